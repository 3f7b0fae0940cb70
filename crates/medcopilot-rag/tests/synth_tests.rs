mod common;

use std::sync::Arc;

use common::{Reply, ScriptedBackend};
use medcopilot_core::config::SynthesisSettings;
use medcopilot_core::error::BackendError;
use medcopilot_rag::synth::{GROUNDED_SYSTEM_PROMPT, OPEN_SYSTEM_PROMPT};
use medcopilot_rag::AnswerSynthesizer;

fn rejected(model: &str) -> Reply {
    Reply::Fail(BackendError::Rejected { model: model.into(), status: 503, message: "over capacity".into() })
}

#[tokio::test(start_paused = true)]
async fn falls_through_timeout_and_rejection_to_third_model() {
    let settings = SynthesisSettings::default();
    let [m1, m2, m3] = [&settings.models[0], &settings.models[1], &settings.models[2]];
    let backend = Arc::new(
        ScriptedBackend::new()
            .reply(m1, Reply::Hang)
            .reply(m2, rejected(m2))
            .reply(m3, Reply::Text("third model answer".into())),
    );
    let synth = AnswerSynthesizer::new(backend.clone(), settings.clone());

    let outcome = synth.synthesize("sepsis protocol", "context").await;
    assert!(outcome.is_answered());
    assert_eq!(outcome.answer, "third model answer");
    assert_eq!(outcome.model.as_deref(), Some(m3.as_str()));
    assert_eq!(backend.models_called(), settings.models);
}

#[tokio::test(start_paused = true)]
async fn exhausted_chain_reports_last_error() {
    let settings = SynthesisSettings::default();
    let last = settings.models[2].clone();
    let backend = Arc::new(
        ScriptedBackend::new()
            .reply(&settings.models[0], Reply::Hang)
            .reply(&settings.models[1], Reply::Hang)
            .reply(&last, rejected(&last)),
    );
    let synth = AnswerSynthesizer::new(backend, settings);

    let outcome = synth.synthesize_open("fever").await;
    assert!(!outcome.is_answered());
    assert!(outcome.model.is_none());
    let error = outcome.error.expect("error");
    assert!(error.contains("over capacity"));
    assert!(outcome.answer.contains(&error));
}

#[tokio::test(start_paused = true)]
async fn timeouts_alone_exhaust_the_chain() {
    let settings = SynthesisSettings { models: vec!["slow".into()], attempt_timeout_secs: 5, ..SynthesisSettings::default() };
    let synth = AnswerSynthesizer::new(Arc::new(ScriptedBackend::new().reply("slow", Reply::Hang)), settings);
    let outcome = synth.synthesize_open("fever").await;
    assert!(outcome.error.expect("error").contains("timed out after 5s"));
}

#[tokio::test]
async fn prompts_are_truncated_and_modes_differ() {
    let settings = SynthesisSettings { max_prompt_chars: 100, ..SynthesisSettings::default() };
    let backend = Arc::new(ScriptedBackend::always("ok"));
    let synth = AnswerSynthesizer::new(backend.clone(), settings.clone());

    synth.synthesize("what dose?", &"é".repeat(5_000)).await;
    synth.synthesize_open("what dose?").await;

    let calls = backend.calls.lock().expect("calls lock");
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].system_prompt, GROUNDED_SYSTEM_PROMPT);
    assert!(calls[0].user_prompt.starts_with("Question: what dose?"));
    assert_eq!(calls[0].user_prompt.chars().count(), 100);
    assert!((calls[0].temperature - settings.grounded_temperature).abs() < f32::EPSILON);
    assert_eq!(calls[1].system_prompt, OPEN_SYSTEM_PROMPT);
    assert_eq!(calls[1].user_prompt, "what dose?");
    assert_eq!(calls[1].max_tokens, 800);
}
