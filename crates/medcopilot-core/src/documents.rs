//! Document ingestion: page extraction, per-page chunking and directory scans.
//!
//! Each document produces a [`DocumentOutcome`] instead of an error so a
//! single unreadable file is reported and skipped while the rest of the
//! corpus is still indexed.
use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::chunker::{chunk_text, is_noise};
use crate::config::ChunkingSettings;
use crate::error::{Error, Result};
use crate::types::{source_label, RawDocument};

/// Page separator emitted by `pdftotext` and most text exporters.
const PAGE_BREAK: char = '\u{000C}';
const TEXT_EXTENSIONS: [&str; 3] = ["txt", "text", "md"];

/// A chunk that survived the noise filter but has no handle yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkDraft {
    pub text: String,
    pub source_label: String,
}

#[derive(Debug, Clone)]
pub enum DocumentOutcome {
    Parsed { filename: String, pages: usize, chunks: Vec<ChunkDraft> },
    Skipped { filename: String, reason: String },
}

impl DocumentOutcome {
    pub fn filename(&self) -> &str {
        match self {
            Self::Parsed { filename, .. } | Self::Skipped { filename, .. } => filename,
        }
    }
}

/// Split a raw document into page texts.
///
/// Only text exports are understood; binary PDFs must be converted first.
pub fn extract_pages(doc: &RawDocument) -> Result<Vec<String>> {
    let malformed = |reason: &str| Error::MalformedDocument { filename: doc.filename.clone(), reason: reason.to_string() };
    if doc.bytes.starts_with(b"%PDF-") {
        return Err(malformed("binary PDF, export it to text (one form feed per page) first"));
    }
    let ext = Path::new(&doc.filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !TEXT_EXTENSIONS.contains(&ext.as_str()) {
        return Err(malformed(&format!("unsupported file type '{ext}'")));
    }
    let text = std::str::from_utf8(&doc.bytes).map_err(|e| malformed(&format!("invalid UTF-8: {e}")))?;
    let normalized = text.replace("\r\n", "\n");
    Ok(normalized.split(PAGE_BREAK).map(str::to_string).collect())
}

pub struct DocumentProcessor {
    chunking: ChunkingSettings,
}

impl DocumentProcessor {
    pub fn new(chunking: ChunkingSettings) -> Self { Self { chunking } }

    pub fn process(&self, doc: &RawDocument) -> DocumentOutcome {
        match self.try_process(doc) {
            Ok((pages, chunks)) => {
                debug!(file = %doc.filename, pages, chunks = chunks.len(), "document chunked");
                DocumentOutcome::Parsed { filename: doc.filename.clone(), pages, chunks }
            }
            Err(e) => {
                warn!(file = %doc.filename, error = %e, "skipping document");
                DocumentOutcome::Skipped { filename: doc.filename.clone(), reason: e.to_string() }
            }
        }
    }

    pub fn process_all(&self, docs: &[RawDocument]) -> Vec<DocumentOutcome> {
        docs.iter().map(|d| self.process(d)).collect()
    }

    fn try_process(&self, doc: &RawDocument) -> Result<(usize, Vec<ChunkDraft>)> {
        let pages = extract_pages(doc)?;
        let mut drafts = Vec::new();
        for (i, page) in pages.iter().enumerate() {
            let label = source_label(&doc.filename, i + 1);
            for window in chunk_text(page, self.chunking.size, self.chunking.overlap)? {
                if is_noise(&window, self.chunking.min_chars) { continue; }
                drafts.push(ChunkDraft { text: window, source_label: label.clone() });
            }
        }
        Ok((pages.len(), drafts))
    }
}

/// Read every regular, non-hidden file under `root`, sorted by path.
///
/// Filtering by type is left to [`extract_pages`] so unsupported files show
/// up in the rebuild report instead of disappearing silently.
pub fn load_documents_from_dir(root: &Path) -> Result<Vec<RawDocument>> {
    if !root.is_dir() {
        return Err(Error::NotFound(format!("document directory {}", root.display())));
    }
    let mut paths: Vec<_> = walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| !e.file_name().to_string_lossy().starts_with('.'))
        .map(|e| e.into_path())
        .collect();
    paths.sort();
    let mut docs = Vec::with_capacity(paths.len());
    for path in paths {
        let filename = path.strip_prefix(root).unwrap_or(&path).to_string_lossy().to_string();
        docs.push(RawDocument { filename, bytes: fs::read(&path)? });
    }
    Ok(docs)
}
