//! On-disk corpus store: `index.bin` (vector blob) next to `chunks.json`.
//!
//! Both files are written to temporaries and renamed into place, index
//! first. `chunks.json` records the blake3 fingerprint of the index it was
//! written with, so a missing file, a torn write or a stale pair all load as
//! "absent" and force a rebuild. There is no partial load.
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use medcopilot_core::error::{Error, Result};
use medcopilot_core::types::Chunk;

use crate::index::FlatL2Index;
use crate::snapshot::CorpusSnapshot;
use crate::store::DocumentStore;

pub const INDEX_FILE: &str = "index.bin";
pub const CHUNKS_FILE: &str = "chunks.json";
const CHUNKS_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct ChunksFile {
    version: u32,
    index_fingerprint: String,
    chunks: Vec<Chunk>,
}

fn write_atomic(dir: &Path, name: &str, bytes: &[u8]) -> Result<()> {
    let tmp = dir.join(format!(".{name}.tmp"));
    fs::write(&tmp, bytes)?;
    fs::rename(&tmp, dir.join(name))?;
    Ok(())
}

pub fn write_snapshot(dir: &Path, snapshot: &CorpusSnapshot) -> Result<()> {
    fs::create_dir_all(dir)?;
    let file = ChunksFile {
        version: CHUNKS_VERSION,
        index_fingerprint: snapshot.fingerprint().to_string(),
        chunks: snapshot.store().chunks().to_vec(),
    };
    let chunks_json = serde_json::to_vec(&file).map_err(|e| Error::Persist(format!("serialize chunks: {e}")))?;
    write_atomic(dir, INDEX_FILE, &snapshot.index().to_bytes())?;
    write_atomic(dir, CHUNKS_FILE, &chunks_json)?;
    info!(dir = %dir.display(), chunks = snapshot.len(), fingerprint = %snapshot.fingerprint(), "corpus snapshot persisted");
    Ok(())
}

/// Load the persisted snapshot, or `Ok(None)` when it is absent or unusable.
///
/// Only I/O failures other than "not found" are returned as errors.
pub fn load_snapshot(dir: &Path) -> Result<Option<CorpusSnapshot>> {
    let index_path = dir.join(INDEX_FILE);
    let chunks_path = dir.join(CHUNKS_FILE);
    match (index_path.exists(), chunks_path.exists()) {
        (true, true) => {}
        (false, false) => return Ok(None),
        (has_index, has_chunks) => {
            warn!(dir = %dir.display(), has_index, has_chunks, "incomplete corpus store, treating as absent");
            return Ok(None);
        }
    }

    let index_bytes = fs::read(&index_path)?;
    let index = match FlatL2Index::from_bytes(&index_bytes) {
        Ok(index) => index,
        Err(e) => {
            warn!(error = %e, "unreadable index blob, treating corpus as absent");
            return Ok(None);
        }
    };
    let file: ChunksFile = match serde_json::from_slice(&fs::read(&chunks_path)?) {
        Ok(f) => f,
        Err(e) => {
            warn!(error = %e, "unreadable chunk file, treating corpus as absent");
            return Ok(None);
        }
    };
    if file.version != CHUNKS_VERSION {
        warn!(version = file.version, "unsupported chunk file version, treating corpus as absent");
        return Ok(None);
    }
    let fingerprint = blake3::hash(&index_bytes).to_hex().to_string();
    if fingerprint != file.index_fingerprint {
        warn!(expected = %file.index_fingerprint, actual = %fingerprint, "index and chunks are from different rebuilds, treating corpus as absent");
        return Ok(None);
    }
    let snapshot = DocumentStore::from_chunks(file.chunks)
        .and_then(|store| CorpusSnapshot::with_fingerprint(store, index, fingerprint));
    match snapshot {
        Ok(s) => Ok(Some(s)),
        Err(e) => {
            warn!(error = %e, "inconsistent corpus store, treating as absent");
            Ok(None)
        }
    }
}

/// Delete both artifacts. Missing files are not an error.
pub fn remove_snapshot(dir: &Path) -> Result<()> {
    for name in [CHUNKS_FILE, INDEX_FILE] {
        match fs::remove_file(dir.join(name)) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
