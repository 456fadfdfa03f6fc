use crate::error::StoreError;
use crate::keywords::InvertedIndex;
use crate::models::Chunk;
use crate::vector::FlatIpIndex;
use std::fs;
use std::path::Path;
use tracing::info;

const VECTORS_FILE: &str = "vectors.json";
const CHUNKS_FILE: &str = "chunks.json";
const KEYWORDS_FILE: &str = "keywords.json";

/// Persist the three retrieval artifacts as one bundle keyed by a directory.
pub fn save_artifacts(
    index_dir: &Path,
    index: &FlatIpIndex,
    chunks: &[Chunk],
    inverted: &InvertedIndex,
) -> Result<(), StoreError> {
    fs::create_dir_all(index_dir)?;

    fs::write(
        index_dir.join(VECTORS_FILE),
        serde_json::to_string(index)?,
    )?;
    fs::write(
        index_dir.join(CHUNKS_FILE),
        serde_json::to_string_pretty(chunks)?,
    )?;
    fs::write(
        index_dir.join(KEYWORDS_FILE),
        serde_json::to_string_pretty(inverted)?,
    )?;

    info!(dir = %index_dir.display(), vectors = index.len(), "artifacts saved");
    Ok(())
}

/// Load the bundle back. The vector index is the anchor artifact: if it is
/// absent the whole load fails, there is no partial success.
pub fn load_artifacts(
    index_dir: &Path,
) -> Result<(FlatIpIndex, Vec<Chunk>, InvertedIndex), StoreError> {
    let vectors_path = index_dir.join(VECTORS_FILE);
    if !vectors_path.exists() {
        return Err(StoreError::ArtifactMissing(vectors_path));
    }

    let index: FlatIpIndex = serde_json::from_str(&fs::read_to_string(&vectors_path)?)?;
    let chunks: Vec<Chunk> = serde_json::from_str(&fs::read_to_string(index_dir.join(CHUNKS_FILE))?)?;
    let inverted: InvertedIndex =
        serde_json::from_str(&fs::read_to_string(index_dir.join(KEYWORDS_FILE))?)?;

    info!(dir = %index_dir.display(), chunks = chunks.len(), "artifacts loaded");
    Ok((index, chunks, inverted))
}
