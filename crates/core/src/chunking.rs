use crate::error::IngestError;
use crate::heading::{normalize_for_headings, HeadingDetector, HeadingMatch};
use crate::models::{BuildStats, Chunk, Page, FULL_PAGE_TITLE};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

/// Width of the truncated hex digest used as a chunk id.
const CHUNK_ID_LEN: usize = 12;

/// Deterministic chunk identity: the same (source, section, page range)
/// always digests to the same id, across runs and processes.
pub fn stable_chunk_id(
    source_file: &str,
    section_id: Option<&str>,
    page_start: u32,
    page_end: u32,
) -> String {
    let raw = format!(
        "{source_file}|{}|{page_start}-{page_end}",
        section_id.unwrap_or("NA")
    );
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    let mut id = format!("{:x}", hasher.finalize());
    id.truncate(CHUNK_ID_LEN);
    id
}

#[derive(Debug)]
pub struct ChunkingOutcome {
    pub chunks: Vec<Chunk>,
    pub stats: BuildStats,
}

pub struct Chunker {
    detector: HeadingDetector,
    min_chunk_chars: usize,
}

impl Chunker {
    pub fn new(max_title_chars: usize, min_chunk_chars: usize) -> Result<Self, IngestError> {
        Ok(Self {
            detector: HeadingDetector::new(max_title_chars)?,
            min_chunk_chars,
        })
    }

    /// Split pages into section chunks at heading boundaries, then merge
    /// heading-less pages into the section opened on a prior page.
    pub fn chunk_pages(&self, pages: &[Page]) -> ChunkingOutcome {
        info!(pages = pages.len(), "chunking pages by section headings");
        let mut stats = BuildStats::default();
        let mut raw_chunks = Vec::new();

        for page in pages {
            let text = normalize_for_headings(&page.text);
            let scan = self.detector.find(&text);
            stats.rejected_titles += scan.rejected_titles;

            if scan.matches.is_empty() {
                raw_chunks.push(Chunk {
                    chunk_id: String::new(),
                    section_id: None,
                    section_title: FULL_PAGE_TITLE.to_string(),
                    text,
                    page_start: page.page_number,
                    page_end: page.page_number,
                    source_file: page.source_file.clone(),
                    keywords: Vec::new(),
                });
                continue;
            }

            self.split_at_headings(&text, &scan.matches, page, &mut raw_chunks, &mut stats);
        }

        let mut merged: Vec<Chunk> = Vec::new();
        for chunk in raw_chunks {
            match merged.last_mut() {
                Some(prev) if chunk.is_full_page() => {
                    prev.text.push_str("\n\n");
                    prev.text.push_str(&chunk.text);
                    prev.page_end = chunk.page_end;
                    stats.merged_pages += 1;
                }
                _ => merged.push(chunk),
            }
        }

        for chunk in &mut merged {
            chunk.chunk_id = stable_chunk_id(
                &chunk.source_file,
                chunk.section_id.as_deref(),
                chunk.page_start,
                chunk.page_end,
            );
        }

        debug!(chunks = merged.len(), "chunking complete");
        ChunkingOutcome {
            chunks: merged,
            stats,
        }
    }

    /// Each chunk's span runs from its heading's start offset to the next
    /// heading's start, or to the end of the page for the last heading.
    fn split_at_headings(
        &self,
        text: &str,
        matches: &[HeadingMatch],
        page: &Page,
        out: &mut Vec<Chunk>,
        stats: &mut BuildStats,
    ) {
        for (idx, matched) in matches.iter().enumerate() {
            let end = matches
                .get(idx + 1)
                .map(|next| next.start)
                .unwrap_or(text.len());
            let chunk_text = text[matched.start..end].trim();

            if chunk_text.chars().count() < self.min_chunk_chars {
                stats.dropped_fragments += 1;
                continue;
            }

            out.push(Chunk {
                chunk_id: String::new(),
                section_id: Some(matched.section_id.clone()),
                section_title: section_title(&matched.section_id, &matched.title),
                text: chunk_text.to_string(),
                page_start: page.page_number,
                page_end: page.page_number,
                source_file: page.source_file.clone(),
                keywords: Vec::new(),
            });
        }
    }
}

/// "4 TITLE" becomes "4. TITLE"; "4.8 TITLE" keeps its id verbatim, the dot
/// already reads as part of the number.
fn section_title(section_id: &str, title: &str) -> String {
    if section_id.contains('.') {
        format!("{section_id} {title}")
    } else {
        format!("{section_id}. {title}")
    }
}
