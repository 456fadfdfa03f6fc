use crate::error::IngestError;
use regex::Regex;
use tracing::warn;

/// Numbered section headings: a 1-2 digit token, optionally dotted once
/// ("4", "4.8"), an optional trailing period, then an uppercase title of at
/// least three characters running to the end of the line. Scandinavian
/// uppercase is part of the title alphabet.
const HEADING_PATTERN: &str =
    r"(?m)^\s*(\d{1,2}(?:\.\d{1,2})?)\s*\.?\s+([A-ZÅÄÖ][A-ZÅÄÖ0-9 \t()/-]{2,})\t*$";

/// One recognized heading: the section id token, the trimmed title, and the
/// byte offset where the heading starts in the scanned text.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadingMatch {
    pub section_id: String,
    pub title: String,
    pub start: usize,
}

#[derive(Debug, Default)]
pub struct HeadingScan {
    pub matches: Vec<HeadingMatch>,
    pub rejected_titles: usize,
}

pub struct HeadingDetector {
    pattern: Regex,
    max_title_chars: usize,
}

impl HeadingDetector {
    pub fn new(max_title_chars: usize) -> Result<Self, IngestError> {
        Ok(Self {
            pattern: Regex::new(HEADING_PATTERN)?,
            max_title_chars,
        })
    }

    /// Scan normalized page text for headings, in document order. Over-length
    /// titles are mis-parsed tables rather than headings; they are skipped
    /// and counted, never fatal.
    pub fn find(&self, text: &str) -> HeadingScan {
        let mut scan = HeadingScan::default();

        for captures in self.pattern.captures_iter(text) {
            let Some(whole) = captures.get(0) else {
                continue;
            };
            let section_id = captures[1].to_string();
            let title = captures[2].trim().to_string();

            if title.chars().count() > self.max_title_chars {
                warn!(
                    section_id = %section_id,
                    title_prefix = %title.chars().take(50).collect::<String>(),
                    "skipping overly long heading title"
                );
                scan.rejected_titles += 1;
                continue;
            }

            scan.matches.push(HeadingMatch {
                section_id,
                title,
                start: whole.start(),
            });
        }

        scan
    }
}

/// Collapse the PDF font-substitution artifacts that break heading matching:
/// non-breaking and zero-width spaces, and the full-width/middle-dot period
/// variants some extractors emit for "4.8".
pub fn normalize_for_headings(text: &str) -> String {
    text.replace('\u{00A0}', " ")
        .replace('\u{200B}', "")
        .replace('．', ".")
        .replace('·', ".")
}
