//! Overlapping-window text chunker.
//!
//! Splits the concatenated page text of a document into [`Passage`]s of a
//! configured target length with a configured overlap, so evidence that
//! spans a chunk boundary is still retrievable from at least one chunk.
//! Cut points prefer paragraph breaks, then sentence ends, then whitespace,
//! falling back to a hard cut; this is a quality heuristic, not a guarantee.
//!
//! Windows are computed over characters (not bytes) so multi-byte text never
//! splits inside a code point. Each passage records its originating page
//! range and window offsets, plus a SHA-256 hash of its text.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::ChunkingConfig;
use crate::models::{PageText, Passage};

/// Char span of one page inside the concatenated document text.
struct PageSpan {
    start: usize,
    end: usize,
    number: u32,
}

/// Split extracted pages into overlapping passages.
///
/// Empty input yields an empty sequence. Consecutive windows advance by
/// `chunk_chars - overlap_chars`, so the whole text is covered with no gaps.
pub fn chunk_pages(document_id: &str, pages: &[PageText], chunking: &ChunkingConfig) -> Vec<Passage> {
    let chunk_chars = chunking.chunk_chars;
    let overlap = chunking.overlap_chars;

    // Concatenate pages with a paragraph separator, tracking page spans.
    let mut chars: Vec<char> = Vec::new();
    let mut spans: Vec<PageSpan> = Vec::with_capacity(pages.len());
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            chars.push('\n');
            chars.push('\n');
        }
        let start = chars.len();
        chars.extend(page.text.chars());
        spans.push(PageSpan {
            start,
            end: chars.len(),
            number: page.number,
        });
    }

    let total = chars.len();
    let mut passages = Vec::new();
    let mut seq: i64 = 0;
    let mut start = 0usize;

    while start < total {
        let hard_end = (start + chunk_chars).min(total);
        // Any cut must land past the overlap region or the window would
        // stop advancing. overlap < chunk_chars is enforced by config
        // validation, so the cut range is never empty.
        let end = if hard_end < total {
            find_break(&chars, start + overlap + 1, hard_end)
        } else {
            hard_end
        };

        let text: String = chars[start..end].iter().collect();
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            let (page_start, page_end) = page_range(&spans, start, end);
            passages.push(make_passage(
                document_id,
                seq,
                trimmed,
                page_start,
                page_end,
                start,
                end,
            ));
            seq += 1;
        }

        if end >= total {
            break;
        }
        start = end - overlap;
    }

    passages
}

/// Pick a cut position in `(min_cut, hard_end]`, preferring a paragraph
/// break, then a sentence end, then any whitespace. Falls back to the
/// hard cut when the window has no break at all.
fn find_break(chars: &[char], min_cut: usize, hard_end: usize) -> usize {
    let mut sentence_cut = None;
    let mut space_cut = None;

    let mut i = hard_end;
    while i > min_cut {
        let prev = chars[i - 1];
        if prev == '\n' && i >= 2 && chars[i - 2] == '\n' {
            return i;
        }
        if sentence_cut.is_none()
            && prev.is_whitespace()
            && i >= 2
            && matches!(chars[i - 2], '.' | '!' | '?')
        {
            sentence_cut = Some(i);
        }
        if space_cut.is_none() && prev.is_whitespace() {
            space_cut = Some(i);
        }
        i -= 1;
    }

    sentence_cut.or(space_cut).unwrap_or(hard_end)
}

/// Pages overlapped by the window `[start, end)`.
fn page_range(spans: &[PageSpan], start: usize, end: usize) -> (i64, i64) {
    let mut first = spans.first().map(|s| s.number).unwrap_or(0);
    let mut last = first;

    for span in spans {
        if span.end > start {
            first = span.number;
            break;
        }
    }
    for span in spans.iter().rev() {
        if span.start < end {
            last = span.number;
            break;
        }
    }

    (i64::from(first), i64::from(last))
}

fn make_passage(
    document_id: &str,
    seq: i64,
    text: &str,
    page_start: i64,
    page_end: i64,
    char_start: usize,
    char_end: usize,
) -> Passage {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Passage {
        id: Uuid::new_v4().to_string(),
        document_id: document_id.to_string(),
        seq,
        text: text.to_string(),
        page_start,
        page_end,
        char_start: char_start as i64,
        char_end: char_end as i64,
        hash,
    }
}
