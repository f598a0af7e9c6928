use fibot_core::error::AppError;
use serde::{Deserialize, Serialize};

use crate::corpus::CorpusRecord;

pub const DEFAULT_CHUNK_SIZE: usize = 500;
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextChunk {
    pub content: String,
    /// `<dataset>#<record ordinal>`.
    pub source_id: String,
}

/// Window size and overlap, both in `char`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    size: usize,
    overlap: usize,
}

impl ChunkConfig {
    pub fn new(size: usize, overlap: usize) -> Result<Self, AppError> {
        if size == 0 || overlap >= size {
            return Err(AppError::new(
                "VALIDATION_CHUNK_CONFIG",
                "Chunk size must be positive and larger than the overlap",
            )
            .with_details(format!("size={size}; overlap={overlap}")));
        }
        Ok(Self { size, overlap })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    pub fn chunks<'a>(&self, text: &'a str) -> Chunks<'a> {
        Chunks {
            text,
            start: 0,
            size: self.size,
            step: self.size - self.overlap,
            done: text.is_empty(),
        }
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// Lazy window iterator. Every window but the last is exactly `size` chars, and
/// consecutive windows share `overlap` chars. Clone to restart from the same point.
///
/// Each step scans at most `size` chars past the current window start and
/// allocates nothing.
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    text: &'a str,
    /// Byte offset of the next window.
    start: usize,
    size: usize,
    step: usize,
    done: bool,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let rest = &self.text[self.start..];
        let mut offsets = rest.char_indices().map(|(i, _)| i);
        // Byte offsets of the `step`-th and the `size`-th char, if the text reaches them.
        let next_start = offsets.nth(self.step);
        let end = match self.size - self.step {
            0 => next_start,
            overlap => next_start.and_then(|_| offsets.nth(overlap - 1)),
        };
        match (end, next_start) {
            (Some(end), Some(next)) => {
                self.start += next;
                Some(&rest[..end])
            }
            _ => {
                self.done = true;
                Some(rest)
            }
        }
    }
}

/// Chunk every record in order.
pub fn chunk_records(records: &[CorpusRecord], cfg: ChunkConfig) -> Vec<TextChunk> {
    let mut out = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let source_id = format!("{}#{}", rec.dataset, i);
        out.extend(cfg.chunks(&rec.text).map(|c| TextChunk {
            content: c.to_string(),
            source_id: source_id.clone(),
        }));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rebuild(chunks: &[&str], overlap: usize) -> String {
        let mut out = String::new();
        for (i, c) in chunks.iter().enumerate() {
            if i == 0 {
                out.push_str(c);
            } else {
                out.extend(c.chars().skip(overlap));
            }
        }
        out
    }

    #[test]
    fn rejects_bad_config() {
        assert_eq!(ChunkConfig::new(0, 0).unwrap_err().code, "VALIDATION_CHUNK_CONFIG");
        assert!(ChunkConfig::new(10, 10).is_err());
        assert!(ChunkConfig::new(10, 9).is_ok());
    }

    #[test]
    fn short_input_is_one_chunk() {
        let cfg = ChunkConfig::new(500, 50).unwrap();
        let text = "Q: What is SIP?\nA: Systematic Investment Plan.";
        assert_eq!(cfg.chunks(text).collect::<Vec<_>>(), vec![text]);
        assert_eq!(cfg.chunks("").count(), 0);

        let exact = "a".repeat(500);
        assert_eq!(cfg.chunks(&exact).count(), 1);
    }

    #[test]
    fn windows_overlap_and_reconstruct() {
        let cfg = ChunkConfig::new(4, 1).unwrap();
        let text = "abcdefghij";
        let chunks = cfg.chunks(text).collect::<Vec<_>>();
        assert_eq!(chunks, vec!["abcd", "defg", "ghij"]);
        assert_eq!(rebuild(&chunks, 1), text);
    }

    #[test]
    fn zero_overlap_tiles_the_text() {
        let cfg = ChunkConfig::new(3, 0).unwrap();
        assert_eq!(cfg.chunks("abcdefg").collect::<Vec<_>>(), vec!["abc", "def", "g"]);
        assert_eq!(cfg.chunks("abcdef").collect::<Vec<_>>(), vec!["abc", "def"]);
    }

    #[test]
    fn long_input_streams_windows_in_order() {
        let cfg = ChunkConfig::default();
        let text = "₹".repeat(100_000);
        let mut it = cfg.chunks(&text);
        assert_eq!(it.next().map(|c| c.chars().count()), Some(500));
        assert_eq!(it.next().map(|c| c.chars().count()), Some(500));
        assert_eq!(cfg.chunks(&text).count(), (100_000 - 50 + 449) / 450);
        assert!(cfg.chunks(&text).all(|c| c.chars().all(|ch| ch == '₹')));
    }

    #[test]
    fn multibyte_text_splits_on_char_boundaries() {
        let cfg = ChunkConfig::new(3, 1).unwrap();
        let text = "₹1₹2₹3₹";
        let chunks = cfg.chunks(text).collect::<Vec<_>>();
        assert!(chunks.iter().all(|c| c.chars().count() <= 3));
        assert_eq!(rebuild(&chunks, 1), text);
    }

    #[test]
    fn iterator_is_restartable() {
        let cfg = ChunkConfig::new(5, 2).unwrap();
        let it = cfg.chunks("the quick brown fox");
        let first: Vec<_> = it.clone().collect();
        let second: Vec<_> = it.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn records_keep_their_source() {
        let recs = vec![
            CorpusRecord {
                text: "abcdef".to_string(),
                dataset: "d1".to_string(),
            },
            CorpusRecord {
                text: "xy".to_string(),
                dataset: "d2".to_string(),
            },
        ];
        let chunks = chunk_records(&recs, ChunkConfig::new(4, 1).unwrap());
        let ids = chunks.iter().map(|c| c.source_id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["d1#0", "d1#0", "d2#1"]);
    }
}
