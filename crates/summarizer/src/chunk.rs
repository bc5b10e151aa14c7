//! Document chunking
//!
//! Splits text into fixed-size, overlapping character spans. Offsets count
//! characters, not bytes, so multi-byte text never splits inside a code point.

use agent_core::{AgentError, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CHUNK_SIZE: usize = 3000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Validated chunking parameters. `overlap < size` always holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ChunkingConfig {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(AgentError::Config("chunk_size must be positive".into()));
        }
        if chunk_overlap >= chunk_size {
            return Err(AgentError::Config(format!(
                "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub const fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    const fn stride(&self) -> usize {
        self.chunk_size - self.chunk_overlap
    }

    /// Whether `text` is longer than one chunk
    pub fn needs_chunking(&self, text: &str) -> bool {
        text.chars().count() > self.chunk_size
    }

    /// Number of chunks `chunk_text` yields for `len` characters
    pub const fn chunk_count(&self, len: usize) -> usize {
        if len <= self.chunk_size {
            1
        } else {
            (len - self.chunk_overlap).div_ceil(self.stride())
        }
    }
}

/// A contiguous character span of the source text
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Zero-based sequence index
    pub index: usize,
    /// Total chunks for the source
    pub total: usize,
    /// First character offset (inclusive)
    pub start: usize,
    /// Last character offset (exclusive)
    pub end: usize,
    pub text: String,
}

impl DocumentChunk {
    /// `--- Chunk i of n ---` header followed by `body`
    pub fn label(&self, body: &str) -> String {
        format!("--- Chunk {} of {} ---\n{body}", self.index + 1, self.total)
    }
}

/// Split `text` into overlapping chunks covering it without gaps.
///
/// Each chunk spans `[start, start + size)` clipped to the text; the next
/// start is `start + size - overlap`. Splitting stops once a chunk reaches
/// the end. Text no longer than one chunk (including empty text) yields a
/// single chunk.
pub fn chunk_text(text: &str, config: &ChunkingConfig) -> Vec<DocumentChunk> {
    // Byte offset of every character boundary, including the end
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    let len = boundaries.len() - 1;

    let mut spans = Vec::with_capacity(config.chunk_count(len));
    let mut start = 0;
    loop {
        let end = (start + config.chunk_size).min(len);
        spans.push((start, end));
        if end >= len {
            break;
        }
        start += config.stride();
    }

    let total = spans.len();
    spans
        .into_iter()
        .enumerate()
        .map(|(index, (start, end))| DocumentChunk {
            index,
            total,
            start,
            end,
            text: text[boundaries[start]..boundaries[end]].to_string(),
        })
        .collect()
}
