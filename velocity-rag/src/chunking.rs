//! Splitting documents into retrievable chunks.
//!
//! [`FixedSizeChunker`] cuts exact character windows and is what ingestion
//! uses by default. [`RecursiveChunker`] prefers natural boundaries
//! (paragraphs, lines, sentences, words) and merges pieces back up to the
//! chunk size.
//!
//! Sizes are counted in characters (Unicode scalar values), so multi-byte
//! text is never cut inside a code point.

use crate::document::{CHUNK_INDEX_KEY, Chunk, Document};

/// Turns a [`Document`] into ordered [`Chunk`]s.
///
/// Chunks carry the document's metadata plus their index, and an empty
/// embedding for the pipeline to fill. Empty text yields no chunks.
pub trait Chunker: Send + Sync {
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Wrap raw chunk texts as [`Chunk`]s that inherit the document's metadata.
fn to_chunks(document: &Document, texts: Vec<String>) -> Vec<Chunk> {
    texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            let mut metadata = document.metadata.clone();
            metadata.insert(CHUNK_INDEX_KEY.to_string(), i.to_string());
            Chunk {
                id: format!("{}_{i}", document.id),
                text,
                embedding: Vec::new(),
                metadata,
                document_id: document.id.clone(),
            }
        })
        .collect()
}

/// Exact character windows.
///
/// Every chunk except the last holds exactly `chunk_size` characters, and each
/// chunk starts `chunk_size - chunk_overlap` characters after its predecessor,
/// so neighbours share exactly `chunk_overlap` characters. Chunk IDs are
/// generated as `{document_id}_{chunk_index}`.
///
/// # Example
///
/// ```rust,ignore
/// use velocity_rag::FixedSizeChunker;
///
/// let chunker = FixedSizeChunker::new(500, 50);
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Windows of `chunk_size` characters, neighbours sharing `chunk_overlap`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }
}

/// Character-window splitting with overlap.
fn split_by_size(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    if text.is_empty() || chunk_size == 0 {
        return Vec::new();
    }

    // Byte offset of every character boundary, including the end of the text.
    let bounds: Vec<usize> =
        text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
    let char_count = bounds.len() - 1;
    let step = chunk_size.saturating_sub(chunk_overlap).max(1);

    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + chunk_size).min(char_count);
        chunks.push(text[bounds[start]..bounds[end]].to_string());
        if end == char_count {
            break;
        }
        start += step;
    }

    chunks
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        if document.text.is_empty() {
            return Vec::new();
        }
        to_chunks(document, split_by_size(&document.text, self.chunk_size, self.chunk_overlap))
    }
}

/// Separators tried in order by [`RecursiveChunker`]. The empty separator
/// splits into single characters and always succeeds.
const SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

/// Splits text hierarchically: paragraphs → lines → sentences → words → characters.
///
/// Text is cut on the coarsest separator it contains. Pieces that still exceed
/// `chunk_size` are split again with the next separator, and neighbouring
/// pieces are merged back into chunks of at most `chunk_size` characters. When
/// a chunk is emitted, its trailing pieces (up to `chunk_overlap` characters)
/// are carried into the next one. Chunks are trimmed of surrounding whitespace,
/// so overlap is approximate rather than exact.
///
/// # Example
///
/// ```rust,ignore
/// use velocity_rag::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(500, 50);
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }

    fn split_text(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let index = separators.iter().position(|s| s.is_empty() || text.contains(*s));
        let (separator, rest) = match index {
            Some(i) => (separators[i], &separators[i + 1..]),
            None => ("", &[][..]),
        };

        let pieces = split_keeping_separator(text, separator);
        let mut chunks = Vec::new();
        let mut pending: Vec<&str> = Vec::new();

        for piece in pieces {
            if char_len(piece) <= self.chunk_size {
                pending.push(piece);
                continue;
            }
            if !pending.is_empty() {
                chunks.extend(self.merge(&pending));
                pending.clear();
            }
            if rest.is_empty() {
                chunks.extend(split_by_size(piece, self.chunk_size, self.chunk_overlap));
            } else {
                chunks.extend(self.split_text(piece, rest));
            }
        }
        if !pending.is_empty() {
            chunks.extend(self.merge(&pending));
        }

        chunks
    }

    /// Merge small pieces into chunks, carrying an overlap tail forward.
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: Vec<&str> = Vec::new();
        let mut window_len = 0;

        for &piece in pieces {
            let len = char_len(piece);
            if window_len + len > self.chunk_size && !window.is_empty() {
                push_trimmed(&mut chunks, &window.concat());
                while window_len > self.chunk_overlap
                    || (window_len + len > self.chunk_size && window_len > 0)
                {
                    window_len -= char_len(window.remove(0));
                }
            }
            window.push(piece);
            window_len += len;
        }
        if !window.is_empty() {
            push_trimmed(&mut chunks, &window.concat());
        }

        chunks
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn push_trimmed(chunks: &mut Vec<String>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

/// Split text at a separator while keeping the separator attached to the preceding segment.
///
/// An empty separator yields one segment per character.
fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text.char_indices().map(|(i, c)| &text[i..i + c.len_utf8()]).collect();
    }

    let mut result = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        result.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        result.push(&text[start..]);
    }

    result
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        if document.text.is_empty() || self.chunk_size == 0 {
            return Vec::new();
        }
        to_chunks(document, self.split_text(&document.text, &SEPARATORS))
    }
}
