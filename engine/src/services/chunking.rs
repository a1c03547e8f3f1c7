//! Character-based text chunking with overlap

/// Default chunk size in characters (about 1000 tokens)
pub const CHUNK_SIZE: usize = 6000;

/// Default overlap between consecutive chunks, in characters
pub const CHUNK_OVERLAP: usize = 500;

/// Split text into overlapping chunks of at most `chunk_size` characters.
///
/// Chunking stops once the unread remainder would start a chunk shorter than
/// half of `chunk_size`; the remaining tail is appended to the last chunk
/// instead, so no text is lost.
///
/// Sizes count `char`s, so multi-byte text is never split inside a code point.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let chunk_size = chunk_size.max(1);
    let overlap = overlap.min(chunk_size - 1);

    tracing::debug!(
        "Starting text chunking: text_length={}, chunk_size={}, overlap={}",
        len,
        chunk_size,
        overlap
    );

    let mut chunks: Vec<String> = Vec::new();
    let mut start = 0;

    while start < len {
        let end = (start + chunk_size).min(len);
        chunks.push(chars[start..end].iter().collect());

        if end == len {
            break;
        }

        start = end - overlap;
        if (len - start) * 2 < chunk_size {
            if let Some(last) = chunks.last_mut() {
                last.extend(&chars[end..]);
            }
            break;
        }
    }

    tracing::debug!("Chunking complete: total_chunks={}", chunks.len());
    chunks
}

/// [`chunk_text`] with the default size and overlap
pub fn chunk_text_default(text: &str) -> Vec<String> {
    chunk_text(text, CHUNK_SIZE, CHUNK_OVERLAP)
}
