//! Text chunking with configurable size and overlap.

use crate::types::ChunkCandidate;

/// Chunk text into overlapping segments.
///
/// Sizes are in bytes, snapped to UTF-8 character boundaries. Each
/// candidate carries `reference`, `position`, `start`, `end` and
/// `content_type` metadata.
pub fn chunk_text(
    reference: &str,
    content_type: &str,
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Vec<ChunkCandidate> {
    if text.trim().is_empty() || chunk_size == 0 {
        return vec![];
    }

    let mut chunks = Vec::new();
    let mut position = 0u32;
    let mut start = 0;

    let step = if chunk_size > overlap {
        chunk_size - overlap
    } else {
        chunk_size
    };

    while start < text.len() {
        let mut end = (start + chunk_size).min(text.len());
        while end > start && !text.is_char_boundary(end) {
            end -= 1;
        }
        if end == start {
            break;
        }

        let trimmed = text[start..end].trim();
        if !trimmed.is_empty() {
            let mut metadata = serde_json::Map::new();
            metadata.insert("reference".to_string(), serde_json::json!(reference));
            metadata.insert("position".to_string(), serde_json::json!(position));
            metadata.insert("start".to_string(), serde_json::json!(start));
            metadata.insert("end".to_string(), serde_json::json!(end));
            metadata.insert("content_type".to_string(), serde_json::json!(content_type));

            chunks.push(ChunkCandidate {
                reference: reference.to_string(),
                position,
                text: trimmed.to_string(),
                metadata,
            });
            position += 1;
        }

        if end == text.len() {
            break;
        }

        let mut next_start = start + step;
        while next_start < text.len() && !text.is_char_boundary(next_start) {
            next_start += 1;
        }
        start = next_start;
    }

    tracing::debug!(
        "Chunked {} into {} chunks (size: {}, overlap: {})",
        reference,
        chunks.len(),
        chunk_size,
        overlap
    );

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_text_basic() {
        let text = "a".repeat(1000);
        let chunks = chunk_text("doc.txt", "text", &text, 200, 50);

        assert!(chunks.len() >= 2);
        assert_eq!(chunks[0].position, 0);
        assert_eq!(chunks[1].position, 1);
        assert_eq!(chunks[1].metadata["start"], serde_json::json!(150));
    }

    #[test]
    fn test_chunk_text_no_overlap() {
        let text = "a".repeat(300);
        let chunks = chunk_text("doc.txt", "text", &text, 100, 0);
        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn test_short_tail_kept_without_overlap() {
        let text = format!("{}TAIL", "a".repeat(100));
        let chunks = chunk_text("doc.txt", "text", &text, 100, 0);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].text, "TAIL");
        assert_eq!(chunks[1].metadata["start"], serde_json::json!(100));
    }

    #[test]
    fn test_every_byte_covered() {
        let text: String = (0..97).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
        for overlap in [0, 3, 10, 40] {
            let chunks = chunk_text("doc.txt", "text", &text, 30, overlap);
            let last_end = chunks.last().unwrap().metadata["end"].as_u64().unwrap();
            assert_eq!(last_end as usize, text.len(), "overlap {}", overlap);
        }
    }

    #[test]
    fn test_chunk_text_empty() {
        assert!(chunk_text("doc.txt", "text", "", 100, 10).is_empty());
        assert!(chunk_text("doc.txt", "text", "   \n", 100, 10).is_empty());
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunks = chunk_text("note.md", "markdown", "Paris is the capital of France.", 512, 64);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Paris is the capital of France.");

        let keys: Vec<&str> = chunks[0].metadata.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["reference", "position", "start", "end", "content_type"]);
        assert_eq!(chunks[0].metadata["content_type"], serde_json::json!("markdown"));
    }

    #[test]
    fn test_chunk_text_with_overlap() {
        let text = "abcdefghijklmnopqrstuvwxyz".repeat(10);
        let chunks = chunk_text("doc.txt", "text", &text, 50, 10);

        let first_tail: String = chunks[0].text.chars().skip(40).collect();
        let second_head: String = chunks[1].text.chars().take(10).collect();
        assert_eq!(first_tail, second_head);
    }

    #[test]
    fn test_multibyte_boundaries() {
        let text = "é".repeat(300);
        let chunks = chunk_text("fr.txt", "text", &text, 101, 11);
        assert!(!chunks.is_empty());
        for chunk in chunks {
            assert!(chunk.text.chars().all(|c| c == 'é'));
        }
    }
}
