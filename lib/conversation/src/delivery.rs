//! Chunked delivery of a finished answer.
//!
//! This is presentation only: the full text already exists, it is just
//! handed out in fixed-size pieces so a client can render it progressively.

use futures::Stream;
use futures::stream;

/// Splits `text` into pieces of at most `size` characters.
///
/// A `size` of zero is treated as one. Pieces never split a character.
#[must_use]
pub fn chunks(text: &str, size: usize) -> Vec<String> {
    let size = size.max(1);
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size)
        .map(|piece| piece.iter().collect())
        .collect()
}

/// Streams the pieces of a finished answer in order.
pub fn chunk_stream(text: String, size: usize) -> impl Stream<Item = String> {
    stream::iter(chunks(&text, size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[test]
    fn splits_into_fixed_pieces() {
        assert_eq!(chunks("abcdefg", 3), vec!["abc", "def", "g"]);
        assert!(chunks("", 4).is_empty());
        assert_eq!(chunks("ab", 0), vec!["a", "b"]);
    }

    #[test]
    fn respects_multibyte_characters() {
        assert_eq!(chunks("héllo wörld", 4), vec!["héll", "o wö", "rld"]);
    }

    #[tokio::test]
    async fn stream_reassembles_original_text() {
        let text = "The mitochondria is the powerhouse of the cell.".to_string();
        let pieces: Vec<String> = chunk_stream(text.clone(), 5).collect().await;
        assert_eq!(pieces.concat(), text);
        assert!(pieces.iter().all(|p| p.chars().count() <= 5));
    }
}
