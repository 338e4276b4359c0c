//! Incremental text decoding for streamed replies.
//!
//! The backend streams plain UTF-8 with no framing, and chunk boundaries can
//! fall anywhere, including inside a multi-byte character.  [`Utf8Decoder`]
//! carries incomplete sequences from one chunk to the next so characters are
//! never split or corrupted.

use std::char::REPLACEMENT_CHARACTER;
use std::pin::Pin;

use futures::stream::{self, Stream, StreamExt};

use crate::backend::ByteStream;
use crate::error::Result;

/// Decoded reply text, one item per received chunk that completed any characters.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Stateful UTF-8 decoder.
///
/// Invalid bytes decode to U+FFFD instead of failing the stream.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Create a decoder with nothing buffered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode as much of `bytes` (after anything buffered) as forms complete characters.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::with_capacity(self.pending.len());
        let mut input: &[u8] = &self.pending;
        loop {
            match std::str::from_utf8(input) {
                Ok(valid) => {
                    out.push_str(valid);
                    input = &[];
                    break;
                }
                Err(err) => {
                    let (valid, rest) = input.split_at(err.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        Some(len) => {
                            out.push(REPLACEMENT_CHARACTER);
                            input = &rest[len..];
                        }
                        None => {
                            // incomplete sequence at the end; wait for more bytes
                            input = rest;
                            break;
                        }
                    }
                }
            }
        }
        let consumed = self.pending.len() - input.len();
        self.pending.drain(..consumed);
        out
    }

    /// Flush the decoder at end of input.
    ///
    /// A truncated trailing sequence becomes a single U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            String::new()
        } else {
            self.pending.clear();
            REPLACEMENT_CHARACTER.to_string()
        }
    }

    /// Number of bytes held back waiting for the rest of a character.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Turn a byte stream into a stream of decoded text chunks.
///
/// Chunks that complete no characters produce no item.  The stream ends after
/// the first error.
pub fn decode_text(byte_stream: ByteStream) -> TextStream {
    let state = (byte_stream, Utf8Decoder::new(), false);
    Box::pin(stream::unfold(
        state,
        |(mut stream, mut decoder, finished)| async move {
            if finished {
                return None;
            }
            loop {
                match stream.next().await {
                    Some(Ok(bytes)) => {
                        let text = decoder.decode(&bytes);
                        if text.is_empty() {
                            continue;
                        }
                        return Some((Ok(text), (stream, decoder, false)));
                    }
                    Some(Err(e)) => {
                        return Some((Err(e), (stream, decoder, true)));
                    }
                    None => {
                        let tail = decoder.finish();
                        if tail.is_empty() {
                            return None;
                        }
                        return Some((Ok(tail), (stream, decoder, true)));
                    }
                }
            }
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use bytes::Bytes;

    fn byte_stream(chunks: Vec<Result<Bytes>>) -> ByteStream {
        Box::pin(stream::iter(chunks))
    }

    #[test]
    fn split_multibyte_character_is_reassembled() {
        let bytes = "olá, 世界".as_bytes();
        // split inside 'á' and inside '世'
        let mut decoder = Utf8Decoder::new();
        let mut out = String::new();
        out.push_str(&decoder.decode(&bytes[..3]));
        assert_eq!(decoder.pending_len(), 1);
        out.push_str(&decoder.decode(&bytes[3..8]));
        out.push_str(&decoder.decode(&bytes[8..]));
        out.push_str(&decoder.finish());
        assert_eq!(out, "olá, 世界");
    }

    #[test]
    fn invalid_bytes_become_replacement_characters() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b"a\xffb"), "a\u{FFFD}b");
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn truncated_tail_flushes_one_replacement() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(&[b'x', 0xe4, 0xb8]), "x");
        assert_eq!(decoder.finish(), "\u{FFFD}");
        assert_eq!(decoder.finish(), "");
    }

    #[tokio::test]
    async fn decode_text_yields_only_completed_text() {
        let euro = "€".as_bytes();
        let chunks = vec![
            Ok(Bytes::from_static(b"price: ")),
            Ok(Bytes::copy_from_slice(&euro[..1])),
            Ok(Bytes::copy_from_slice(&euro[1..])),
            Ok(Bytes::from_static(b"5")),
        ];
        let items: Vec<String> = decode_text(byte_stream(chunks))
            .map(|item| item.unwrap())
            .collect()
            .await;
        assert_eq!(items, vec!["price: ", "€", "5"]);
    }

    #[test]
    fn decode_text_stops_after_error() {
        let chunks = vec![
            Ok(Bytes::from_static(b"partial")),
            Err(Error::streaming("connection reset", None)),
            Ok(Bytes::from_static(b"never seen")),
        ];
        let items: Vec<Result<String>> =
            tokio_test::block_on(decode_text(byte_stream(chunks)).collect());
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_deref().unwrap(), "partial");
        assert!(items[1].as_ref().is_err_and(Error::is_streaming));
    }
}
