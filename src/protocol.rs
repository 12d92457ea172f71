//! Wire format between the vision sender and the robot receiver.
//!
//! Each message is one UTF-8 JSON object followed by `\n`. There is no length
//! prefix, so the decoder has to cope with a message split across reads and
//! with several messages arriving in one read.

use bytes::{Buf, BufMut, BytesMut};
use log::warn;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

pub const DELIMITER: u8 = b'\n';

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to serialize message: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("unterminated message exceeds {limit} bytes")]
    MessageTooLong { limit: usize },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Newline-delimited JSON codec.
///
/// Decoding yields `serde_json::Value` so callers can read the fields they
/// know about and treat anything else as missing.
#[derive(Debug, Clone)]
pub struct JsonLinesCodec {
    max_length: usize,
}

impl JsonLinesCodec {
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }
}

impl Default for JsonLinesCodec {
    fn default() -> Self {
        Self::new(1024 * 1024)
    }
}

impl<T: Serialize> Encoder<&T> for JsonLinesCodec {
    type Error = CodecError;

    fn encode(&mut self, item: &T, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let data = serde_json::to_vec(item)?;
        dst.reserve(data.len() + 1);
        dst.put_slice(&data);
        dst.put_u8(DELIMITER);
        Ok(())
    }
}

impl Decoder for JsonLinesCodec {
    type Item = Value;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let (next, consumed) = {
                let mut stream = serde_json::Deserializer::from_slice(&src[..]).into_iter::<Value>();
                let next = stream.next();
                (next, stream.byte_offset())
            };

            match next {
                // nothing but whitespace buffered
                None => {
                    src.clear();
                    return Ok(None);
                }
                Some(Ok(value)) => {
                    src.advance(consumed);
                    return Ok(Some(value));
                }
                Some(Err(e)) if e.is_eof() => {
                    if src.len() > self.max_length {
                        return Err(CodecError::MessageTooLong {
                            limit: self.max_length,
                        });
                    }
                    return Ok(None);
                }
                // A syntax error can't be fixed by more bytes; drop through
                // the end of the offending line once it has arrived.
                Some(Err(e)) => match src.iter().position(|b| *b == DELIMITER) {
                    Some(pos) => {
                        warn!("discarding malformed message ({} bytes): {}", pos + 1, e);
                        src.advance(pos + 1);
                    }
                    None => {
                        if src.len() > self.max_length {
                            return Err(CodecError::MessageTooLong {
                                limit: self.max_length,
                            });
                        }
                        return Ok(None);
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode_all(codec: &mut JsonLinesCodec, buf: &mut BytesMut) -> Vec<Value> {
        let mut out = Vec::new();
        while let Some(v) = codec.decode(buf).unwrap() {
            out.push(v);
        }
        out
    }

    #[test]
    fn test_encode_appends_single_newline() {
        let mut codec = JsonLinesCodec::default();
        let mut buf = BytesMut::new();
        codec.encode(&json!({"a": 1}), &mut buf).unwrap();
        assert_eq!(&buf[..], b"{\"a\":1}\n");
    }

    #[test]
    fn test_split_message_reassembles() {
        let mut codec = JsonLinesCodec::default();
        let mut buf = BytesMut::new();

        buf.extend_from_slice(b"{\"Angles\":");
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert_eq!(&buf[..], b"{\"Angles\":");

        buf.extend_from_slice(b"{}}\n");
        let split = decode_all(&mut codec, &mut buf);

        let mut whole = BytesMut::from(&b"{\"Angles\":{}}\n"[..]);
        let single = decode_all(&mut codec, &mut whole);

        assert_eq!(split.len(), 1);
        assert_eq!(split, single);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_coalesced_messages_decode_in_order() {
        let mut codec = JsonLinesCodec::default();
        let mut buf = BytesMut::from(&b"{\"a\":1}\n{\"a\":2}\n"[..]);
        let values = decode_all(&mut codec, &mut buf);
        assert_eq!(values, vec![json!({"a": 1}), json!({"a": 2})]);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_complete_then_partial() {
        let mut codec = JsonLinesCodec::default();
        let mut buf = BytesMut::from(&b"{\"a\":1}\n{\"a\":"[..]);
        assert_eq!(decode_all(&mut codec, &mut buf), vec![json!({"a": 1})]);
        buf.extend_from_slice(b"2}\n");
        assert_eq!(decode_all(&mut codec, &mut buf), vec![json!({"a": 2})]);
    }

    #[test]
    fn test_split_inside_multibyte_char() {
        let mut codec = JsonLinesCodec::default();
        let bytes = "{\"name\":\"ñ\"}\n".as_bytes();
        let cut = bytes.iter().position(|b| *b == 0xC3).unwrap() + 1;

        let mut buf = BytesMut::from(&bytes[..cut]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        buf.extend_from_slice(&bytes[cut..]);
        assert_eq!(decode_all(&mut codec, &mut buf), vec![json!({"name": "ñ"})]);
    }

    #[test]
    fn test_malformed_line_is_dropped() {
        let mut codec = JsonLinesCodec::default();
        let mut buf = BytesMut::from(&b"{\"a\":oops}\n{\"a\":3}\n"[..]);
        assert_eq!(decode_all(&mut codec, &mut buf), vec![json!({"a": 3})]);
    }

    #[test]
    fn test_malformed_without_newline_waits() {
        let mut codec = JsonLinesCodec::default();
        let mut buf = BytesMut::from(&b"{\"a\":oops"[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 9);
    }

    #[test]
    fn test_oversized_partial_is_an_error() {
        let mut codec = JsonLinesCodec::new(16);
        let mut buf = BytesMut::from(&b"{\"a\":\"0123456789abcdef"[..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(CodecError::MessageTooLong { limit: 16 })
        ));
    }

    #[test]
    fn test_blank_lines_are_ignored() {
        let mut codec = JsonLinesCodec::default();
        let mut buf = BytesMut::from(&b"\n\r\n  \n"[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert!(buf.is_empty());
    }
}
