//! Typed value encoding for the scalar facade.

use crate::error::{Error, Result};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

/// Turns typed values into stored bytes and back.
///
/// One instance is configured per [`Database`](crate::Database) and shared by
/// the scalar facade of every table created from it.
pub trait Codec: Send + Sync + fmt::Debug + 'static {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Bytes>;

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T>;
}

/// JSON via `serde_json`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<Bytes> {
        serde_json::to_vec(value)
            .map(Bytes::from)
            .map_err(|e| Error::Codec(Box::new(e)))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(|e| Error::Codec(Box::new(e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Session {
        user: String,
        hits: u32,
    }

    #[test]
    fn test_json_codec() {
        let codec = JsonCodec;
        let bytes = codec
            .encode(&Session {
                user: "ariz".into(),
                hits: 3,
            })
            .unwrap();
        assert_eq!(&bytes[..], br#"{"user":"ariz","hits":3}"#);

        let back: Session = codec.decode(&bytes).unwrap();
        assert_eq!(back.hits, 3);
    }

    #[test]
    fn test_decode_failure_is_codec_error() {
        let result: Result<Session> = JsonCodec.decode(b"v1");
        assert!(matches!(result, Err(Error::Codec(_))));
    }
}
