//! Wire framing: length-delimited frames carrying one JSON document each.
//!
//! JSON keeps the encoding self-describing, so readers tolerate unknown or
//! extra fields, and proposal numbers ride as plain u64 integers.

use bytes::Bytes;
use tokio_util::codec::LengthDelimitedCodec;

use crate::error::Error;
use crate::message::Message;

/// Frames larger than this are rejected before JSON parsing.
const MAX_FRAME_LEN: usize = 64 * 1024;

/// Codec for the u32 big-endian length prefix.
#[must_use]
pub(crate) fn frame_codec() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .max_frame_length(MAX_FRAME_LEN)
        .new_codec()
}

/// Serialize a message into a frame payload.
pub(crate) fn encode(msg: &Message) -> Result<Bytes, Error> {
    Ok(Bytes::from(serde_json::to_vec(msg)?))
}

/// Deserialize a frame payload.
pub(crate) fn decode(payload: &[u8]) -> Result<Message, Error> {
    Ok(serde_json::from_slice(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemberId;
    use crate::message::MessageType;

    #[test]
    fn round_trip() {
        let msg = Message::promise(
            42,
            MemberId::new("M2").unwrap(),
            11,
            Some("M1".to_string()),
        );
        let bytes = encode(&msg).unwrap();
        let back = decode(&bytes).unwrap();
        assert_eq!(back.kind, MessageType::Promise);
        assert_eq!(back.proposal_number, 42);
        assert_eq!(back.accept_report(), Some((11, "M1")));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(decode(b"not json at all").is_err());
        assert!(decode(b"").is_err());
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let msg = Message::prepare(11, MemberId::new("M1").unwrap());
        let bytes = encode(&msg).unwrap();
        assert!(decode(&bytes[..bytes.len() / 2]).is_err());
    }
}
