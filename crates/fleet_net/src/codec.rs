//! MessagePack codec helpers.
//!
//! Thin wrappers around `rmp-serde` for encoding and decoding envelopes.
//! Struct fields are written by name so the payload stays self-describing;
//! the envelope version is checked before the message is handed out.

use serde::Serialize;

use crate::error::NetError;
use crate::messages::{Envelope, Message, PROTOCOL_VERSION};

/// Borrowed form of [`Envelope`] for encoding. Field names must match.
#[derive(Serialize)]
struct EnvelopeRef<'a> {
    version: u16,
    message: &'a Message,
}

/// Encode a message, wrapped in a current-version envelope, to bytes.
///
/// # Errors
///
/// Returns [`NetError::Encode`] if serialisation fails.
pub fn encode(message: &Message) -> Result<Vec<u8>, NetError> {
    let envelope = EnvelopeRef {
        version: PROTOCOL_VERSION,
        message,
    };
    rmp_serde::to_vec_named(&envelope).map_err(NetError::Encode)
}

/// Decode an envelope from bytes and return its message.
///
/// # Errors
///
/// Returns [`NetError::Decode`] if the bytes are not a valid envelope, or
/// [`NetError::UnsupportedVersion`] if the envelope version differs from
/// [`PROTOCOL_VERSION`].
pub fn decode(bytes: &[u8]) -> Result<Message, NetError> {
    let envelope: Envelope = rmp_serde::from_slice(bytes).map_err(NetError::Decode)?;
    if envelope.version != PROTOCOL_VERSION {
        return Err(NetError::UnsupportedVersion {
            found: envelope.version,
            expected: PROTOCOL_VERSION,
        });
    }
    Ok(envelope.message)
}

#[cfg(test)]
mod tests {
    use fleet_model::{ClientId, Coordinate, RideRequest};

    use super::*;

    #[test]
    fn test_encode_decode_roundtrip() {
        let msg = Message::RideRequest(RideRequest {
            client_id: ClientId(3),
            origin: Coordinate::new(4, 4),
            destination: Coordinate::new(9, 1),
        });
        let bytes = encode(&msg).unwrap();
        assert_eq!(decode(&bytes).unwrap(), msg);
    }

    #[test]
    fn test_encode_matches_owned_envelope_bytes() {
        let msg = Message::Diagnostic("vehicle 3 lost".to_string());
        let borrowed = encode(&msg).unwrap();
        let owned = rmp_serde::to_vec_named(&Envelope::new(msg)).unwrap();
        assert_eq!(borrowed, owned);
    }

    #[test]
    fn test_decode_invalid_bytes() {
        let result = decode(&[0xFF, 0xFF]);
        assert!(matches!(result, Err(NetError::Decode(_))));
    }

    #[test]
    fn test_decode_plain_text_is_rejected() {
        let result = decode(b"HELLO:1");
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_rejects_other_version() {
        let envelope = Envelope {
            version: PROTOCOL_VERSION + 1,
            message: Message::Diagnostic("from the future".to_string()),
        };
        let bytes = rmp_serde::to_vec_named(&envelope).unwrap();
        let result = decode(&bytes);
        assert!(matches!(
            result,
            Err(NetError::UnsupportedVersion { found, .. }) if found == PROTOCOL_VERSION + 1
        ));
    }
}
