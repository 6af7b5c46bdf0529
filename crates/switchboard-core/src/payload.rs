//! Relayed payloads.

use bytes::Bytes;

/// Frame type a payload arrived in. Relay writes it back out unchanged.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// UTF-8 text frame.
    Text,
    /// Binary frame.
    Binary,
}

/// Opaque bytes relayed between participants.
///
/// The registry never inspects the contents. A `Text` payload is only ever
/// built from a `str` or from bytes checked as UTF-8.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Payload {
    kind: FrameKind,
    data: Bytes,
}

impl Payload {
    /// Text payload.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: FrameKind::Text,
            data: Bytes::from(text.into()),
        }
    }

    /// Text payload over existing bytes. Checks UTF-8 without copying.
    pub fn text_bytes(data: Bytes) -> Result<Self, std::str::Utf8Error> {
        let _ = std::str::from_utf8(&data)?;
        Ok(Self {
            kind: FrameKind::Text,
            data,
        })
    }

    /// Binary payload.
    pub fn binary(data: impl Into<Bytes>) -> Self {
        Self {
            kind: FrameKind::Binary,
            data: data.into(),
        }
    }

    /// Frame kind.
    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Text view for `Text` payloads.
    pub fn as_text(&self) -> Option<&str> {
        match self.kind {
            FrameKind::Text => std::str::from_utf8(&self.data).ok(),
            FrameKind::Binary => None,
        }
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload carries no bytes.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Split into kind and bytes.
    pub fn into_parts(self) -> (FrameKind, Bytes) {
        (self.kind, self.data)
    }
}

impl From<Bytes> for Payload {
    fn from(data: Bytes) -> Self {
        Self::binary(data)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(data: Vec<u8>) -> Self {
        Self::binary(data)
    }
}

impl From<&[u8]> for Payload {
    fn from(data: &[u8]) -> Self {
        Self::binary(Bytes::copy_from_slice(data))
    }
}

impl<const N: usize> From<&[u8; N]> for Payload {
    fn from(data: &[u8; N]) -> Self {
        Self::binary(Bytes::copy_from_slice(data))
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::text(text)
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::text(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_payload_keeps_kind_and_bytes() {
        let p = Payload::text(r#"{"type":"offer"}"#);
        assert_eq!(p.kind(), FrameKind::Text);
        assert_eq!(p.as_bytes(), br#"{"type":"offer"}"#);
        assert_eq!(p.as_text(), Some(r#"{"type":"offer"}"#));
    }

    #[test]
    fn binary_payload_has_no_text_view() {
        let p = Payload::binary(vec![0xff, 0x00, 0x7f]);
        assert_eq!(p.kind(), FrameKind::Binary);
        assert!(p.as_text().is_none());
        assert_eq!(p.len(), 3);
    }

    #[test]
    fn byte_conversions_are_binary() {
        assert_eq!(Payload::from(b"hello").kind(), FrameKind::Binary);
        assert_eq!(Payload::from(&b"hello"[..]).kind(), FrameKind::Binary);
        assert_eq!(Payload::from(vec![1u8]).kind(), FrameKind::Binary);
        assert_eq!(Payload::from(Bytes::from_static(b"x")).kind(), FrameKind::Binary);
    }

    #[test]
    fn string_conversions_are_text() {
        assert_eq!(Payload::from("hi").kind(), FrameKind::Text);
        assert_eq!(Payload::from(String::from("hi")).kind(), FrameKind::Text);
    }

    #[test]
    fn text_bytes_shares_the_buffer() {
        let data = Bytes::from(String::from("candidate:1 1 udp"));
        let ptr = data.as_ptr();
        let p = Payload::text_bytes(data).unwrap();
        assert_eq!(p.kind(), FrameKind::Text);
        assert_eq!(p.as_text(), Some("candidate:1 1 udp"));
        assert_eq!(p.as_bytes().as_ptr(), ptr);
    }

    #[test]
    fn text_bytes_rejects_invalid_utf8() {
        assert!(Payload::text_bytes(Bytes::from_static(&[0xff, 0xfe])).is_err());
    }

    #[test]
    fn empty_payload() {
        let p = Payload::text("");
        assert!(p.is_empty());
        let (kind, data) = p.into_parts();
        assert_eq!(kind, FrameKind::Text);
        assert!(data.is_empty());
    }
}
