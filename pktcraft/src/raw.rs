//! Opaque payload bytes.

use crate::pdu::{ParentLayer, Pdu, PduType};

/// A PDU holding bytes the crate does not interpret: application data,
/// fragments and payloads of unregistered protocols.
#[derive(Debug, Clone, Default)]
pub struct RawPdu {
    payload: Vec<u8>,
    inner: Option<Box<dyn Pdu>>,
}

impl RawPdu {
    /// Wrap a copy of `payload`.
    pub fn new<T: Into<Vec<u8>>>(payload: T) -> Self {
        Self {
            payload: payload.into(),
            inner: None,
        }
    }

    /// The payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Mutable access to the payload bytes.
    #[inline]
    pub fn payload_mut(&mut self) -> &mut Vec<u8> {
        &mut self.payload
    }

    /// The number of payload bytes.
    #[inline]
    pub fn payload_size(&self) -> usize {
        self.payload.len()
    }

    /// Take the payload out.
    pub fn into_payload(self) -> Vec<u8> {
        self.payload
    }
}

impl Pdu for RawPdu {
    pdu_common!();

    fn pdu_type(&self) -> PduType {
        PduType::RAW
    }

    fn header_size(&self) -> usize {
        self.payload.len()
    }

    fn write_serialization(&mut self, buf: &mut [u8], _parent: Option<&ParentLayer>) {
        buf[..self.payload.len()].copy_from_slice(&self.payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_payload() {
        let mut raw = RawPdu::new(b"abc".to_vec());
        assert_eq!(raw.size(), 3);
        assert_eq!(raw.serialize(), b"abc");

        raw.payload_mut().push(b'd');
        assert_eq!(raw.payload_size(), 4);
        assert_eq!(raw.into_payload(), b"abcd");
    }

    #[test]
    fn empty_payload() {
        let mut raw = RawPdu::default();
        assert_eq!(raw.size(), 0);
        assert!(raw.serialize().is_empty());
    }
}
