//! Fixed frame header shared by every wire record.
//!
//! Mirrors the subscriber's native `Hdr{seqNo,nsec,bodyLen,type,_pad}` layout
//! byte-for-byte: little-endian, unaligned, no host-dependent padding.

use zerocopy::byteorder::little_endian::{U16, U32, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

pub const HDR_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct Hdr {
    /// Per-channel monotonic sequence number.
    pub seq_no: U64,
    /// Nanoseconds-since-epoch, low 32 bits.
    pub nsec: U32,
    /// Bytes following this header.
    pub body_len: U16,
    /// Record type code, see [`super::records::RecordType`].
    pub r#type: u8,
    pub _pad: u8,
}

const _: () = assert!(std::mem::size_of::<Hdr>() == HDR_LEN);

impl Hdr {
    pub fn new(seq_no: u64, nsec: u32, body_len: u16, type_code: u8) -> Self {
        Self {
            seq_no: U64::new(seq_no),
            nsec: U32::new(nsec),
            body_len: U16::new(body_len),
            r#type: type_code,
            _pad: 0,
        }
    }

    pub fn seq_no(&self) -> u64 {
        self.seq_no.get()
    }

    pub fn nsec(&self) -> u32 {
        self.nsec.get()
    }

    pub fn body_len(&self) -> u16 {
        self.body_len.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_16_bytes() {
        assert_eq!(std::mem::size_of::<Hdr>(), HDR_LEN);
    }

    #[test]
    fn round_trips_through_bytes() {
        let hdr = Hdr::new(42, 123_456, 20, 12);
        let bytes = hdr.as_bytes();
        let back = Hdr::read_from_bytes(bytes).unwrap();
        assert_eq!(back.seq_no(), 42);
        assert_eq!(back.nsec(), 123_456);
        assert_eq!(back.body_len(), 20);
        assert_eq!(back.r#type, 12);
    }
}
