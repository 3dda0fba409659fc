//! Frame encode/decode: splits a `Hdr` off the front of a buffer, validates
//! `bodyLen` against the record type's expected length, and hands back the
//! body as a zero-copy `Bytes` slice.
//!
//! Grounded on `MxMDSubLink::UDP::process`'s `hdr.scan(msg->length)` check
//! and its hex-dump-on-truncation branch (`original_source/mxmd/src/MxMDSubscriber.cc`).

use bytes::{Bytes, BytesMut};
use zerocopy::{FromBytes, IntoBytes};

use crate::core::MdError;
use crate::wire::header::{Hdr, HDR_LEN};
use crate::wire::records::RecordType;

/// A decoded frame: header plus the raw body bytes, not yet cast to a
/// concrete body struct (the caller knows which one from `record_type`).
#[derive(Debug, Clone)]
pub struct Frame {
    pub hdr: Hdr,
    pub record_type: RecordType,
    pub body: Bytes,
}

/// Encode a header + POD body into a single contiguous buffer.
pub fn encode<B: IntoBytes + zerocopy::Immutable>(
    seq_no: u64,
    nsec: u32,
    record_type: RecordType,
    body: &B,
) -> Bytes {
    let body_bytes = body.as_bytes();
    let hdr = Hdr::new(seq_no, nsec, body_bytes.len() as u16, record_type.code());
    let mut buf = BytesMut::with_capacity(HDR_LEN + body_bytes.len());
    buf.extend_from_slice(hdr.as_bytes());
    buf.extend_from_slice(body_bytes);
    buf.freeze()
}

/// Decode one frame from the front of `buf`.
///
/// Validates that the header fits, that `type` is a known record type, and
/// that `bodyLen` both matches the type's expected length and does not run
/// past the end of `buf`. Any violation hex-dumps the offending bytes into
/// the returned error's message, per the wire format's "malformed frames
/// disconnect the link with a logged warning" rule.
pub fn decode(buf: &Bytes) -> Result<Frame, MdError> {
    if buf.len() < HDR_LEN {
        return Err(malformed("frame shorter than header", buf));
    }
    let hdr = Hdr::read_from_bytes(&buf[..HDR_LEN]).map_err(|_| malformed("unaligned header", buf))?;
    let record_type = RecordType::from_code(hdr.r#type)
        .ok_or_else(|| malformed(&format!("unknown record type {}", hdr.r#type), buf))?;

    let body_len = hdr.body_len() as usize;
    let expected = record_type.expected_len();
    if body_len != expected {
        return Err(malformed(
            &format!(
                "bodyLen {} does not match expected {} for type {}",
                body_len,
                expected,
                hdr.r#type
            ),
            buf,
        ));
    }
    if buf.len() < HDR_LEN + body_len {
        return Err(malformed("frame truncated before end of body", buf));
    }

    let body = buf.slice(HDR_LEN..HDR_LEN + body_len);
    Ok(Frame {
        hdr,
        record_type,
        body,
    })
}

fn malformed(reason: &str, buf: &Bytes) -> MdError {
    MdError::Malformed {
        reason: format!("{}\n{}", reason, hex_dump(buf)),
    }
}

/// Render `buf` as a 16-bytes-per-line hex dump with an ASCII gutter, in
/// the style of `ZtHexDump` — used only on the error path so it never
/// touches the hot path.
pub fn hex_dump(buf: &[u8]) -> String {
    let mut out = String::with_capacity(buf.len() * 4);
    for (i, chunk) in buf.chunks(16).enumerate() {
        out.push_str(&format!("{:08x}  ", i * 16));
        for byte in chunk {
            out.push_str(&format!("{:02x} ", byte));
        }
        for _ in chunk.len()..16 {
            out.push_str("   ");
        }
        out.push_str(" |");
        for &byte in chunk {
            let c = byte as char;
            out.push(if c.is_ascii_graphic() || c == ' ' { c } else { '.' });
        }
        out.push_str("|\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::records::EndOfSnapshotBody;
    use zerocopy::byteorder::little_endian::U64;

    #[test]
    fn encode_decode_round_trip() {
        let body = EndOfSnapshotBody {
            seq_no: U64::new(99),
        };
        let buf = encode(5, 1000, RecordType::EndOfSnapshot, &body);
        let frame = decode(&buf).unwrap();
        assert_eq!(frame.hdr.seq_no(), 5);
        assert_eq!(frame.record_type, RecordType::EndOfSnapshot);
        let decoded = EndOfSnapshotBody::read_from_bytes(&frame.body[..]).unwrap();
        assert_eq!(decoded.seq_no.get(), 99);
    }

    #[test]
    fn truncated_frame_is_malformed() {
        let short = Bytes::from_static(&[0u8; 4]);
        assert!(decode(&short).is_err());
    }

    #[test]
    fn bad_body_len_is_malformed() {
        let body = EndOfSnapshotBody {
            seq_no: U64::new(1),
        };
        let mut buf = encode(1, 0, RecordType::EndOfSnapshot, &body).to_vec();
        // Corrupt bodyLen field (bytes 12..14) to claim a larger body.
        buf[12] = 0xff;
        let corrupted = Bytes::from(buf);
        let err = decode(&corrupted).unwrap_err();
        match err {
            MdError::Malformed { reason } => assert!(reason.contains("bodyLen")),
            _ => panic!("expected Malformed"),
        }
    }

    #[test]
    fn unknown_type_is_malformed() {
        let body = EndOfSnapshotBody {
            seq_no: U64::new(1),
        };
        let mut buf = encode(1, 0, RecordType::EndOfSnapshot, &body).to_vec();
        buf[14] = 250; // type byte
        let corrupted = Bytes::from(buf);
        assert!(decode(&corrupted).is_err());
    }
}
