//! Wire format: frame header, per-type POD bodies, and the encode/decode
//! codec used by both the broadcast emitter and the subscriber transport.

pub mod codec;
pub mod header;
pub mod records;

pub use codec::{decode, encode, hex_dump, Frame};
pub use header::{Hdr, HDR_LEN};
pub use records::*;
