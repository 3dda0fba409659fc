//! Record type codes and fixed-layout POD bodies broadcast by the library
//! and exchanged by the subscriber's control channel.
//!
//! Every mutating library call emits exactly one of the "event" bodies
//! below; `Login`/`ResendReq`/`EndOfSnapshot`/`HeartBeat` are subscriber
//! control records, never library events.

use zerocopy::byteorder::little_endian::{I32, I64, U16, U32, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::book::TickDir;
use crate::core::{FixedId, InstrumentKey, InstrumentId, SegmentId, Side, VenueId};

/// Record type code carried in [`super::header::Hdr::type`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum RecordType {
    Login = 1,
    ResendReq = 2,
    EndOfSnapshot = 3,
    HeartBeat = 4,

    AddInstrument = 10,
    AddOrderBook = 11,
    L1 = 12,
    PxLevel = 13,
    L2 = 14,
    AddOrder = 15,
    ModifyOrder = 16,
    CancelOrder = 17,
    AddTrade = 18,
    CorrectTrade = 19,
    CancelTrade = 20,
    ResetOb = 21,
    TradingSession = 22,
    AddVenue = 23,
    RefDataLoaded = 24,
    AddTickSizeTbl = 25,
    AddTickSize = 26,
    ResetTickSizeTbl = 27,
    UpdateInstrument = 28,
    UpdateOrderBook = 29,
    DelOrderBook = 30,
    AddCombination = 31,
    DelCombination = 32,
}

impl RecordType {
    pub fn from_code(code: u8) -> Option<RecordType> {
        use RecordType::*;
        Some(match code {
            1 => Login,
            2 => ResendReq,
            3 => EndOfSnapshot,
            4 => HeartBeat,
            10 => AddInstrument,
            11 => AddOrderBook,
            12 => L1,
            13 => PxLevel,
            14 => L2,
            15 => AddOrder,
            16 => ModifyOrder,
            17 => CancelOrder,
            18 => AddTrade,
            19 => CorrectTrade,
            20 => CancelTrade,
            21 => ResetOb,
            22 => TradingSession,
            23 => AddVenue,
            24 => RefDataLoaded,
            25 => AddTickSizeTbl,
            26 => AddTickSize,
            27 => ResetTickSizeTbl,
            28 => UpdateInstrument,
            29 => UpdateOrderBook,
            30 => DelOrderBook,
            31 => AddCombination,
            32 => DelCombination,
            _ => return None,
        })
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Expected body length in bytes, used to validate `Hdr::body_len`
    /// before dispatch.
    pub fn expected_len(self) -> usize {
        use std::mem::size_of;
        use RecordType::*;
        match self {
            Login => size_of::<LoginBody>(),
            ResendReq => size_of::<ResendReqBody>(),
            EndOfSnapshot => size_of::<EndOfSnapshotBody>(),
            HeartBeat => size_of::<HeartBeatBody>(),
            AddInstrument | ResetOb | UpdateInstrument | UpdateOrderBook | DelOrderBook
            | DelCombination => size_of::<InstrumentKeyBody>(),
            AddOrderBook => size_of::<AddOrderBookBody>(),
            L1 => size_of::<L1Body>(),
            PxLevel | L2 => size_of::<PxLevelBody>(),
            AddOrder | ModifyOrder => size_of::<OrderBody>(),
            CancelOrder => size_of::<CancelOrderBody>(),
            AddTrade | CorrectTrade => size_of::<TradeBody>(),
            CancelTrade => size_of::<CancelTradeBody>(),
            TradingSession => size_of::<TradingSessionBody>(),
            AddVenue | RefDataLoaded => size_of::<VenueKeyBody>(),
            AddTickSizeTbl | ResetTickSizeTbl => size_of::<TickSizeTblBody>(),
            AddTickSize => size_of::<AddTickSizeBody>(),
            AddCombination => size_of::<AddCombinationBody>(),
        }
    }
}

macro_rules! pod_body {
    ($name:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
        #[repr(C)]
        pub struct $name {
            $(pub $field: $ty),*
        }
    };
}

pod_body!(LoginBody {
    user: [u8; 16],
    password: [u8; 16],
});

pod_body!(ResendReqBody {
    seq_no: U64,
    count: U32,
});

pod_body!(EndOfSnapshotBody { seq_no: U64 });

pod_body!(HeartBeatBody { stamp: I64 });

/// Shared `(venue, segment, instrument)` key carried by events that only
/// need to identify an instrument: `addInstrument`, `resetOB`,
/// `updateInstrument`, `updateOrderBook`, `delOrderBook`, `delCombination`.
pod_body!(InstrumentKeyBody {
    venue: [u8; 8],
    segment: [u8; 8],
    id: [u8; 8],
});

pod_body!(VenueKeyBody { venue: [u8; 8] });

pod_body!(AddOrderBookBody {
    venue: [u8; 8],
    segment: [u8; 8],
    id: [u8; 8],
    price_ndp: u8,
    qty_ndp: u8,
    _pad: [u8; 6],
});

pod_body!(L1Body {
    venue: [u8; 8],
    segment: [u8; 8],
    id: [u8; 8],
    bid_price: I64,
    bid_qty: I64,
    ask_price: I64,
    ask_qty: I64,
    tick_dir: u8,
    _pad: [u8; 7],
});

/// Shared by `pxLevel` (per-update delta) and `l2` (rank-indexed snapshot
/// row) — `l2` always carries a valid `rank`, `pxLevel` leaves it zero.
pod_body!(PxLevelBody {
    venue: [u8; 8],
    segment: [u8; 8],
    id: [u8; 8],
    side: u8,
    _pad: [u8; 1],
    rank: U16,
    price: I64,
    qty: I64,
    n_orders: U32,
    flags: u8,
    _pad2: [u8; 3],
});

pod_body!(OrderBody {
    venue: [u8; 8],
    segment: [u8; 8],
    id: [u8; 8],
    order_id: [u8; 16],
    side: u8,
    _pad: [u8; 7],
    price: I64,
    qty: I64,
    flags: u8,
    _pad2: [u8; 7],
});

pod_body!(CancelOrderBody {
    venue: [u8; 8],
    segment: [u8; 8],
    id: [u8; 8],
    order_id: [u8; 16],
    side: u8,
    _pad: [u8; 7],
});

pod_body!(TradeBody {
    venue: [u8; 8],
    segment: [u8; 8],
    id: [u8; 8],
    trade_id: [u8; 16],
    price: I64,
    qty: I64,
});

pod_body!(CancelTradeBody {
    venue: [u8; 8],
    segment: [u8; 8],
    id: [u8; 8],
    trade_id: [u8; 16],
});

pod_body!(TradingSessionBody {
    venue: [u8; 8],
    segment: [u8; 8],
    id: [u8; 8],
    session: u8,
    _pad: [u8; 7],
});

pod_body!(TickSizeTblBody {
    venue: [u8; 8],
    tbl_id: [u8; 8],
});

pod_body!(AddTickSizeBody {
    venue: [u8; 8],
    tbl_id: [u8; 8],
    from_price: I64,
    tick_size: I64,
});

/// One leg of a combination: which instrument, on which side, at what
/// ratio. `ratio` is signed so a leg can be expressed against either side
/// of the combination without a separate sign field.
pod_body!(CombinationLegBody {
    venue: [u8; 8],
    segment: [u8; 8],
    id: [u8; 8],
    side: u8,
    _pad: [u8; 3],
    ratio: I32,
});

/// Combinations carry a fixed-size leg array rather than a variable-length
/// tail — the codec's `bodyLen == expectedLen` check has no notion of a
/// variable-length record, so `leg_count` (<= `MAX_COMBINATION_LEGS`)
/// indicates how many of `legs` are populated; the rest are zeroed.
pub const MAX_COMBINATION_LEGS: usize = 4;

pod_body!(AddCombinationBody {
    venue: [u8; 8],
    segment: [u8; 8],
    id: [u8; 8],
    price_ndp: u8,
    qty_ndp: u8,
    leg_count: u8,
    _pad: [u8; 5],
    legs: [CombinationLegBody; MAX_COMBINATION_LEGS],
});

/// Encodes an [`InstrumentKey`] into the `(venue, segment, id)` triple
/// carried by most record bodies.
pub fn key_to_bytes(key: InstrumentKey) -> ([u8; 8], [u8; 8], [u8; 8]) {
    (key.venue.0.as_bytes(), key.segment.0.as_bytes(), key.id.0.as_bytes())
}

/// Decodes the `(venue, segment, id)` triple back into an [`InstrumentKey`].
pub fn key_from_bytes(venue: [u8; 8], segment: [u8; 8], id: [u8; 8]) -> InstrumentKey {
    InstrumentKey::new(
        VenueId(FixedId::from_bytes(venue)),
        SegmentId(FixedId::from_bytes(segment)),
        InstrumentId(FixedId::from_bytes(id)),
    )
}

/// Order ids travel the wire as a 16-byte zero-padded ASCII field (like
/// [`FixedId`], but wider — order ids run longer than venue/segment/
/// instrument symbols).
pub fn order_id_to_bytes(id: &str) -> [u8; 16] {
    let mut buf = [0u8; 16];
    let src = id.as_bytes();
    let n = src.len().min(16);
    buf[..n].copy_from_slice(&src[..n]);
    buf
}

pub fn order_id_from_bytes(bytes: [u8; 16]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(16);
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

pub fn side_to_code(side: Side) -> u8 {
    side as u8
}

pub fn side_from_code(code: u8) -> Option<Side> {
    match code {
        0 => Some(Side::Buy),
        1 => Some(Side::Sell),
        _ => None,
    }
}

pub fn tick_dir_to_code(dir: TickDir) -> u8 {
    match dir {
        TickDir::Null => 0,
        TickDir::Up => 1,
        TickDir::Down => 2,
        TickDir::LevelUp => 3,
        TickDir::LevelDown => 4,
    }
}

pub fn tick_dir_from_code(code: u8) -> TickDir {
    match code {
        1 => TickDir::Up,
        2 => TickDir::Down,
        3 => TickDir::LevelUp,
        4 => TickDir::LevelDown,
        _ => TickDir::Null,
    }
}
