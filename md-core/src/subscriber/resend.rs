//! Synchronous gap-fill protocol. A detected UDP gap produces a
//! [`PendingResend`]; the link sends a `ResendReq` to the channel's UDP
//! resend endpoint and narrows the pending range as records arrive on the
//! resend stream, re-sending the request every `reReqInterval` until the
//! gap closes.

use std::time::{Duration, Instant};

use bytes::Bytes;
use zerocopy::byteorder::little_endian::{U32, U64};

use crate::wire::{self, RecordType, ResendReqBody};

use super::gap::Gap;

#[derive(Debug, Clone)]
pub struct PendingResend {
    pub from_seq_no: u64,
    pub count: u64,
    requested_at: Instant,
}

impl PendingResend {
    pub fn new(gap: Gap, now: Instant) -> Self {
        Self {
            from_seq_no: gap.from_seq_no,
            count: gap.count,
            requested_at: now,
        }
    }

    /// True once `re_req_interval` has elapsed since the last request was
    /// sent, meaning it should be re-sent.
    pub fn should_retry(&self, re_req_interval: Duration, now: Instant) -> bool {
        now.duration_since(self.requested_at) >= re_req_interval
    }

    pub fn mark_sent(&mut self, now: Instant) {
        self.requested_at = now;
    }

    /// Narrows the pending range as a resend record with `seq_no` arrives.
    /// Returns `true` once the whole gap is filled.
    pub fn advance(&mut self, seq_no: u64) -> bool {
        if self.count == 0 {
            return true;
        }
        if seq_no < self.from_seq_no {
            return false;
        }
        let consumed = (seq_no - self.from_seq_no + 1).min(self.count);
        self.from_seq_no = seq_no + 1;
        self.count -= consumed;
        self.count == 0
    }

    fn body(&self) -> ResendReqBody {
        ResendReqBody {
            seq_no: U64::new(self.from_seq_no),
            count: U32::new(self.count.min(u32::MAX as u64) as u32),
        }
    }

    /// Encodes this request's wire frame. `request_seq_no` is the *control*
    /// channel's own sequence number, unrelated to the gap being requested.
    pub fn encode(&self, request_seq_no: u64, nsec: u32) -> Bytes {
        wire::encode(request_seq_no, nsec, RecordType::ResendReq, &self.body())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gap() -> Gap {
        Gap { from_seq_no: 10, count: 3 }
    }

    #[test]
    fn advance_fills_gap_incrementally() {
        let mut pending = PendingResend::new(gap(), Instant::now());
        assert!(!pending.advance(10));
        assert!(!pending.advance(11));
        assert!(pending.advance(12));
    }

    #[test]
    fn advance_ignores_records_before_the_gap() {
        let mut pending = PendingResend::new(gap(), Instant::now());
        assert!(!pending.advance(5));
        assert_eq!(pending.from_seq_no, 10);
        assert_eq!(pending.count, 3);
    }

    #[test]
    fn should_retry_respects_interval() {
        let now = Instant::now();
        let pending = PendingResend::new(gap(), now);
        assert!(!pending.should_retry(Duration::from_secs(1), now));
        assert!(pending.should_retry(Duration::from_secs(1), now + Duration::from_secs(2)));
    }

    #[test]
    fn encode_produces_a_decodable_resend_req_frame() {
        let pending = PendingResend::new(gap(), Instant::now());
        let frame = pending.encode(1, 0);
        let decoded = wire::decode(&frame).unwrap();
        assert_eq!(decoded.record_type, RecordType::ResendReq);
    }
}
