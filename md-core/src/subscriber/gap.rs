//! UDP sequence-gap detection for a single live link.
//!
//! Adapted from the bot's market-data gap detector, with the Huginn-epoch
//! restart handling dropped (this feed has no shared-memory epoch concept)
//! and `u64` wraparound arithmetic kept, since a long-running link can
//! still see `seqNo` wrap.

#[derive(Debug, Clone, Default)]
pub struct GapDetector {
    last_seq_no: u64,
    ready: bool,
}

/// A detected gap: the sequence immediately after `last_seq_no` through
/// `current_seq_no - 1` were never observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gap {
    pub from_seq_no: u64,
    pub count: u64,
}

impl GapDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `current_seq_no`, returning `Some(gap)` if one or more
    /// sequence numbers were skipped since the last call. A repeat of the
    /// last-seen sequence number is not a gap.
    pub fn check(&mut self, current_seq_no: u64) -> Option<Gap> {
        if !self.ready {
            self.last_seq_no = current_seq_no;
            self.ready = true;
            return None;
        }
        if current_seq_no == self.last_seq_no {
            return None;
        }

        let missing = current_seq_no.wrapping_sub(self.last_seq_no).wrapping_sub(1);
        self.last_seq_no = current_seq_no;

        if missing == 0 {
            None
        } else {
            Some(Gap {
                from_seq_no: self.last_seq_no.wrapping_sub(missing),
                count: missing,
            })
        }
    }

    pub fn last_seq_no(&self) -> u64 {
        self.last_seq_no
    }

    /// Forcibly re-bases the detector after a resend has filled a gap, or
    /// after a reconnect restarts the sequence.
    pub fn reset(&mut self, seq_no: u64) {
        self.last_seq_no = seq_no;
        self.ready = true;
    }
}
