//! Sequence-numbered record emission. Every state-changing library call
//! ends by handing its outcome to a [`Broadcaster`], which assigns the
//! next sequence number, tags the originating shard, and encodes the wire
//! frame.
//!
//! The sequence counter is a single atomic shared across every shard
//! thread: incrementing it needs no lock, and receivers rely on strict
//! per-channel monotonicity (§8 invariant) regardless of which shard
//! produced a given record.

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use zerocopy::{Immutable, IntoBytes};

use crate::wire::{self, RecordType};

/// A broadcast record ready to hand to a transport: the frame bytes plus
/// the shard that produced it, so a receiver can dispatch a reply (a
/// resend, say) back to the right place without re-indexing.
#[derive(Debug, Clone)]
pub struct BroadcastRecord {
    pub seq_no: u64,
    pub shard_id: usize,
    pub record_type: RecordType,
    pub frame: Bytes,
}

pub struct Broadcaster {
    seq_no: AtomicU64,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self {
            seq_no: AtomicU64::new(1),
        }
    }

    /// Encodes `body` under the next sequence number and tags it with
    /// `shard_id`. `nsec` is the low 32 bits of the event's
    /// nanoseconds-since-epoch timestamp.
    pub fn emit<B: IntoBytes + Immutable>(
        &self,
        shard_id: usize,
        nsec: u32,
        record_type: RecordType,
        body: &B,
    ) -> BroadcastRecord {
        let seq_no = self.seq_no.fetch_add(1, Ordering::SeqCst);
        let frame = wire::encode(seq_no, nsec, record_type, body);
        BroadcastRecord {
            seq_no,
            shard_id,
            record_type,
            frame,
        }
    }

    pub fn current_seq_no(&self) -> u64 {
        self.seq_no.load(Ordering::SeqCst)
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}
