//! Thread-per-shard runtime: each shard owns a disjoint partition of
//! instruments and order books and mutates them only from its own OS
//! thread, so no book-level locking is needed.

use std::collections::HashMap;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{bounded, unbounded, Sender};

use crate::book::OrderBook;
use crate::core::InstrumentKey;
use crate::instrument::Instrument;

/// The state a shard thread exclusively owns. Only code running inside a
/// job closure (via [`Shard::invoke`]/[`Shard::run`]) ever sees a
/// `&mut ShardState`.
pub struct ShardState {
    pub instruments: HashMap<String, Instrument>,
    pub order_books: HashMap<InstrumentKey, OrderBook>,
}

impl ShardState {
    fn new() -> Self {
        Self {
            instruments: HashMap::new(),
            order_books: HashMap::new(),
        }
    }
}

type Job = Box<dyn FnOnce(&mut ShardState) + Send>;

/// A single shard: one worker thread plus the channel used to submit work
/// to it. Dropping a `Shard` closes the channel and joins the thread.
pub struct Shard {
    pub id: usize,
    sender: Sender<Job>,
    handle: Option<JoinHandle<()>>,
}

impl Shard {
    /// Spawns the shard's worker thread, optionally pinned to `core`.
    pub fn spawn(id: usize, core: Option<usize>) -> Self {
        let (tx, rx) = unbounded::<Job>();
        let handle = thread::Builder::new()
            .name(format!("md-shard-{id}"))
            .spawn(move || {
                if let Some(core) = core {
                    if let Err(e) = crate::perf::cpu::pin_to_core(core) {
                        tracing::warn!(shard = id, core, error = %e, "failed to pin shard thread to core");
                    }
                }
                let mut state = ShardState::new();
                for job in rx.iter() {
                    job(&mut state);
                }
                tracing::debug!(shard = id, "shard thread exiting");
            })
            .expect("failed to spawn shard thread");
        Self {
            id,
            sender: tx,
            handle: Some(handle),
        }
    }

    /// Enqueues `f` on this shard's thread and blocks until it has run,
    /// returning its result. Panics if the shard thread has already exited.
    pub fn invoke<T: Send + 'static>(&self, f: impl FnOnce(&mut ShardState) -> T + Send + 'static) -> T {
        let (result_tx, result_rx) = bounded(1);
        let job: Job = Box::new(move |state| {
            let _ = result_tx.send(f(state));
        });
        self.sender.send(job).expect("shard thread gone");
        result_rx.recv().expect("shard thread dropped result channel")
    }

    /// Enqueues `f` without waiting for it to run.
    pub fn run(&self, f: impl FnOnce(&mut ShardState) + Send + 'static) {
        let job: Job = Box::new(f);
        let _ = self.sender.send(job);
    }
}

impl Drop for Shard {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
