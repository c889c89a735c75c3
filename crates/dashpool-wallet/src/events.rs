//! Replay-from-start transaction event bus.
//!
//! Protocol responses can land before the code that waits for them starts
//! waiting. The bus therefore replays its full history to every new
//! subscriber before handing over the live feed, so a subscriber sees each
//! transaction exactly once, in publication order, regardless of when it
//! subscribed.

use dashpool_types::Transaction;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::mpsc;

/// Fan-out bus over the wallet's transaction stream.
#[derive(Default)]
pub struct TxEventBus {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    history: Vec<Transaction>,
    subscribers: Vec<mpsc::UnboundedSender<Transaction>>,
    closed: bool,
}

impl TxEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to history and fan out to live subscribers. No-op after
    /// [`close`](Self::close).
    pub fn publish(&self, tx: Transaction) {
        let mut inner = match self.inner.lock() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        };
        if inner.closed {
            log::warn!("transaction published after bus close, dropping");
            return;
        }
        inner.history.push(tx.clone());
        inner
            .subscribers
            .retain(|sender| sender.send(tx.clone()).is_ok());
    }

    /// Subscribe: a snapshot of everything published so far, then the live
    /// feed. Taken under one lock, so nothing is missed or duplicated
    /// between the two.
    pub fn subscribe(&self) -> TxEvents {
        let mut inner = match self.inner.lock() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        };
        let (sender, receiver) = mpsc::unbounded_channel();
        if !inner.closed {
            inner.subscribers.push(sender);
        }
        TxEvents {
            backlog: inner.history.iter().cloned().collect(),
            live: receiver,
        }
    }

    /// Terminate all streams. Subscribers drain their backlog and then
    /// observe end-of-stream.
    pub fn close(&self) {
        let mut inner = match self.inner.lock() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        };
        inner.closed = true;
        inner.subscribers.clear();
    }

    /// Everything published so far.
    pub fn history(&self) -> Vec<Transaction> {
        match self.inner.lock() {
            Ok(inner) => inner.history.clone(),
            Err(poisoned) => poisoned.into_inner().history.clone(),
        }
    }
}

/// One subscriber's view of the bus: replayed history, then live events.
pub struct TxEvents {
    backlog: VecDeque<Transaction>,
    live: mpsc::UnboundedReceiver<Transaction>,
}

impl TxEvents {
    /// Next transaction, or `None` once the bus is closed and the backlog
    /// is drained.
    pub async fn next(&mut self) -> Option<Transaction> {
        if let Some(tx) = self.backlog.pop_front() {
            return Some(tx);
        }
        self.live.recv().await
    }
}
