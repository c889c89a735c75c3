//! Transaction predicates for matching protocol messages.
//!
//! Every message in the handshake is recognized by shape alone: direction,
//! destination address, and exact output value. Filters are the unit the
//! observer waits on and the classifier folds with.

use dashpool_types::api::{self, RequestCode, ResponseCode};
use dashpool_types::{Address, Direction, Duffs, Transaction, TxId};

/// A predicate over wallet-view transactions.
pub trait TxFilter: Send + Sync {
    fn matches(&self, tx: &Transaction) -> bool;

    /// Both this filter and `other` must match.
    fn and<F: TxFilter>(self, other: F) -> And<Self, F>
    where
        Self: Sized,
    {
        And(self, other)
    }
}

/// Conjunction of two filters.
pub struct And<A, B>(A, B);

impl<A: TxFilter, B: TxFilter> TxFilter for And<A, B> {
    fn matches(&self, tx: &Transaction) -> bool {
        self.0.matches(tx) && self.1.matches(tx)
    }
}

// =============================================================================
// Concrete filters
// =============================================================================

/// An incoming transaction paying `amount` (if set) to `address` (if set).
pub struct CoinsToAddress {
    pub address: Option<Address>,
    pub amount: Option<Duffs>,
}

impl TxFilter for CoinsToAddress {
    fn matches(&self, tx: &Transaction) -> bool {
        tx.direction == Direction::Received
            && tx.outputs.iter().any(|o| {
                self.address.as_ref().map_or(true, |a| &o.address == a)
                    && self.amount.map_or(true, |v| o.value == v)
            })
    }
}

/// Our own broadcast, identified by exact transaction id.
pub struct OutgoingTx {
    pub txid: TxId,
}

impl TxFilter for OutgoingTx {
    fn matches(&self, tx: &Transaction) -> bool {
        tx.direction == Direction::Sent && tx.txid() == self.txid
    }
}

/// An outgoing request to the pool address carrying `code`.
pub struct PoolRequest {
    pub pool: Address,
    pub code: RequestCode,
}

impl TxFilter for PoolRequest {
    fn matches(&self, tx: &Transaction) -> bool {
        tx.direction == Direction::Sent
            && tx
                .outputs
                .iter()
                .any(|o| o.address == self.pool && o.value == self.code.request_value())
    }
}

/// An incoming response from the pool carrying `code`, paying the account
/// address when one is given.
pub struct PoolResponse {
    pub code: ResponseCode,
    pub account: Option<Address>,
}

impl TxFilter for PoolResponse {
    fn matches(&self, tx: &Transaction) -> bool {
        tx.direction == Direction::Received
            && tx.outputs.iter().any(|o| {
                o.value == self.code.response_value()
                    && self.account.as_ref().map_or(true, |a| &o.address == a)
            })
    }
}

/// The pool's error acknowledgement for a failed request: the request value
/// echoed back to the account, plus one duff.
pub struct PoolErrorResponse {
    pub request_value: Duffs,
    pub account: Address,
}

impl TxFilter for PoolErrorResponse {
    fn matches(&self, tx: &Transaction) -> bool {
        tx.direction == Direction::Received
            && tx.outputs.iter().any(|o| {
                o.address == self.account
                    && o.value == api::error_response_value(self.request_value)
            })
    }
}

/// A transfer funding the account address, incoming or our own internal
/// send, optionally pinned to an exact amount.
pub struct TopUpTx {
    pub account: Address,
    pub amount: Option<Duffs>,
}

impl TxFilter for TopUpTx {
    fn matches(&self, tx: &Transaction) -> bool {
        tx.outputs.iter().any(|o| {
            o.address == self.account && self.amount.map_or(true, |v| o.value == v)
        })
    }
}

/// Transactions whose timestamp falls in `[from, to]`.
pub struct WithinPeriod {
    pub from: u64,
    pub to: u64,
}

impl TxFilter for WithinPeriod {
    fn matches(&self, tx: &Transaction) -> bool {
        self.from <= tx.timestamp && tx.timestamp <= self.to
    }
}
