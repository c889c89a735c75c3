//! Pure transaction-domain logic for the staking-pool handshake.
//!
//! Provides transaction predicates for matching protocol messages in a
//! wallet's transaction stream, pinned-input selection for chained
//! transactions, fee estimation, and the sign-up conversation classifier
//! used to restore enrollment state from history. No I/O lives here.

pub mod fee;
pub mod filter;
pub mod selector;
pub mod signup_set;

pub use fee::{FeeEstimator, FlatRateFee};
pub use filter::TxFilter;
pub use selector::PinnedInputSelector;
pub use signup_set::SignUpTxSet;

use dashpool_types::{Duffs, TxId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TxError {
    #[error("insufficient funds: need {need}, have {have}")]
    InsufficientFunds { need: Duffs, have: Duffs },

    #[error(
        "chained inputs hold {selected}, cannot cover amount {amount} plus fee {fee}"
    )]
    InsufficientChainedFunds {
        selected: Duffs,
        amount: Duffs,
        fee: Duffs,
    },

    #[error("pinned transaction {txid} pays nothing to {address}")]
    InvalidPinnedInput { txid: TxId, address: String },

    #[error("every eligible output is already spent")]
    NoSpendableOutputs,
}
