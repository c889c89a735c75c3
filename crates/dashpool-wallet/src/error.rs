//! Wallet error types.

use crate::signup::SignUpState;
use dashpool_tx::TxError;
use dashpool_types::Duffs;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("insufficient funds: need {need}, have {have}")]
    InsufficientFunds { need: Duffs, have: Duffs },

    #[error("broadcast rejected: {0}")]
    BroadcastRejected(String),

    #[error("transaction source closed while waiting")]
    WatchSourceClosed,

    #[error("pool refused the request at step {step:?}")]
    SignUpRefused { step: SignUpState },

    #[error("pool denied the withdrawal request")]
    WithdrawalDenied,

    #[error("withdrawal of {requested} exceeds pool balance {available}")]
    WithdrawLimit {
        requested: Duffs,
        available: Duffs,
    },

    #[error("state store error: {0}")]
    Store(String),

    #[error(transparent)]
    Tx(#[from] TxError),
}
