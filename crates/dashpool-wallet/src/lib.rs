//! Wallet-side orchestration of the staking-pool handshake.
//!
//! Provides the collaborator traits a host wallet implements (account
//! signing/broadcast, persisted attempt state), the replay-from-start
//! transaction event bus with its predicate observer, the coin-sending
//! service for ordinary and chained transactions, and the sign-up service
//! that drives the enrollment flow end to end.

pub mod account;
pub mod error;
pub mod events;
pub mod observer;
pub mod send;
pub mod signup;

pub use account::{MemoryStateStore, StateStore, WalletAccount};
pub use error::WalletError;
pub use events::{TxEventBus, TxEvents};
pub use observer::TransactionObserver;
pub use send::SendCoinsService;
pub use signup::{SignUpService, SignUpState};
