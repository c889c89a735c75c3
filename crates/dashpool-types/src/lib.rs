//! Core types and constants for the Dash staking-pool client.
//!
//! This crate provides the foundational types used across all dashpool
//! crates: duff amounts, network constants, base58check addresses, the
//! staking pool's API code vocabulary with its amount codec, and the
//! wallet-view transaction model.

pub mod address;
pub mod api;
pub mod base58;
pub mod constants;
pub mod transaction;

pub use address::{pool_address, Address};
pub use api::{RequestCode, ResponseCode};
pub use constants::{Duffs, Network};
pub use transaction::{Direction, OutPoint, Transaction, TxId, TxInput, TxOutput};
