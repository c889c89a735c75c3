//! Collaborator traits implemented by the host wallet.
//!
//! The handshake never touches keys or scripts itself. Everything it needs
//! from the surrounding wallet goes through [`WalletAccount`]; everything it
//! persists between app runs goes through [`StateStore`].

use crate::error::WalletError;
use crate::signup::SignUpState;
use dashpool_tx::FeeEstimator;
use dashpool_types::{Address, Duffs, OutPoint, Transaction, TxInput};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;

/// The host wallet's account surface: balances, coin selection, signing,
/// local registration, and broadcast.
pub trait WalletAccount: Send + Sync {
    /// Total spendable balance, excluding outputs already marked spent.
    fn spendable_balance(&self) -> Duffs;

    /// Ordinary coin selection: inputs covering `amount` plus the fee the
    /// estimator assigns to the resulting transaction.
    fn select_inputs(
        &self,
        amount: Duffs,
        fee: &dyn FeeEstimator,
    ) -> Result<Vec<TxInput>, WalletError>;

    /// A fresh change address owned by this wallet.
    fn fresh_change_address(&self) -> Address;

    /// Sign all inputs of `tx` in place.
    fn sign(&self, tx: &mut Transaction) -> Result<(), WalletError>;

    /// Record `tx` locally and mark its inputs spent, atomically with
    /// respect to concurrent `select_inputs` and `is_spent` calls.
    fn register(&self, tx: &Transaction) -> Result<(), WalletError>;

    /// Submit `tx` to the network. A registered transaction whose broadcast
    /// is rejected stays registered so it can be re-broadcast as-is.
    fn broadcast(
        &self,
        tx: &Transaction,
    ) -> impl Future<Output = Result<(), WalletError>> + Send;

    /// Whether an output is already spent (or reserved by registration).
    fn is_spent(&self, out: &OutPoint) -> bool;

    /// Full transaction history, oldest first.
    fn transactions(&self) -> Vec<Transaction>;
}

// =============================================================================
// Persisted attempt state
// =============================================================================

/// Persistence for the per-account enrollment state.
pub trait StateStore: Send + Sync {
    /// Load the state for an account address. Unknown addresses load as
    /// [`SignUpState::NotStarted`].
    fn load(&self, address: &Address) -> Result<SignUpState, WalletError>;

    fn save(&self, address: &Address, state: SignUpState) -> Result<(), WalletError>;
}

/// In-memory store, for tests and hosts that persist elsewhere.
#[derive(Default)]
pub struct MemoryStateStore {
    states: Mutex<HashMap<Address, SignUpState>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self, address: &Address) -> Result<SignUpState, WalletError> {
        let states = self
            .states
            .lock()
            .map_err(|e| WalletError::Store(e.to_string()))?;
        Ok(states
            .get(address)
            .copied()
            .unwrap_or(SignUpState::NotStarted))
    }

    fn save(&self, address: &Address, state: SignUpState) -> Result<(), WalletError> {
        let mut states = self
            .states
            .lock()
            .map_err(|e| WalletError::Store(e.to_string()))?;
        states.insert(address.clone(), state);
        Ok(())
    }
}
