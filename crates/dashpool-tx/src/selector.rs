//! Pinned-input selection for chained transactions.
//!
//! Protocol requests must spend outputs of specific prior transactions so
//! the counter-party can trace the lineage back to the funding transaction.
//! The selector takes those prior transactions as-is; it never falls back
//! to the wallet's general coin selection.

use crate::TxError;
use dashpool_types::{Address, Duffs, OutPoint, Transaction, TxInput};

/// Selects spendable inputs from a fixed set of prior transactions.
pub struct PinnedInputSelector {
    candidates: Vec<Transaction>,
    address: Address,
}

impl PinnedInputSelector {
    /// `candidates` are the transactions whose outputs to `address` the new
    /// transaction is allowed to spend.
    pub fn new(candidates: Vec<Transaction>, address: Address) -> Self {
        Self {
            candidates,
            address,
        }
    }

    /// Collect every unspent output paying the pinned address, in candidate
    /// order then output order.
    ///
    /// Fails fast with [`TxError::InvalidPinnedInput`] when a candidate pays
    /// nothing to the address at all; that is a caller bug, not a spendable
    /// race. Fails with [`TxError::NoSpendableOutputs`] when every eligible
    /// output is already spent.
    pub fn select(&self, spent: &dyn Fn(&OutPoint) -> bool) -> Result<Vec<TxInput>, TxError> {
        let mut inputs = Vec::new();

        for candidate in &self.candidates {
            let txid = candidate.txid();
            let mut pays_address = false;

            for (vout, output) in candidate.outputs.iter().enumerate() {
                if output.address != self.address {
                    continue;
                }
                pays_address = true;

                let prev_out = OutPoint {
                    txid,
                    vout: vout as u32,
                };
                if spent(&prev_out) {
                    continue;
                }

                inputs.push(TxInput {
                    prev_out,
                    address: output.address.clone(),
                    value: output.value,
                });
            }

            if !pays_address {
                return Err(TxError::InvalidPinnedInput {
                    txid,
                    address: self.address.encoded(),
                });
            }
        }

        if inputs.is_empty() {
            return Err(TxError::NoSpendableOutputs);
        }
        Ok(inputs)
    }

    /// Total value held by the selected inputs.
    pub fn selected_value(inputs: &[TxInput]) -> Duffs {
        inputs.iter().map(|i| i.value).sum()
    }
}
