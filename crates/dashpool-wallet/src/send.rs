//! Coin sending, ordinary and chained.
//!
//! Both paths share the same tail: canonical output ordering, sign,
//! register locally, then broadcast. Registration comes first so a rejected
//! broadcast leaves the transaction (and its spent inputs) recorded; the
//! same transaction is then re-broadcast later instead of being rebuilt,
//! which would double-spend its own inputs.

use crate::account::WalletAccount;
use crate::error::WalletError;
use dashpool_tx::{FeeEstimator, PinnedInputSelector, TxError};
use dashpool_types::{Address, Direction, Duffs, Transaction, TxInput, TxOutput};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Builds, signs, registers, and broadcasts transactions for one wallet.
pub struct SendCoinsService<W, F> {
    wallet: Arc<W>,
    fee: F,
}

impl<W: WalletAccount, F: FeeEstimator> SendCoinsService<W, F> {
    pub fn new(wallet: Arc<W>, fee: F) -> Self {
        Self { wallet, fee }
    }

    /// Ordinary send: the wallet picks the inputs, change returns to a
    /// fresh wallet address.
    pub async fn send_coins(
        &self,
        destination: Address,
        amount: Duffs,
    ) -> Result<Transaction, WalletError> {
        let inputs = self.wallet.select_inputs(amount, &self.fee)?;
        let input_value: Duffs = inputs.iter().map(|i| i.value).sum();
        let fee = self.fee.fee_for_shape(inputs.len(), 2);

        let need = amount + fee;
        let change = input_value
            .checked_sub(need)
            .ok_or(WalletError::InsufficientFunds {
                need,
                have: input_value,
            })?;

        let mut outputs = vec![TxOutput {
            address: destination,
            value: amount,
        }];
        if change > 0 {
            outputs.push(TxOutput {
                address: self.wallet.fresh_change_address(),
                value: change,
            });
        }

        log::debug!("sending {amount} duffs, fee {fee}, change {change}");
        self.finalize(inputs, outputs).await
    }

    /// Chained send: inputs are fixed to the unspent outputs of `pinned`
    /// paying `change_address`, so the receiver can trace the lineage.
    ///
    /// The fee comes from the known size plus one prospective change
    /// output. On a shortfall, `adjust_downward` retries exactly once with
    /// `amount - fee`; otherwise the shortfall is an error.
    pub async fn send_coins_chained(
        &self,
        destination: Address,
        amount: Duffs,
        pinned: &[Transaction],
        change_address: &Address,
        adjust_downward: bool,
    ) -> Result<Transaction, WalletError> {
        let selector = PinnedInputSelector::new(pinned.to_vec(), change_address.clone());
        let wallet = &self.wallet;
        let inputs = selector.select(&|out| wallet.is_spent(out))?;

        let selected: Duffs = inputs.iter().map(|i| i.value).sum();
        let fee = self.fee.fee_for_shape(inputs.len(), 2);

        let mut amount = amount;
        if selected < amount.saturating_add(fee) {
            let shortfall = TxError::InsufficientChainedFunds {
                selected,
                amount,
                fee,
            };
            if !adjust_downward || amount <= fee {
                return Err(shortfall.into());
            }
            let reduced = amount - fee;
            if selected < reduced + fee {
                return Err(shortfall.into());
            }
            log::debug!("chained amount adjusted down from {amount} to {reduced} for fee {fee}");
            amount = reduced;
        }

        let change = selected - amount - fee;
        let mut outputs = vec![TxOutput {
            address: destination,
            value: amount,
        }];
        if change > 0 {
            outputs.push(TxOutput {
                address: change_address.clone(),
                value: change,
            });
        }

        log::debug!(
            "chained send of {amount} duffs over {} pinned inputs, fee {fee}",
            inputs.len()
        );
        self.finalize(inputs, outputs).await
    }

    async fn finalize(
        &self,
        inputs: Vec<TxInput>,
        mut outputs: Vec<TxOutput>,
    ) -> Result<Transaction, WalletError> {
        canonical_order(&mut outputs);
        let mut tx = Transaction {
            inputs,
            outputs,
            timestamp: unix_now(),
            direction: Direction::Sent,
        };
        self.wallet.sign(&mut tx)?;
        self.wallet.register(&tx)?;
        self.wallet.broadcast(&tx).await?;
        Ok(tx)
    }
}

/// Canonical output ordering: by value, ties broken by public key hash.
/// Keeps the output layout independent of construction order.
fn canonical_order(outputs: &mut [TxOutput]) {
    outputs.sort_by(|a, b| {
        a.value
            .cmp(&b.value)
            .then_with(|| a.address.pubkey_hash().cmp(b.address.pubkey_hash()))
    });
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
