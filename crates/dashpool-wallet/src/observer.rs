//! Predicate waits over the transaction event bus.

use crate::error::WalletError;
use crate::events::TxEventBus;
use dashpool_tx::TxFilter;
use dashpool_types::Transaction;
use std::sync::Arc;

/// Suspending waits for transactions matching a predicate.
#[derive(Clone)]
pub struct TransactionObserver {
    bus: Arc<TxEventBus>,
}

impl TransactionObserver {
    pub fn new(bus: Arc<TxEventBus>) -> Self {
        Self { bus }
    }

    /// Wait for the first transaction, historical or live, matching any of
    /// `filters`. Resolves at most once per call; dropping the future
    /// abandons only this wait. Fails with
    /// [`WalletError::WatchSourceClosed`] when the bus closes first.
    pub async fn first(&self, filters: &[&dyn TxFilter]) -> Result<Transaction, WalletError> {
        let mut events = self.bus.subscribe();
        while let Some(tx) = events.next().await {
            if filters.iter().any(|f| f.matches(&tx)) {
                return Ok(tx);
            }
        }
        Err(WalletError::WatchSourceClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashpool_tx::filter::CoinsToAddress;
    use dashpool_types::constants::Network;
    use dashpool_types::{Address, Direction, Duffs, TxOutput};

    fn addr(byte: u8) -> Address {
        Address::from_pubkey_hash(Network::Testnet, [byte; 20])
    }

    fn incoming(to: Address, value: Duffs) -> Transaction {
        Transaction {
            inputs: vec![],
            outputs: vec![TxOutput { address: to, value }],
            timestamp: value,
            direction: Direction::Received,
        }
    }

    fn coins_to(byte: u8, value: Duffs) -> CoinsToAddress {
        CoinsToAddress {
            address: Some(addr(byte)),
            amount: Some(value),
        }
    }

    #[tokio::test]
    async fn resolves_from_history() {
        let bus = Arc::new(TxEventBus::new());
        bus.publish(incoming(addr(1), 500));

        let observer = TransactionObserver::new(bus);
        let filter = coins_to(1, 500);
        let tx = observer.first(&[&filter]).await.unwrap();
        assert_eq!(tx.outputs[0].value, 500);
    }

    #[tokio::test]
    async fn resolves_from_live_events_and_ignores_non_matches() {
        let bus = Arc::new(TxEventBus::new());
        let observer = TransactionObserver::new(bus.clone());

        let wait = tokio::spawn({
            let observer = observer.clone();
            async move {
                let filter = coins_to(1, 500);
                observer.first(&[&filter]).await
            }
        });

        // A non-matching transaction must not resolve the wait.
        bus.publish(incoming(addr(1), 499));
        tokio::task::yield_now().await;
        assert!(!wait.is_finished());

        bus.publish(incoming(addr(1), 500));
        let tx = wait.await.unwrap().unwrap();
        assert_eq!(tx.outputs[0].value, 500);
    }

    #[tokio::test]
    async fn any_of_several_filters_matches() {
        let bus = Arc::new(TxEventBus::new());
        bus.publish(incoming(addr(2), 42));

        let observer = TransactionObserver::new(bus);
        let a = coins_to(1, 500);
        let b = coins_to(2, 42);
        let tx = observer.first(&[&a, &b]).await.unwrap();
        assert_eq!(tx.outputs[0].value, 42);
    }

    #[tokio::test]
    async fn closed_bus_fails_the_wait() {
        let bus = Arc::new(TxEventBus::new());
        let observer = TransactionObserver::new(bus.clone());

        let wait = tokio::spawn({
            let observer = observer.clone();
            async move {
                let filter = coins_to(1, 500);
                observer.first(&[&filter]).await
            }
        });

        tokio::task::yield_now().await;
        bus.close();
        assert!(matches!(
            wait.await.unwrap(),
            Err(WalletError::WatchSourceClosed)
        ));
    }
}
