//! In-memory wallet and a scripted pool counter-party for integration tests.

use dashpool_tx::{FeeEstimator, FlatRateFee};
use dashpool_types::api::{RequestCode, ResponseCode, WITHDRAW_ALL_PERMIL};
use dashpool_types::constants::{Network, API_OFFSET};
use dashpool_types::{
    pool_address, Address, Direction, Duffs, OutPoint, Transaction, TxId, TxInput, TxOutput,
};
use dashpool_wallet::{
    MemoryStateStore, SignUpService, TxEventBus, WalletAccount, WalletError,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub type TestService = SignUpService<MemoryWallet, FlatRateFee, MemoryStateStore>;

pub const NETWORK: Network = Network::Testnet;

pub fn addr(byte: u8) -> Address {
    Address::from_pubkey_hash(NETWORK, [byte; 20])
}

pub fn account() -> Address {
    addr(5)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// =============================================================================
// MemoryWallet
// =============================================================================

/// A wallet holding a seeded pile of spendable outputs, publishing every
/// broadcast and every externally received transaction to the shared bus.
pub struct MemoryWallet {
    bus: Arc<TxEventBus>,
    inner: Mutex<Inner>,
    broadcasts: AtomicUsize,
    fail_broadcasts: Mutex<HashSet<usize>>,
    clock: AtomicU64,
}

struct Inner {
    utxos: Vec<TxInput>,
    spent: HashSet<OutPoint>,
    txs: Vec<Transaction>,
    owned: HashSet<Address>,
    next_change: u8,
    next_seed: u8,
}

impl MemoryWallet {
    pub fn new(bus: Arc<TxEventBus>) -> Arc<Self> {
        Arc::new(Self {
            bus,
            inner: Mutex::new(Inner {
                utxos: Vec::new(),
                spent: HashSet::new(),
                txs: Vec::new(),
                owned: HashSet::new(),
                next_change: 100,
                next_seed: 0,
            }),
            broadcasts: AtomicUsize::new(0),
            fail_broadcasts: Mutex::new(HashSet::new()),
            clock: AtomicU64::new(unix_now()),
        })
    }

    pub fn bus(&self) -> Arc<TxEventBus> {
        self.bus.clone()
    }

    /// Seed a spendable output at a wallet-internal address.
    pub fn fund(&self, value: Duffs) {
        let mut inner = self.inner.lock().unwrap();
        let seed = inner.next_seed;
        inner.next_seed += 1;
        let address = addr(200 + seed % 50);
        inner.owned.insert(address.clone());
        inner.utxos.push(TxInput {
            prev_out: OutPoint {
                txid: TxId([seed; 32]),
                vout: 0,
            },
            address,
            value,
        });
    }

    /// Make the nth broadcast attempt (1-based) fail.
    pub fn fail_broadcast(&self, n: usize) {
        self.fail_broadcasts.lock().unwrap().insert(n);
    }

    pub fn broadcast_count(&self) -> usize {
        self.broadcasts.load(Ordering::SeqCst)
    }

    /// Record an externally received payment and publish it.
    pub fn receive_external(&self, to: Address, value: Duffs) -> Transaction {
        let tx = Transaction {
            inputs: vec![],
            outputs: vec![TxOutput { address: to, value }],
            timestamp: self.clock.fetch_add(1, Ordering::SeqCst),
            direction: Direction::Received,
        };
        self.inner.lock().unwrap().txs.push(tx.clone());
        self.bus.publish(tx.clone());
        tx
    }
}

impl WalletAccount for MemoryWallet {
    fn spendable_balance(&self) -> Duffs {
        let inner = self.inner.lock().unwrap();
        inner
            .utxos
            .iter()
            .filter(|u| !inner.spent.contains(&u.prev_out))
            .map(|u| u.value)
            .sum()
    }

    fn select_inputs(
        &self,
        amount: Duffs,
        fee: &dyn FeeEstimator,
    ) -> Result<Vec<TxInput>, WalletError> {
        let inner = self.inner.lock().unwrap();
        let mut picked = Vec::new();
        let mut total = 0;
        for utxo in inner.utxos.iter().filter(|u| !inner.spent.contains(&u.prev_out)) {
            picked.push(utxo.clone());
            total += utxo.value;
            if total >= amount + fee.fee_for_shape(picked.len(), 2) {
                return Ok(picked);
            }
        }
        Err(WalletError::InsufficientFunds {
            need: amount,
            have: total,
        })
    }

    fn fresh_change_address(&self) -> Address {
        let mut inner = self.inner.lock().unwrap();
        let byte = inner.next_change;
        inner.next_change += 1;
        let address = addr(byte);
        inner.owned.insert(address.clone());
        address
    }

    fn sign(&self, _tx: &mut Transaction) -> Result<(), WalletError> {
        Ok(())
    }

    fn register(&self, tx: &Transaction) -> Result<(), WalletError> {
        let mut inner = self.inner.lock().unwrap();
        for input in &tx.inputs {
            inner.spent.insert(input.prev_out);
        }
        // Change to internal addresses becomes spendable again. Outputs to
        // the account address stay out of general selection; the protocol
        // spends those through pinned inputs only.
        let txid = tx.txid();
        for (vout, output) in tx.outputs.iter().enumerate() {
            if inner.owned.contains(&output.address) {
                inner.utxos.push(TxInput {
                    prev_out: OutPoint {
                        txid,
                        vout: vout as u32,
                    },
                    address: output.address.clone(),
                    value: output.value,
                });
            }
        }
        inner.txs.push(tx.clone());
        Ok(())
    }

    async fn broadcast(&self, tx: &Transaction) -> Result<(), WalletError> {
        let n = self.broadcasts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_broadcasts.lock().unwrap().remove(&n) {
            return Err(WalletError::BroadcastRejected(format!(
                "injected failure at broadcast {n}"
            )));
        }
        self.bus.publish(tx.clone());
        Ok(())
    }

    fn is_spent(&self, out: &OutPoint) -> bool {
        self.inner.lock().unwrap().spent.contains(out)
    }

    fn transactions(&self) -> Vec<Transaction> {
        self.inner.lock().unwrap().txs.clone()
    }
}

// =============================================================================
// Scripted pool counter-party
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolBehavior {
    /// Answer every request per protocol.
    Normal,
    /// Refuse the sign-up request with the error acknowledgement.
    RefuseSignUp,
}

/// Watch the bus for payments to the pool address and answer them the way
/// the pool does: terms prompt, welcome, deposit/withdrawal acknowledgement.
pub fn spawn_pool(
    wallet: Arc<MemoryWallet>,
    behavior: PoolBehavior,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let pool = pool_address(NETWORK);
        let mut events = wallet.bus().subscribe();
        while let Some(tx) = events.next().await {
            if tx.direction != Direction::Sent {
                continue;
            }
            let Some(paid) = tx.outputs.iter().find(|o| o.address == pool) else {
                continue;
            };

            let value = paid.value;
            if value == RequestCode::SignUp.request_value() {
                let response = match behavior {
                    PoolBehavior::Normal => ResponseCode::PleaseAcceptTerms.response_value(),
                    PoolBehavior::RefuseSignUp => dashpool_types::api::error_response_value(value),
                };
                wallet.receive_external(account(), response);
            } else if value == RequestCode::AcceptTerms.request_value() {
                wallet.receive_external(account(), ResponseCode::WelcomeToApi.response_value());
            } else if let Some(code) = value.checked_sub(API_OFFSET) {
                let response = if (1..=WITHDRAW_ALL_PERMIL).contains(&code) {
                    ResponseCode::WithdrawalQueued.response_value()
                } else {
                    ResponseCode::DepositReceived.response_value()
                };
                wallet.receive_external(account(), response);
            }
        }
    })
}

// =============================================================================
// Harness
// =============================================================================

pub struct Harness {
    pub bus: Arc<TxEventBus>,
    pub wallet: Arc<MemoryWallet>,
    pub service: Arc<TestService>,
}

pub fn harness() -> Harness {
    let _ = env_logger::builder().is_test(true).try_init();
    let bus = Arc::new(TxEventBus::new());
    let wallet = MemoryWallet::new(bus.clone());
    let service = Arc::new(SignUpService::new(
        wallet.clone(),
        FlatRateFee::default(),
        bus.clone(),
        MemoryStateStore::new(),
        NETWORK,
        account(),
    ));
    Harness {
        bus,
        wallet,
        service,
    }
}

/// Poll until `cond` holds, panicking after a bounded wait.
pub async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..1_000 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("condition not met within timeout");
}
