//! The on-chain sign-up flow.
//!
//! Linking an account to the pool is a three-transaction conversation:
//! fund the account address, send the sign-up request and wait for the
//! terms prompt, send the accept-terms request and wait for the welcome.
//! Each request spends outputs of the previous step's transactions so the
//! pool can trace the lineage back to the funding transfer.
//!
//! Progress is persisted per account address. Interrupted attempts resume
//! at the first incomplete step by reclassifying the wallet history; a
//! step whose transaction already exists is never rebuilt, only its
//! broadcast is repeated.

use crate::account::{StateStore, WalletAccount};
use crate::error::WalletError;
use crate::events::TxEventBus;
use crate::observer::TransactionObserver;
use crate::send::SendCoinsService;
use dashpool_tx::filter::{OutgoingTx, PoolErrorResponse, PoolResponse, TxFilter};
use dashpool_tx::{FeeEstimator, SignUpTxSet, TxError};
use dashpool_types::api::{self, RequestCode, ResponseCode, WITHDRAW_ALL_PERMIL};
use dashpool_types::constants::{
    Network, MIN_RELAY_FEE, REQUIRED_FOR_ACCEPT_TERMS, REQUIRED_FOR_SIGNUP, TX_FEE_PER_INPUT,
};
use dashpool_types::{pool_address, Address, Direction, Duffs, Transaction};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Enrollment progress for one account address.
///
/// The first five variants form the ordered chain and only ever advance.
/// `Error` marks a failed attempt that a later call may resume;
/// `LinkedExternally` marks an account linked outside this wallet and gates
/// enrollment like `Finished` does.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum SignUpState {
    NotStarted,
    FundingWallet,
    SigningUp,
    AcceptingTerms,
    Finished,
    Error,
    LinkedExternally,
}

impl SignUpState {
    /// Whether the account is linked and enrollment is a no-op.
    pub fn is_linked(self) -> bool {
        matches!(self, SignUpState::Finished | SignUpState::LinkedExternally)
    }
}

/// Drives the sign-up flow for one account address.
pub struct SignUpService<W, F, S> {
    wallet: Arc<W>,
    send: SendCoinsService<W, F>,
    observer: TransactionObserver,
    store: S,
    network: Network,
    account: Address,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag when an attempt ends, including by
/// cancellation.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<W, F, S> SignUpService<W, F, S>
where
    W: WalletAccount,
    F: FeeEstimator + Send + Sync,
    S: StateStore,
{
    pub fn new(
        wallet: Arc<W>,
        fee: F,
        bus: Arc<TxEventBus>,
        store: S,
        network: Network,
        account: Address,
    ) -> Self {
        Self {
            send: SendCoinsService::new(wallet.clone(), fee),
            wallet,
            observer: TransactionObserver::new(bus),
            store,
            network,
            account,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn account(&self) -> &Address {
        &self.account
    }

    /// The persisted state; a store failure reads as `NotStarted`.
    pub fn current_state(&self) -> SignUpState {
        match self.store.load(&self.account) {
            Ok(state) => state,
            Err(err) => {
                log::warn!("state load failed for {}: {err}", self.account);
                SignUpState::NotStarted
            }
        }
    }

    /// Mark the account as linked through another wallet or service.
    pub fn set_linked_externally(&self) -> Result<(), WalletError> {
        self.save(SignUpState::LinkedExternally)
    }

    /// Run the enrollment to completion.
    ///
    /// A call while another attempt is in flight, or once the account is
    /// linked, returns immediately without side effects. After an error or
    /// an interruption, the flow resumes at the first incomplete step.
    /// Any step failure persists [`SignUpState::Error`] and re-raises;
    /// there are no automatic retries.
    pub async fn enroll(&self) -> Result<(), WalletError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            log::debug!("enrollment already in flight for {}", self.account);
            return Ok(());
        }
        let _guard = InFlight(&self.in_flight);

        if self.current_state().is_linked() {
            return Ok(());
        }

        let result = self.run_enrollment().await;
        if let Err(err) = &result {
            log::warn!("enrollment failed for {}: {err}", self.account);
            if let Err(store_err) = self.store.save(&self.account, SignUpState::Error) {
                log::warn!("could not persist error state: {store_err}");
            }
        }
        result
    }

    async fn run_enrollment(&self) -> Result<(), WalletError> {
        let history = self.wallet.transactions();
        let set = SignUpTxSet::from_history(self.network, &self.account, &history);
        if set.is_complete() {
            self.save(SignUpState::Finished)?;
            return Ok(());
        }
        let pool = pool_address(self.network);

        // Step 1: fund the account address. Never rebuilt once the funding
        // transaction exists; a funding we built ourselves is re-broadcast
        // until the sign-up request follows it (an external transfer cannot
        // be re-broadcast from here).
        let funding = match set.top_up.clone() {
            Some(tx) => {
                if tx.direction == Direction::Sent && set.signup_request.is_none() {
                    log::info!("re-broadcasting funding transaction {}", tx.txid());
                    self.wallet.broadcast(&tx).await?;
                }
                tx
            }
            None => {
                self.save(SignUpState::FundingWallet)?;
                log::info!(
                    "funding account {} with {} duffs",
                    self.account,
                    REQUIRED_FOR_SIGNUP
                );
                let tx = self
                    .send
                    .send_coins(self.account.clone(), REQUIRED_FOR_SIGNUP)
                    .await?;
                // Later steps spend this transaction, so wait until the
                // wallet has seen its own broadcast before building on it.
                let landed = OutgoingTx { txid: tx.txid() };
                self.observer.first(&[&landed]).await?;
                tx
            }
        };

        // Step 2: sign-up request, then wait for the terms prompt.
        self.save(SignUpState::SigningUp)?;
        let signup_request = match set.signup_request.clone() {
            Some(tx) => {
                if set.accept_terms_response.is_none() {
                    // Built and registered earlier; repeat the broadcast of
                    // the same transaction rather than rebuilding it, which
                    // would double-spend its own inputs.
                    log::info!("re-broadcasting sign-up request {}", tx.txid());
                    self.wallet.broadcast(&tx).await?;
                }
                tx
            }
            None => {
                log::info!("sending sign-up request for {}", self.account);
                self.send
                    .send_coins_chained(
                        pool.clone(),
                        RequestCode::SignUp.request_value(),
                        std::slice::from_ref(&funding),
                        &self.account,
                        false,
                    )
                    .await?
            }
        };
        let terms_prompt = match set.accept_terms_response.clone() {
            Some(tx) => tx,
            None => {
                self.await_response(
                    ResponseCode::PleaseAcceptTerms,
                    RequestCode::SignUp.request_value(),
                    SignUpState::SigningUp,
                )
                .await?
            }
        };

        // Step 3: accept the terms, then wait for the welcome. The request
        // spends the sign-up change and the terms-prompt payment.
        self.save(SignUpState::AcceptingTerms)?;
        match set.accept_terms_request.clone() {
            Some(tx) => {
                log::info!("re-broadcasting accept-terms request {}", tx.txid());
                self.wallet.broadcast(&tx).await?;
            }
            None => {
                log::info!("accepting terms for {}", self.account);
                let request_value = RequestCode::AcceptTerms.request_value();
                let pinned = [signup_request, terms_prompt.clone()];
                let attempt = self
                    .send
                    .send_coins_chained(
                        pool.clone(),
                        request_value,
                        &pinned,
                        &self.account,
                        false,
                    )
                    .await;
                match attempt {
                    Ok(_) => {}
                    // The lineage outputs were spent since the conversation
                    // stalled; fund this step with a fresh top-up and pin
                    // that instead.
                    Err(WalletError::Tx(TxError::NoSpendableOutputs))
                    | Err(WalletError::Tx(TxError::InsufficientChainedFunds { .. })) => {
                        log::info!(
                            "topping up {} with {} duffs for the accept-terms step",
                            self.account,
                            REQUIRED_FOR_ACCEPT_TERMS
                        );
                        let top_up = self
                            .send
                            .send_coins(self.account.clone(), REQUIRED_FOR_ACCEPT_TERMS)
                            .await?;
                        let landed = OutgoingTx { txid: top_up.txid() };
                        self.observer.first(&[&landed]).await?;
                        let pinned = [top_up, terms_prompt];
                        self.send
                            .send_coins_chained(
                                pool,
                                request_value,
                                &pinned,
                                &self.account,
                                false,
                            )
                            .await?;
                    }
                    Err(err) => return Err(err),
                }
            }
        }
        self.await_response(
            ResponseCode::WelcomeToApi,
            RequestCode::AcceptTerms.request_value(),
            SignUpState::AcceptingTerms,
        )
        .await?;

        self.save(SignUpState::Finished)?;
        log::info!("account {} linked to the pool", self.account);
        Ok(())
    }

    /// Recompute state from the wallet history and persist it. The
    /// app-restart path; an externally linked account keeps its state
    /// since that link leaves no trace on this wallet's chain view.
    pub fn restore(&self) -> Result<SignUpState, WalletError> {
        let current = self.store.load(&self.account)?;
        if current == SignUpState::LinkedExternally {
            return Ok(current);
        }

        let set =
            SignUpTxSet::from_history(self.network, &self.account, &self.wallet.transactions());
        let state = if set.welcome_response.is_some() {
            SignUpState::Finished
        } else if set.accept_terms_request.is_some() || set.accept_terms_response.is_some() {
            SignUpState::AcceptingTerms
        } else if set.signup_request.is_some() || set.top_up.is_some() {
            SignUpState::SigningUp
        } else {
            SignUpState::NotStarted
        };
        self.save(state)?;
        Ok(state)
    }

    /// Deposit into the pool: top up the account with the amount plus fee
    /// headroom, forward it with the amount adjusted down for the fee, and
    /// wait for the pool's acknowledgement. Returns the forwarding
    /// transaction.
    pub async fn deposit(&self, amount: Duffs) -> Result<Transaction, WalletError> {
        log::info!("depositing {amount} duffs from {}", self.account);
        let top_up = self
            .send
            .send_coins(self.account.clone(), amount + TX_FEE_PER_INPUT)
            .await?;

        let pool = pool_address(self.network);
        let deposit = self
            .send
            .send_coins_chained(
                pool.clone(),
                amount,
                std::slice::from_ref(&top_up),
                &self.account,
                true,
            )
            .await?;

        let ack = self
            .await_response(
                ResponseCode::DepositReceived,
                deposit.pays(&pool),
                SignUpState::Finished,
            )
            .await?;
        log::debug!("deposit acknowledged by {}", ack.txid());
        Ok(deposit)
    }

    /// Withdraw from the pool balance: the requested fraction travels as a
    /// permil code, so the request transaction itself stays tiny. Returns
    /// the request transaction once the pool queues the withdrawal.
    pub async fn withdraw(
        &self,
        amount: Duffs,
        pool_balance: Duffs,
    ) -> Result<Transaction, WalletError> {
        if pool_balance == 0 || amount > pool_balance {
            return Err(WalletError::WithdrawLimit {
                requested: amount,
                available: pool_balance,
            });
        }
        let permil = permil_for(amount, pool_balance);
        let request_value = api::withdrawal_request_value(permil);
        log::info!(
            "withdrawing {amount} of {pool_balance} duffs ({permil} permil) for {}",
            self.account
        );

        // The permil must survive unchanged, so the top-up covers the exact
        // request value plus the chained fee and no downward adjustment is
        // allowed.
        let top_up = self
            .send
            .send_coins(self.account.clone(), request_value + MIN_RELAY_FEE)
            .await?;
        let pool = pool_address(self.network);
        let request = self
            .send
            .send_coins_chained(
                pool,
                request_value,
                std::slice::from_ref(&top_up),
                &self.account,
                false,
            )
            .await?;

        let queued = PoolResponse {
            code: ResponseCode::WithdrawalQueued,
            account: Some(self.account.clone()),
        };
        let denied = PoolResponse {
            code: ResponseCode::WithdrawalDenied,
            account: Some(self.account.clone()),
        };
        let refused = PoolErrorResponse {
            request_value,
            account: self.account.clone(),
        };
        let ack = self.observer.first(&[&queued, &denied, &refused]).await?;
        if denied.matches(&ack) || refused.matches(&ack) {
            return Err(WalletError::WithdrawalDenied);
        }
        Ok(request)
    }

    /// Wait for the expected response or the pool's error acknowledgement
    /// (the request value echoed back plus one).
    async fn await_response(
        &self,
        expected: ResponseCode,
        request_value: Duffs,
        step: SignUpState,
    ) -> Result<Transaction, WalletError> {
        let ok = PoolResponse {
            code: expected,
            account: Some(self.account.clone()),
        };
        let refused = PoolErrorResponse {
            request_value,
            account: self.account.clone(),
        };
        let tx = self.observer.first(&[&ok, &refused]).await?;
        if refused.matches(&tx) {
            return Err(WalletError::SignUpRefused { step });
        }
        Ok(tx)
    }

    fn save(&self, state: SignUpState) -> Result<(), WalletError> {
        log::debug!("account {} -> {state:?}", self.account);
        self.store.save(&self.account, state)
    }
}

/// Smallest permil whose share of `balance` covers `amount`.
fn permil_for(amount: Duffs, balance: Duffs) -> u64 {
    let permil = (amount as u128 * WITHDRAW_ALL_PERMIL as u128).div_ceil(balance as u128);
    (permil as u64).clamp(1, WITHDRAW_ALL_PERMIL)
}
