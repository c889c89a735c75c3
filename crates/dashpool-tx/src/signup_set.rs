//! Classifier for the sign-up conversation in a wallet's history.
//!
//! A completed sign-up leaves up to five transactions on the account
//! address: the funding top-up, the sign-up request, the please-accept-terms
//! response, the accept-terms request, and the welcome response. Folding the
//! wallet history through this classifier recovers them, which is how an
//! interrupted enrollment resumes and how state is rebuilt after a restart.

use crate::filter::{PoolRequest, PoolResponse, TopUpTx, TxFilter};
use dashpool_types::api::{RequestCode, ResponseCode};
use dashpool_types::constants::{Network, PROTOCOL_EPOCH, REQUIRED_FOR_ACCEPT_TERMS};
use dashpool_types::{pool_address, Address, Transaction};

/// The transactions of one sign-up conversation, newest occurrence of each.
#[derive(Debug, Default, Clone)]
pub struct SignUpTxSet {
    pub top_up: Option<Transaction>,
    pub signup_request: Option<Transaction>,
    pub accept_terms_response: Option<Transaction>,
    pub accept_terms_request: Option<Transaction>,
    pub welcome_response: Option<Transaction>,
}

impl SignUpTxSet {
    /// Fold a wallet history into the conversation for `account`.
    pub fn from_history(network: Network, account: &Address, history: &[Transaction]) -> Self {
        let mut set = Self::default();
        for tx in history {
            set.observe(network, account, tx);
        }
        set
    }

    /// Classify one transaction, retaining it if it belongs to the
    /// conversation. Returns whether it was retained. Transactions older
    /// than the protocol epoch never belong.
    pub fn observe(&mut self, network: Network, account: &Address, tx: &Transaction) -> bool {
        if tx.timestamp < PROTOCOL_EPOCH {
            return false;
        }
        let pool = pool_address(network);

        let request = |code| PoolRequest {
            pool: pool.clone(),
            code,
        };
        let response = |code| PoolResponse {
            code,
            account: Some(account.clone()),
        };

        if request(RequestCode::SignUp).matches(tx) {
            return retain(&mut self.signup_request, tx);
        }
        if request(RequestCode::AcceptTerms).matches(tx) {
            return retain(&mut self.accept_terms_request, tx);
        }
        if response(ResponseCode::PleaseAcceptTerms).matches(tx) {
            return retain(&mut self.accept_terms_response, tx);
        }
        if response(ResponseCode::WelcomeToApi).matches(tx) {
            return retain(&mut self.welcome_response, tx);
        }

        // A funding transfer: pays the account enough for at least the
        // accept-terms step and is not any protocol message. Change outputs
        // from our own requests never reach here because the request
        // branches above claim those transactions first.
        let funding = TopUpTx {
            account: account.clone(),
            amount: None,
        };
        if funding.matches(tx) && tx.pays(account) >= REQUIRED_FOR_ACCEPT_TERMS {
            return retain(&mut self.top_up, tx);
        }

        false
    }

    /// Whether the conversation reached the welcome response.
    pub fn is_complete(&self) -> bool {
        self.welcome_response.is_some()
    }

    /// Whether any transaction of the conversation exists.
    pub fn is_empty(&self) -> bool {
        self.top_up.is_none()
            && self.signup_request.is_none()
            && self.accept_terms_response.is_none()
            && self.accept_terms_request.is_none()
            && self.welcome_response.is_none()
    }
}

/// Keep the newer of the existing slot and the candidate.
fn retain(slot: &mut Option<Transaction>, tx: &Transaction) -> bool {
    match slot {
        Some(existing) if existing.timestamp > tx.timestamp => {}
        _ => *slot = Some(tx.clone()),
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashpool_types::constants::REQUIRED_FOR_SIGNUP;
    use dashpool_types::{Direction, Duffs, TxOutput};

    fn account() -> Address {
        Address::from_pubkey_hash(Network::Testnet, [5; 20])
    }

    fn tx_to(address: Address, value: Duffs, ts: u64, direction: Direction) -> Transaction {
        Transaction {
            inputs: vec![],
            outputs: vec![TxOutput { address, value }],
            timestamp: ts,
            direction,
        }
    }

    fn full_conversation() -> Vec<Transaction> {
        let pool = pool_address(Network::Testnet);
        let t = PROTOCOL_EPOCH + 1_000;
        vec![
            tx_to(account(), REQUIRED_FOR_SIGNUP, t, Direction::Received),
            tx_to(
                pool.clone(),
                RequestCode::SignUp.request_value(),
                t + 1,
                Direction::Sent,
            ),
            tx_to(
                account(),
                ResponseCode::PleaseAcceptTerms.response_value(),
                t + 2,
                Direction::Received,
            ),
            tx_to(
                pool,
                RequestCode::AcceptTerms.request_value(),
                t + 3,
                Direction::Sent,
            ),
            tx_to(
                account(),
                ResponseCode::WelcomeToApi.response_value(),
                t + 4,
                Direction::Received,
            ),
        ]
    }

    #[test]
    fn classifies_a_full_conversation() {
        let set = SignUpTxSet::from_history(Network::Testnet, &account(), &full_conversation());
        assert!(set.top_up.is_some());
        assert!(set.signup_request.is_some());
        assert!(set.accept_terms_response.is_some());
        assert!(set.accept_terms_request.is_some());
        assert!(set.welcome_response.is_some());
        assert!(set.is_complete());
        assert!(!set.is_empty());
    }

    #[test]
    fn partial_conversation_leaves_later_slots_empty() {
        let history: Vec<_> = full_conversation().into_iter().take(2).collect();
        let set = SignUpTxSet::from_history(Network::Testnet, &account(), &history);
        assert!(set.top_up.is_some());
        assert!(set.signup_request.is_some());
        assert!(set.accept_terms_response.is_none());
        assert!(!set.is_complete());
    }

    #[test]
    fn pre_epoch_transactions_are_ignored() {
        let mut history = full_conversation();
        for tx in &mut history {
            tx.timestamp = PROTOCOL_EPOCH - 10;
        }
        let set = SignUpTxSet::from_history(Network::Testnet, &account(), &history);
        assert!(set.is_empty());
    }

    #[test]
    fn small_payments_are_not_funding() {
        let history = vec![tx_to(
            account(),
            REQUIRED_FOR_ACCEPT_TERMS - 1,
            PROTOCOL_EPOCH + 1,
            Direction::Received,
        )];
        let set = SignUpTxSet::from_history(Network::Testnet, &account(), &history);
        assert!(set.top_up.is_none());
    }

    #[test]
    fn unrelated_transactions_are_ignored() {
        let other = Address::from_pubkey_hash(Network::Testnet, [9; 20]);
        let history = vec![
            tx_to(other, 5_000_000, PROTOCOL_EPOCH + 1, Direction::Received),
            tx_to(account(), 77, PROTOCOL_EPOCH + 2, Direction::Received),
        ];
        let set = SignUpTxSet::from_history(Network::Testnet, &account(), &history);
        assert!(set.is_empty());
    }

    #[test]
    fn newest_occurrence_wins() {
        let pool = pool_address(Network::Testnet);
        let older = tx_to(
            pool.clone(),
            RequestCode::SignUp.request_value(),
            PROTOCOL_EPOCH + 10,
            Direction::Sent,
        );
        let newer = tx_to(
            pool,
            RequestCode::SignUp.request_value(),
            PROTOCOL_EPOCH + 20,
            Direction::Sent,
        );
        // Order of arrival does not matter.
        let set =
            SignUpTxSet::from_history(Network::Testnet, &account(), &[newer.clone(), older]);
        assert_eq!(set.signup_request.as_ref().map(|t| t.timestamp), Some(newer.timestamp));
    }
}
