//! Staking pool API codes and the amount codec.
//!
//! The pool has no request/response API for the handshake itself: a message
//! is a transaction whose value is `API_OFFSET + code`. Requests are sent to
//! the pool address; responses come back as payments to the account address.
//! Request and response vocabularies are disjoint, so direction plus decoded
//! value identifies a message unambiguously.

use crate::constants::{Duffs, API_OFFSET};
use serde::{Deserialize, Serialize};

// =============================================================================
// Request codes
// =============================================================================

/// Message types the client sends to the pool address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u64)]
pub enum RequestCode {
    AcceptTerms = 65_536,
    SignUp = 131_072,
}

impl RequestCode {
    pub const ALL: [RequestCode; 2] = [RequestCode::AcceptTerms, RequestCode::SignUp];

    /// The raw code.
    pub fn code(self) -> u64 {
        self as u64
    }

    /// Transaction value carrying this request.
    pub fn request_value(self) -> Duffs {
        encode(API_OFFSET, self as u64)
    }

    /// Recover a request code from an observed transaction value.
    pub fn from_value(amount: Duffs) -> Option<Self> {
        let code = decode(API_OFFSET, amount)?;
        Self::ALL.iter().copied().find(|r| r.code() == code)
    }
}

// =============================================================================
// Response codes
// =============================================================================

/// Message types the pool sends back to the account address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u64)]
pub enum ResponseCode {
    PleaseAcceptTerms = 2,
    WelcomeToApi = 4,
    DepositReceived = 8,
    WithdrawalQueued = 16,
    WithdrawalDenied = 32,
}

impl ResponseCode {
    pub const ALL: [ResponseCode; 5] = [
        ResponseCode::PleaseAcceptTerms,
        ResponseCode::WelcomeToApi,
        ResponseCode::DepositReceived,
        ResponseCode::WithdrawalQueued,
        ResponseCode::WithdrawalDenied,
    ];

    /// The raw code.
    pub fn code(self) -> u64 {
        self as u64
    }

    /// Transaction value carrying this response.
    pub fn response_value(self) -> Duffs {
        encode(API_OFFSET, self as u64)
    }

    /// Recover a response code from an observed transaction value.
    pub fn from_value(amount: Duffs) -> Option<Self> {
        let code = decode(API_OFFSET, amount)?;
        Self::ALL.iter().copied().find(|r| r.code() == code)
    }
}

// =============================================================================
// Withdrawal permil encoding
// =============================================================================

/// Withdrawals encode the requested fraction of the pool balance as a
/// permil in `1..=WITHDRAW_ALL_PERMIL`, added to the offset like any code.
pub const WITHDRAW_ALL_PERMIL: u64 = 1_000;

/// Transaction value requesting withdrawal of `permil` thousandths of the
/// pool balance. Values above [`WITHDRAW_ALL_PERMIL`] are clamped.
pub fn withdrawal_request_value(permil: u64) -> Duffs {
    encode(API_OFFSET, permil.clamp(1, WITHDRAW_ALL_PERMIL))
}

// =============================================================================
// Codec primitives
// =============================================================================

/// Encode a code as a transaction value around a base offset.
pub fn encode(base_offset: Duffs, code: u64) -> Duffs {
    base_offset + code
}

/// Decode a transaction value back to its code. Returns `None` when the
/// amount does not reach the offset; membership in a vocabulary is the
/// caller's check.
pub fn decode(base_offset: Duffs, amount: Duffs) -> Option<u64> {
    amount.checked_sub(base_offset)
}

/// Value of the pool's error acknowledgement for a failed request: the
/// request value echoed back plus one duff.
pub fn error_response_value(request_value: Duffs) -> Duffs {
    request_value + 1
}
