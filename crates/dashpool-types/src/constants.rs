//! Network constants, pool endpoints, and the fee model parameters.

use serde::{Deserialize, Serialize};

// =============================================================================
// Amounts
// =============================================================================

/// Atomic Dash unit. All amounts in this workspace are duffs.
pub type Duffs = u64;

/// Duffs per DASH.
pub const DUFFS: Duffs = 100_000_000;

// =============================================================================
// Network
// =============================================================================

/// Network type identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Network {
    Mainnet,
    Testnet,
}

impl Network {
    /// P2PKH address version byte for this network.
    pub fn address_version(self) -> u8 {
        match self {
            Network::Mainnet => 0x4C, // addresses start with 'X'
            Network::Testnet => 0x8C, // addresses start with 'y'
        }
    }

    /// Network for a given P2PKH version byte.
    pub fn from_address_version(version: u8) -> Option<Self> {
        match version {
            0x4C => Some(Network::Mainnet),
            0x8C => Some(Network::Testnet),
            _ => None,
        }
    }
}

// =============================================================================
// Pool API endpoints
// =============================================================================

/// The staking pool's on-chain API address, mainnet.
pub const POOL_MAINNET_ADDRESS: &str = "XjbaGWaGnvEtuQAUoBgDxJWe8ZNv45upG2";

/// The staking pool's on-chain API address, testnet.
pub const POOL_TESTNET_ADDRESS: &str = "yP1Hea4zoMZxV9daeb3bZXg8H2hYRcJh1m";

/// The well-known pool API address for a network.
pub fn pool_address_str(network: Network) -> &'static str {
    match network {
        Network::Mainnet => POOL_MAINNET_ADDRESS,
        Network::Testnet => POOL_TESTNET_ADDRESS,
    }
}

// =============================================================================
// Protocol amounts
// =============================================================================

/// Base offset added to every API request or response code when it is
/// carried as a transaction value.
pub const API_OFFSET: Duffs = 20_000;

/// Funding required on the account address for a fresh sign-up. Covers the
/// sign-up and accept-terms request values plus fees for both steps.
pub const REQUIRED_FOR_SIGNUP: Duffs = 1_000_000;

/// Funding required when resuming an enrollment at the accept-terms step.
pub const REQUIRED_FOR_ACCEPT_TERMS: Duffs = 100_000;

/// No sign-up conversation predates this point (2022-01-01 UTC); older
/// transactions are never classified as part of one.
pub const PROTOCOL_EPOCH: u64 = 1_640_995_200;

// =============================================================================
// Fee model
// =============================================================================

/// Standard relay fee rate, duffs per byte.
pub const FEE_PER_BYTE: Duffs = 1;

/// Minimum relay fee for any transaction.
pub const MIN_RELAY_FEE: Duffs = 1_000;

/// Serialized size of a P2PKH input (outpoint + signature script).
pub const TX_INPUT_SIZE: usize = 148;

/// Serialized size of a P2PKH output.
pub const TX_OUTPUT_SIZE: usize = 34;

/// Fixed transaction overhead (version, counts, locktime).
pub const TX_BASE_SIZE: usize = 10;

/// Fee headroom budgeted per additional input when topping up.
pub const TX_FEE_PER_INPUT: Duffs = TX_INPUT_SIZE as Duffs * FEE_PER_BYTE;
