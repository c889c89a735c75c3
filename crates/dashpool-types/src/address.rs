//! Dash P2PKH address parsing and validation.

use crate::base58::{self, Base58Error};
use crate::constants::Network;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Length of the public key hash in a P2PKH address.
pub const PUBKEY_HASH_SIZE: usize = 20;

#[derive(Debug, Error)]
pub enum AddressError {
    #[error("base58 error: {0}")]
    Base58(#[from] Base58Error),

    #[error("invalid payload length {len} (expected {expected})", len = .0, expected = PUBKEY_HASH_SIZE + 1)]
    InvalidLength(usize),

    #[error("unknown address version byte {0:#04x}")]
    UnknownVersion(u8),
}

/// A validated Dash P2PKH address.
///
/// Equality and hashing are over the decoded payload, so two addresses are
/// equal exactly when they pay the same key on the same network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address {
    network: Network,
    pubkey_hash: [u8; PUBKEY_HASH_SIZE],
}

impl Address {
    /// Construct an address from a raw public key hash.
    pub fn from_pubkey_hash(network: Network, pubkey_hash: [u8; PUBKEY_HASH_SIZE]) -> Self {
        Self {
            network,
            pubkey_hash,
        }
    }

    /// The network this address belongs to.
    pub fn network(&self) -> Network {
        self.network
    }

    /// The 20-byte public key hash.
    pub fn pubkey_hash(&self) -> &[u8; PUBKEY_HASH_SIZE] {
        &self.pubkey_hash
    }

    /// Base58Check-encode this address.
    pub fn encoded(&self) -> String {
        let mut payload = [0u8; PUBKEY_HASH_SIZE + 1];
        payload[0] = self.network.address_version();
        payload[1..].copy_from_slice(&self.pubkey_hash);
        base58::encode_check(&payload)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let payload = base58::decode_check(s)?;
        if payload.len() != PUBKEY_HASH_SIZE + 1 {
            return Err(AddressError::InvalidLength(payload.len()));
        }

        let network = Network::from_address_version(payload[0])
            .ok_or(AddressError::UnknownVersion(payload[0]))?;

        let mut pubkey_hash = [0u8; PUBKEY_HASH_SIZE];
        pubkey_hash.copy_from_slice(&payload[1..]);

        Ok(Self {
            network,
            pubkey_hash,
        })
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded())
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Address> for String {
    fn from(addr: Address) -> Self {
        addr.encoded()
    }
}

/// The staking pool's on-chain API address for a network.
///
/// Built from the decoded public key hashes so no fallible parse sits on
/// this path; tests pin them to the base58 constants in [`crate::constants`].
pub fn pool_address(network: Network) -> Address {
    const MAINNET_HASH: [u8; PUBKEY_HASH_SIZE] = [
        0x61, 0xBA, 0x0F, 0x43, 0xE1, 0x3C, 0x1C, 0xDF, 0x5B, 0xC8, 0x1D, 0xB6, 0xBC, 0x46,
        0xFD, 0xAF, 0x16, 0x2F, 0x03, 0x8C,
    ];
    const TESTNET_HASH: [u8; PUBKEY_HASH_SIZE] = [
        0x1D, 0x79, 0x35, 0xB5, 0xB8, 0x5E, 0x2E, 0xC2, 0x01, 0x15, 0x45, 0xF9, 0x57, 0x55,
        0x89, 0xC7, 0x99, 0x34, 0x79, 0x16,
    ];
    match network {
        Network::Mainnet => Address::from_pubkey_hash(network, MAINNET_HASH),
        Network::Testnet => Address::from_pubkey_hash(network, TESTNET_HASH),
    }
}

/// Whether a string is a valid address on the given network.
pub fn is_valid_address(s: &str, network: Network) -> bool {
    s.parse::<Address>()
        .map(|a| a.network() == network)
        .unwrap_or(false)
}
