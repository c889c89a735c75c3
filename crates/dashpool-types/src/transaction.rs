//! Wallet-view transaction model.
//!
//! The handshake protocol only needs to know which addresses a transaction
//! pays, with what values, and which prior outputs it spends. Inputs carry
//! the address and value of the output they consume, resolved by the wallet
//! that owns them; scripts and signatures stay inside the wallet collaborator.

use crate::address::Address;
use crate::constants::{Duffs, TX_BASE_SIZE, TX_INPUT_SIZE, TX_OUTPUT_SIZE};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

// =============================================================================
// TxId
// =============================================================================

/// Transaction identifier: double SHA-256 of the canonical serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxId(pub [u8; 32]);

impl TxId {
    /// Hex-encode (display order).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a 64-character hex string.
    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        let arr: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(arr))
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// =============================================================================
// Outpoints, inputs, outputs
// =============================================================================

/// Reference to a specific output of a prior transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub txid: TxId,
    pub vout: u32,
}

/// A transaction input, as the wallet sees it: the outpoint being spent
/// plus the address and value of that output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    pub prev_out: OutPoint,
    pub address: Address,
    pub value: Duffs,
}

/// A transaction output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub address: Address,
    pub value: Duffs,
}

/// Direction of a transaction relative to the owning wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Signed and sent by this wallet (including internal transfers).
    Sent,
    /// Received from an external party.
    Received,
}

// =============================================================================
// Transaction
// =============================================================================

/// One transaction in the wallet's view of the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    /// Unix timestamp at which the wallet learned of the transaction.
    pub timestamp: u64,
    pub direction: Direction,
}

impl Transaction {
    /// Compute the transaction id over the canonical serialization.
    pub fn txid(&self) -> TxId {
        let mut buf = Vec::with_capacity(self.estimated_size());
        self.serialize_canonical(&mut buf);
        let first = Sha256::digest(&buf);
        let second = Sha256::digest(first);
        TxId(second.into())
    }

    /// Total value paid to `address` across all outputs.
    pub fn pays(&self, address: &Address) -> Duffs {
        self.outputs
            .iter()
            .filter(|o| &o.address == address)
            .map(|o| o.value)
            .sum()
    }

    /// Whether any output pays `address`.
    pub fn has_output_to(&self, address: &Address) -> bool {
        self.outputs.iter().any(|o| &o.address == address)
    }

    /// Total value consumed by the inputs.
    pub fn input_value(&self) -> Duffs {
        self.inputs.iter().map(|i| i.value).sum()
    }

    /// Total value of the outputs.
    pub fn output_value(&self) -> Duffs {
        self.outputs.iter().map(|o| o.value).sum()
    }

    /// Implied fee (zero for transactions whose inputs we do not own).
    pub fn fee(&self) -> Duffs {
        self.input_value().saturating_sub(self.output_value())
    }

    /// Estimated serialized size from the standard P2PKH structural sizes.
    pub fn estimated_size(&self) -> usize {
        TX_BASE_SIZE + self.inputs.len() * TX_INPUT_SIZE + self.outputs.len() * TX_OUTPUT_SIZE
    }

    fn serialize_canonical(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&(self.inputs.len() as u32).to_le_bytes());
        for input in &self.inputs {
            buf.extend_from_slice(&input.prev_out.txid.0);
            buf.extend_from_slice(&input.prev_out.vout.to_le_bytes());
            buf.extend_from_slice(&input.value.to_le_bytes());
            buf.extend_from_slice(input.address.pubkey_hash());
        }
        buf.extend_from_slice(&(self.outputs.len() as u32).to_le_bytes());
        for output in &self.outputs {
            buf.extend_from_slice(output.address.pubkey_hash());
            buf.extend_from_slice(&output.value.to_le_bytes());
        }
        buf.extend_from_slice(&self.timestamp.to_le_bytes());
    }
}
