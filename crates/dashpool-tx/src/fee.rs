//! Fee estimation from structural transaction sizes.

use dashpool_types::constants::{
    Duffs, FEE_PER_BYTE, MIN_RELAY_FEE, TX_BASE_SIZE, TX_INPUT_SIZE, TX_OUTPUT_SIZE,
};

/// Maps a serialized transaction size to the fee it must carry.
pub trait FeeEstimator {
    fn fee_for_size(&self, size: usize) -> Duffs;

    /// Fee for a transaction of the given structural shape.
    fn fee_for_shape(&self, num_inputs: usize, num_outputs: usize) -> Duffs {
        self.fee_for_size(
            TX_BASE_SIZE + num_inputs * TX_INPUT_SIZE + num_outputs * TX_OUTPUT_SIZE,
        )
    }
}

/// Flat per-byte rate with a relay floor.
#[derive(Debug, Clone, Copy)]
pub struct FlatRateFee {
    pub rate: Duffs,
}

impl FlatRateFee {
    pub fn new(rate: Duffs) -> Self {
        Self { rate }
    }
}

impl Default for FlatRateFee {
    fn default() -> Self {
        Self { rate: FEE_PER_BYTE }
    }
}

impl FeeEstimator for FlatRateFee {
    fn fee_for_size(&self, size: usize) -> Duffs {
        (size as Duffs * self.rate).max(MIN_RELAY_FEE)
    }
}
