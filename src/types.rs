// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Identity and descriptor types for spike-to-address resolution

use core::fmt;

/// An incoming spike: a 32-bit key identifying the source neuron/core.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Spike(pub u32);

impl fmt::Display for Spike {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Spike(0x{:08x})", self.0)
    }
}

/// Source neuron ID recovered from a spike key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct NeuronId(pub u32);

impl fmt::Display for NeuronId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Neuron({})", self.0)
    }
}

/// One synaptic-row transfer computed by the resolver.
///
/// `transfer_bytes == 0` is the signal that the row is a pre-resolved
/// single word at `row_address`; the driver must read it directly
/// instead of issuing a DMA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferDescriptor {
    /// The spike this transfer was resolved from.
    pub spike: Spike,
    /// Absolute byte address of the row (or of the single word).
    pub row_address: u32,
    /// DMA transfer size in bytes; zero for single-word rows.
    pub transfer_bytes: u32,
}

impl TransferDescriptor {
    /// True when this descriptor names a single pre-resolved word.
    #[inline(always)]
    pub fn is_single_word(&self) -> bool {
        self.transfer_bytes == 0
    }
}
