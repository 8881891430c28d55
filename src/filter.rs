// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Connectivity bitfield filter
//!
//! One optional bitmap per master-table entry, indexed by source neuron
//! id: a set bit means that neuron has at least one synaptic target
//! here. Used purely as an admission filter to short-circuit DMA
//! transfers that provably hit nothing.
//!
//! A bitmap may be absent for an individual entry (DTCM was too tight
//! to build it, or the filter was merged into upstream routing); an
//! absent bitmap never filters.

use roaring::RoaringBitmap;

use crate::types::NeuronId;

/// Per-table-entry admission bitmaps.
#[derive(Debug, Clone, Default)]
pub struct ConnectivityFilter {
    bitfields: Vec<Option<RoaringBitmap>>,
}

impl ConnectivityFilter {
    /// Wrap one optional bitmap per table entry, in table order.
    pub fn new(bitfields: Vec<Option<RoaringBitmap>>) -> Self {
        Self { bitfields }
    }

    /// Whether the spike from `neuron_id` may hit anything under the
    /// table entry at `position`. Passes when no bitmap is present.
    #[inline(always)]
    pub fn test(&self, position: usize, neuron_id: NeuronId) -> bool {
        match self.bitfields.get(position) {
            Some(Some(bits)) => bits.contains(neuron_id.0),
            _ => true,
        }
    }
}
