// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Host-side table blob builder
//!
//! Produces the word blob consumed by [`crate::SpikeResolver::new`].
//! On the deployed system the blob is generated by the host tool-chain
//! and written into SDRAM; this builder exists for host-side tooling
//! and for tests. It sorts entries by key, as the binary search
//! requires, and panics on field overflow rather than returning errors
//! (a malformed table is a tooling bug, not a runtime condition).

use crate::codec::{AddressEntry, ExtraInfo, PopulationTableEntry};
use crate::table::ENTRY_WORDS;

struct PendingEntry {
    key: u32,
    mask: u32,
    extra: Option<ExtraInfo>,
    rows: Vec<AddressEntry>,
}

/// Builder for the population table load blob.
#[derive(Default)]
pub struct TableBlobBuilder {
    entries: Vec<PendingEntry>,
}

impl TableBlobBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one key/mask pattern with its address records. The optional
    /// extra-info record occupies the first slot of the slice and is
    /// not counted in the entry's record count.
    pub fn add_entry(
        &mut self,
        key: u32,
        mask: u32,
        extra: Option<ExtraInfo>,
        rows: &[AddressEntry],
    ) -> &mut Self {
        assert!(rows.len() < (1 << 16), "entry exceeds the 16-bit record count");
        self.entries.push(PendingEntry {
            key,
            mask,
            extra,
            rows: rows.to_vec(),
        });
        self
    }

    /// Emit the blob: `[N, M, entries..., address list...]`.
    pub fn build(&self) -> Vec<u32> {
        let mut order: Vec<usize> = (0..self.entries.len()).collect();
        order.sort_by_key(|&i| self.entries[i].key);

        let mut entry_words = Vec::with_capacity(self.entries.len() * ENTRY_WORDS);
        let mut address_words = Vec::new();
        for &i in &order {
            let pending = &self.entries[i];
            let start = address_words.len();
            assert!(start < (1 << 15), "address list exceeds the 15-bit start field");

            let entry = PopulationTableEntry::new(
                pending.key,
                pending.mask,
                start as u16,
                pending.extra.is_some(),
                pending.rows.len() as u16,
            );
            entry_words.extend([entry.key, entry.mask, entry.encode_packed()]);

            if let Some(extra) = pending.extra {
                address_words.push(extra.encode());
            }
            address_words.extend(pending.rows.iter().map(AddressEntry::encode));
        }

        let mut blob = Vec::with_capacity(2 + entry_words.len() + address_words.len());
        blob.push(self.entries.len() as u32);
        blob.push(address_words.len() as u32);
        blob.extend(entry_words);
        blob.extend(address_words);
        blob
    }
}
