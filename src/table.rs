// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! The master population table
//!
//! A key-sorted array of [`PopulationTableEntry`] built once at load
//! time. Lookup is a binary search with an intentional asymmetry: the
//! match test applies the entry's mask to the spike, while the branch
//! direction compares the raw `key`. That is correct because the table
//! is sorted by unmasked `key` and entries are non-overlapping under
//! their masks; upstream table generation guarantees both, and no
//! validation is re-done here.

use tracing::debug;

use crate::codec::PopulationTableEntry;
use crate::error::{PopTableError, Result};
use crate::types::Spike;

/// Words per table entry in the load blob: key, mask, packed fields.
pub(crate) const ENTRY_WORDS: usize = 3;

/// The sorted master population table.
#[derive(Debug, Clone)]
pub struct PopulationTable {
    entries: Vec<PopulationTableEntry>,
}

impl PopulationTable {
    /// Decode `n_entries` table entries out of `words`.
    ///
    /// Allocation failure is fatal for the caller, which must abort
    /// simulation setup.
    pub fn load(words: &[u32], n_entries: usize) -> Result<Self> {
        let needed = n_entries * ENTRY_WORDS;
        if words.len() < needed {
            return Err(PopTableError::TruncatedBlob {
                needed,
                available: words.len(),
            });
        }

        let mut entries = Vec::new();
        entries
            .try_reserve_exact(n_entries)
            .map_err(|source| PopTableError::AllocationFailed {
                region: "master population table",
                source,
            })?;
        for chunk in words[..needed].chunks_exact(ENTRY_WORDS) {
            entries.push(PopulationTableEntry::decode(chunk[0], chunk[1], chunk[2]));
        }

        debug!("population table loaded: {} entries", entries.len());
        Ok(Self { entries })
    }

    /// Re-decode all entries from `words` without reallocating.
    ///
    /// Sizes are invariant across a reset within one run.
    pub(crate) fn reload(&mut self, words: &[u32]) {
        for (entry, chunk) in self.entries.iter_mut().zip(words.chunks_exact(ENTRY_WORDS)) {
            *entry = PopulationTableEntry::decode(chunk[0], chunk[1], chunk[2]);
        }
    }

    /// Locate the entry matching a spike, if any.
    ///
    /// A miss is a valid outcome (unrecognized sender), not an error.
    pub fn position_of(&self, spike: Spike) -> Option<usize> {
        let mut imin = 0;
        let mut imax = self.entries.len();

        while imin < imax {
            let imid = (imax + imin) >> 1;
            let entry = &self.entries[imid];
            if entry.matches(spike) {
                return Some(imid);
            } else if entry.key < spike.0 {
                // Entry must be in the upper part of the table
                imin = imid + 1;
            } else {
                // Entry must be in the lower part of the table
                imax = imid;
            }
        }
        None
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline(always)]
    pub fn entry_at(&self, index: usize) -> PopulationTableEntry {
        self.entries[index]
    }

    /// The key of the entry at `index`, for diagnostics.
    #[inline(always)]
    pub fn key_at(&self, index: usize) -> u32 {
        self.entries[index].key
    }

    /// The mask of the entry at `index`, for diagnostics.
    #[inline(always)]
    pub fn mask_at(&self, index: usize) -> u32 {
        self.entries[index].mask
    }
}
