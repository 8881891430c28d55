// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! The address list
//!
//! A flat array of packed one-word records, kept in wire form and
//! decoded on access. Each master-table entry owns a contiguous slice
//! of this list; whether the first slot of a slice is an
//! [`ExtraInfo`] record is decided by the owning entry's flag, not by
//! anything in the word itself. [`EntrySlice`] keeps that coupling in
//! one place.

use crate::codec::{AddressEntry, ExtraInfo, PopulationTableEntry};
use crate::error::{PopTableError, Result};

/// The address list, indexed by slices referenced from table entries.
#[derive(Debug, Clone)]
pub struct AddressList {
    words: Vec<u32>,
}

impl AddressList {
    /// Copy `n_entries` packed words out of `words`.
    pub fn load(words: &[u32], n_entries: usize) -> Result<Self> {
        if words.len() < n_entries {
            return Err(PopTableError::TruncatedBlob {
                needed: n_entries,
                available: words.len(),
            });
        }

        let mut list = Vec::new();
        list.try_reserve_exact(n_entries)
            .map_err(|source| PopTableError::AllocationFailed {
                region: "address list",
                source,
            })?;
        list.extend_from_slice(&words[..n_entries]);
        Ok(Self { words: list })
    }

    /// Overwrite all words from `words` without reallocating.
    pub(crate) fn reload(&mut self, words: &[u32]) {
        let n = self.words.len();
        self.words.copy_from_slice(&words[..n]);
    }

    #[inline(always)]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Decode the word at `index` as an address record.
    ///
    /// Indices come from table-entry slices; an out-of-range index is a
    /// programming error, not a recoverable condition.
    #[inline(always)]
    pub fn address_at(&self, index: usize) -> AddressEntry {
        AddressEntry::decode(self.words[index])
    }

    /// Decode the word at `index` as an extra-info record.
    #[inline(always)]
    pub fn extra_info_at(&self, index: usize) -> ExtraInfo {
        ExtraInfo::decode(self.words[index])
    }

    /// Resolve a table entry's slice, consuming the extra-info slot if
    /// the entry carries one.
    pub fn slice_of(&self, entry: &PopulationTableEntry) -> EntrySlice<'_> {
        let mut first = entry.start();
        let extra = if entry.has_extra_info() {
            let extra = self.extra_info_at(first);
            first += 1;
            Some(extra)
        } else {
            None
        };
        EntrySlice {
            list: self,
            extra,
            first,
            count: entry.count(),
        }
    }
}

/// A table entry's resolved view of the address list.
#[derive(Debug, Clone, Copy)]
pub struct EntrySlice<'a> {
    list: &'a AddressList,
    extra: Option<ExtraInfo>,
    first: usize,
    count: u16,
}

impl<'a> EntrySlice<'a> {
    /// Multi-core decode metadata, when the owning entry carries it.
    #[inline(always)]
    pub fn extra_info(&self) -> Option<ExtraInfo> {
        self.extra
    }

    /// Index of the first address record.
    #[inline(always)]
    pub fn first(&self) -> usize {
        self.first
    }

    /// Number of address records (placeholders included).
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.count as usize
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// The address records of this slice, placeholders included.
    pub fn records(&self) -> impl Iterator<Item = AddressEntry> + 'a {
        let list = self.list;
        (self.first..self.first + self.count as usize).map(move |i| list.address_at(i))
    }
}
