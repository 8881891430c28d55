// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Packed record codec for the population table load format.
//!
//! The load blob carries three word shapes, all decoded with explicit
//! shifts and masks (never compiler bit-fields, whose ordering is not
//! portable):
//!
//! ```text
//! table entry (3 words):
//!   W0: key(32)
//!   W1: mask(32)
//!   W2: start(15) | extra_info(1) | count(16)        [bit 0 upward]
//!
//! address list entry (1 word, two roles):
//!   row:   row_length-1(8) | address(23) | is_single(1)
//!   extra: core_mask(16) | mask_shift(5) | n_neurons(11)
//! ```
//!
//! The role of an address-list word is selected out-of-band by the
//! owning table entry's extra-info flag, not by any in-band tag.

use crate::types::Spike;

/// The number of bits of a row address.
pub const N_ADDRESS_BITS: u32 = 23;

/// The shift to apply to indirect addresses, which are stored in units
/// of four words (so this multiplies by 16 bytes).
pub const INDIRECT_ADDRESS_SHIFT: u32 = 4;

/// An invalid address and row length, used to keep indices aligned
/// between delayed and undelayed tables. Skipped during resolution,
/// never dereferenced.
pub const INVALID_ADDRESS: u32 = (1 << N_ADDRESS_BITS) - 1;

/// The maximum row length supported, in words, excluding header words.
pub const MAX_ROW_LENGTH: u32 = 256;

/// Bytes per word on the target.
pub const WORD_BYTES: u32 = 4;

/// One entry of the master population table.
///
/// Entries are matched with `spike & mask == key`; the table is sorted
/// ascending by raw `key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopulationTableEntry {
    /// The key to match against the incoming spike.
    pub key: u32,
    /// The mask selecting the significant bits of the spike.
    pub mask: u32,
    start: u16,
    has_extra_info: bool,
    count: u16,
}

impl PopulationTableEntry {
    /// Build an entry from its field values. `start` must fit 15 bits.
    pub fn new(key: u32, mask: u32, start: u16, has_extra_info: bool, count: u16) -> Self {
        debug_assert!(start < (1 << 15), "start {} exceeds 15 bits", start);
        Self {
            key,
            mask,
            start,
            has_extra_info,
            count,
        }
    }

    /// Decode an entry from its three blob words.
    #[inline(always)]
    pub fn decode(key: u32, mask: u32, packed: u32) -> Self {
        Self {
            key,
            mask,
            start: (packed & 0x7FFF) as u16,
            has_extra_info: packed & 0x8000 != 0,
            count: (packed >> 16) as u16,
        }
    }

    /// Re-encode the third (packed) word of this entry.
    #[inline(always)]
    pub fn encode_packed(&self) -> u32 {
        (self.start as u32) | ((self.has_extra_info as u32) << 15) | ((self.count as u32) << 16)
    }

    /// Whether a spike matches this entry under its mask.
    #[inline(always)]
    pub fn matches(&self, spike: Spike) -> bool {
        spike.0 & self.mask == self.key
    }

    /// Index into the address list where this entry's slice begins.
    #[inline(always)]
    pub fn start(&self) -> usize {
        self.start as usize
    }

    /// Whether the first slot of the slice is an extra-info record.
    #[inline(always)]
    pub fn has_extra_info(&self) -> bool {
        self.has_extra_info
    }

    /// Number of address records in the slice (the extra-info slot, if
    /// present, is not counted).
    #[inline(always)]
    pub fn count(&self) -> u16 {
        self.count
    }
}

/// A packed address and row length (same word size as [`ExtraInfo`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressEntry {
    address: u32,
    row_length_minus_one: u8,
    is_single: bool,
}

impl AddressEntry {
    /// Build a row entry. `row_length` is the actual length (1-256);
    /// `address` must fit 23 bits.
    pub fn new(address: u32, row_length: u32, is_single: bool) -> Self {
        debug_assert!(address < INVALID_ADDRESS, "address 0x{:x} exceeds 23 bits", address);
        debug_assert!(
            (1..=MAX_ROW_LENGTH).contains(&row_length),
            "row length {} out of range 1-256",
            row_length
        );
        Self {
            address,
            row_length_minus_one: (row_length - 1) as u8,
            is_single,
        }
    }

    /// The placeholder entry kept only for positional alignment.
    pub fn invalid() -> Self {
        Self {
            address: INVALID_ADDRESS,
            row_length_minus_one: 0,
            is_single: false,
        }
    }

    #[inline(always)]
    pub fn decode(word: u32) -> Self {
        Self {
            address: (word >> 8) & INVALID_ADDRESS,
            row_length_minus_one: (word & 0xFF) as u8,
            is_single: word >> 31 != 0,
        }
    }

    #[inline(always)]
    pub fn encode(&self) -> u32 {
        (self.row_length_minus_one as u32) | (self.address << 8) | ((self.is_single as u32) << 31)
    }

    /// Whether this is the alignment placeholder.
    #[inline(always)]
    pub fn is_invalid(&self) -> bool {
        self.address == INVALID_ADDRESS
    }

    /// Row lengths are stored offset by one, allowing lengths 1-256.
    #[inline(always)]
    pub fn row_length(&self) -> u32 {
        self.row_length_minus_one as u32 + 1
    }

    /// Word offset (indirect rows) or byte offset (single rows).
    #[inline(always)]
    pub fn address(&self) -> u32 {
        self.address
    }

    /// Whether this row is a direct/single word.
    #[inline(always)]
    pub fn is_single(&self) -> bool {
        self.is_single
    }
}

/// Multi-core decode metadata for entries whose key is shared by
/// several source cores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtraInfo {
    core_mask: u16,
    mask_shift: u8,
    n_neurons_per_core: u16,
}

impl ExtraInfo {
    /// Build an extra-info record. `mask_shift` must be 0-31 and
    /// `n_neurons_per_core` must fit 11 bits.
    pub fn new(core_mask: u16, mask_shift: u8, n_neurons_per_core: u16) -> Self {
        debug_assert!(mask_shift < 32, "mask shift {} out of range", mask_shift);
        debug_assert!(
            n_neurons_per_core < (1 << 11),
            "neurons per core {} exceeds 11 bits",
            n_neurons_per_core
        );
        Self {
            core_mask,
            mask_shift,
            n_neurons_per_core,
        }
    }

    #[inline(always)]
    pub fn decode(word: u32) -> Self {
        Self {
            core_mask: (word & 0xFFFF) as u16,
            mask_shift: ((word >> 16) & 0x1F) as u8,
            n_neurons_per_core: (word >> 21) as u16,
        }
    }

    #[inline(always)]
    pub fn encode(&self) -> u32 {
        (self.core_mask as u32)
            | ((self.mask_shift as u32) << 16)
            | ((self.n_neurons_per_core as u32) << 21)
    }

    #[inline(always)]
    pub fn core_mask(&self) -> u32 {
        self.core_mask as u32
    }

    #[inline(always)]
    pub fn mask_shift(&self) -> u32 {
        self.mask_shift as u32
    }

    #[inline(always)]
    pub fn n_neurons_per_core(&self) -> u32 {
        self.n_neurons_per_core as u32
    }

    /// Which of the cores sharing this key the spike came from.
    #[inline(always)]
    pub fn core_index(&self, spike: Spike) -> u32 {
        (spike.0 >> self.mask_shift) & self.core_mask as u32
    }

    /// Total neurons on the cores preceding the spike's core.
    #[inline(always)]
    pub fn core_sum(&self, spike: Spike) -> u32 {
        self.core_index(spike) * self.n_neurons_per_core as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_entry_packed_round_trip() {
        for (start, extra, count) in [
            (0u16, false, 0u16),
            (0x7FFF, true, 0xFFFF),
            (1234, true, 0),
            (1, false, 65535),
        ] {
            let entry = PopulationTableEntry::new(0xDEAD_0000, 0xFFFF_0000, start, extra, count);
            let decoded =
                PopulationTableEntry::decode(entry.key, entry.mask, entry.encode_packed());
            assert_eq!(decoded, entry);
        }
    }

    #[test]
    fn test_address_entry_round_trip_at_field_boundaries() {
        for row_length in [1u32, 256] {
            for address in [0u32, INVALID_ADDRESS - 1] {
                for is_single in [false, true] {
                    let entry = AddressEntry::new(address, row_length, is_single);
                    let decoded = AddressEntry::decode(entry.encode());
                    assert_eq!(decoded, entry);
                    assert_eq!(decoded.address(), address);
                    assert_eq!(decoded.row_length(), row_length);
                    assert_eq!(decoded.is_single(), is_single);
                    assert!(!decoded.is_invalid());
                }
            }
        }
    }

    #[test]
    fn test_invalid_address_entry_survives_encode() {
        let decoded = AddressEntry::decode(AddressEntry::invalid().encode());
        assert!(decoded.is_invalid());
    }

    #[test]
    fn test_extra_info_round_trip_at_field_boundaries() {
        for mask_shift in [0u8, 31] {
            for n_neurons in [0u16, 2047] {
                for core_mask in [0u16, 0xFFFF] {
                    let extra = ExtraInfo::new(core_mask, mask_shift, n_neurons);
                    let decoded = ExtraInfo::decode(extra.encode());
                    assert_eq!(decoded, extra);
                    assert_eq!(decoded.mask_shift(), mask_shift as u32);
                    assert_eq!(decoded.n_neurons_per_core(), n_neurons as u32);
                }
            }
        }
    }

    #[test]
    fn test_core_index_and_sum() {
        // Key shared by 4 cores of 100 neurons, core bits at 8-9.
        let extra = ExtraInfo::new(0x3, 8, 100);
        let spike = Spike(0x0000_0245);
        assert_eq!(extra.core_index(spike), 2);
        assert_eq!(extra.core_sum(spike), 200);
    }

    #[test]
    fn test_entry_match_uses_mask() {
        let entry = PopulationTableEntry::new(0x4, 0xFFFF_FFFC, 0, false, 1);
        assert!(entry.matches(Spike(0x4)));
        assert!(entry.matches(Spike(0x6)));
        assert!(!entry.matches(Spike(0x8)));
    }
}
