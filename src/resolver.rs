// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Spike-to-address resolution
//!
//! [`SpikeResolver`] turns one incoming spike into a lazy sequence of
//! transfer descriptors, one per call. The external driver calls
//! [`SpikeResolver::get_first_address`] on spike receipt, hands the
//! descriptor to the DMA engine, and calls
//! [`SpikeResolver::get_next_address`] from each DMA-completion
//! interrupt until it returns `None`.
//!
//! One cursor, one spike in flight: the resolver is safe across the
//! asynchronous gap between calls, but a new `get_first_address` while
//! a previous resolution is incomplete simply overwrites the cursor.
//! Fully draining one spike before starting the next is a usage
//! invariant owned by the driver.

use tracing::{debug, trace};

use crate::address_list::AddressList;
use crate::codec::{
    AddressEntry, ExtraInfo, PopulationTableEntry, INDIRECT_ADDRESS_SHIFT, MAX_ROW_LENGTH,
    WORD_BYTES,
};
use crate::error::{PopTableError, Result};
use crate::filter::ConnectivityFilter;
use crate::stats::ResolutionStats;
use crate::table::{PopulationTable, ENTRY_WORDS};
use crate::types::{NeuronId, Spike, TransferDescriptor};

/// Words of synaptic-row header preceding the synapse words. Owned by
/// the synaptic-row format, not by this crate.
pub const SYNAPSE_ROW_HEADER_WORDS: u32 = 3;

/// Load-blob header: table length, address-list length.
const BLOB_HEADER_WORDS: usize = 2;

/// The spike currently being resolved.
#[derive(Debug, Clone, Copy, Default)]
struct ResolutionCursor {
    spike: Spike,
    neuron_id: NeuronId,
    next_slot: usize,
    remaining: u16,
}

/// The master population table together with its resolution protocol.
#[derive(Debug, Clone)]
pub struct SpikeResolver {
    table: PopulationTable,
    address_list: AddressList,
    filter: Option<ConnectivityFilter>,
    /// Base byte address of the synaptic matrix's indirect rows.
    indirect_base: u32,
    /// Base byte address of the synaptic matrix's direct rows.
    direct_base: u32,
    /// The load blob, retained for `reset`.
    blob: Vec<u32>,
    cursor: ResolutionCursor,
    primed: bool,
    stats: ResolutionStats,
}

impl SpikeResolver {
    /// Build the resolver from the load blob:
    ///
    /// ```text
    /// word[0]              master table length (N)
    /// word[1]              address list length (M)
    /// word[2 .. 2+3N)      table entries, 3 words each
    /// word[2+3N .. 2+3N+M) address list, 1 word each
    /// ```
    ///
    /// Any load failure is unrecoverable for the caller.
    pub fn new(blob: &[u32], indirect_base: u32, direct_base: u32) -> Result<Self> {
        if blob.len() < BLOB_HEADER_WORDS {
            return Err(PopTableError::TruncatedBlob {
                needed: BLOB_HEADER_WORDS,
                available: blob.len(),
            });
        }
        let n_entries = blob[0] as usize;
        let n_addresses = blob[1] as usize;

        let table = PopulationTable::load(&blob[BLOB_HEADER_WORDS..], n_entries)?;
        let address_list = AddressList::load(
            &blob[BLOB_HEADER_WORDS + n_entries * ENTRY_WORDS..],
            n_addresses,
        )?;

        let mut retained = Vec::new();
        retained
            .try_reserve_exact(blob.len())
            .map_err(|source| PopTableError::AllocationFailed {
                region: "retained table blob",
                source,
            })?;
        retained.extend_from_slice(blob);

        debug!("synaptic matrix base address: 0x{:08x}", indirect_base);
        debug!("direct matrix base address: 0x{:08x}", direct_base);

        let resolver = Self {
            table,
            address_list,
            filter: None,
            indirect_base,
            direct_base,
            blob: retained,
            cursor: ResolutionCursor::default(),
            primed: false,
            stats: ResolutionStats::new(),
        };
        resolver.trace_contents();
        Ok(resolver)
    }

    /// The largest possible row transfer in words, header included.
    /// The driver sizes its DMA buffer from this.
    pub const fn row_max_words() -> u32 {
        MAX_ROW_LENGTH + SYNAPSE_ROW_HEADER_WORDS
    }

    /// Replace the connectivity filter; `None` disables filtering.
    pub fn set_connectivity_filter(&mut self, filter: Option<ConnectivityFilter>) {
        self.filter = filter;
    }

    /// Start resolving a spike and return its first transfer, if any.
    ///
    /// `None` means the spike produced nothing: an unrecognized sender,
    /// a bitfield-filtered packet, or a slice of placeholders. Each
    /// cause is tracked in the statistics counters.
    pub fn get_first_address(&mut self, spike: Spike) -> Option<TransferDescriptor> {
        let Some(position) = self.table.position_of(spike) else {
            self.stats.record_invalid_hit();
            trace!("{}: not found in master population table", spike);
            return None;
        };

        let entry = self.table.entry_at(position);
        if entry.count() == 0 {
            trace!("{}: found at position {} but count is 0", spike, position);
        }

        let mut next_slot = entry.start();
        let neuron_id = if entry.has_extra_info() {
            // The extra-info slot is consumed here and does not count
            // against the entry's record count.
            let extra = self.address_list.extra_info_at(next_slot);
            next_slot += 1;
            extended_neuron_id(&entry, extra, spike)
        } else {
            plain_neuron_id(&entry, spike)
        };

        self.cursor = ResolutionCursor {
            spike,
            neuron_id,
            next_slot,
            remaining: entry.count(),
        };
        self.primed = true;

        // The bitmap for this entry may be missing (DTCM was too tight,
        // or the filter was merged into the routing tables); then the
        // packet proceeds to the address list unfiltered.
        if let Some(filter) = &self.filter {
            if !filter.test(position, neuron_id) {
                trace!("{}: filtered by connectivity bitfield", spike);
                self.stats.record_filtered_packet();
                return None;
            }
        }

        let first = self.get_next_address();
        if first.is_none() {
            // The entry exists but its slice held nothing usable.
            trace!("{}: ghost entry", spike);
            self.stats.record_ghost_search();
        }
        first
    }

    /// Produce the next transfer of the in-flight spike, skipping
    /// placeholder slots; `None` once the slice is exhausted.
    ///
    /// Must be preceded by a `get_first_address` call for the spike
    /// being drained; that precondition is the driver's to uphold and
    /// is only checked in debug builds.
    pub fn get_next_address(&mut self) -> Option<TransferDescriptor> {
        debug_assert!(
            self.primed,
            "get_next_address called before any get_first_address"
        );
        while self.cursor.remaining > 0 {
            let record = self.address_list.address_at(self.cursor.next_slot);
            self.cursor.next_slot += 1;
            self.cursor.remaining -= 1;
            if record.is_invalid() {
                continue;
            }
            return Some(self.descriptor_for(record));
        }
        None
    }

    /// Re-decode the table and address list from the retained blob,
    /// without reallocating (sizes are invariant within a run).
    /// Statistics counters are process-lifetime and survive this.
    pub fn reset(&mut self) {
        let entry_words = self.table.len() * ENTRY_WORDS;
        self.table.reload(&self.blob[BLOB_HEADER_WORDS..]);
        self.address_list
            .reload(&self.blob[BLOB_HEADER_WORDS + entry_words..]);
        self.cursor = ResolutionCursor::default();
        self.primed = false;
    }

    /// Number of master-table entries.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// The key of the entry at `index`, for diagnostics.
    pub fn key_at(&self, index: usize) -> u32 {
        self.table.key_at(index)
    }

    /// The mask of the entry at `index`, for diagnostics.
    pub fn mask_at(&self, index: usize) -> u32 {
        self.table.mask_at(index)
    }

    /// Table hits whose slice produced no usable address.
    pub fn ghost_search_count(&self) -> u32 {
        self.stats.ghost_searches()
    }

    /// Spikes that matched no table entry at all.
    pub fn invalid_hit_count(&self) -> u32 {
        self.stats.invalid_hits()
    }

    /// Packets rejected by the connectivity bitfield.
    pub fn filtered_packet_count(&self) -> u32 {
        self.stats.filtered_packets()
    }

    fn descriptor_for(&self, record: AddressEntry) -> TransferDescriptor {
        let neuron_id = self.cursor.neuron_id.0;
        if record.is_single() {
            // Direct row: one pre-resolved word, no DMA. The zero
            // transfer size is the signal the driver branches on.
            TransferDescriptor {
                spike: self.cursor.spike,
                row_address: self.direct_base + record.address() + neuron_id * WORD_BYTES,
                transfer_bytes: 0,
            }
        } else {
            let stride = record.row_length() + SYNAPSE_ROW_HEADER_WORDS;
            let block_address =
                self.indirect_base + (record.address() << INDIRECT_ADDRESS_SHIFT);
            let row_address = block_address + neuron_id * stride * WORD_BYTES;
            trace!(
                "neuron_id = {}, block_address = 0x{:08x}, row_length = {}, \
                 row_address = 0x{:08x}, n_bytes = {}",
                neuron_id,
                block_address,
                record.row_length(),
                row_address,
                stride * WORD_BYTES
            );
            TransferDescriptor {
                spike: self.cursor.spike,
                row_address,
                transfer_bytes: stride * WORD_BYTES,
            }
        }
    }

    /// Log the whole table at trace level, for debugging.
    fn trace_contents(&self) {
        if !tracing::enabled!(tracing::Level::TRACE) {
            return;
        }
        for i in 0..self.table.len() {
            let entry = self.table.entry_at(i);
            trace!("key: 0x{:08x}, mask: 0x{:08x}", entry.key, entry.mask);
            let slice = self.address_list.slice_of(&entry);
            if let Some(extra) = slice.extra_info() {
                trace!(
                    "    core_mask: 0x{:04x}, core_shift: {}, n_neurons: {}",
                    extra.core_mask(),
                    extra.mask_shift(),
                    extra.n_neurons_per_core()
                );
            }
            for (j, record) in slice.records().enumerate() {
                let index = slice.first() + j;
                if record.is_invalid() {
                    trace!("    index {}: INVALID", index);
                } else if record.is_single() {
                    trace!("    index {}: offset: {}, single", index, record.address());
                } else {
                    trace!(
                        "    index {}: offset: {}, row_length: {}",
                        index,
                        record.address() << INDIRECT_ADDRESS_SHIFT,
                        record.row_length()
                    );
                }
            }
        }
        trace!("population table has {} entries", self.table.len());
    }
}

/// Source neuron id for an entry without extra info.
#[inline(always)]
fn plain_neuron_id(entry: &PopulationTableEntry, spike: Spike) -> NeuronId {
    NeuronId(spike.0 & !entry.mask)
}

/// Source neuron id for a multi-core entry: the id local to the source
/// core plus the total neurons on the cores preceding it.
#[inline(always)]
fn extended_neuron_id(entry: &PopulationTableEntry, extra: ExtraInfo, spike: Spike) -> NeuronId {
    let local = spike.0 & !(entry.mask | (extra.core_mask() << extra.mask_shift()));
    NeuronId(local + extra.core_sum(spike))
}
