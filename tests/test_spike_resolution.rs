// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! End-to-end spike resolution through the public interface: build a
//! blob the way the host tool-chain does, load it, and drive the
//! resolver the way the DMA-completion loop does.

use feagi_npu_pop_table::{
    AddressEntry, ConnectivityFilter, ExtraInfo, RoaringBitmap, Spike, SpikeResolver,
    TableBlobBuilder, TransferDescriptor, SYNAPSE_ROW_HEADER_WORDS, WORD_BYTES,
};

const INDIRECT_BASE: u32 = 0x6040_0000;
const DIRECT_BASE: u32 = 0x6080_0000;

/// Drain one spike the way the driver does: first address on receipt,
/// next address on each simulated DMA completion.
fn drain(resolver: &mut SpikeResolver, spike: Spike) -> Vec<TransferDescriptor> {
    let mut transfers = Vec::new();
    let mut next = resolver.get_first_address(spike);
    while let Some(descriptor) = next {
        transfers.push(descriptor);
        next = resolver.get_next_address();
    }
    transfers
}

#[test]
fn one_live_row_and_one_placeholder() {
    let mut builder = TableBlobBuilder::new();
    builder.add_entry(
        0x4,
        0xFFFF_FFFC,
        None,
        &[AddressEntry::new(10, 4, false), AddressEntry::invalid()],
    );
    let mut resolver = SpikeResolver::new(&builder.build(), INDIRECT_BASE, DIRECT_BASE).unwrap();

    let transfers = drain(&mut resolver, Spike(0x6));
    assert_eq!(transfers.len(), 1);

    // neuron id = 0x6 & !0xFFFFFFFC = 2
    let stride = 4 + SYNAPSE_ROW_HEADER_WORDS;
    assert_eq!(transfers[0].transfer_bytes, stride * WORD_BYTES);
    assert_eq!(
        transfers[0].row_address,
        INDIRECT_BASE + (10 << 4) + 2 * stride * WORD_BYTES
    );
    assert_eq!(resolver.ghost_search_count(), 0);
    assert_eq!(resolver.invalid_hit_count(), 0);
}

#[test]
fn multi_population_table_with_mixed_rows() {
    let extra = ExtraInfo::new(0x3, 12, 200);
    let mut builder = TableBlobBuilder::new();
    builder
        // Undelayed projection: two rows, one placeholder between them.
        .add_entry(
            0x1000,
            0xFFFF_FF00,
            None,
            &[
                AddressEntry::new(0x20, 16, false),
                AddressEntry::invalid(),
                AddressEntry::new(0x90, 2, false),
            ],
        )
        // Direct single-word synapses.
        .add_entry(0x2000, 0xFFFF_FF00, None, &[AddressEntry::new(0x400, 1, true)])
        // Shared key from four source cores.
        .add_entry(
            0x8000,
            0xFFFF_C000,
            Some(extra),
            &[AddressEntry::new(0x100, 8, false)],
        );
    let mut resolver = SpikeResolver::new(&builder.build(), INDIRECT_BASE, DIRECT_BASE).unwrap();
    assert_eq!(resolver.len(), 3);

    // Table introspection sees the sorted keys.
    assert_eq!(resolver.key_at(0), 0x1000);
    assert_eq!(resolver.key_at(1), 0x2000);
    assert_eq!(resolver.key_at(2), 0x8000);
    assert_eq!(resolver.mask_at(0), 0xFFFF_FF00);

    // Spike into the two-row entry: both rows come out, the
    // placeholder does not.
    let transfers = drain(&mut resolver, Spike(0x1003));
    assert_eq!(transfers.len(), 2);
    let stride_a = 16 + SYNAPSE_ROW_HEADER_WORDS;
    let stride_b = 2 + SYNAPSE_ROW_HEADER_WORDS;
    assert_eq!(
        transfers[0].row_address,
        INDIRECT_BASE + (0x20 << 4) + 3 * stride_a * WORD_BYTES
    );
    assert_eq!(
        transfers[1].row_address,
        INDIRECT_BASE + (0x90 << 4) + 3 * stride_b * WORD_BYTES
    );
    assert!(transfers.iter().all(|t| t.spike == Spike(0x1003)));

    // Spike into the single-word entry: no DMA, direct address.
    let transfers = drain(&mut resolver, Spike(0x2007));
    assert_eq!(transfers.len(), 1);
    assert!(transfers[0].is_single_word());
    assert_eq!(
        transfers[0].row_address,
        DIRECT_BASE + 0x400 + 7 * WORD_BYTES
    );

    // Spike from core 1 of the shared-key entry: global neuron id is
    // local id plus one core's worth of neurons.
    let transfers = drain(&mut resolver, Spike(0x9005)); // core bits 12-13 = 1, local 5
    assert_eq!(transfers.len(), 1);
    let stride_c = 8 + SYNAPSE_ROW_HEADER_WORDS;
    assert_eq!(
        transfers[0].row_address,
        INDIRECT_BASE + (0x100 << 4) + (200 + 5) * stride_c * WORD_BYTES
    );

    // An unknown sender is counted, not an error.
    assert!(drain(&mut resolver, Spike(0x4000)).is_empty());
    assert_eq!(resolver.invalid_hit_count(), 1);
}

#[test]
fn connectivity_filter_governs_admission() {
    let mut builder = TableBlobBuilder::new();
    builder
        .add_entry(0x10, 0xFFFF_FFF0, None, &[AddressEntry::new(1, 4, false)])
        .add_entry(0x20, 0xFFFF_FFF0, None, &[AddressEntry::new(2, 4, false)]);
    let mut resolver = SpikeResolver::new(&builder.build(), INDIRECT_BASE, DIRECT_BASE).unwrap();

    // First entry: only neuron 3 has targets. Second entry: no bitmap
    // (DTCM ran out when it was built), so everything passes.
    let mut bits = RoaringBitmap::new();
    bits.insert(3);
    resolver.set_connectivity_filter(Some(ConnectivityFilter::new(vec![Some(bits), None])));

    assert!(drain(&mut resolver, Spike(0x15)).is_empty());
    assert_eq!(resolver.filtered_packet_count(), 1);

    assert_eq!(drain(&mut resolver, Spike(0x13)).len(), 1);
    assert_eq!(drain(&mut resolver, Spike(0x25)).len(), 1);
    assert_eq!(resolver.filtered_packet_count(), 1);
}

#[test]
fn reset_preserves_resolution_and_counters() {
    let mut builder = TableBlobBuilder::new();
    builder.add_entry(0x4, 0xFFFF_FFFC, None, &[AddressEntry::new(10, 4, false)]);
    let mut resolver = SpikeResolver::new(&builder.build(), INDIRECT_BASE, DIRECT_BASE).unwrap();

    let before = drain(&mut resolver, Spike(0x6));
    drain(&mut resolver, Spike(0x100)); // miss, bumps the counter
    assert_eq!(resolver.invalid_hit_count(), 1);

    resolver.reset();
    let after = drain(&mut resolver, Spike(0x6));
    assert_eq!(before, after);
    // Counters are process-lifetime; reset does not clear them.
    assert_eq!(resolver.invalid_hit_count(), 1);
}
