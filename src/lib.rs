// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Master Population Table & Spike-to-Address Resolution
//!
//! Firmware core that maps one incoming spike key to every synaptic
//! matrix region it must be applied to, under a hard real-time deadline
//! shared with thousands of spikes per millisecond:
//! - **Codec**: explicit shift/mask decode of the packed load format
//! - **Table**: key-sorted lookup structure with masked binary search
//! - **Address list**: packed row locations and multi-core metadata
//! - **Filter**: optional per-entry connectivity bitfields that
//!   short-circuit provably-empty DMA transfers
//! - **Resolver**: the resumable one-descriptor-per-call protocol
//!   driven by the external DMA-completion loop
//!
//! The SDRAM allocator, the DMA engine, the spike-reception interrupt
//! path and the recording subsystem are external collaborators; this
//! crate only computes addresses and sizes.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod address_list;
pub mod builder;
pub mod codec;
pub mod error;
pub mod filter;
pub mod resolver;
pub mod stats;
pub mod table;
pub mod types;

// Re-export the working set
pub use address_list::{AddressList, EntrySlice};
pub use builder::TableBlobBuilder;
pub use codec::{
    AddressEntry, ExtraInfo, PopulationTableEntry, INVALID_ADDRESS, MAX_ROW_LENGTH, WORD_BYTES,
};
pub use error::{PopTableError, Result};
pub use filter::ConnectivityFilter;
pub use roaring::RoaringBitmap;
pub use resolver::{SpikeResolver, SYNAPSE_ROW_HEADER_WORDS};
pub use stats::ResolutionStats;
pub use table::PopulationTable;
pub use types::{NeuronId, Spike, TransferDescriptor};
