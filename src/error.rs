// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error types for population table loading
//!
//! Load failures are fatal for the caller: simulation setup must abort.
//! Misses, ghost searches and filtered packets are not errors; they are
//! tracked by [`crate::stats::ResolutionStats`].

use std::collections::TryReserveError;

#[derive(Debug, Clone, thiserror::Error)]
pub enum PopTableError {
    #[error("table blob is truncated: need {needed} words, have {available}")]
    TruncatedBlob { needed: usize, available: usize },

    #[error("could not allocate {region}: {source}")]
    AllocationFailed {
        region: &'static str,
        source: TryReserveError,
    },
}

pub type Result<T> = core::result::Result<T, PopTableError>;
