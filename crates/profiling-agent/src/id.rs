// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Correlation identifier generation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use sha1::{Digest, Sha1};

/// Exclusive upper bound of the random component.
const RANDOM_COMPONENT_BOUND: u32 = 1_000_000_000;

/// Produces process-unique correlation identifiers.
///
/// Each identifier is the lowercase hex SHA-1 of `<unix seconds><random><counter>`.
/// The counter keeps identifiers generated within the same second apart; it is
/// advanced with `fetch_add`, so concurrent callers never observe the same value.
#[derive(Debug, Default)]
pub struct IdGenerator {
    next_id: AtomicU64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generates a fresh 40-character identifier.
    pub fn generate(&self) -> String {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let random = rand::thread_rng().gen_range(0..RANDOM_COMPONENT_BOUND);

        sha1_hex(&format!("{}{}{}", unix_seconds(), random, id))
    }

    /// Number of identifiers generated so far.
    pub fn issued(&self) -> u64 {
        self.next_id.load(Ordering::Relaxed)
    }
}

/// Seconds since the Unix epoch, 0 if the clock is set before it.
pub(crate) fn unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}

fn sha1_hex(input: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}
