// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log-oriented rendering of byte counts, durations, and timestamps.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Render a byte count for the request log.
///
/// Below 100000 bytes the count is exact (`2B`); below 10000·1024 it
/// is scaled to kB; above that, MB. Scaled forms carry two decimals.
pub fn format_byte_count(bytes: u64) -> String {
    if bytes < 100_000 {
        format!("{bytes}B")
    } else if bytes < 10_000 * 1024 {
        format!("{:.2}kB", bytes as f64 / 1024.0)
    } else {
        format!("{:.2}MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

/// Render a duration for the request log: millisecond granularity
/// below one second (`42ms`), three-decimal seconds above (`1.234s`).
pub fn format_duration(d: Duration) -> String {
    if d < Duration::from_secs(1) {
        format!("{}ms", d.as_millis())
    } else {
        format!("{:.3}s", d.as_secs_f64())
    }
}

/// Render a UTC timestamp as `YYYYMMDD-HH:MM:SS.ffff`.
pub fn format_utc_timestamp(at: DateTime<Utc>) -> String {
    let frac = at.timestamp_subsec_micros() / 100;
    format!("{}.{:04}", at.format("%Y%m%d-%H:%M:%S"), frac)
}

#[cfg(test)]
#[path = "format_tests.rs"]
mod tests;
