// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;
use yare::parameterized;

#[parameterized(
    zero = { 0, "0B" },
    tiny = { 2, "2B" },
    just_below_b_limit = { 99_999, "99999B" },
    at_b_limit = { 100_000, "97.66kB" },
    mid_kb = { 1_048_576, "1024.00kB" },
    just_below_mb_limit = { 10_239_999, "10000.00kB" },
    at_mb_limit = { 10_240_000, "9.77MB" },
    big = { 1_073_741_824, "1024.00MB" },
)]
fn byte_counts(bytes: u64, want: &str) {
    assert_eq!(format_byte_count(bytes), want);
}

#[parameterized(
    zero = { 0, "0ms" },
    sub_second = { 42, "42ms" },
    one_second = { 1000, "1.000s" },
    longer = { 12_345, "12.345s" },
)]
fn durations(ms: u64, want: &str) {
    assert_eq!(format_duration(Duration::from_millis(ms)), want);
}

#[test]
fn utc_timestamp_format() {
    let at = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap()
        + chrono::Duration::microseconds(123_456);
    assert_eq!(format_utc_timestamp(at), "20260304-05:06:07.1234");
}

#[test]
fn utc_timestamp_pads_fraction() {
    let at = Utc.with_ymd_and_hms(2026, 12, 31, 23, 59, 59).unwrap();
    assert_eq!(format_utc_timestamp(at), "20261231-23:59:59.0000");
}
