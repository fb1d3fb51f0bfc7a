// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::bucket::{BucketConfig, DenyReason};
use std::time::{Duration, Instant};
use tokio::io::AsyncWriteExt;

fn byte_bucket(burst: f64, flow: f64) -> TokenBucket {
    TokenBucket::new(BucketConfig::new(burst, flow)).unwrap()
}

#[tokio::test]
async fn passes_bytes_through_within_burst() {
    let bucket = byte_bucket(1_024.0, 1_024.0);
    let mut stream = RateLimited::new(Vec::new(), bucket);

    stream.write_all(b"hello").await.unwrap();
    stream.flush().await.unwrap();

    assert_eq!(stream.get_ref(), b"hello");
    assert_eq!(stream.bytes_written(), 5);
}

#[tokio::test]
async fn long_write_is_paced_by_flow_rate() {
    // 1000-byte burst, 100_000 B/s flow: 3000 bytes needs at least
    // (3000 - 1000) / 100_000 = 20ms.
    let bucket = byte_bucket(1_000.0, 100_000.0);
    let mut stream = RateLimited::new(Vec::new(), bucket);
    let payload = vec![0xa5u8; 3_000];

    let started = Instant::now();
    stream.write_all(&payload).await.unwrap();
    let elapsed = started.elapsed();

    assert_eq!(stream.bytes_written(), 3_000);
    assert_eq!(stream.get_ref().len(), 3_000);
    assert!(
        elapsed >= Duration::from_millis(15),
        "3000 bytes should be paced, took {elapsed:?}"
    );
}

#[tokio::test]
async fn grant_denial_poisons_the_stream() {
    let mut config = BucketConfig::new(8.0, 0.001);
    config.initial_burst = Some(8.0);
    config.max_waiters = Some(0);
    let bucket = TokenBucket::new(config).unwrap();
    let mut stream = RateLimited::new(Vec::new(), bucket.clone());

    // First 8 bytes fit the burst.
    stream.write_all(&[1u8; 8]).await.unwrap();

    // The next write needs a waiter slot and there are none.
    let error = stream.write_all(&[2u8; 8]).await.unwrap_err();
    assert!(
        error.to_string().contains("rate-limit-too-many-waiters"),
        "unexpected error: {error}"
    );

    // Later writes fail with the same retained error; no bytes leak
    // to the inner stream.
    let error = stream.write_all(&[3u8; 4]).await.unwrap_err();
    assert!(error.to_string().contains("rate-limit-too-many-waiters"));
    assert_eq!(stream.get_ref().len(), 8);
    assert_eq!(stream.bytes_written(), 8);
}

#[tokio::test]
async fn deny_all_fails_pending_write() {
    let mut config = BucketConfig::new(1_000.0, 0.001);
    config.initial_burst = Some(0.0);
    let bucket = TokenBucket::new(config).unwrap();
    let mut stream = RateLimited::new(Vec::new(), bucket.clone());

    let writer = tokio::spawn(async move {
        let result = stream.write_all(b"blocked").await;
        (stream, result)
    });
    tokio::time::sleep(Duration::from_millis(20)).await;

    bucket.deny_all_requests(DenyReason::Shutdown);

    let (stream, result) = writer.await.unwrap();
    let error = result.unwrap_err();
    assert!(error.to_string().contains("rate-limit-shutdown"));
    assert_eq!(stream.bytes_written(), 0);
}

#[tokio::test]
async fn reads_are_not_metered() {
    use tokio::io::AsyncReadExt;

    let mut config = BucketConfig::new(1.0, 0.001);
    config.initial_burst = Some(0.0);
    let bucket = TokenBucket::new(config).unwrap();

    let data: &[u8] = b"unmetered read side";
    let mut stream = RateLimited::new(data, bucket);

    let mut out = Vec::new();
    stream.read_to_end(&mut out).await.unwrap();
    assert_eq!(out, b"unmetered read side");
}
