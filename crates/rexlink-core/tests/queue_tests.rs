//! Write queue ordering, chunking and busy-retry behaviour


use std::sync::{Arc, Mutex};
use std::time::Duration;

use rexlink_core::{LinkError, QueueConfig, WriteQueue};
use test_utils::{test_queue_config, FakeChannel, Scripted};
use tokio::time::{timeout, Instant};

// ----------------------------------------------------------------------------
// Ordering
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_completions_follow_enqueue_order_without_overlap() {
    let channel = FakeChannel::with_delay(true, Duration::from_millis(3));
    let queue = Arc::new(WriteQueue::new(channel.clone(), test_queue_config()).unwrap());
    let completed = Arc::new(Mutex::new(Vec::new()));

    let mut handles = Vec::new();
    for i in 0..12 {
        let pending = queue.enqueue(format!("message number {i} with some padding"));
        let completed = completed.clone();
        handles.push(tokio::spawn(async move {
            pending.await.unwrap();
            completed.lock().unwrap().push(i);
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(*completed.lock().unwrap(), (0..12).collect::<Vec<_>>());
    assert_eq!(channel.overlaps(), 0);

    let expected: Vec<String> = (0..12)
        .map(|i| format!("message number {i} with some padding"))
        .collect();
    assert_eq!(channel.lines(), expected);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submitters_never_overlap_writes() {
    let channel = FakeChannel::with_delay(true, Duration::from_millis(1));
    let queue = Arc::new(WriteQueue::new(channel.clone(), QueueConfig::default()).unwrap());

    let mut handles = Vec::new();
    for task in 0..4 {
        let queue = queue.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..5 {
                queue
                    .enqueue(format!("task {task} line {i} padded past one chunk"))
                    .await
                    .unwrap();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(channel.overlaps(), 0);
    let lines = channel.lines();
    assert_eq!(lines.len(), 20);
    // each submitter's own lines stay in order and are never interleaved
    for task in 0..4 {
        let prefix = format!("task {task} ");
        let own: Vec<&String> = lines.iter().filter(|l| l.starts_with(&prefix)).collect();
        for (i, line) in own.iter().enumerate() {
            assert_eq!(**line, format!("task {task} line {i} padded past one chunk"));
        }
    }
}

// ----------------------------------------------------------------------------
// Chunking
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_chunk_count_and_reassembly() {
    for (len, max) in [(1usize, 18usize), (17, 18), (18, 18), (50, 18), (50, 7), (90, 20)] {
        let channel = FakeChannel::new(true);
        let config = QueueConfig::default().with_max_chunk_size(max);
        let queue = WriteQueue::new(channel.clone(), config).unwrap();

        let message: Vec<u8> = (0..len).map(|i| b'a' + (i % 26) as u8).collect();
        let report = queue.enqueue(message.clone()).await.unwrap();

        let line_len = len + 1;
        let expected_chunks = line_len.div_ceil(max);
        let writes = channel.writes();
        assert_eq!(writes.len(), expected_chunks, "len {len} max {max}");
        assert_eq!(report.chunks, expected_chunks);
        assert!(writes.iter().all(|w| !w.is_empty() && w.len() <= max));

        let mut expected = message;
        expected.push(b'\n');
        assert_eq!(writes.concat(), expected);
    }
}

#[tokio::test]
async fn test_terminated_message_is_not_extended() {
    let channel = FakeChannel::new(true);
    let queue = WriteQueue::new(channel.clone(), QueueConfig::default()).unwrap();

    let report = queue.enqueue(b"ping\n".to_vec()).await.unwrap();
    assert_eq!(report.bytes, 5);
    assert_eq!(channel.writes().concat(), b"ping\n".to_vec());
}

#[tokio::test(start_paused = true)]
async fn test_chunks_are_paced() {
    let channel = FakeChannel::new(true);
    let config = QueueConfig::default().with_chunk_delay(Duration::from_millis(10));
    let queue = WriteQueue::new(channel.clone(), config).unwrap();

    let started = Instant::now();
    let report = queue.enqueue(vec![b'x'; 53]).await.unwrap();
    assert_eq!(report.chunks, 3);
    assert!(started.elapsed() >= Duration::from_millis(20));
}

// ----------------------------------------------------------------------------
// Busy Retry
// ----------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_single_busy_is_retried_once() {
    let channel = FakeChannel::new(true);
    let queue = WriteQueue::new(channel.clone(), test_queue_config()).unwrap();
    channel.script(&[Scripted::Busy]);

    let started = Instant::now();
    let report = queue.enqueue(b"short".to_vec()).await.unwrap();

    assert_eq!(report.retries, 1);
    assert_eq!(channel.attempts(), 2);
    assert_eq!(channel.writes().concat(), b"short\n".to_vec());
    assert!(started.elapsed() >= Duration::from_millis(30));
}

#[tokio::test(start_paused = true)]
async fn test_second_busy_fails_message_without_third_attempt() {
    let channel = FakeChannel::new(true);
    let queue = WriteQueue::new(channel.clone(), test_queue_config()).unwrap();
    channel.script(&[Scripted::Busy, Scripted::Busy]);

    let result = queue.enqueue(vec![b'y'; 40]).await;
    assert!(matches!(result, Err(LinkError::TransientBusy)));
    assert_eq!(channel.attempts(), 2);
    assert!(channel.writes().is_empty());

    // the next message is unaffected
    let report = queue.enqueue(b"after".to_vec()).await.unwrap();
    assert_eq!(report.retries, 0);
    assert_eq!(channel.lines(), vec!["after".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_busy_mid_message_abandons_remaining_chunks() {
    let channel = FakeChannel::new(true);
    let queue = WriteQueue::new(channel.clone(), test_queue_config()).unwrap();

    // first chunk goes through, second chunk is busy twice
    channel.script(&[Scripted::Pass, Scripted::Busy, Scripted::Busy]);
    let result = queue.enqueue(vec![b'z'; 40]).await;

    assert!(matches!(result, Err(LinkError::TransientBusy)));
    assert_eq!(channel.attempts(), 3);
    assert_eq!(channel.writes().len(), 1);
}

#[tokio::test]
async fn test_hard_failure_is_not_retried() {
    let channel = FakeChannel::new(true);
    let queue = WriteQueue::new(channel.clone(), test_queue_config()).unwrap();
    channel.script(&[Scripted::Fail]);

    let result = queue.enqueue(vec![b'q'; 30]).await;
    assert!(matches!(result, Err(LinkError::WriteFailed(_))));
    assert_eq!(channel.attempts(), 1);
}

// ----------------------------------------------------------------------------
// Connectivity
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_disconnected_channel_fails_fast() {
    let channel = FakeChannel::new(true);
    let queue = WriteQueue::new(channel.clone(), test_queue_config()).unwrap();
    channel.set_connected(false);

    let result = timeout(Duration::from_secs(1), queue.enqueue(b"x".to_vec()))
        .await
        .expect("send must not hang");
    assert!(matches!(result, Err(LinkError::NotConnected)));
    assert_eq!(channel.attempts(), 0);
}
