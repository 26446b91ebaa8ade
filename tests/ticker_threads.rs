//! Worker-thread accounting for tickers.
//!
//! Kept in its own test binary: it counts the threads of the whole process,
//! which the parallel tests in other files would disturb.

#![cfg(target_os = "linux")]

use std::time::Duration;

use orrery::utils::Ticker;

fn thread_count() -> usize {
    std::fs::read_dir("/proc/self/task")
        .map(|entries| entries.count())
        .unwrap_or(0)
}

#[test]
fn close_joins_every_worker_thread() {
    let before = thread_count();
    assert!(before > 0, "/proc/self/task not readable");

    let tickers: Vec<Ticker> = (0..8)
        .map(|i| Ticker::new(format!("count-{i}"), Duration::from_millis(2), |_| {}).unwrap())
        .collect();
    for (i, ticker) in tickers.iter().enumerate() {
        if i % 2 == 0 {
            ticker.start().unwrap();
        }
    }
    assert_eq!(thread_count(), before + 8);

    for ticker in &tickers {
        ticker.close().unwrap();
        // Start / stop after close must return, not hang.
        assert!(ticker.start().is_err());
        assert!(ticker.stop().is_err());
    }

    // `close` joined each worker, so the count is back immediately.
    assert_eq!(thread_count(), before);
}
