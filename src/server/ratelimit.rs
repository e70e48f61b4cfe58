//! Sliding window rate limiting, applied per client IP on connect and per
//! session on every command.

use crate::server::options::RateLimit;

use std::collections::{HashMap, VecDeque};
use std::net::IpAddr;
use std::time::Instant;
use tokio::sync::Mutex;

/// Counts events inside a moving window. Not thread safe by itself; owners
/// embed it behind their own lock.
#[derive(Debug)]
pub struct SlidingWindow {
    limit: RateLimit,
    hits: VecDeque<Instant>,
}

impl SlidingWindow {
    pub fn new(limit: RateLimit) -> Self {
        SlidingWindow {
            limit,
            hits: VecDeque::with_capacity(limit.max as usize),
        }
    }

    /// Records an event and tells whether the limit still holds.
    pub fn record(&mut self) -> bool {
        self.record_at(Instant::now())
    }

    fn record_at(&mut self, now: Instant) -> bool {
        while let Some(first) = self.hits.front() {
            if now.duration_since(*first) >= self.limit.window {
                self.hits.pop_front();
            } else {
                break;
            }
        }
        self.hits.push_back(now);
        self.hits.len() <= self.limit.max as usize
    }

    fn is_idle(&self, now: Instant) -> bool {
        match self.hits.back() {
            Some(last) => now.duration_since(*last) >= self.limit.window,
            None => true,
        }
    }
}

/// Limits the rate of incoming control connections, keyed by client IP.
#[derive(Debug)]
pub struct ConnectionLimiter {
    limit: RateLimit,
    windows: Mutex<HashMap<IpAddr, SlidingWindow>>,
}

impl ConnectionLimiter {
    pub fn new(limit: RateLimit) -> Self {
        ConnectionLimiter {
            limit,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Records a connect from `ip` and tells whether it is still within the
    /// limit. Windows that went idle are swept on the way.
    pub async fn check(&self, ip: IpAddr) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        windows.retain(|_, w| !w.is_idle(now));
        windows.entry(ip).or_insert_with(|| SlidingWindow::new(self.limit)).record_at(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn allows_up_to_max_within_window() {
        let mut w = SlidingWindow::new(RateLimit::new(3, Duration::from_secs(60)));
        assert!(w.record());
        assert!(w.record());
        assert!(w.record());
        assert!(!w.record());
    }

    #[test]
    fn window_expiry_frees_budget() {
        let mut w = SlidingWindow::new(RateLimit::new(2, Duration::from_millis(100)));
        let start = Instant::now();
        assert!(w.record_at(start));
        assert!(w.record_at(start));
        assert!(!w.record_at(start + Duration::from_millis(50)));
        // the two oldest hits have aged out by now
        assert!(w.record_at(start + Duration::from_millis(200)));
    }

    #[tokio::test]
    async fn limiter_is_keyed_by_ip() {
        let limiter = ConnectionLimiter::new(RateLimit::new(1, Duration::from_secs(60)));
        let a: IpAddr = "10.0.0.1".parse().unwrap();
        let b: IpAddr = "10.0.0.2".parse().unwrap();
        assert!(limiter.check(a).await);
        assert!(!limiter.check(a).await);
        assert!(limiter.check(b).await);
    }
}
