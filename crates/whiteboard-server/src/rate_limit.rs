//! Per-IP connection-attempt throttling (`SPEC_FULL.md`'s added Rate Limiter
//! row). Not part of `spec.md`'s core routing path — guards the accept loop
//! against one peer opening connections in a tight loop, the ambient
//! resource-hygiene concern `spec.md` §5 gestures at without fully
//! specifying.

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Instant;

use tokio::sync::Mutex;

/// Fixed-window limiter: `limit` accepted connection attempts per IP per
/// rolling one-second window.
pub struct RateLimiter {
    limit: u32,
    state: Mutex<HashMap<IpAddr, (u32, Instant)>>,
}

impl RateLimiter {
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            state: Mutex::new(HashMap::new()),
        }
    }

    /// Returns whether a new connection attempt from `ip` should be admitted.
    pub async fn check(&self, ip: IpAddr) -> bool {
        let now = Instant::now();
        let mut state = self.state.lock().await;
        let entry = state.entry(ip).or_insert((0, now));

        if now.duration_since(entry.1).as_secs() >= 1 {
            *entry = (1, now);
            return true;
        }

        if entry.0 < self.limit {
            entry.0 += 1;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn admits_up_to_the_limit_then_rejects() {
        let limiter = RateLimiter::new(2);
        let ip: IpAddr = "127.0.0.1".parse().unwrap();
        assert!(limiter.check(ip).await);
        assert!(limiter.check(ip).await);
        assert!(!limiter.check(ip).await);
    }

    #[tokio::test]
    async fn different_ips_have_independent_windows() {
        let limiter = RateLimiter::new(1);
        let a: IpAddr = "127.0.0.1".parse().unwrap();
        let b: IpAddr = "127.0.0.2".parse().unwrap();
        assert!(limiter.check(a).await);
        assert!(limiter.check(b).await);
    }
}
