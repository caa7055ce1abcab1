//! Client-side fixed-window rate limiter for outbound collaborator requests.
//!
//! Proactively paces requests to stay within provider rate limits instead of
//! relying on 429 backpressure. The window is coarse: the first admitted
//! request opens a 60-second window, subsequent requests count against it,
//! and callers over the limit suspend until the window elapses. Bursts at
//! window boundaries are accepted.

use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Default)]
struct WindowState {
    started: Option<Instant>,
    count: u32,
}

/// A fixed-window requests-per-interval limiter. A limit of 0 means
/// unlimited: callers are never suspended.
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    state: Mutex<WindowState>,
}

impl RateLimiter {
    /// Create a limiter admitting `limit` requests per minute.
    pub fn per_minute(limit: u32) -> Self {
        Self::with_window(limit, Duration::from_secs(60))
    }

    /// Create a limiter with an explicit window length.
    pub fn with_window(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            state: Mutex::new(WindowState::default()),
        }
    }

    /// Whether this limiter ever suspends callers.
    pub fn is_unlimited(&self) -> bool {
        self.limit == 0
    }

    /// Wait until the caller may issue one more outbound request.
    ///
    /// Returns immediately when unlimited or while the current window has
    /// admissions left; otherwise sleeps until the window elapses and
    /// admits into the fresh window.
    pub async fn acquire(&self) {
        if self.limit == 0 {
            return;
        }
        loop {
            let wait = {
                let mut state = self.state.lock().await;
                self.admit(&mut state, Instant::now())
            };
            match wait {
                None => return,
                Some(delay) => {
                    debug!(delay_ms = delay.as_millis() as u64, "rate limit reached, pacing request");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// The admit decision: `None` admits the request and updates the window,
    /// `Some(delay)` tells the caller how long until the window elapses.
    fn admit(&self, state: &mut WindowState, now: Instant) -> Option<Duration> {
        match state.started {
            None => {
                state.started = Some(now);
                state.count = 1;
                None
            }
            Some(started) if now.duration_since(started) >= self.window => {
                state.started = Some(now);
                state.count = 1;
                None
            }
            Some(started) => {
                if state.count >= self.limit {
                    Some(self.window.saturating_sub(now.duration_since(started)))
                } else {
                    state.count += 1;
                    None
                }
            }
        }
    }
}
