//! Pauses between browser actions.
//!
//! They only lower the chance of being flagged as automated traffic; output
//! does not depend on them. Tests use [`NoDelay`].

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

/// Inclusive range of seconds to pause for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PauseRange {
    pub min_secs: f64,
    pub max_secs: f64,
}

impl PauseRange {
    pub const fn new(min_secs: f64, max_secs: f64) -> Self {
        Self { min_secs, max_secs }
    }

    pub const fn fixed(secs: f64) -> Self {
        Self::new(secs, secs)
    }
}

/// Before opening a thread.
pub const BEFORE_LOAD: PauseRange = PauseRange::new(0.5, 2.0);
/// After scrolling a control into view, before clicking it.
pub const BEFORE_CLICK: PauseRange = PauseRange::new(0.5, 2.0);
/// After a click, while replies load.
pub const AFTER_CLICK: PauseRange = PauseRange::new(1.0, 2.0);
/// After the comment tree appears.
pub const SETTLE: PauseRange = PauseRange::fixed(1.0);
/// Between relevant threads.
pub const BETWEEN_THREADS: PauseRange = PauseRange::new(1.0, 2.0);

#[async_trait]
pub trait DelayStrategy: Send + Sync {
    async fn pause(&self, range: PauseRange);
}

/// Sleeps a uniformly random duration within the range.
pub struct RandomDelay;

impl RandomDelay {
    fn pick(range: PauseRange) -> Duration {
        if range.max_secs <= range.min_secs {
            return Duration::from_secs_f64(range.min_secs.max(0.0));
        }
        let secs = rand::rng().random_range(range.min_secs..=range.max_secs);
        Duration::from_secs_f64(secs.max(0.0))
    }
}

#[async_trait]
impl DelayStrategy for RandomDelay {
    async fn pause(&self, range: PauseRange) {
        tokio::time::sleep(Self::pick(range)).await;
    }
}

pub struct NoDelay;

#[async_trait]
impl DelayStrategy for NoDelay {
    async fn pause(&self, _range: PauseRange) {}
}
