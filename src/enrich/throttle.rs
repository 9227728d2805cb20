use std::sync::Mutex;
use std::time::{Duration, Instant};

use rand::Rng;

/// Spaces consecutive calls to one service by a random gap.
///
/// Shared across worker threads; a caller holds the lock while sleeping so
/// the next caller measures its gap from this call, not from the previous one.
#[derive(Debug)]
pub struct Throttle {
    last_call: Mutex<Option<Instant>>,
    min_gap: Duration,
    max_gap: Duration,
}

impl Throttle {
    pub fn new(min_gap: Duration, max_gap: Duration) -> Self {
        Self {
            last_call: Mutex::new(None),
            min_gap,
            max_gap: max_gap.max(min_gap),
        }
    }

    /// 0.5 to 1.5 seconds between calls.
    pub fn polite() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_millis(1500))
    }

    /// Block until this caller may hit the service.
    pub fn wait(&self) {
        let mut last = match self.last_call.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(prev) = *last {
            let gap = self.pick_gap();
            let elapsed = prev.elapsed();
            if elapsed < gap {
                std::thread::sleep(gap - elapsed);
            }
        }
        *last = Some(Instant::now());
    }

    fn pick_gap(&self) -> Duration {
        if self.max_gap == self.min_gap {
            return self.min_gap;
        }
        let ms = rand::rng()
            .random_range(self.min_gap.as_millis() as u64..=self.max_gap.as_millis() as u64);
        Duration::from_millis(ms)
    }
}
