//! Randomized start delay for inbound units of work
//!
//! Both sessions see the same channel traffic; a random delay before handling an
//! event keeps their reactions apart and spreads bursts out.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::clock::Clock;
use crate::config::JitterConfig;

pub struct Jitter {
    min: Duration,
    max: Duration,
    rng: Mutex<StdRng>,
}

impl Jitter {
    pub fn new(config: &JitterConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            min: Duration::from_millis(config.min_ms),
            max: Duration::from_millis(config.max_ms.max(config.min_ms)),
            rng: Mutex::new(rng),
        }
    }

    /// Draw a delay within `[min, max]`
    pub fn next_delay(&self) -> Duration {
        if self.min == self.max {
            return self.min;
        }
        let millis = self
            .rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .gen_range(self.min.as_millis() as u64..=self.max.as_millis() as u64);
        Duration::from_millis(millis)
    }

    /// Sleep for a freshly drawn delay; zero-length delays return immediately
    pub async fn wait(&self, clock: &dyn Clock) -> Duration {
        let delay = self.next_delay();
        if !delay.is_zero() {
            clock.sleep(delay).await;
        }
        delay
    }
}
