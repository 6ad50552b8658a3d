//! Probabilistic, per-destination throttled ad injection

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::debug;

use crate::config::AdConfig;
use crate::roster::RosterCache;
use crate::types::{Destination, Timestamp};

/// Appends a promotional line to some replies
///
/// A reply is considered with `probability`; a considered reply only gets an ad
/// if the destination's last ad is older than `window` (or there was none).
pub struct AdPolicy {
    probability: f64,
    window: Duration,
    separator: String,
    pool: Vec<String>,
    rng: Mutex<StdRng>,
}

impl AdPolicy {
    pub fn new(config: &AdConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            probability: config.probability,
            window: config.window(),
            separator: config.separator.clone(),
            pool: config.weighted_pool(),
            rng: Mutex::new(rng),
        }
    }

    /// Weighted pool the ad line is drawn from
    pub fn pool(&self) -> &[String] {
        &self.pool
    }

    /// Return `reply`, possibly with an ad line appended
    pub fn apply(
        &self,
        reply: String,
        destination: &Destination,
        roster: &RosterCache,
        now: Timestamp,
    ) -> String {
        if reply.trim().is_empty() || self.pool.is_empty() {
            return reply;
        }

        let considered = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            rng.gen::<f64>() < self.probability
        };
        if !considered {
            return reply;
        }

        if !roster.try_claim_ad_slot(destination.id, destination.kind, now, self.window) {
            debug!(destination = %destination.id, "Ad window still closed");
            return reply;
        }

        let line = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            self.pool.choose(&mut *rng).cloned()
        };
        match line {
            Some(line) => {
                debug!(destination = %destination.id, "Injecting ad");
                format!("{}{}{}", reply, self.separator, line)
            }
            None => reply,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DestinationKind;

    fn always() -> AdConfig {
        AdConfig {
            probability: 1.0,
            pool: vec!["ad-a".to_string()],
            self_promotion: "ad-self".to_string(),
            ..AdConfig::default()
        }
    }

    fn roster_with(destination: &Destination) -> RosterCache {
        let roster = RosterCache::new();
        roster.replace(destination.kind, vec![destination.clone()]);
        roster
    }

    #[test]
    fn test_never_considered_at_zero_probability() {
        let config = AdConfig {
            probability: 0.0,
            ..always()
        };
        let policy = AdPolicy::new(&config, Some(1));
        let destination = Destination::group(1, "g");
        let roster = roster_with(&destination);

        for i in 0..100 {
            let reply = policy.apply("hi".to_string(), &destination, &roster, Timestamp::new(i));
            assert_eq!(reply, "hi");
        }
        assert!(roster.ad_stamp(destination.id, DestinationKind::Group).is_zero());
    }

    #[test]
    fn test_at_most_one_ad_per_window() {
        let policy = AdPolicy::new(&always(), Some(3));
        let destination = Destination::group(1, "g");
        let roster = roster_with(&destination);
        let window = Duration::from_secs(30 * 60);

        let mut injected = Vec::new();
        let minute = Duration::from_secs(60);
        let mut now = Timestamp::new(1);
        for _ in 0..180 {
            let reply = policy.apply("hi".to_string(), &destination, &roster, now);
            if reply != "hi" {
                injected.push(now);
            }
            now = now.saturating_add(minute);
        }

        assert!(injected.len() >= 2);
        for pair in injected.windows(2) {
            assert!(pair[1].duration_since(pair[0]) > window);
        }
    }

    #[test]
    fn test_throttle_is_per_destination() {
        let policy = AdPolicy::new(&always(), Some(5));
        let first = Destination::group(1, "first");
        let second = Destination::group(2, "second");
        let roster = RosterCache::new();
        roster.replace(DestinationKind::Group, vec![first.clone(), second.clone()]);

        let now = Timestamp::new(10);
        assert_ne!(policy.apply("a".to_string(), &first, &roster, now), "a");
        assert_ne!(policy.apply("b".to_string(), &second, &roster, now), "b");
        assert_eq!(policy.apply("c".to_string(), &first, &roster, now), "c");
    }

    #[test]
    fn test_injected_line_comes_from_pool() {
        let policy = AdPolicy::new(&always(), Some(9));
        let destination = Destination::discuss(4, "d");
        let roster = roster_with(&destination);

        let reply = policy.apply("answer".to_string(), &destination, &roster, Timestamp::new(1));
        let (body, line) = reply.split_once("\n\n").expect("ad separator");
        assert_eq!(body, "answer");
        assert!(policy.pool().iter().any(|ad| ad == line));
        assert_eq!(policy.pool().len(), 4);
    }
}
