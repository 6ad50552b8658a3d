//! Property tests for the pending-delivery bound and router precedence

use echorelay_core::{Classification, PendingDeliveries, RelayConfig, Router};
use proptest::prelude::*;

proptest! {
    #[test]
    fn pending_set_never_exceeds_capacity(destinations in 1usize..20, extra in 1usize..40) {
        let capacity = 5 * destinations;
        let pending = PendingDeliveries::new();
        let total = capacity + extra;
        for i in 0..total {
            pending.insert(&format!("text-{}", i), capacity);
        }

        prop_assert_eq!(pending.len(), capacity);
        // The survivors are exactly the newest `capacity` texts, in order.
        let expected: Vec<String> = (extra..total).map(|i| format!("text-{}", i)).collect();
        prop_assert_eq!(pending.snapshot(), expected);
    }

    #[test]
    fn keyword_always_beats_mention(prefix in "[a-z]{0,8}", suffix in "[a-z]{0,8}") {
        let config = RelayConfig {
            keywords: vec!["价格".to_string()],
            ..RelayConfig::testing()
        };
        let router = Router::new(&config);
        let text = format!("{}小薇{}价格{}", prefix, suffix, prefix);

        prop_assert_eq!(
            router.classify(&text),
            Classification::KeywordHit("价格".to_string())
        );
    }

    #[test]
    fn ineligible_text_is_never_answered(text in "[a-z ]{0,30}") {
        let config = RelayConfig {
            keywords: vec!["rust".to_string()],
            ..RelayConfig::testing()
        };
        let router = Router::new(&config);
        // No bot name and no question marker: never eligible, even with a keyword.
        prop_assert_eq!(router.classify(&text), Classification::NoReply);
    }
}
