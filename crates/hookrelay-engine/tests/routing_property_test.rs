//! Property tests for routing plan construction.

use hookrelay_core::models::Destination;
use hookrelay_engine::routing;
use proptest::prelude::*;

fn arb_destination() -> impl Strategy<Value = Destination> {
    ("[a-z]{3,12}", any::<bool>(), 0u32..20).prop_map(|(host, enabled, order)| {
        let mut destination = Destination::new(format!("https://{host}.example.com/hooks"), order);
        destination.enabled = enabled;
        destination
    })
}

proptest! {
    #[test]
    fn plan_contains_exactly_the_enabled_destinations(
        destinations in prop::collection::vec(arb_destination(), 0..40),
    ) {
        let plan = routing::routable(&destinations);

        prop_assert!(plan.iter().all(|d| d.enabled));
        let enabled = destinations.iter().filter(|d| d.enabled).count();
        prop_assert_eq!(plan.len(), enabled);
    }

    #[test]
    fn plan_is_sorted_ascending_by_order(
        destinations in prop::collection::vec(arb_destination(), 0..40),
    ) {
        let plan = routing::routable(&destinations);
        prop_assert!(plan.windows(2).all(|pair| pair[0].order <= pair[1].order));
    }

    #[test]
    fn order_ties_preserve_list_position(
        destinations in prop::collection::vec(arb_destination(), 0..40),
    ) {
        let plan = routing::routable(&destinations);

        let position = |d: &Destination| {
            destinations.iter().position(|candidate| candidate.id == d.id)
        };
        for pair in plan.windows(2) {
            if pair[0].order == pair[1].order {
                prop_assert!(position(&pair[0]) < position(&pair[1]));
            }
        }
    }

    #[test]
    fn input_snapshot_is_never_mutated(
        destinations in prop::collection::vec(arb_destination(), 0..40),
    ) {
        let before = destinations.clone();
        let _ = routing::routable(&destinations);
        prop_assert_eq!(destinations, before);
    }
}
