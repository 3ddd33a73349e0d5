//! Destination snapshot planning shared by both routing strategies.
//!
//! Before any strategy executes, the destination snapshot is filtered to
//! enabled entries and sorted ascending by order. The sort is stable, so
//! destinations sharing an order value keep their original list position:
//! under `All` both are attempted, under `First` the earlier one wins the
//! tie.

use hookrelay_core::models::Destination;

/// Returns the destinations that participate in routing, in attempt order.
///
/// Disabled destinations are dropped and never produce an outcome. The input
/// slice is left untouched; the caller's snapshot stays immutable.
pub fn routable(destinations: &[Destination]) -> Vec<Destination> {
    let mut snapshot: Vec<Destination> =
        destinations.iter().filter(|d| d.enabled).cloned().collect();
    snapshot.sort_by_key(|d| d.order);
    snapshot
}
