//! Imperative actions against the currently live engine instance.

use crate::api::GraphClient;
use crate::layout::LayoutAlgorithm;
use crate::lifecycle::RenderLifecycle;

/// Bundles the lifecycle and the fetch adapter of one graph view for the
/// duration of a frame, so button handlers have one place to act on.
pub struct InteractionController<'a> {
    lifecycle: &'a mut RenderLifecycle,
    client: &'a mut GraphClient,
}

impl<'a> InteractionController<'a> {
    /// Borrow the view's lifecycle and client for this frame.
    pub fn new(lifecycle: &'a mut RenderLifecycle, client: &'a mut GraphClient) -> Self {
        Self { lifecycle, client }
    }

    /// Reframe the viewport to the bounding box of all current elements.
    /// No-op when no engine is live or the snapshot is empty.
    pub fn fit(&mut self) {
        if let Some(engine) = self.lifecycle.engine_mut() {
            engine.request_fit();
        }
    }

    /// Apply a layout to the live engine in place, reusing the current
    /// snapshot: positions are recomputed, the element set stays untouched.
    /// Cheaper than the full rebuild a snapshot replacement triggers.
    pub fn relayout(&mut self, algorithm: LayoutAlgorithm) {
        self.lifecycle.relayout(algorithm);
    }

    /// Re-issue the data fetch for the current query. Returns whether a
    /// request was dispatched, so the caller can raise the loading flag.
    /// On success the settled snapshot replaces the current one and the
    /// lifecycle rebuilds.
    pub fn refresh(&mut self) -> bool {
        if self.client.query().is_some() {
            self.client.refresh();
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::GraphScale;
    use crate::lifecycle::LifecyclePhase;
    use impact_graph_core::{GraphSnapshot, RawGraphResponse};
    use serde_json::json;

    fn sample_snapshot() -> GraphSnapshot {
        let raw: RawGraphResponse = serde_json::from_value(json!({
            "nodes": ["a", "b"],
            "edges": [{"source": "a", "target": "b"}]
        }))
        .expect("valid raw json");
        GraphSnapshot::from_raw(raw)
    }

    #[test]
    fn test_fit_without_live_engine_does_not_panic() {
        let mut lifecycle = RenderLifecycle::new();
        let mut client = GraphClient::new();
        let mut controller = InteractionController::new(&mut lifecycle, &mut client);
        controller.fit();
        assert_eq!(lifecycle.phase(), LifecyclePhase::Uninitialized);
    }

    #[test]
    fn test_fit_on_zero_node_snapshot_is_a_noop() {
        let mut lifecycle = RenderLifecycle::new();
        let empty = GraphSnapshot::empty();
        lifecycle.sync(
            true,
            Some(&empty),
            0,
            LayoutAlgorithm::SpiderWeb,
            GraphScale::Neighborhood,
        );
        let mut client = GraphClient::new();
        let mut controller = InteractionController::new(&mut lifecycle, &mut client);
        controller.fit();

        let engine = lifecycle.engine_mut().expect("engine");
        assert!(!engine.take_pending_fit());
    }

    #[test]
    fn test_relayout_keeps_element_set_and_phase() {
        let mut lifecycle = RenderLifecycle::new();
        let snapshot = sample_snapshot();
        lifecycle.sync(
            true,
            Some(&snapshot),
            0,
            LayoutAlgorithm::SpiderWeb,
            GraphScale::Neighborhood,
        );

        let mut client = GraphClient::new();
        let mut controller = InteractionController::new(&mut lifecycle, &mut client);
        controller.relayout(LayoutAlgorithm::Concentric);

        assert_eq!(lifecycle.phase(), LifecyclePhase::Ready);
        let engine = lifecycle.engine().expect("engine");
        assert_eq!(engine.config().algorithm, LayoutAlgorithm::Concentric);
        assert_eq!(engine.node_count(), 2);
        assert_eq!(engine.edge_count(), 1);
    }

    #[test]
    fn test_refresh_requires_a_current_query() {
        let mut lifecycle = RenderLifecycle::new();
        let mut client = GraphClient::new();

        let mut controller = InteractionController::new(&mut lifecycle, &mut client);
        assert!(!controller.refresh());

        client.load_neighborhood("main.py");
        let _ = client.poll();
        let mut controller = InteractionController::new(&mut lifecycle, &mut client);
        assert!(controller.refresh());
    }
}
