//! End-to-end flow through the view layer: raw service JSON in, rendered
//! engine state out, including overlapping-fetch resolution and rebuild
//! behavior across snapshot generations.

use std::sync::Once;

use impact_graph_core::{GraphSnapshot, RawGraphResponse};
use impact_graph_viz::api::{FetchError, GraphClient, GraphQuery};
use impact_graph_viz::layout::{GraphScale, LayoutAlgorithm};
use impact_graph_viz::lifecycle::{LifecyclePhase, RenderLifecycle};
use serde_json::json;

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .with_test_writer()
            .try_init();
    });
}

fn snapshot_from(value: serde_json::Value) -> GraphSnapshot {
    let raw: RawGraphResponse = serde_json::from_value(value).expect("valid raw json");
    GraphSnapshot::from_raw(raw)
}

fn neighborhood_of(center: &str, others: &[&str]) -> GraphSnapshot {
    let nodes: Vec<&str> = std::iter::once(center).chain(others.iter().copied()).collect();
    let edges: Vec<serde_json::Value> = others
        .iter()
        .map(|other| json!({"source": center, "target": other}))
        .collect();
    snapshot_from(json!({"nodes": nodes, "edges": edges, "root": center}))
}

/// Drives one graph view the way the frame loop does: poll the client,
/// adopt a settled snapshot, sync the lifecycle.
struct ViewHarness {
    client: GraphClient,
    lifecycle: RenderLifecycle,
    snapshot: Option<GraphSnapshot>,
    generation: u64,
    algorithm: LayoutAlgorithm,
}

impl ViewHarness {
    fn new() -> Self {
        Self {
            client: GraphClient::new(),
            lifecycle: RenderLifecycle::new(),
            snapshot: None,
            generation: 0,
            algorithm: LayoutAlgorithm::SpiderWeb,
        }
    }

    fn frame(&mut self) {
        if let Some(result) = self.client.poll() {
            if let Ok((GraphQuery::Neighborhood(_), snapshot)) = result {
                self.snapshot = Some(snapshot);
                self.generation += 1;
            }
        }
        self.lifecycle.sync(
            true,
            self.snapshot.as_ref(),
            self.generation,
            self.algorithm,
            GraphScale::Neighborhood,
        );
    }

    fn rendered_nodes(&self) -> Option<usize> {
        self.lifecycle.engine().map(|engine| engine.node_count())
    }
}

#[test]
fn test_snapshot_to_engine_flow() {
    init_tracing();
    let mut view = ViewHarness::new();

    view.client.load_neighborhood("main.py");
    let _ = view.client.poll();
    view.client.settle(Ok((
        GraphQuery::Neighborhood("main.py".to_string()),
        neighborhood_of("main.py", &["calculate_sum", "calculate_product"]),
    )));
    view.frame();

    assert_eq!(view.lifecycle.phase(), LifecyclePhase::Ready);
    assert_eq!(view.rendered_nodes(), Some(3));
    assert_eq!(view.generation, 1);
}

#[test]
fn test_last_settled_fetch_wins_in_the_view() {
    init_tracing();
    let mut view = ViewHarness::new();

    view.client.load_neighborhood("first.py");
    view.client.load_neighborhood("second.py");
    let _ = view.client.poll();

    // The second request resolves first, then the first one lands late.
    view.client.settle(Ok((
        GraphQuery::Neighborhood("second.py".to_string()),
        neighborhood_of("second.py", &["helper"]),
    )));
    view.frame();
    assert_eq!(view.rendered_nodes(), Some(2));

    view.client.settle(Ok((
        GraphQuery::Neighborhood("first.py".to_string()),
        neighborhood_of("first.py", &["a", "b", "c"]),
    )));
    view.frame();

    // The late arrival replaced the display; whichever settles last wins.
    assert_eq!(view.rendered_nodes(), Some(4));
    assert_eq!(view.generation, 2);
}

#[test]
fn test_generation_bump_forces_full_rebuild() {
    init_tracing();
    let mut view = ViewHarness::new();

    view.client.load_neighborhood("main.py");
    let _ = view.client.poll();
    view.client.settle(Ok((
        GraphQuery::Neighborhood("main.py".to_string()),
        neighborhood_of("main.py", &["calculate_sum"]),
    )));
    view.frame();
    assert_eq!(view.rendered_nodes(), Some(2));

    // Identical element ids in the replacement snapshot still rebuild.
    view.client.settle(Ok((
        GraphQuery::Neighborhood("main.py".to_string()),
        neighborhood_of("main.py", &["calculate_sum", "test_main.py"]),
    )));
    view.frame();

    assert_eq!(view.generation, 2);
    assert_eq!(view.rendered_nodes(), Some(3));
    assert_eq!(view.lifecycle.phase(), LifecyclePhase::Ready);
}

#[test]
fn test_algorithm_switch_rebuilds_without_refetch() {
    init_tracing();
    let mut view = ViewHarness::new();

    view.client.load_neighborhood("main.py");
    let _ = view.client.poll();
    view.client.settle(Ok((
        GraphQuery::Neighborhood("main.py".to_string()),
        neighborhood_of("main.py", &["calculate_sum", "calculate_product"]),
    )));
    view.frame();
    let generation_before = view.generation;

    view.algorithm = LayoutAlgorithm::Concentric;
    view.frame();

    assert_eq!(view.generation, generation_before);
    assert_eq!(view.rendered_nodes(), Some(3));
    assert_eq!(
        view.lifecycle.engine().expect("engine").config().algorithm,
        LayoutAlgorithm::Concentric
    );
}

#[test]
fn test_fetch_error_leaves_previous_display_intact() {
    init_tracing();
    let mut view = ViewHarness::new();

    view.client.load_neighborhood("main.py");
    let _ = view.client.poll();
    view.client.settle(Ok((
        GraphQuery::Neighborhood("main.py".to_string()),
        neighborhood_of("main.py", &["calculate_sum"]),
    )));
    view.frame();

    view.client.settle(Err(FetchError::Status {
        status: 500,
        body: "analysis backend unavailable".to_string(),
    }));
    view.frame();

    // The failed refresh never touches the snapshot or the engine.
    assert_eq!(view.lifecycle.phase(), LifecyclePhase::Ready);
    assert_eq!(view.rendered_nodes(), Some(2));
}

#[test]
fn test_teardown_mid_flight_drops_late_result() {
    init_tracing();
    let mut view = ViewHarness::new();

    view.client.load_neighborhood("main.py");
    let _ = view.client.poll();
    view.lifecycle.teardown();

    view.client.settle(Ok((
        GraphQuery::Neighborhood("main.py".to_string()),
        neighborhood_of("main.py", &["calculate_sum"]),
    )));
    view.frame();

    // Destroyed is terminal; the settled snapshot never becomes an engine.
    assert_eq!(view.lifecycle.phase(), LifecyclePhase::Destroyed);
    assert!(view.rendered_nodes().is_none());
}
