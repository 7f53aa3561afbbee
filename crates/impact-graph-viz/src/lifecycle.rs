//! Render lifecycle: owns construction and destruction of the live engine
//! instance bound to the display surface.
//!
//! Any change to the snapshot generation or the layout algorithm tears the
//! current engine down completely and constructs a replacement within the
//! same frame update — a full rebuild, never incremental diffing — so at
//! most one engine is ever bound to the surface. Release is unconditional
//! on every exit path; `Drop` backs the guarantee.

use std::collections::{HashMap, HashSet};

use egui_graphs::Graph;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use thiserror::Error;

use impact_graph_core::GraphSnapshot;

use crate::layout::{configure, EngineConfig, GraphScale, LayoutAlgorithm};

/// Upper zoom bound, shared by both graph views.
pub const MAX_ZOOM: f32 = 2.5;

/// Errors raised while constructing an engine instance. Kept distinct from
/// fetch errors so the UI can tell a bad snapshot from a failed call.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// Two nodes in the snapshot share an id.
    #[error("duplicate node id in snapshot: {0}")]
    DuplicateNodeId(String),
    /// Two edges in the snapshot share an id.
    #[error("duplicate edge id in snapshot: {0}")]
    DuplicateEdgeId(String),
}

/// Lifecycle phases of the engine bound to one display surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecyclePhase {
    /// No engine yet; waiting for a surface and a snapshot.
    #[default]
    Uninitialized,
    /// Construction in progress (transient within one update).
    Rendering,
    /// A live engine is bound to the surface.
    Ready,
    /// The owning view was torn down; the lifecycle is finished.
    Destroyed,
}

/// Viewport state normalized after construction: zoom clamped into the
/// fixed range and reset to 1.0, with a one-shot centering fit queued.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Current zoom factor.
    pub zoom: f32,
    /// Lower zoom bound for this scale.
    pub min_zoom: f32,
    /// Upper zoom bound.
    pub max_zoom: f32,
}

impl Viewport {
    fn new(scale: GraphScale) -> Self {
        let mut viewport = Self {
            zoom: 1.0,
            min_zoom: scale.min_zoom(),
            max_zoom: MAX_ZOOM,
        };
        viewport.set_zoom(1.0);
        viewport
    }

    /// Set the zoom factor, clamped into the fixed range.
    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
    }
}

/// The single live rendering/interaction object bound to the surface.
///
/// Wraps the egui_graphs structure built from one snapshot, plus the layout
/// configuration and viewport state the render path consumes each frame.
pub struct GraphEngine {
    graph: Graph<(), ()>,
    index_of: HashMap<String, NodeIndex>,
    snapshot: GraphSnapshot,
    config: EngineConfig,
    viewport: Viewport,
    pending_fit: bool,
}

impl GraphEngine {
    /// Construct an engine from a snapshot.
    ///
    /// Dangling edges are dropped silently; duplicated ids violate the
    /// snapshot invariants and fail construction.
    pub fn build(
        snapshot: &GraphSnapshot,
        algorithm: LayoutAlgorithm,
        scale: GraphScale,
    ) -> Result<Self, EngineError> {
        let mut backing = StableDiGraph::<(), ()>::new();
        let mut index_of: HashMap<String, NodeIndex> = HashMap::new();

        for node in &snapshot.nodes {
            if index_of.contains_key(&node.id) {
                return Err(EngineError::DuplicateNodeId(node.id.clone()));
            }
            let idx = backing.add_node(());
            index_of.insert(node.id.clone(), idx);
        }

        let mut edge_ids = HashSet::new();
        for edge in &snapshot.edges {
            if !edge_ids.insert(edge.id.as_str()) {
                return Err(EngineError::DuplicateEdgeId(edge.id.clone()));
            }
            if let (Some(&source), Some(&target)) =
                (index_of.get(&edge.source), index_of.get(&edge.target))
            {
                backing.add_edge(source, target, ());
            }
        }

        let mut graph = Graph::from(&backing);

        for node in &snapshot.nodes {
            if let Some(g_node) = graph.node_mut(index_of[&node.id]) {
                g_node.set_label(node.label.clone());
            }
        }

        let node_count = snapshot.node_count();
        let mut engine = Self {
            graph,
            index_of,
            snapshot: snapshot.clone(),
            config: configure(algorithm, snapshot, scale),
            viewport: Viewport::new(scale),
            pending_fit: node_count > 0,
        };
        engine.seed_positions();
        Ok(engine)
    }

    /// Apply seed positions from the current config, or a randomized spread
    /// for the force variants.
    fn seed_positions(&mut self) {
        match &self.config.seeds {
            Some(seeds) => {
                for (id, &idx) in &self.index_of {
                    if let Some(&pos) = seeds.get(id) {
                        if let Some(node) = self.graph.node_mut(idx) {
                            node.set_location(pos);
                        }
                    }
                }
            }
            None => {
                let spread = 200.0;
                for &idx in self.index_of.values() {
                    if let Some(node) = self.graph.node_mut(idx) {
                        let x = (rand_simple() - 0.5) * spread * 2.0;
                        let y = (rand_simple() - 0.5) * spread * 2.0;
                        node.set_location(egui::Pos2::new(x, y));
                    }
                }
            }
        }
    }

    /// Recompute the configuration for the current snapshot and apply it in
    /// place: positions only, the element set is untouched.
    pub fn relayout(&mut self, algorithm: LayoutAlgorithm) {
        self.config = configure(algorithm, &self.snapshot, self.config.scale);
        self.seed_positions();
        self.request_fit();
    }

    /// Queue a one-shot viewport reframe; no-op on an empty snapshot.
    pub fn request_fit(&mut self) {
        if !self.snapshot.is_empty() {
            self.pending_fit = true;
        }
    }

    /// Consume the queued fit request, if any.
    pub fn take_pending_fit(&mut self) -> bool {
        std::mem::take(&mut self.pending_fit)
    }

    /// Mirror the widget's zoom factor into the viewport and return the
    /// clamped value; the render path writes it back each frame.
    pub fn clamp_zoom(&mut self, zoom: f32) -> f32 {
        self.viewport.set_zoom(zoom);
        self.viewport.zoom
    }

    /// The active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Viewport state.
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// The snapshot this engine was built from.
    pub fn snapshot(&self) -> &GraphSnapshot {
        &self.snapshot
    }

    /// Mutable access for the `GraphView` widget.
    pub fn graph_mut(&mut self) -> &mut Graph<(), ()> {
        &mut self.graph
    }

    /// Number of rendered nodes.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of rendered edges (dangling edges were dropped).
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}

/// Xorshift over one thread-local stream, no external entropy source.
/// Every engine built on the thread draws from the same sequence, so
/// successive rebuilds get different spreads rather than repeating the
/// first one.
fn rand_simple() -> f32 {
    use std::cell::Cell;
    thread_local! {
        static STATE: Cell<u64> = const { Cell::new(0x4d59_5df4_d0f3_3173) };
    }
    STATE.with(|state| {
        let mut x = state.get();
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        state.set(x);
        (x as f32) / (u64::MAX as f32)
    })
}

/// Scoped owner of the engine instance for one display surface.
#[derive(Default)]
pub struct RenderLifecycle {
    phase: LifecyclePhase,
    engine: Option<GraphEngine>,
    bound_generation: Option<u64>,
    bound_algorithm: Option<LayoutAlgorithm>,
    last_error: Option<EngineError>,
}

impl RenderLifecycle {
    /// A lifecycle with no engine, waiting for inputs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current phase.
    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    /// The live engine, if `Ready`.
    pub fn engine(&self) -> Option<&GraphEngine> {
        self.engine.as_ref()
    }

    /// Mutable access to the live engine.
    pub fn engine_mut(&mut self) -> Option<&mut GraphEngine> {
        self.engine.as_mut()
    }

    /// The most recent construction failure, until inputs change.
    pub fn last_error(&self) -> Option<&EngineError> {
        self.last_error.as_ref()
    }

    /// Drive the state machine from the frame update.
    ///
    /// Constructs the engine once a surface and a snapshot both exist, and
    /// rebuilds whenever the snapshot generation or the algorithm changed.
    /// Teardown and reconstruction happen synchronously inside this call.
    pub fn sync(
        &mut self,
        surface_ready: bool,
        snapshot: Option<&GraphSnapshot>,
        generation: u64,
        algorithm: LayoutAlgorithm,
        scale: GraphScale,
    ) {
        if self.phase == LifecyclePhase::Destroyed {
            return;
        }
        let Some(snapshot) = snapshot else {
            return;
        };
        if !surface_ready {
            return;
        }

        let bound = self.bound_generation == Some(generation)
            && self.bound_algorithm == Some(algorithm);
        if bound {
            return;
        }

        // Release the previous instance completely before constructing the
        // replacement; listeners, timers and simulation state go with it.
        self.engine = None;
        self.phase = LifecyclePhase::Rendering;
        tracing::debug!(generation, ?algorithm, "constructing graph engine");

        self.bound_generation = Some(generation);
        self.bound_algorithm = Some(algorithm);
        match GraphEngine::build(snapshot, algorithm, scale) {
            Ok(engine) => {
                self.engine = Some(engine);
                self.last_error = None;
                self.phase = LifecyclePhase::Ready;
            }
            Err(err) => {
                tracing::warn!(error = %err, "engine construction failed");
                self.last_error = Some(err);
                self.phase = LifecyclePhase::Uninitialized;
            }
        }
    }

    /// Apply a layout to the live engine in place, without a rebuild.
    pub fn relayout(&mut self, algorithm: LayoutAlgorithm) {
        if let Some(engine) = self.engine.as_mut() {
            engine.relayout(algorithm);
            self.bound_algorithm = Some(algorithm);
        }
    }

    /// Discard the engine and all bindings; the lifecycle starts over.
    /// Used when the active repository context changes.
    pub fn reset(&mut self) {
        tracing::debug!("resetting render lifecycle");
        self.engine = None;
        self.bound_generation = None;
        self.bound_algorithm = None;
        self.last_error = None;
        self.phase = LifecyclePhase::Uninitialized;
    }

    /// Final teardown on view destruction.
    pub fn teardown(&mut self) {
        self.engine = None;
        self.phase = LifecyclePhase::Destroyed;
    }
}

impl Drop for RenderLifecycle {
    fn drop(&mut self) {
        self.teardown();
    }
}
