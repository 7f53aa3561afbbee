//! Layout configuration: pure mapping from (algorithm, snapshot, scale) to
//! an engine-ready configuration.
//!
//! Each algorithm carries a fixed numeric profile tuned for two scales:
//! small neighborhood graphs and large whole-repository graphs. The force
//! variants hand their profile to the running simulation; the deterministic
//! variants (concentric, hierarchy) compute explicit seed positions here so
//! repeated invocations on identical input yield identical arrangements.

use egui::Pos2;
use impact_graph_core::GraphSnapshot;
use std::collections::HashMap;

use crate::api::GraphQuery;

/// Fixed start angle for the concentric arrangement (pointing straight down,
/// matching the service UI convention).
pub const CONCENTRIC_START_ANGLE: f32 = 3.0 * std::f32::consts::PI / 2.0;

const CONCENTRIC_SPACING_FACTOR: f32 = 1.75;
const HIERARCHY_LAYER_GAP: f32 = 120.0;
const HIERARCHY_COLUMN_GAP: f32 = 90.0;

/// Which of the two tuning scales a snapshot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphScale {
    /// Small graph centered on one node.
    Neighborhood,
    /// Large whole-repository structural graph.
    RepoTree,
}

impl GraphScale {
    /// Derive the scale from the query that produced the snapshot.
    pub fn for_query(query: &GraphQuery) -> Self {
        match query {
            GraphQuery::Neighborhood(_) => GraphScale::Neighborhood,
            GraphQuery::RepoTree(_) => GraphScale::RepoTree,
        }
    }

    /// Lower zoom bound for the viewport at this scale.
    pub fn min_zoom(self) -> f32 {
        match self {
            GraphScale::Neighborhood => 0.2,
            GraphScale::RepoTree => 0.1,
        }
    }
}

/// Runtime-selectable layout algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutAlgorithm {
    /// Physics-simulation spread: fast convergence, moderate repulsion.
    #[default]
    SpiderWeb,
    /// Constraint-based force layout with explicit overlap avoidance.
    Force,
    /// Radial arrangement with a fixed start angle, clockwise.
    Concentric,
    /// Layered by BFS depth from the snapshot root.
    Hierarchy,
    /// Generic force-directed fallback.
    Organic,
}

impl LayoutAlgorithm {
    /// Display label for the selector buttons.
    pub fn label(self) -> &'static str {
        match self {
            LayoutAlgorithm::SpiderWeb => "Spider Web",
            LayoutAlgorithm::Force => "Force",
            LayoutAlgorithm::Concentric => "Circle",
            LayoutAlgorithm::Hierarchy => "Tree",
            LayoutAlgorithm::Organic => "Organic",
        }
    }

    /// Selector choices offered on the neighborhood view.
    pub fn neighborhood_choices() -> &'static [LayoutAlgorithm] {
        &[
            LayoutAlgorithm::SpiderWeb,
            LayoutAlgorithm::Force,
            LayoutAlgorithm::Concentric,
            LayoutAlgorithm::Organic,
        ]
    }

    /// Selector choices offered on the repo-tree view.
    pub fn repo_tree_choices() -> &'static [LayoutAlgorithm] {
        &[
            LayoutAlgorithm::SpiderWeb,
            LayoutAlgorithm::Force,
            LayoutAlgorithm::Hierarchy,
        ]
    }
}

/// Fixed numeric parameter profile handed to the simulation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationProfile {
    /// Simulation iteration budget.
    pub iterations: u32,
    /// Node repulsion strength.
    pub node_repulsion: f32,
    /// Ideal edge length.
    pub ideal_edge_length: f32,
    /// Minimum spacing between nodes (constraint-based variant).
    pub node_spacing: f32,
    /// Simulation time budget in milliseconds (constraint-based variant).
    pub max_simulation_ms: u32,
    /// Whether overlapping nodes are pushed apart explicitly.
    pub avoid_overlap: bool,
    /// Viewport fit padding in points.
    pub fit_padding: f32,
    /// Whether the simulation animates; deterministic variants seed final
    /// positions and leave this off.
    pub animate: bool,
}

/// Engine-ready configuration: the profile plus, for the deterministic
/// variants, explicit seed positions per node id.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// The algorithm this configuration realizes.
    pub algorithm: LayoutAlgorithm,
    /// Tuning scale the profile was chosen for.
    pub scale: GraphScale,
    /// Fixed numeric parameters.
    pub profile: SimulationProfile,
    /// Seed positions keyed by node id; `None` for the force variants,
    /// which randomize their spread instead.
    pub seeds: Option<HashMap<String, Pos2>>,
}

/// Build the engine configuration for a snapshot.
///
/// Pure: the same inputs always produce the same configuration. Switching
/// the algorithm reuses the existing snapshot; no refetch happens here.
pub fn configure(
    algorithm: LayoutAlgorithm,
    snapshot: &GraphSnapshot,
    scale: GraphScale,
) -> EngineConfig {
    let profile = profile_for(algorithm, scale);
    let seeds = match algorithm {
        LayoutAlgorithm::Concentric => Some(concentric_seeds(snapshot)),
        LayoutAlgorithm::Hierarchy => Some(hierarchy_seeds(snapshot)),
        _ => None,
    };

    EngineConfig {
        algorithm,
        scale,
        profile,
        seeds,
    }
}

fn profile_for(algorithm: LayoutAlgorithm, scale: GraphScale) -> SimulationProfile {
    let neighborhood = scale == GraphScale::Neighborhood;
    match algorithm {
        LayoutAlgorithm::SpiderWeb => SimulationProfile {
            iterations: if neighborhood { 2500 } else { 3000 },
            node_repulsion: if neighborhood { 4500.0 } else { 8000.0 },
            ideal_edge_length: if neighborhood { 100.0 } else { 120.0 },
            node_spacing: 0.0,
            max_simulation_ms: 0,
            avoid_overlap: false,
            fit_padding: if neighborhood { 50.0 } else { 40.0 },
            animate: true,
        },
        LayoutAlgorithm::Force => SimulationProfile {
            iterations: 0,
            node_repulsion: 0.0,
            ideal_edge_length: 0.0,
            node_spacing: if neighborhood { 80.0 } else { 100.0 },
            max_simulation_ms: if neighborhood { 4000 } else { 6000 },
            avoid_overlap: true,
            fit_padding: if neighborhood { 30.0 } else { 40.0 },
            animate: true,
        },
        LayoutAlgorithm::Concentric => SimulationProfile {
            iterations: 0,
            node_repulsion: 0.0,
            ideal_edge_length: 0.0,
            node_spacing: 0.0,
            max_simulation_ms: 0,
            avoid_overlap: true,
            fit_padding: 30.0,
            animate: false,
        },
        LayoutAlgorithm::Hierarchy => SimulationProfile {
            iterations: 0,
            node_repulsion: 0.0,
            ideal_edge_length: 0.0,
            node_spacing: 0.0,
            max_simulation_ms: 0,
            avoid_overlap: false,
            fit_padding: 40.0,
            animate: false,
        },
        LayoutAlgorithm::Organic => SimulationProfile {
            iterations: 1000,
            node_repulsion: 400_000.0,
            ideal_edge_length: 80.0,
            node_spacing: 0.0,
            max_simulation_ms: 0,
            avoid_overlap: false,
            fit_padding: if neighborhood { 30.0 } else { 40.0 },
            animate: true,
        },
    }
}

/// Place nodes on a circle, clockwise from the fixed start angle, ordered by
/// their position in the snapshot.
fn concentric_seeds(snapshot: &GraphSnapshot) -> HashMap<String, Pos2> {
    let n = snapshot.node_count();
    if n == 0 {
        return HashMap::new();
    }

    let radius = 40.0 * CONCENTRIC_SPACING_FACTOR * (n as f32).sqrt();
    let step = std::f32::consts::TAU / n as f32;

    snapshot
        .nodes
        .iter()
        .enumerate()
        .map(|(i, node)| {
            // Negative step: clockwise in screen coordinates.
            let angle = CONCENTRIC_START_ANGLE - step * i as f32;
            let pos = Pos2::new(radius * angle.cos(), -radius * angle.sin());
            (node.id.clone(), pos)
        })
        .collect()
}

/// Layer nodes by BFS depth from the snapshot root.
///
/// Without a root every node lands in layer zero in snapshot order — the
/// arrangement is arbitrary but stable, and never an error. Nodes
/// unreachable from the root collect in one layer below the deepest.
fn hierarchy_seeds(snapshot: &GraphSnapshot) -> HashMap<String, Pos2> {
    use std::collections::VecDeque;

    let order: HashMap<&str, usize> = snapshot
        .nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id.as_str(), i))
        .collect();

    let mut depth: HashMap<&str, usize> = HashMap::new();

    if let Some(root) = snapshot.root.as_deref().filter(|r| order.contains_key(r)) {
        let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
        for edge in &snapshot.edges {
            adjacency
                .entry(edge.source.as_str())
                .or_default()
                .push(edge.target.as_str());
        }

        let mut queue = VecDeque::from([root]);
        depth.insert(root, 0);
        while let Some(current) = queue.pop_front() {
            let next = depth[current] + 1;
            if let Some(children) = adjacency.get(current) {
                for &child in children {
                    if order.contains_key(child) && !depth.contains_key(child) {
                        depth.insert(child, next);
                        queue.push_back(child);
                    }
                }
            }
        }

        let deepest = depth.values().copied().max().unwrap_or(0);
        for node in &snapshot.nodes {
            depth.entry(node.id.as_str()).or_insert(deepest + 1);
        }
    } else {
        for node in &snapshot.nodes {
            depth.insert(node.id.as_str(), 0);
        }
    }

    // Column assignment within each layer follows snapshot order, so the
    // result is stable across invocations.
    let mut layers: HashMap<usize, Vec<&str>> = HashMap::new();
    for node in &snapshot.nodes {
        layers.entry(depth[node.id.as_str()]).or_default().push(node.id.as_str());
    }

    let mut seeds = HashMap::new();
    for (layer, ids) in layers {
        let width = (ids.len().saturating_sub(1)) as f32 * HIERARCHY_COLUMN_GAP;
        for (column, id) in ids.into_iter().enumerate() {
            let x = column as f32 * HIERARCHY_COLUMN_GAP - width / 2.0;
            let y = layer as f32 * HIERARCHY_LAYER_GAP;
            seeds.insert(id.to_string(), Pos2::new(x, y));
        }
    }
    seeds
}
