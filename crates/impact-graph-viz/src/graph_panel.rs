//! Graph views: the neighborhood explorer and the full repository tree.
//!
//! Each view owns its own fetch client, lifecycle and layout selection. The
//! frame update polls the client first, so a settled fetch replaces the
//! snapshot (bumping the generation) before the lifecycle sync runs.

use egui::{RichText, Ui};
use egui_graphs::{
    FruchtermanReingoldWithCenterGravity, FruchtermanReingoldWithCenterGravityState, GraphView,
    LayoutForceDirected, MetadataFrame,
};

use impact_graph_core::GraphSnapshot;

use crate::api::{self, GraphClient, GraphQuery, TaskSlot};
use crate::app::AppState;
use crate::interaction::InteractionController;
use crate::layout::{GraphScale, LayoutAlgorithm, SimulationProfile};
use crate::lifecycle::{GraphEngine, LifecyclePhase, RenderLifecycle};
use crate::settings::{SettingsInteraction, SettingsNavigation, SettingsStyle};

type ForceLayout = LayoutForceDirected<FruchtermanReingoldWithCenterGravity>;
type ForceState = FruchtermanReingoldWithCenterGravityState;

/// Fallback quick picks when the node list has not loaded.
const SAMPLE_NODE_IDS: &[&str] = &["main.py", "calculate_sum", "calculate_product", "test_main.py"];

fn error_label(ui: &mut Ui, error: &str) {
    ui.label(
        RichText::new(error)
            .color(egui::Color32::from_rgb(255, 68, 102))
            .size(12.0),
    );
}

/// Map the fixed numeric profile onto the force-directed layout state the
/// widget persists in egui memory. Deterministic variants seed positions up
/// front and keep the simulation off.
fn apply_profile(ui: &mut Ui, profile: &SimulationProfile) {
    let mut state = egui_graphs::get_layout_state::<ForceState>(ui, None);
    state.base.is_running = profile.animate;
    if profile.node_repulsion > 0.0 {
        state.base.c_repulse = (profile.node_repulsion / 4500.0).clamp(0.2, 3.0);
    }
    if profile.ideal_edge_length > 0.0 {
        state.base.k_scale = (profile.ideal_edge_length / 100.0).clamp(0.2, 3.0);
    }
    egui_graphs::set_layout_state::<ForceState>(ui, state, None);
}

/// Render the graph widget for a live engine. A queued fit request turns
/// into one frame of fit-to-screen; zoom and pan are suspended for that
/// frame so the reframe is not fought.
fn draw_graph(
    ui: &mut Ui,
    engine: &mut GraphEngine,
    interaction: &SettingsInteraction,
    navigation: &SettingsNavigation,
    style: &SettingsStyle,
) {
    let fit_now = engine.take_pending_fit();
    let profile = engine.config().profile;
    apply_profile(ui, &profile);

    let settings_interaction = egui_graphs::SettingsInteraction::new()
        .with_dragging_enabled(interaction.dragging_enabled)
        .with_hover_enabled(interaction.hover_enabled)
        .with_node_clicking_enabled(interaction.node_clicking_enabled)
        .with_node_selection_enabled(interaction.node_selection_enabled);

    let settings_navigation = egui_graphs::SettingsNavigation::new()
        .with_fit_to_screen_enabled(fit_now)
        .with_zoom_and_pan_enabled(navigation.zoom_and_pan_enabled && !fit_now)
        .with_zoom_speed(navigation.zoom_speed)
        // Padding in points, expressed as the viewport fraction the widget expects.
        .with_fit_to_screen_padding(profile.fit_padding / 500.0);

    let settings_style = egui_graphs::SettingsStyle::new().with_labels_always(style.labels_always);

    ui.add(
        &mut GraphView::<_, _, _, _, _, _, ForceState, ForceLayout>::new(engine.graph_mut())
            .with_interactions(&settings_interaction)
            .with_navigations(&settings_navigation)
            .with_styles(&settings_style),
    );

    // Keep the widget's zoom inside the viewport bounds; egui_graphs itself
    // applies no limits to zoom-and-pan input.
    let mut meta = MetadataFrame::new(None).load(ui);
    let clamped = engine.clamp_zoom(meta.zoom);
    if clamped != meta.zoom {
        meta.zoom = clamped;
        meta.save(ui);
    }

    if profile.animate {
        ui.ctx().request_repaint();
    }
}

fn counts_label(ui: &mut Ui, engine: &GraphEngine) {
    ui.label(
        RichText::new(format!(
            "{} nodes, {} edges",
            engine.node_count(),
            engine.edge_count()
        ))
        .small()
        .color(egui::Color32::GRAY),
    );
}

// =============================================================================
// Neighborhood explorer
// =============================================================================

/// Neighborhood view: one node id at the center, its dependency context
/// around it.
pub struct GraphPanel {
    node_id: String,
    available_nodes: Vec<String>,
    node_list_task: TaskSlot<Vec<String>>,
    client: GraphClient,
    snapshot: Option<GraphSnapshot>,
    generation: u64,
    algorithm: LayoutAlgorithm,
    lifecycle: RenderLifecycle,
    settings_interaction: SettingsInteraction,
    settings_navigation: SettingsNavigation,
    settings_style: SettingsStyle,
    error: Option<String>,
    loaded_repo: Option<String>,
}

impl Default for GraphPanel {
    fn default() -> Self {
        Self {
            node_id: String::new(),
            available_nodes: Vec::new(),
            node_list_task: TaskSlot::new(),
            client: GraphClient::new(),
            snapshot: None,
            generation: 0,
            algorithm: LayoutAlgorithm::default(),
            lifecycle: RenderLifecycle::new(),
            settings_interaction: SettingsInteraction::default(),
            settings_navigation: SettingsNavigation::default(),
            settings_style: SettingsStyle::default(),
            error: None,
            loaded_repo: None,
        }
    }
}

impl GraphPanel {
    pub fn show(&mut self, ui: &mut Ui, state: &mut AppState) {
        self.sync_repo_context(state);
        self.poll_node_list(state);
        self.poll_client(state);

        ui.heading("Neighborhood Graph");
        ui.add_space(6.0);

        ui.horizontal(|ui| {
            ui.label("Node ID");
            ui.add(
                egui::TextEdit::singleline(&mut self.node_id)
                    .desired_width(260.0)
                    .hint_text("main.py"),
            );
            ui.add_enabled_ui(!state.loading, |ui| {
                if ui.button("Load Graph").clicked() && !self.node_id.trim().is_empty() {
                    self.error = None;
                    state.loading = true;
                    self.client.load_neighborhood(self.node_id.trim());
                }
            });
        });

        self.quick_picks(ui, state);

        if let Some(error) = &self.error {
            error_label(ui, error);
        }
        if let Some(err) = self.lifecycle.last_error() {
            error_label(ui, &err.to_string());
        }

        if self.snapshot.is_some() {
            self.toolbar(ui, state);
        }

        self.lifecycle.sync(
            true,
            self.snapshot.as_ref(),
            self.generation,
            self.algorithm,
            GraphScale::Neighborhood,
        );

        if self.lifecycle.phase() == LifecyclePhase::Ready {
            if let Some(engine) = self.lifecycle.engine_mut() {
                draw_graph(
                    ui,
                    engine,
                    &self.settings_interaction,
                    &self.settings_navigation,
                    &self.settings_style,
                );
            }
        } else if self.snapshot.is_none() && !state.loading {
            ui.add_space(12.0);
            ui.label(
                RichText::new("Load a node to explore its neighborhood.")
                    .color(egui::Color32::GRAY),
            );
        }
    }

    /// A repo-context change invalidates everything this view holds: the
    /// snapshot, the engine and the node list all belong to the old repo.
    fn sync_repo_context(&mut self, state: &mut AppState) {
        if state.repo_path == self.loaded_repo {
            return;
        }
        self.loaded_repo = state.repo_path.clone();
        self.snapshot = None;
        self.available_nodes.clear();
        // The old repo's node id must not block auto-selection in the new one.
        self.node_id.clear();
        self.error = None;
        self.lifecycle.reset();
        if let Some(path) = &self.loaded_repo {
            state.loading = true;
            api::spawn_node_list(&self.node_list_task, path.clone());
        }
    }

    fn poll_node_list(&mut self, state: &mut AppState) {
        let Some(result) = self.node_list_task.poll() else {
            return;
        };
        match result {
            Ok(nodes) => {
                let first = nodes.first().cloned();
                self.available_nodes = nodes;
                match first {
                    // Auto-select the first node so the view is never blank
                    // right after ingestion.
                    Some(id) if self.node_id.is_empty() => {
                        self.node_id = id.clone();
                        self.client.load_neighborhood(&id);
                    }
                    _ => state.loading = false,
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "node list fetch failed");
                state.loading = false;
            }
        }
    }

    fn poll_client(&mut self, state: &mut AppState) {
        match self.client.poll() {
            Some(Ok((GraphQuery::Neighborhood(_), snapshot))) => {
                self.snapshot = Some(snapshot);
                self.generation += 1;
                self.error = None;
                state.loading = false;
            }
            Some(Ok(_)) => {}
            Some(Err(err)) => {
                self.error = Some(err.to_string());
                state.loading = false;
            }
            None => {}
        }
    }

    fn quick_picks(&mut self, ui: &mut Ui, state: &mut AppState) {
        let picks: Vec<String> = if self.available_nodes.is_empty() {
            SAMPLE_NODE_IDS.iter().map(|s| s.to_string()).collect()
        } else {
            self.available_nodes.iter().take(8).cloned().collect()
        };
        ui.horizontal_wrapped(|ui| {
            ui.label(RichText::new("Quick picks:").small());
            for id in picks {
                if ui.small_button(&id).clicked() && !state.loading {
                    self.node_id = id.clone();
                    self.error = None;
                    state.loading = true;
                    self.client.load_neighborhood(&id);
                }
            }
        });
    }

    fn toolbar(&mut self, ui: &mut Ui, state: &mut AppState) {
        ui.separator();
        ui.horizontal(|ui| {
            ui.label("Layout");
            let mut selected = self.algorithm;
            for &choice in LayoutAlgorithm::neighborhood_choices() {
                ui.selectable_value(&mut selected, choice, choice.label());
            }
            // Algorithm change flows through the next sync as a full rebuild.
            self.algorithm = selected;

            ui.separator();
            let mut controller =
                InteractionController::new(&mut self.lifecycle, &mut self.client);
            if ui.button("Re-layout").clicked() {
                controller.relayout(selected);
            }
            if ui.button("Fit").clicked() {
                controller.fit();
            }
            if ui.button("Refresh").clicked() && controller.refresh() {
                state.loading = true;
            }

            if let Some(engine) = self.lifecycle.engine() {
                ui.separator();
                counts_label(ui, engine);
            }
        });
    }
}

// =============================================================================
// Full repository tree
// =============================================================================

/// Whole-repository view, auto-loaded from the active repo path.
pub struct FullGraphPanel {
    client: GraphClient,
    snapshot: Option<GraphSnapshot>,
    generation: u64,
    algorithm: LayoutAlgorithm,
    lifecycle: RenderLifecycle,
    settings_interaction: SettingsInteraction,
    settings_navigation: SettingsNavigation,
    settings_style: SettingsStyle,
    error: Option<String>,
    loaded_repo: Option<String>,
}

impl Default for FullGraphPanel {
    fn default() -> Self {
        Self {
            client: GraphClient::new(),
            snapshot: None,
            generation: 0,
            algorithm: LayoutAlgorithm::default(),
            lifecycle: RenderLifecycle::new(),
            settings_interaction: SettingsInteraction::default(),
            settings_navigation: SettingsNavigation::default(),
            settings_style: SettingsStyle::default(),
            error: None,
            loaded_repo: None,
        }
    }
}

impl FullGraphPanel {
    pub fn show(&mut self, ui: &mut Ui, state: &mut AppState) {
        self.sync_repo_context(state);
        self.poll_client(state);

        ui.heading("Full Repository Graph");
        ui.add_space(6.0);

        let Some(_repo) = state.repo_path.clone() else {
            ui.label(RichText::new("Ingest a repository first.").color(egui::Color32::GRAY));
            return;
        };

        if let Some(error) = &self.error {
            error_label(ui, error);
        }
        if let Some(err) = self.lifecycle.last_error() {
            error_label(ui, &err.to_string());
        }

        if self.snapshot.is_some() {
            self.toolbar(ui, state);
        }

        self.lifecycle.sync(
            true,
            self.snapshot.as_ref(),
            self.generation,
            self.algorithm,
            GraphScale::RepoTree,
        );

        if self.lifecycle.phase() == LifecyclePhase::Ready {
            if let Some(engine) = self.lifecycle.engine_mut() {
                draw_graph(
                    ui,
                    engine,
                    &self.settings_interaction,
                    &self.settings_navigation,
                    &self.settings_style,
                );
            }
        }
    }

    fn sync_repo_context(&mut self, state: &mut AppState) {
        if state.repo_path == self.loaded_repo {
            return;
        }
        self.loaded_repo = state.repo_path.clone();
        self.snapshot = None;
        self.error = None;
        self.lifecycle.reset();
        if let Some(path) = &self.loaded_repo {
            state.loading = true;
            self.client.load_repo_tree(path);
        }
    }

    fn poll_client(&mut self, state: &mut AppState) {
        match self.client.poll() {
            Some(Ok((GraphQuery::RepoTree(_), snapshot))) => {
                self.snapshot = Some(snapshot);
                self.generation += 1;
                self.error = None;
                state.loading = false;
            }
            Some(Ok(_)) => {}
            Some(Err(err)) => {
                self.error = Some(err.to_string());
                state.loading = false;
            }
            None => {}
        }
    }

    fn toolbar(&mut self, ui: &mut Ui, state: &mut AppState) {
        ui.separator();
        ui.horizontal(|ui| {
            ui.label("Layout");
            let mut selected = self.algorithm;
            for &choice in LayoutAlgorithm::repo_tree_choices() {
                ui.selectable_value(&mut selected, choice, choice.label());
            }
            self.algorithm = selected;

            ui.separator();
            let mut controller =
                InteractionController::new(&mut self.lifecycle, &mut self.client);
            if ui.button("Re-layout").clicked() {
                controller.relayout(selected);
            }
            if ui.button("Fit").clicked() {
                controller.fit();
            }
            if ui.button("Refresh").clicked() && controller.refresh() {
                state.loading = true;
            }

            if let Some(engine) = self.lifecycle.engine() {
                ui.separator();
                counts_label(ui, engine);
            }
        });
    }
}
