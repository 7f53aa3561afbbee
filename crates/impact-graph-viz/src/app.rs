//! Application shell: view switching, shared state and the frame loop.

use eframe::{App, CreationContext};
use egui::{Context, RichText};

use crate::graph_panel::{FullGraphPanel, GraphPanel};
use crate::panels::{AskPanel, DiffPanel, IngestPanel};

/// The view the central panel currently shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveView {
    #[default]
    Ingest,
    AnalyzeDiff,
    Ask,
    Graph,
    FullGraph,
}

impl ActiveView {
    pub fn label(self) -> &'static str {
        match self {
            ActiveView::Ingest => "Ingest",
            ActiveView::AnalyzeDiff => "Analyze Diff",
            ActiveView::Ask => "Ask",
            ActiveView::Graph => "Graph",
            ActiveView::FullGraph => "Full Graph",
        }
    }

    pub fn all() -> &'static [ActiveView] {
        &[
            ActiveView::Ingest,
            ActiveView::AnalyzeDiff,
            ActiveView::Ask,
            ActiveView::Graph,
            ActiveView::FullGraph,
        ]
    }
}

/// State shared across all views. Passed to panels by reference; switching
/// views never resets it, so the ingested repo path survives navigation.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    /// The view the tab bar has selected.
    pub active_view: ActiveView,
    /// One request in flight somewhere; panels both set and clear it.
    pub loading: bool,
    /// Server-side path of the ingested repository, once one exists.
    pub repo_path: Option<String>,
}

/// Top-level eframe application.
pub struct ImpactGraphApp {
    state: AppState,
    ingest: IngestPanel,
    diff: DiffPanel,
    ask: AskPanel,
    graph: GraphPanel,
    full_graph: FullGraphPanel,
}

impl ImpactGraphApp {
    pub fn new(_cc: &CreationContext<'_>) -> Self {
        Self {
            state: AppState::default(),
            ingest: IngestPanel::default(),
            diff: DiffPanel::default(),
            ask: AskPanel::default(),
            graph: GraphPanel::default(),
            full_graph: FullGraphPanel::default(),
        }
    }

    fn tab_bar(&mut self, ctx: &Context) {
        egui::TopBottomPanel::top("tab_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(RichText::new("Impact Graph").strong());
                ui.separator();
                for &view in ActiveView::all() {
                    ui.selectable_value(&mut self.state.active_view, view, view.label());
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if self.state.loading {
                        ui.spinner();
                        ui.label(RichText::new("Loading...").small());
                    }
                    if let Some(repo) = &self.state.repo_path {
                        ui.label(
                            RichText::new(repo)
                                .small()
                                .color(egui::Color32::from_rgb(0, 255, 136)),
                        );
                    }
                });
            });
        });
    }
}

impl App for ImpactGraphApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        // Slots settle outside the event loop; keep frames coming while a
        // request is in flight so the poll that adopts the result runs.
        if self.state.loading {
            ctx.request_repaint();
        }

        self.tab_bar(ctx);

        egui::CentralPanel::default().show(ctx, |ui| match self.state.active_view {
            ActiveView::Ingest => self.ingest.show(ui, &mut self.state),
            ActiveView::AnalyzeDiff => self.diff.show(ui, &mut self.state),
            ActiveView::Ask => self.ask.show(ui, &mut self.state),
            ActiveView::Graph => self.graph.show(ui, &mut self.state),
            ActiveView::FullGraph => self.full_graph.show(ui, &mut self.state),
        });
    }
}
