//! Form panels for the external analysis endpoints: repository ingestion,
//! diff analysis and question answering.
//!
//! Each panel owns its task slot and renders its own inline error; failures
//! never take down the other views. The shared loading flag lives in
//! [`AppState`](crate::app::AppState) and is clobbered freely across panels,
//! which is tolerated because only one view is visible at a time.

use egui::{RichText, ScrollArea, Ui};
use serde_json::Value;

use crate::api::{
    self, normalize_repo_url, AskRequest, DiffRequest, IngestRequest, IngestResponse, TaskSlot,
};
use crate::app::{ActiveView, AppState};

fn error_label(ui: &mut Ui, error: &str) {
    ui.label(
        RichText::new(error)
            .color(egui::Color32::from_rgb(255, 68, 102))
            .size(12.0),
    );
}

fn json_block(ui: &mut Ui, heading: &str, value: &Value) {
    ui.separator();
    ui.label(RichText::new(heading).strong());
    let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    ScrollArea::vertical()
        .id_salt(heading)
        .max_height(240.0)
        .show(ui, |ui| {
            ui.label(RichText::new(pretty).monospace().size(11.0));
        });
}

// =============================================================================
// Repository Ingestion
// =============================================================================

/// Repository ingestion form.
#[derive(Default)]
pub struct IngestPanel {
    repo_url: String,
    github_token: String,
    task: TaskSlot<IngestResponse>,
    ingested: Option<String>,
    error: Option<String>,
}

impl IngestPanel {
    /// Render the form and handle completions. A successful ingest stores
    /// the repo path in the shared state and jumps to the graph view.
    pub fn show(&mut self, ui: &mut Ui, state: &mut AppState) {
        if let Some(result) = self.task.poll() {
            state.loading = false;
            match result {
                Ok(resp) => {
                    self.ingested = Some(resp.repo_path.clone());
                    self.error = None;
                    state.repo_path = Some(resp.repo_path);
                    state.active_view = ActiveView::Graph;
                }
                Err(err) => self.error = Some(err.to_string()),
            }
        }

        ui.heading("Repository Ingestion");
        ui.add_space(6.0);

        ui.label("Repository URL");
        ui.add(
            egui::TextEdit::singleline(&mut self.repo_url)
                .desired_width(360.0)
                .hint_text("https://github.com/owner/repo or owner/repo"),
        );
        ui.label(
            RichText::new("Supports: https://github.com/owner/repo, github.com/owner/repo, or owner/repo")
                .small()
                .color(egui::Color32::GRAY),
        );

        ui.add_space(4.0);
        ui.label("GitHub Token (Optional)");
        ui.add(
            egui::TextEdit::singleline(&mut self.github_token)
                .desired_width(360.0)
                .password(true)
                .hint_text("ghp_xxxxxxxxxxxx"),
        );

        ui.add_space(6.0);
        ui.add_enabled_ui(!state.loading, |ui| {
            if ui.button("Ingest Repository").clicked() && !self.repo_url.trim().is_empty() {
                let request = IngestRequest {
                    repo_url: normalize_repo_url(&self.repo_url),
                    github_token: if self.github_token.is_empty() {
                        None
                    } else {
                        Some(self.github_token.clone())
                    },
                };
                self.error = None;
                state.loading = true;
                api::spawn_ingest(&self.task, request);
            }
        });

        if let Some(error) = &self.error {
            error_label(ui, error);
        }
        if let Some(path) = &self.ingested {
            ui.label(
                RichText::new(format!("Ingested: {}", path))
                    .color(egui::Color32::from_rgb(0, 255, 136))
                    .size(12.0),
            );
        }
    }
}

// =============================================================================
// Diff Analysis
// =============================================================================

/// Diff-analysis form; the report shape is service-defined JSON.
#[derive(Default)]
pub struct DiffPanel {
    diff_patch: String,
    task: TaskSlot<Value>,
    report: Option<Value>,
    error: Option<String>,
}

impl DiffPanel {
    pub fn show(&mut self, ui: &mut Ui, state: &mut AppState) {
        if let Some(result) = self.task.poll() {
            state.loading = false;
            match result {
                Ok(report) => {
                    self.report = Some(report);
                    self.error = None;
                }
                Err(err) => self.error = Some(err.to_string()),
            }
        }

        ui.heading("Diff Analysis");
        ui.add_space(6.0);

        ui.label("Diff Patch");
        ScrollArea::vertical()
            .id_salt("diff_input")
            .max_height(200.0)
            .show(ui, |ui| {
                ui.add(
                    egui::TextEdit::multiline(&mut self.diff_patch)
                        .desired_width(f32::INFINITY)
                        .desired_rows(10)
                        .code_editor()
                        .hint_text("Paste a unified diff"),
                );
            });

        ui.add_space(6.0);
        ui.add_enabled_ui(!state.loading, |ui| {
            if ui.button("Analyze Diff").clicked() && !self.diff_patch.trim().is_empty() {
                self.error = None;
                state.loading = true;
                api::spawn_analyze_diff(
                    &self.task,
                    DiffRequest {
                        diff_patch: self.diff_patch.clone(),
                    },
                );
            }
        });

        if let Some(error) = &self.error {
            error_label(ui, error);
        }
        if let Some(report) = &self.report {
            json_block(ui, "Analysis Report", report);
        }
    }
}

// =============================================================================
// Question Answering
// =============================================================================

/// Question-answering form, scoped to the ingested repository when one exists.
#[derive(Default)]
pub struct AskPanel {
    question: String,
    task: TaskSlot<Value>,
    answer: Option<Value>,
    error: Option<String>,
}

impl AskPanel {
    pub fn show(&mut self, ui: &mut Ui, state: &mut AppState) {
        if let Some(result) = self.task.poll() {
            state.loading = false;
            match result {
                Ok(answer) => {
                    self.answer = Some(answer);
                    self.error = None;
                }
                Err(err) => self.error = Some(err.to_string()),
            }
        }

        ui.heading("Ask Questions");
        ui.add_space(6.0);

        ui.label("Question");
        ui.add(
            egui::TextEdit::multiline(&mut self.question)
                .desired_width(f32::INFINITY)
                .desired_rows(3)
                .hint_text("What does this change impact?"),
        );

        if let Some(repo) = &state.repo_path {
            ui.label(
                RichText::new(format!("Scope: {}", repo))
                    .small()
                    .color(egui::Color32::GRAY),
            );
        }

        ui.add_space(6.0);
        ui.add_enabled_ui(!state.loading, |ui| {
            if ui.button("Ask").clicked() && !self.question.trim().is_empty() {
                self.error = None;
                state.loading = true;
                api::spawn_ask(
                    &self.task,
                    AskRequest {
                        question: self.question.clone(),
                        context_ids: None,
                        repo_path: state.repo_path.clone(),
                    },
                );
            }
        });

        if let Some(error) = &self.error {
            error_label(ui, error);
        }
        if let Some(answer) = &self.answer {
            json_block(ui, "Answer", answer);
        }
    }
}
