//! Settings structures for the visualization UI.

/// Interaction-related toggles.
#[derive(Debug, Clone)]
pub struct SettingsInteraction {
    pub dragging_enabled: bool,
    pub hover_enabled: bool,
    pub node_clicking_enabled: bool,
    pub node_selection_enabled: bool,
}

impl Default for SettingsInteraction {
    fn default() -> Self {
        Self {
            dragging_enabled: true,
            hover_enabled: true,
            node_clicking_enabled: true,
            node_selection_enabled: true,
        }
    }
}

/// Navigation & viewport parameters.
#[derive(Debug, Clone)]
pub struct SettingsNavigation {
    pub zoom_and_pan_enabled: bool,
    pub zoom_speed: f32,
}

impl Default for SettingsNavigation {
    fn default() -> Self {
        Self {
            zoom_and_pan_enabled: true,
            zoom_speed: 0.02,
        }
    }
}

/// Visual style toggles.
#[derive(Debug, Clone)]
pub struct SettingsStyle {
    /// Always show node labels (vs hover-only).
    pub labels_always: bool,
}

impl Default for SettingsStyle {
    fn default() -> Self {
        Self { labels_always: true }
    }
}
