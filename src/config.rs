use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::Result;

/// Tunables for the timeline layout and the collision/crossing resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LayoutConfig {
    pub pixels_per_month: f64,
    /// Months added to the discovering parent's position for undated nodes.
    pub inherited_spacing_months: f64,
    pub cluster_window_months: f64,
    pub start_x: f64,
    pub spine_y: f64,
    pub top_margin: f64,
    pub main_nudge: f64,
    pub branch_offset: f64,
    /// Pairs closer than `overlap_factor * (r1 + r2)` overlap.
    pub overlap_factor: f64,
    pub max_overlap_iterations: usize,
    pub max_verification_sweeps: usize,
    pub max_crossing_iterations: usize,
    pub line_clearance: f64,
    pub cluster_min_gap: f64,
    pub separation_slack: f64,
    /// Share of a branch/main overlap taken up by the branch node.
    pub branch_yield: f64,
    /// Fraction of the clearance deficit applied to an edge's endpoints when
    /// the interfering node is on the main path.
    pub endpoint_nudge: f64,
    /// Minimum gap between any node's edge and the top/left of the surface
    /// once collisions are resolved.
    pub surface_padding: f64,
    pub canvas_margin: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            pixels_per_month: 25.0,
            inherited_spacing_months: 6.0,
            cluster_window_months: 3.0,
            start_x: 200.0,
            spine_y: 400.0,
            top_margin: 120.0,
            main_nudge: 40.0,
            branch_offset: 180.0,
            overlap_factor: 1.5,
            max_overlap_iterations: 100,
            max_verification_sweeps: 100,
            max_crossing_iterations: 30,
            line_clearance: 10.0,
            cluster_min_gap: 40.0,
            separation_slack: 0.5,
            branch_yield: 0.9,
            endpoint_nudge: 0.25,
            surface_padding: 40.0,
            canvas_margin: 200.0,
        }
    }
}

/// Tunables for pan/zoom, elastic dragging and the detail panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InteractionConfig {
    pub max_drag_distance: f64,
    pub push_radius: f64,
    pub push_strength: f64,
    pub max_push_distance: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub zoom_step: f64,
    pub wheel_zoom_sensitivity: f64,
    pub click_tolerance: f64,
    pub panel_width: f64,
    pub panel_gap: f64,
    /// Node centred in the initial view.
    pub anchor: Option<String>,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            max_drag_distance: 100.0,
            push_radius: 220.0,
            push_strength: 80.0,
            max_push_distance: 50.0,
            min_zoom: 0.5,
            max_zoom: 2.0,
            zoom_step: 1.2,
            wheel_zoom_sensitivity: 0.002,
            click_tolerance: 4.0,
            panel_width: 320.0,
            panel_gap: 16.0,
            anchor: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OdysseyConfig {
    pub layout: LayoutConfig,
    pub interaction: InteractionConfig,
}

impl OdysseyConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }
}
