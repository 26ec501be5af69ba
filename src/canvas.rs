//! Interaction state for a mounted career canvas.
//!
//! The controller owns everything that changes after layout: the pan/zoom
//! viewport, the live `positions` map mutated while dragging, hover and
//! selection. The resolved [`Layout`] is shared read-only; every drag ends by
//! snapping `positions` back to it.
//!
//! Screen points are relative to the container's top-left corner.

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::config::InteractionConfig;
use crate::geometry::{CanvasSize, GEOMETRY_EPSILON, Point, elastic_constrain};
use crate::layout::Layout;
use crate::model::CareerNode;

/// Height of a rendered node card; its width is twice the node radius.
pub const NODE_CARD_HEIGHT: f64 = 64.0;

/// Pan/zoom transform between screen space and canvas space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub pan: Point,
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            pan: Point::default(),
            zoom: 1.0,
        }
    }
}

impl Viewport {
    pub fn screen_to_canvas(&self, screen: Point) -> Point {
        (screen - self.pan) * (1.0 / self.zoom)
    }

    pub fn canvas_to_screen(&self, canvas: Point) -> Point {
        canvas * self.zoom + self.pan
    }

    /// `translate(pan) scale(zoom)` in SVG transform syntax.
    pub fn transform(&self) -> String {
        format!(
            "translate({:.2} {:.2}) scale({:.4})",
            self.pan.x, self.pan.y, self.zoom
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeInteraction {
    Idle,
    Hovered,
    Dragging,
    /// Pushed aside by a nearby drag.
    Displaced,
    /// Snapped back after a drag; the host animates this.
    Returning,
}

impl NodeInteraction {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeInteraction::Idle => "idle",
            NodeInteraction::Hovered => "hovered",
            NodeInteraction::Dragging => "dragging",
            NodeInteraction::Displaced => "displaced",
            NodeInteraction::Returning => "returning",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelSide {
    Right,
    Left,
}

/// Canvas-space placement of the detail panel for the selected node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PanelPlacement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub side: PanelSide,
}

#[derive(Debug, Clone, PartialEq)]
enum Gesture {
    Idle,
    Pan {
        start_screen: Point,
        start_pan: Point,
        moved: bool,
    },
    Drag {
        id: String,
        /// Pointer minus node center at grab time, in canvas space.
        offset: Point,
        origin: Point,
        start_screen: Point,
        moved: bool,
    },
}

pub struct CanvasController {
    layout: Arc<Layout>,
    config: InteractionConfig,
    initial: HashMap<String, Point>,
    positions: HashMap<String, Point>,
    viewport: Viewport,
    container: CanvasSize,
    gesture: Gesture,
    hovered: Option<String>,
    selected: Option<String>,
    displaced: HashSet<String>,
    returning: HashSet<String>,
}

impl CanvasController {
    pub fn new(layout: Arc<Layout>, config: InteractionConfig) -> Self {
        let initial: HashMap<String, Point> = layout
            .nodes
            .iter()
            .map(|node| (node.id().to_string(), node.position()))
            .collect();
        Self {
            positions: initial.clone(),
            initial,
            container: layout.canvas,
            layout,
            config,
            viewport: Viewport::default(),
            gesture: Gesture::Idle,
            hovered: None,
            selected: None,
            displaced: HashSet::new(),
            returning: HashSet::new(),
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn container(&self) -> CanvasSize {
        self.container
    }

    pub fn set_container_size(&mut self, size: CanvasSize) {
        self.container = size;
    }

    pub fn positions(&self) -> &HashMap<String, Point> {
        &self.positions
    }

    pub fn position(&self, id: &str) -> Option<Point> {
        self.positions.get(id).copied()
    }

    pub fn initial_position(&self, id: &str) -> Option<Point> {
        self.initial.get(id).copied()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.gesture, Gesture::Drag { .. })
    }

    pub fn is_panning(&self) -> bool {
        matches!(self.gesture, Gesture::Pan { .. })
    }

    pub fn node_state(&self, id: &str) -> NodeInteraction {
        if let Gesture::Drag { id: dragged, .. } = &self.gesture {
            if dragged == id {
                return NodeInteraction::Dragging;
            }
        }
        if self.displaced.contains(id) {
            NodeInteraction::Displaced
        } else if self.returning.contains(id) {
            NodeInteraction::Returning
        } else if self.hovered.as_deref() == Some(id) {
            NodeInteraction::Hovered
        } else {
            NodeInteraction::Idle
        }
    }

    /// Topmost node whose card contains the canvas point.
    pub fn node_at(&self, canvas: Point) -> Option<&CareerNode> {
        self.layout.nodes.iter().rev().find(|node| {
            let center = self.positions.get(node.id()).copied().unwrap_or(node.position());
            (canvas.x - center.x).abs() <= node.radius
                && (canvas.y - center.y).abs() <= NODE_CARD_HEIGHT / 2.0
        })
    }

    pub fn pointer_down(&mut self, screen: Point) {
        let canvas = self.viewport.screen_to_canvas(screen);
        let grabbed = self.node_at(canvas).map(|node| node.id().to_string());

        self.gesture = match grabbed {
            Some(id) => {
                let current = self.positions.get(&id).copied().unwrap_or(canvas);
                let origin = self.initial.get(&id).copied().unwrap_or(current);
                self.returning.remove(&id);
                Gesture::Drag {
                    id,
                    offset: canvas - current,
                    origin,
                    start_screen: screen,
                    moved: false,
                }
            }
            None => Gesture::Pan {
                start_screen: screen,
                start_pan: self.viewport.pan,
                moved: false,
            },
        };
    }

    pub fn pointer_move(&mut self, screen: Point) {
        let tolerance = self.config.click_tolerance;
        match &mut self.gesture {
            Gesture::Idle => {
                let canvas = self.viewport.screen_to_canvas(screen);
                self.hovered = self.node_at(canvas).map(|node| node.id().to_string());
            }
            Gesture::Pan {
                start_screen,
                start_pan,
                moved,
            } => {
                let delta = screen - *start_screen;
                if !*moved && delta.length() <= tolerance {
                    return;
                }
                *moved = true;
                self.viewport.pan = *start_pan + delta;
            }
            Gesture::Drag {
                id,
                offset,
                origin,
                start_screen,
                moved,
            } => {
                if !*moved && screen.distance(*start_screen) <= tolerance {
                    return;
                }
                *moved = true;
                let candidate = self.viewport.screen_to_canvas(screen) - *offset;
                let (id, origin) = (id.clone(), *origin);
                self.drag_to(&id, origin, candidate);
            }
        }
    }

    /// Moves the dragged node elastically and pushes its neighbours aside.
    fn drag_to(&mut self, id: &str, origin: Point, candidate: Point) {
        let dragged = elastic_constrain(origin, candidate, self.config.max_drag_distance);
        self.positions.insert(id.to_string(), dragged);

        for (other, &home) in &self.initial {
            if other == id {
                continue;
            }
            let away = home - dragged;
            let distance = away.length();
            let pushed = if distance < self.config.push_radius && distance > GEOMETRY_EPSILON {
                let strength = (1.0 - distance / self.config.push_radius) * self.config.push_strength;
                let target = home + away * (strength / distance);
                Some(elastic_constrain(home, target, self.config.max_push_distance))
            } else {
                None
            };

            match pushed {
                Some(point) => {
                    self.positions.insert(other.clone(), point);
                    self.displaced.insert(other.clone());
                }
                None => {
                    self.positions.insert(other.clone(), home);
                    if self.displaced.remove(other) {
                        self.returning.insert(other.clone());
                    }
                }
            }
        }
    }

    /// Ends the gesture. A drag that never moved past the click tolerance
    /// toggles selection; a pan that never moved clears it.
    pub fn pointer_up(&mut self) {
        match std::mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::Idle => {}
            Gesture::Pan { moved, .. } => {
                if !moved {
                    self.selected = None;
                }
            }
            Gesture::Drag { id, moved, .. } => {
                if !moved {
                    self.toggle_selection(&id);
                }
                self.spring_back(&id);
            }
        }
    }

    /// Cancels any gesture without selection side effects.
    pub fn pointer_leave(&mut self) {
        if let Gesture::Drag { id, .. } = std::mem::replace(&mut self.gesture, Gesture::Idle) {
            self.spring_back(&id);
        }
        self.hovered = None;
    }

    fn spring_back(&mut self, dragged: &str) {
        let moved: Vec<String> = std::iter::once(dragged.to_string())
            .chain(self.displaced.drain())
            .collect();
        for id in moved {
            if let Some(&home) = self.initial.get(&id) {
                self.positions.insert(id.clone(), home);
            }
            self.returning.insert(id);
        }
    }

    /// Called by the host once the return animation has finished.
    pub fn finish_returning(&mut self) {
        self.returning.clear();
    }

    pub fn toggle_selection(&mut self, id: &str) {
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        } else if self.initial.contains_key(id) {
            self.selected = Some(id.to_string());
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Handles a wheel event. Only ctrl/cmd + wheel zooms; anything else is
    /// left to the host (returns `false`).
    pub fn wheel(&mut self, delta_y: f64, zoom_modifier: bool, screen: Point) -> bool {
        if !zoom_modifier || !delta_y.is_finite() {
            return false;
        }
        let factor = (-delta_y * self.config.wheel_zoom_sensitivity).exp();
        self.zoom_around(screen, self.viewport.zoom * factor);
        true
    }

    /// Sets the zoom, clamped, keeping the canvas point under `screen` fixed.
    pub fn zoom_around(&mut self, screen: Point, zoom: f64) {
        let anchor = self.viewport.screen_to_canvas(screen);
        self.viewport.zoom = zoom.clamp(self.config.min_zoom, self.config.max_zoom);
        self.viewport.pan = screen - anchor * self.viewport.zoom;
    }

    fn container_center(&self) -> Point {
        Point::new(self.container.width / 2.0, self.container.height / 2.0)
    }

    pub fn zoom_in(&mut self) {
        let center = self.container_center();
        self.zoom_around(center, self.viewport.zoom * self.config.zoom_step);
    }

    pub fn zoom_out(&mut self) {
        let center = self.container_center();
        self.zoom_around(center, self.viewport.zoom / self.config.zoom_step);
    }

    pub fn reset_view(&mut self) {
        self.viewport = Viewport::default();
        self.center_on_anchor();
    }

    /// Pans so the node sits at the container center. Returns `false` for an
    /// unknown id.
    pub fn center_on(&mut self, id: &str) -> bool {
        let Some(position) = self.positions.get(id).copied() else {
            return false;
        };
        self.viewport.pan = self.container_center() - position * self.viewport.zoom;
        true
    }

    /// The configured anchor if it exists, otherwise the latest main-path node.
    pub fn anchor_id(&self) -> Option<&str> {
        if let Some(anchor) = self.config.anchor.as_deref() {
            if self.initial.contains_key(anchor) {
                return Some(anchor);
            }
            log::debug!("anchor '{anchor}' not found, falling back to latest main-path node");
        }
        self.layout
            .nodes
            .iter()
            .filter(|node| node.is_main_path())
            .max_by(|a, b| {
                a.timeline_months
                    .total_cmp(&b.timeline_months)
                    .then(a.x.total_cmp(&b.x))
            })
            .or_else(|| self.layout.nodes.first())
            .map(CareerNode::id)
    }

    /// Initial view once the host knows its container size.
    pub fn center_on_anchor(&mut self) -> bool {
        match self.anchor_id().map(str::to_string) {
            Some(id) => self.center_on(&id),
            None => false,
        }
    }

    /// Right of the selected node, flipped left when it would overflow the
    /// canvas, never past the left or top edge.
    pub fn detail_panel(&self) -> Option<PanelPlacement> {
        let id = self.selected.as_deref()?;
        let node = self.layout.node(id)?;
        let center = self.positions.get(id).copied().unwrap_or(node.position());
        let width = self.config.panel_width;
        let gap = self.config.panel_gap;

        let right = center.x + node.radius + gap;
        let (x, side) = if right + width > self.layout.canvas.width {
            (center.x - node.radius - gap - width, PanelSide::Left)
        } else {
            (right, PanelSide::Right)
        };

        Some(PanelPlacement {
            x: x.max(0.0),
            y: (center.y - NODE_CARD_HEIGHT / 2.0).max(0.0),
            width,
            side,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::model::CareerNodeInput;

    fn controller(nodes: Vec<CareerNodeInput>) -> CanvasController {
        let layout = Layout::compute(&nodes, &LayoutConfig::default()).unwrap();
        CanvasController::new(Arc::new(layout), InteractionConfig::default())
    }

    fn two_years() -> CanvasController {
        controller(vec![
            CareerNodeInput::new("a", "A").with_date("2020").with_next("b"),
            CareerNodeInput::new("b", "B").with_date("2021"),
        ])
    }

    #[test]
    fn viewport_round_trips_points() {
        let viewport = Viewport {
            pan: Point::new(40.0, -20.0),
            zoom: 1.5,
        };
        let canvas = Point::new(120.0, 80.0);
        let screen = viewport.canvas_to_screen(canvas);
        assert_eq!(screen, Point::new(220.0, 100.0));
        let back = viewport.screen_to_canvas(screen);
        assert!(back.distance(canvas) < 1e-9);
    }

    #[test]
    fn drag_is_capped_and_springs_back() {
        let mut canvas = two_years();
        let origin = canvas.position("a").unwrap();

        canvas.pointer_down(origin);
        canvas.pointer_move(origin + Point::new(500.0, 0.0));
        let dragged = canvas.position("a").unwrap();
        assert!(dragged.distance(origin) <= 100.0 + 1e-9);
        assert!(dragged.x > origin.x);
        assert_eq!(canvas.node_state("a"), NodeInteraction::Dragging);

        canvas.pointer_up();
        assert_eq!(canvas.position("a"), Some(origin));
        assert_eq!(canvas.node_state("a"), NodeInteraction::Returning);
        assert_eq!(canvas.selected(), None);

        canvas.finish_returning();
        assert_eq!(canvas.node_state("a"), NodeInteraction::Idle);
    }

    #[test]
    fn dragging_pushes_neighbours_within_their_limit() {
        let mut canvas = two_years();
        let a = canvas.position("a").unwrap();
        let b = canvas.position("b").unwrap();

        canvas.pointer_down(a);
        canvas.pointer_move(b);
        let pushed = canvas.position("b").unwrap();
        assert!(pushed != b);
        assert!(pushed.distance(b) <= 50.0 + 1e-9);
        assert_eq!(canvas.node_state("b"), NodeInteraction::Displaced);

        canvas.pointer_leave();
        assert_eq!(canvas.position("a"), Some(a));
        assert_eq!(canvas.position("b"), Some(b));
    }

    #[test]
    fn click_toggles_selection_and_background_click_clears() {
        let mut canvas = two_years();
        let a = canvas.position("a").unwrap();

        canvas.pointer_down(a);
        canvas.pointer_up();
        assert_eq!(canvas.selected(), Some("a"));

        canvas.pointer_down(a);
        canvas.pointer_up();
        assert_eq!(canvas.selected(), None);

        canvas.pointer_down(a);
        canvas.pointer_up();
        canvas.pointer_down(Point::new(-500.0, -500.0));
        canvas.pointer_up();
        assert_eq!(canvas.selected(), None);
    }

    #[test]
    fn background_drag_pans_without_deselecting() {
        let mut canvas = two_years();
        canvas.toggle_selection("b");
        canvas.pointer_down(Point::new(5.0, 5.0));
        canvas.pointer_move(Point::new(65.0, 45.0));
        canvas.pointer_up();

        assert_eq!(canvas.viewport().pan, Point::new(60.0, 40.0));
        assert_eq!(canvas.selected(), Some("b"));
    }

    #[test]
    fn wheel_zoom_requires_modifier_and_is_clamped() {
        let mut canvas = two_years();
        assert!(!canvas.wheel(-100.0, false, Point::new(0.0, 0.0)));
        assert_eq!(canvas.viewport().zoom, 1.0);

        let pointer = Point::new(300.0, 200.0);
        let under_pointer = canvas.viewport().screen_to_canvas(pointer);
        assert!(canvas.wheel(-10_000.0, true, pointer));
        assert_eq!(canvas.viewport().zoom, 2.0);
        let after = canvas.viewport().screen_to_canvas(pointer);
        assert!(after.distance(under_pointer) < 1e-9);

        for _ in 0..20 {
            canvas.zoom_out();
        }
        assert_eq!(canvas.viewport().zoom, 0.5);

        canvas.reset_view();
        assert_eq!(canvas.viewport().zoom, 1.0);
    }

    #[test]
    fn anchor_falls_back_to_latest_main_path_node() {
        let canvas = controller(vec![
            CareerNodeInput::new("old", "Old").with_date("2010"),
            CareerNodeInput::new("new", "New").with_date("2020"),
            CareerNodeInput::new("dream", "Dream").with_date("2024").branch(),
        ]);
        assert_eq!(canvas.anchor_id(), Some("new"));
    }

    #[test]
    fn centering_puts_anchor_mid_container() {
        let mut canvas = two_years();
        canvas.set_container_size(CanvasSize {
            width: 800.0,
            height: 600.0,
        });
        assert!(canvas.center_on_anchor());
        let b = canvas.position("b").unwrap();
        let screen = canvas.viewport().canvas_to_screen(b);
        assert!(screen.distance(Point::new(400.0, 300.0)) < 1e-9);
        assert!(!canvas.center_on("missing"));
    }

    #[test]
    fn detail_panel_flips_near_right_edge() {
        let mut canvas = two_years();
        canvas.toggle_selection("a");
        let left_node = canvas.detail_panel().unwrap();
        assert_eq!(left_node.side, PanelSide::Right);

        canvas.toggle_selection("b");
        let right_node = canvas.detail_panel().unwrap();
        assert_eq!(right_node.side, PanelSide::Left);
        assert!(right_node.x >= 0.0);
        let b = canvas.position("b").unwrap();
        assert!(right_node.x + right_node.width <= b.x);
    }

    #[test]
    fn detail_panel_stays_level_with_topmost_node() {
        let mut canvas = controller(
            (0..6)
                .map(|i| CareerNodeInput::new(format!("n{i}"), format!("Same month {i}")).with_date("2019-03"))
                .collect(),
        );
        let top = canvas
            .layout()
            .nodes
            .iter()
            .min_by(|a, b| a.y.total_cmp(&b.y))
            .map(|node| node.id().to_string())
            .unwrap();

        canvas.toggle_selection(&top);
        let panel = canvas.detail_panel().unwrap();
        let center = canvas.position(&top).unwrap();
        assert_eq!(panel.y, center.y - NODE_CARD_HEIGHT / 2.0);
    }

    #[test]
    fn hover_tracks_pointer_when_idle() {
        let mut canvas = two_years();
        let b = canvas.position("b").unwrap();
        canvas.pointer_move(b);
        assert_eq!(canvas.hovered(), Some("b"));
        assert_eq!(canvas.node_state("b"), NodeInteraction::Hovered);
        canvas.pointer_move(Point::new(-1000.0, -1000.0));
        assert_eq!(canvas.hovered(), None);
    }
}
