use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::config::LayoutConfig;
use crate::error::{OdysseyError, Result};
use crate::geometry::{CanvasSize, Point};
use crate::measure::{GlyphWidthMeasure, TextMeasure, estimate_radius};
use crate::model::{CareerNode, CareerNodeInput, Edge, EdgeKind};
use crate::normalize::normalize_connections;
use crate::resolve::{ResolutionReport, Resolver};
use crate::timeline::place_nodes;

/// Fully resolved node set for one input array.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Layout {
    pub nodes: Vec<CareerNode>,
    pub edges: Vec<Edge>,
    pub canvas: CanvasSize,
    pub report: ResolutionReport,
}

impl Layout {
    pub fn compute(nodes: &[CareerNodeInput], config: &LayoutConfig) -> Result<Self> {
        Self::compute_with(nodes, config, &GlyphWidthMeasure::default())
    }

    /// Normalizes connections, sizes nodes, places them on the timeline and
    /// resolves collisions, in that order.
    pub fn compute_with(
        nodes: &[CareerNodeInput],
        config: &LayoutConfig,
        measure: &dyn TextMeasure,
    ) -> Result<Self> {
        ensure_unique_ids(nodes)?;

        if nodes.is_empty() {
            return Ok(Self::default());
        }

        let normalized = normalize_connections(nodes);
        let radii: Vec<f64> = normalized
            .iter()
            .map(|node| estimate_radius(&node.label, measure))
            .collect();

        let mut placed = place_nodes(&normalized, &radii, config);
        let declared = declared_edges(&placed);
        let report = Resolver::new(config).run(&mut placed, &declared);
        fit_to_surface(&mut placed, config.surface_padding);

        let mut edges: Vec<Edge> = declared
            .iter()
            .map(|&(from, to)| Edge {
                from: placed[from].id().to_string(),
                to: placed[to].id().to_string(),
                kind: EdgeKind::Declared,
            })
            .collect();
        edges.extend(infer_branch_links(&placed, &declared));

        let canvas = canvas_extent(&placed, config.canvas_margin);

        log::debug!(
            "laid out {} nodes and {} edges on a {:.0}x{:.0} canvas",
            placed.len(),
            edges.len(),
            canvas.width,
            canvas.height
        );

        Ok(Self {
            nodes: placed,
            edges,
            canvas,
            report,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&CareerNode> {
        self.nodes.iter().find(|node| node.id() == id)
    }
}

fn ensure_unique_ids(nodes: &[CareerNodeInput]) -> Result<()> {
    let mut seen = HashSet::new();
    for node in nodes {
        if !seen.insert(node.id.as_str()) {
            return Err(OdysseyError::DuplicateId(node.id.clone()));
        }
    }
    Ok(())
}

/// Index pairs for every `connections` entry, one per unordered pair.
/// Self-loops and dangling targets are dropped.
pub fn declared_edges(nodes: &[CareerNode]) -> Vec<(usize, usize)> {
    let index: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| (node.id(), idx))
        .collect();

    let mut seen = HashSet::new();
    let mut edges = Vec::new();

    for (from, node) in nodes.iter().enumerate() {
        for target in &node.input.connections {
            let Some(&to) = index.get(target.as_str()) else {
                log::warn!("node '{}' connects to unknown node '{target}'", node.id());
                continue;
            };
            if to == from {
                continue;
            }
            if seen.insert((from.min(to), from.max(to))) {
                edges.push((from, to));
            }
        }
    }

    edges
}

/// Links each branch node that no declared edge touches to its nearest
/// main-path node, or to the nearest node of any kind when there is no main
/// path. Ties go to the earlier node.
pub fn infer_branch_links(nodes: &[CareerNode], declared: &[(usize, usize)]) -> Vec<Edge> {
    let connected: HashSet<usize> = declared.iter().flat_map(|&(a, b)| [a, b]).collect();
    let has_main_path = nodes.iter().any(CareerNode::is_main_path);

    let mut linked = HashSet::new();
    let mut edges = Vec::new();

    for (idx, branch) in nodes.iter().enumerate() {
        if branch.is_main_path() || connected.contains(&idx) {
            continue;
        }

        let mut nearest: Option<(usize, f64)> = None;
        for (candidate_idx, candidate) in nodes.iter().enumerate() {
            if candidate_idx == idx || (has_main_path && !candidate.is_main_path()) {
                continue;
            }
            let distance = branch.position().distance(candidate.position());
            if nearest.is_none_or(|(_, best)| distance < best) {
                nearest = Some((candidate_idx, distance));
            }
        }

        let Some((target, _)) = nearest else {
            continue;
        };
        if linked.insert((idx.min(target), idx.max(target))) {
            edges.push(Edge {
                from: nodes[target].id().to_string(),
                to: branch.id().to_string(),
                kind: EdgeKind::Inferred,
            });
        }
    }

    edges
}

/// Translates the whole scene right/down when collision resolution pushed a
/// node past the top or left edge, so that every node keeps at least
/// `padding` from the origin. Relative positions, pinned ones included, are
/// preserved. Returns the applied offset.
pub fn fit_to_surface(nodes: &mut [CareerNode], padding: f64) -> Point {
    let (min_x, min_y) = nodes.iter().fold((f64::INFINITY, f64::INFINITY), |(mx, my), node| {
        (mx.min(node.x - node.radius), my.min(node.y - node.radius))
    });
    if !min_x.is_finite() || !min_y.is_finite() {
        return Point::new(0.0, 0.0);
    }

    let offset = Point::new((padding - min_x).max(0.0), (padding - min_y).max(0.0));
    if offset.x > 0.0 || offset.y > 0.0 {
        log::debug!("shifting layout by ({:.1}, {:.1}) to keep it on the surface", offset.x, offset.y);
        for node in nodes.iter_mut() {
            let moved = node.position() + offset;
            node.set_position(moved);
        }
    }
    offset
}

/// Size of the virtual surface: furthest node extents plus `margin`. Nodes
/// are expected to sit at non-negative coordinates (see [`fit_to_surface`]).
pub fn canvas_extent(nodes: &[CareerNode], margin: f64) -> CanvasSize {
    let (max_x, max_y) = nodes.iter().fold((0.0_f64, 0.0_f64), |(mx, my), node| {
        (mx.max(node.x + node.radius), my.max(node.y + node.radius))
    });
    CanvasSize {
        width: max_x + margin,
        height: max_y + margin,
    }
}
