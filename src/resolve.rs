//! Best-effort separation of overlapping nodes and of nodes sitting on edges.
//!
//! Every pass is a bounded fixed-point loop built on [`resolve`]: it stops as
//! soon as its condition holds or when the iteration cap is reached. Hitting
//! the cap is reported, not treated as an error.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::LayoutConfig;
use crate::geometry::{Point, closest_point_on_segment};
use crate::model::CareerNode;

const OVERLAP_TOLERANCE: f64 = 1e-6;
/// Separation axis for coincident nodes.
const COINCIDENT_AXIS: Point = Point::new(0.0, 1.0);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Convergence {
    pub iterations: usize,
    pub converged: bool,
}

/// Applies `step` until `is_satisfied` holds, at most `max_iterations` times.
pub fn resolve<T: ?Sized>(
    state: &mut T,
    max_iterations: usize,
    mut is_satisfied: impl FnMut(&T) -> bool,
    mut step: impl FnMut(&mut T),
) -> Convergence {
    for iteration in 0..max_iterations {
        if is_satisfied(state) {
            return Convergence {
                iterations: iteration,
                converged: true,
            };
        }
        step(state);
    }
    Convergence {
        iterations: max_iterations,
        converged: is_satisfied(state),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionReport {
    pub overlap: Convergence,
    pub verification: Convergence,
    pub crossing: Convergence,
    pub final_verification: Convergence,
    pub remaining_overlaps: usize,
    pub remaining_crossings: usize,
}

impl ResolutionReport {
    /// No overlapping pairs and no edge running through a node.
    pub fn is_clean(&self) -> bool {
        self.remaining_overlaps == 0 && self.remaining_crossings == 0
    }
}

pub struct Resolver<'a> {
    config: &'a LayoutConfig,
}

impl<'a> Resolver<'a> {
    pub fn new(config: &'a LayoutConfig) -> Self {
        Self { config }
    }

    /// Runs every pass in order. `edges` are index pairs into `nodes`.
    pub fn run(&self, nodes: &mut [CareerNode], edges: &[(usize, usize)]) -> ResolutionReport {
        let overlap = resolve(
            nodes,
            self.config.max_overlap_iterations,
            |nodes| self.overlapping_pairs(nodes) == 0,
            |nodes| self.separation_step(nodes),
        );
        log::debug!(
            "overlap pass: {} iterations, converged={}",
            overlap.iterations,
            overlap.converged
        );

        self.enforce_cluster_gaps(nodes);

        let verification = self.verify(nodes);

        let crossing = resolve(
            nodes,
            self.config.max_crossing_iterations,
            |nodes| self.crossing_count(nodes, edges) == 0,
            |nodes| self.crossing_step(nodes, edges),
        );
        log::debug!(
            "crossing pass: {} iterations, converged={}",
            crossing.iterations,
            crossing.converged
        );

        let final_verification = self.verify(nodes);

        let cleared = self.clear_branches(nodes);
        if cleared > 0 {
            log::debug!("moved {cleared} stuck branch nodes off the main path");
        }

        let report = ResolutionReport {
            overlap,
            verification,
            crossing,
            final_verification,
            remaining_overlaps: self.overlapping_pairs(nodes),
            remaining_crossings: self.crossing_count(nodes, edges),
        };

        if report.remaining_overlaps > 0 {
            log::warn!(
                "{} node pairs still overlap after resolution",
                report.remaining_overlaps
            );
        }

        report
    }

    pub fn min_distance(&self, a: &CareerNode, b: &CareerNode) -> f64 {
        self.config.overlap_factor * (a.radius + b.radius)
    }

    pub fn overlapping_pairs(&self, nodes: &[CareerNode]) -> usize {
        let mut count = 0;
        for i in 0..nodes.len() {
            for j in (i + 1)..nodes.len() {
                if self.overlaps(&nodes[i], &nodes[j]) {
                    count += 1;
                }
            }
        }
        count
    }

    fn overlaps(&self, a: &CareerNode, b: &CareerNode) -> bool {
        a.position().distance(b.position()) < self.min_distance(a, b) - OVERLAP_TOLERANCE
    }

    fn separation_step(&self, nodes: &mut [CareerNode]) {
        for i in 0..nodes.len() {
            for j in (i + 1)..nodes.len() {
                self.separate_pair(nodes, i, j);
            }
        }
    }

    /// Pushes one overlapping pair apart. Branch nodes give way to main-path
    /// nodes, two branch nodes split the distance evenly. Main-path nodes
    /// only ever move vertically so dates keep their left-to-right order.
    /// Pinned nodes never move.
    fn separate_pair(&self, nodes: &mut [CareerNode], i: usize, j: usize) {
        if !self.overlaps(&nodes[i], &nodes[j]) {
            return;
        }
        let (pinned_i, pinned_j) = (nodes[i].is_pinned(), nodes[j].is_pinned());
        if pinned_i && pinned_j {
            return;
        }

        let target = self.min_distance(&nodes[i], &nodes[j]) + self.config.separation_slack;
        let (main_i, main_j) = (nodes[i].is_main_path(), nodes[j].is_main_path());

        if main_i && main_j {
            let (share_i, share_j) = pinned_shares(pinned_i, pinned_j, 0.5, 0.5);
            split_vertically(nodes, i, j, target, share_i, share_j);
            return;
        }

        let delta = nodes[j].position() - nodes[i].position();
        let unit = delta.normalized().unwrap_or(COINCIDENT_AXIS);
        let push = target - delta.length();
        let branch_yield = self.config.branch_yield;
        let (share_i, share_j) = match (main_i, main_j) {
            (true, false) => (1.0 - branch_yield, branch_yield),
            (false, true) => (branch_yield, 1.0 - branch_yield),
            _ => (0.5, 0.5),
        };
        let (share_i, share_j) = pinned_shares(pinned_i, pinned_j, share_i, share_j);

        displace(&mut nodes[i], unit * (-push * share_i));
        displace(&mut nodes[j], unit * (push * share_j));
    }

    /// Within each time cluster, keeps neighbouring nodes (ordered by x) at
    /// least `cluster_min_gap` apart horizontally. Only branch nodes are
    /// shifted; main-path nodes stay on their date.
    fn enforce_cluster_gaps(&self, nodes: &mut [CareerNode]) {
        let mut clusters: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for (idx, node) in nodes.iter().enumerate() {
            clusters.entry(node.cluster).or_default().push(idx);
        }

        for members in clusters.values_mut() {
            if members.len() < 2 {
                continue;
            }
            members.sort_by(|&a, &b| nodes[a].x.total_cmp(&nodes[b].x).then(a.cmp(&b)));
            for pair in members.windows(2) {
                let (prev, current) = (pair[0], pair[1]);
                if nodes[current].is_pinned() || nodes[current].is_main_path() {
                    continue;
                }
                let minimum_x = nodes[prev].x + self.config.cluster_min_gap;
                if nodes[current].x < minimum_x {
                    nodes[current].x = minimum_x;
                }
            }
        }
    }

    /// Brute-force sweeps that place each still-overlapping pair exactly
    /// `min_distance` apart around its midpoint.
    fn verify(&self, nodes: &mut [CareerNode]) -> Convergence {
        let convergence = resolve(
            nodes,
            self.config.max_verification_sweeps,
            |nodes| self.overlapping_pairs(nodes) == 0,
            |nodes| {
                for i in 0..nodes.len() {
                    for j in (i + 1)..nodes.len() {
                        self.force_apart(nodes, i, j);
                    }
                }
            },
        );
        log::debug!(
            "verification: {} sweeps, converged={}",
            convergence.iterations,
            convergence.converged
        );
        convergence
    }

    fn force_apart(&self, nodes: &mut [CareerNode], i: usize, j: usize) {
        if !self.overlaps(&nodes[i], &nodes[j]) {
            return;
        }
        let (pinned_i, pinned_j) = (nodes[i].is_pinned(), nodes[j].is_pinned());
        if pinned_i && pinned_j {
            return;
        }
        let (a, b) = (nodes[i].position(), nodes[j].position());
        let target = self.min_distance(&nodes[i], &nodes[j]) + self.config.separation_slack;
        let unit = (b - a).normalized().unwrap_or(COINCIDENT_AXIS);

        match (nodes[i].is_main_path(), nodes[j].is_main_path()) {
            (true, true) => {
                let (share_i, share_j) = pinned_shares(pinned_i, pinned_j, 0.5, 0.5);
                split_vertically(nodes, i, j, target, share_i, share_j);
            }
            (true, false) if !pinned_j => nodes[j].set_position(a + unit * target),
            (false, true) if !pinned_i => nodes[i].set_position(b - unit * target),
            (true, false) | (false, true) => {
                let (share_i, share_j) = pinned_shares(pinned_i, pinned_j, 0.5, 0.5);
                split_vertically(nodes, i, j, target, share_i, share_j);
            }
            (false, false) => match (pinned_i, pinned_j) {
                (true, _) => nodes[j].set_position(a + unit * target),
                (_, true) => nodes[i].set_position(b - unit * target),
                _ => {
                    let midpoint = a.lerp(b, 0.5);
                    nodes[i].set_position(midpoint - unit * (target / 2.0));
                    nodes[j].set_position(midpoint + unit * (target / 2.0));
                }
            },
        }
    }

    /// Last resort for branch nodes the sweeps could not free: each one still
    /// overlapping something slides vertically away from the main path until
    /// it is clear of every node. Returns how many branches moved.
    fn clear_branches(&self, nodes: &mut [CareerNode]) -> usize {
        let axis = path_axis(nodes);
        let mut moved = 0;
        for idx in 0..nodes.len() {
            if nodes[idx].is_main_path() || nodes[idx].is_pinned() {
                continue;
            }
            let direction = if nodes[idx].y <= axis { -1.0 } else { 1.0 };
            let start = nodes[idx].y;
            for _ in 0..=nodes.len() {
                let node = &nodes[idx];
                let cleared = nodes
                    .iter()
                    .enumerate()
                    .filter(|&(other, candidate)| other != idx && self.overlaps(node, candidate))
                    .map(|(_, other)| {
                        let target = self.min_distance(node, other) + self.config.separation_slack;
                        let dx = node.x - other.x;
                        other.y + direction * (target * target - dx * dx).max(0.0).sqrt()
                    })
                    .reduce(|a, b| if direction < 0.0 { a.min(b) } else { a.max(b) });
                match cleared {
                    Some(y) => nodes[idx].y = y,
                    None => break,
                }
            }
            if nodes[idx].y != start {
                moved += 1;
            }
        }
        moved
    }

    fn clearance(&self, node: &CareerNode) -> f64 {
        node.radius + self.config.line_clearance
    }

    pub fn crossing_count(&self, nodes: &[CareerNode], edges: &[(usize, usize)]) -> usize {
        let mut count = 0;
        for &(from, to) in edges {
            let (a, b) = (nodes[from].position(), nodes[to].position());
            for (idx, node) in nodes.iter().enumerate() {
                if idx == from || idx == to {
                    continue;
                }
                let closest = closest_point_on_segment(node.position(), a, b);
                if node.position().distance(closest) < self.clearance(node) - OVERLAP_TOLERANCE {
                    count += 1;
                }
            }
        }
        count
    }

    /// Moves nodes off the edges they sit on. Branch nodes are pushed along
    /// the edge normal; for protected main-path nodes the edge's endpoints
    /// shift away instead (main-path endpoints only vertically).
    fn crossing_step(&self, nodes: &mut [CareerNode], edges: &[(usize, usize)]) {
        for &(from, to) in edges {
            for idx in 0..nodes.len() {
                if idx == from || idx == to {
                    continue;
                }
                let (a, b) = (nodes[from].position(), nodes[to].position());
                let point = nodes[idx].position();
                let closest = closest_point_on_segment(point, a, b);
                let distance = point.distance(closest);
                let clearance = self.clearance(&nodes[idx]);
                if distance >= clearance {
                    continue;
                }

                let segment = b - a;
                let Some(normal) = Point::new(-segment.y, segment.x).normalized() else {
                    continue;
                };
                let offset = point - closest;
                let side = if offset.x * normal.x + offset.y * normal.y >= 0.0 {
                    1.0
                } else {
                    -1.0
                };
                let push = clearance - distance + self.config.separation_slack;

                let node = &nodes[idx];
                if !node.is_main_path() && !node.is_pinned() {
                    nodes[idx].set_position(point + normal * (side * push));
                } else {
                    let nudge = normal * (-side * push * self.config.endpoint_nudge);
                    for endpoint in [from, to] {
                        if !nodes[endpoint].is_pinned() {
                            displace(&mut nodes[endpoint], nudge);
                        }
                    }
                }
            }
        }
    }
}

/// Moves a node by `offset`, dropping the horizontal part for main-path
/// nodes.
fn displace(node: &mut CareerNode, offset: Point) {
    if node.is_main_path() {
        node.y += offset.y;
    } else {
        let moved = node.position() + offset;
        node.set_position(moved);
    }
}

/// Opens the vertical gap between `i` and `j` until their centres are
/// `target` apart, without touching either x.
fn split_vertically(
    nodes: &mut [CareerNode],
    i: usize,
    j: usize,
    target: f64,
    share_i: f64,
    share_j: f64,
) {
    let delta = nodes[j].position() - nodes[i].position();
    let needed = (target * target - delta.x * delta.x).max(0.0).sqrt();
    let gap = needed - delta.y.abs();
    if gap <= 0.0 {
        return;
    }
    let direction = if delta.y >= 0.0 { 1.0 } else { -1.0 };
    nodes[i].y -= direction * gap * share_i;
    nodes[j].y += direction * gap * share_j;
}

/// Mean height of the main path, or of every node when there is none.
fn path_axis(nodes: &[CareerNode]) -> f64 {
    let (sum, count) = nodes
        .iter()
        .filter(|node| node.is_main_path())
        .fold((0.0, 0usize), |(sum, count), node| (sum + node.y, count + 1));
    if count > 0 {
        return sum / count as f64;
    }
    if nodes.is_empty() {
        return 0.0;
    }
    nodes.iter().map(|node| node.y).sum::<f64>() / nodes.len() as f64
}

fn pinned_shares(pinned_i: bool, pinned_j: bool, share_i: f64, share_j: f64) -> (f64, f64) {
    if pinned_i {
        (0.0, 1.0)
    } else if pinned_j {
        (1.0, 0.0)
    } else {
        (share_i, share_j)
    }
}
