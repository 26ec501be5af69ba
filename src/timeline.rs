//! Approximate placement of career nodes along a horizontal time axis.
//!
//! Positions come from each node's own date or, for undated nodes, from the
//! node that discovered it during a breadth-first walk from the layout roots.
//! Nodes that fall in the same rolling window are stacked: main-path nodes
//! hug the spine, branch nodes alternate above and below it. Overlaps left
//! here are cleaned up by the resolver.

use chrono::{Datelike, NaiveDate};
use std::collections::{HashMap, VecDeque};

use crate::config::LayoutConfig;
use crate::model::{CareerNode, CareerNodeInput};

const EPOCH_YEAR: i32 = 1970;
const YEAR_ONLY_MONTH: u32 = 7;

/// Parses `YYYY`, `YYYY-MM` or `YYYY-MM-DD`. A bare year maps to mid-year
/// (July 1st), a year-month to the first of that month.
pub fn parse_career_date(raw: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = raw.trim().split('-').collect();
    let year = parse_year(parts.first()?)?;
    match parts.as_slice() {
        [_] => NaiveDate::from_ymd_opt(year, YEAR_ONLY_MONTH, 1),
        [_, month] => NaiveDate::from_ymd_opt(year, parse_component(month)?, 1),
        [_, month, day] => {
            NaiveDate::from_ymd_opt(year, parse_component(month)?, parse_component(day)?)
        }
        _ => None,
    }
}

fn parse_year(raw: &str) -> Option<i32> {
    if raw.len() != 4 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

fn parse_component(raw: &str) -> Option<u32> {
    if raw.is_empty() || raw.len() > 2 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// Fractional months since January 1970. Strictly increasing in the date.
pub fn months_since_epoch(date: NaiveDate) -> f64 {
    let whole = (date.year() - EPOCH_YEAR) as f64 * 12.0 + date.month0() as f64;
    whole + date.day0() as f64 / days_in_month(date) as f64
}

fn days_in_month(date: NaiveDate) -> u32 {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(30)
}

/// Timeline timestamp of a raw date string; missing or unparsable dates map to
/// the epoch so they sort first.
pub fn timestamp_months(raw: Option<&str>) -> f64 {
    raw.and_then(parse_career_date)
        .map(months_since_epoch)
        .unwrap_or(0.0)
}

/// Indices of the nodes the breadth-first walk starts from.
///
/// Nodes with no incoming connections or with a manual position qualify. If
/// none do, nodes with no outgoing connections are used, and failing that the
/// first node.
pub fn select_roots(nodes: &[CareerNodeInput]) -> Vec<usize> {
    let index = id_index(nodes);
    let mut incoming = vec![0_usize; nodes.len()];
    let mut outgoing = vec![0_usize; nodes.len()];

    for (idx, node) in nodes.iter().enumerate() {
        for target in &node.connections {
            if let Some(&target_idx) = index.get(target.as_str()) {
                if target_idx != idx {
                    incoming[target_idx] += 1;
                    outgoing[idx] += 1;
                }
            }
        }
    }

    let mut roots: Vec<usize> = (0..nodes.len())
        .filter(|&idx| incoming[idx] == 0 || nodes[idx].manual.is_some())
        .collect();

    if roots.is_empty() {
        roots = (0..nodes.len()).filter(|&idx| outgoing[idx] == 0).collect();
    }

    if roots.is_empty() && !nodes.is_empty() {
        roots.push(0);
    }

    roots
}

/// Absolute timeline position, in months, of every node.
pub fn timeline_positions(nodes: &[CareerNodeInput], config: &LayoutConfig) -> Vec<f64> {
    let index = id_index(nodes);
    let dates: Vec<Option<f64>> = nodes
        .iter()
        .map(|node| {
            node.date
                .as_deref()
                .and_then(parse_career_date)
                .map(months_since_epoch)
        })
        .collect();

    let mut positions: Vec<Option<f64>> = vec![None; nodes.len()];
    let mut queue = VecDeque::new();

    let roots = select_roots(nodes);
    // Unreached nodes (e.g. cycles hanging off nothing) seed their own walk.
    let seeds = roots.into_iter().chain(0..nodes.len());

    for seed in seeds {
        if positions[seed].is_some() {
            continue;
        }
        positions[seed] = Some(dates[seed].unwrap_or(0.0));
        queue.push_back(seed);

        while let Some(current) = queue.pop_front() {
            let parent_position = positions[current].unwrap_or(0.0);
            for target in &nodes[current].connections {
                let Some(&target_idx) = index.get(target.as_str()) else {
                    continue;
                };
                if positions[target_idx].is_some() {
                    continue;
                }
                positions[target_idx] = Some(
                    dates[target_idx]
                        .unwrap_or(parent_position + config.inherited_spacing_months),
                );
                queue.push_back(target_idx);
            }
        }
    }

    positions.into_iter().map(|p| p.unwrap_or(0.0)).collect()
}

/// Groups node indices into rolling windows over normalised time. A window
/// opens at its earliest node and takes every later node less than
/// `window` months after it.
pub fn cluster_by_time(normalized: &[f64], window: f64) -> Vec<Vec<usize>> {
    let mut order: Vec<usize> = (0..normalized.len()).collect();
    order.sort_by(|&a, &b| normalized[a].total_cmp(&normalized[b]).then(a.cmp(&b)));

    let mut clusters: Vec<Vec<usize>> = Vec::new();
    let mut window_start = f64::NEG_INFINITY;

    for idx in order {
        let time = normalized[idx];
        match clusters.last_mut() {
            Some(current) if time - window_start < window => current.push(idx),
            _ => {
                window_start = time;
                clusters.push(vec![idx]);
            }
        }
    }

    clusters
}

fn main_path_offset(rank: usize, nudge: f64) -> f64 {
    if rank == 0 {
        0.0
    } else if rank % 2 == 1 {
        nudge * ((rank + 1) / 2) as f64
    } else {
        -nudge * (rank / 2) as f64
    }
}

fn branch_offset(rank: usize, offset: f64) -> f64 {
    let level = (rank / 2 + 1) as f64;
    if rank % 2 == 0 {
        -offset * level
    } else {
        offset * level
    }
}

/// Places every node; `radii` is parallel to `nodes`.
pub fn place_nodes(
    nodes: &[CareerNodeInput],
    radii: &[f64],
    config: &LayoutConfig,
) -> Vec<CareerNode> {
    let absolute = timeline_positions(nodes, config);
    let earliest = absolute.iter().copied().fold(f64::INFINITY, f64::min);
    let normalized: Vec<f64> = absolute
        .iter()
        .map(|p| if earliest.is_finite() { p - earliest } else { 0.0 })
        .collect();

    let mut placed: Vec<CareerNode> = nodes
        .iter()
        .zip(radii)
        .zip(&normalized)
        .map(|((node, &radius), &months)| {
            let (x, y) = match node.manual {
                Some(manual) => (manual.x, manual.y),
                None => (config.start_x + months * config.pixels_per_month, config.spine_y),
            };
            CareerNode {
                input: node.clone(),
                x,
                y,
                radius,
                timeline_months: months,
                cluster: 0,
            }
        })
        .collect();

    for (cluster_idx, members) in cluster_by_time(&normalized, config.cluster_window_months)
        .into_iter()
        .enumerate()
    {
        let mut main_rank = 0;
        let mut branch_rank = 0;
        // Members arrive in time order; main-path nodes are stacked first.
        let (main, branches): (Vec<usize>, Vec<usize>) =
            members.into_iter().partition(|&idx| nodes[idx].is_main_path());

        for idx in main.into_iter().chain(branches) {
            let node = &mut placed[idx];
            node.cluster = cluster_idx;
            if node.is_pinned() {
                continue;
            }
            if node.is_main_path() {
                node.y = config.spine_y + main_path_offset(main_rank, config.main_nudge);
                main_rank += 1;
            } else {
                node.y = config.spine_y + branch_offset(branch_rank, config.branch_offset);
                branch_rank += 1;
            }
        }
    }

    let top = placed
        .iter()
        .filter(|node| !node.is_pinned())
        .map(|node| node.y - node.radius)
        .fold(f64::INFINITY, f64::min);
    if top.is_finite() && top < config.top_margin {
        let shift = config.top_margin - top;
        for node in placed.iter_mut().filter(|node| !node.is_pinned()) {
            node.y += shift;
        }
    }

    placed
}

fn id_index(nodes: &[CareerNodeInput]) -> HashMap<&str, usize> {
    nodes
        .iter()
        .enumerate()
        .map(|(idx, node)| (node.id.as_str(), idx))
        .collect()
}
