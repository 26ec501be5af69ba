use anyhow::Result;
use career_odyssey::{
    CanvasController, CareerNodeInput, CareerOdyssey, InteractionConfig, Layout, LayoutConfig,
    OdysseyConfig, PLACEHOLDER_TEXT, Point, normalize_connections, parse_nodes,
};
use std::sync::Arc;

/// Small deterministic generator so layouts are reproducible across runs.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn below(&mut self, bound: u64) -> u64 {
        self.next() % bound
    }
}

fn random_nodes(seed: u64, count: usize) -> Vec<CareerNodeInput> {
    const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyz ";
    let mut rng = Lcg(seed);
    (0..count)
        .map(|idx| {
            let len = 3 + rng.below(10) as usize;
            let label: String = (0..len)
                .map(|_| LETTERS[rng.below(LETTERS.len() as u64) as usize] as char)
                .collect();
            let year = 2018 + rng.below(5);
            let month = 1 + rng.below(12);
            let mut node = CareerNodeInput::new(format!("n{idx}"), label.trim().to_string())
                .with_date(format!("{year}-{month:02}"));
            if rng.below(3) == 0 {
                node = node.branch();
            }
            node
        })
        .collect()
}

#[test]
fn normalization_is_idempotent() -> Result<()> {
    let nodes = parse_nodes(
        r#"[
            {"id": "a", "label": "A", "next": "b"},
            {"id": "b", "label": "B", "next": "c"},
            {"id": "c", "label": "C"}
        ]"#,
    )?;

    let once = normalize_connections(&nodes);
    let twice = normalize_connections(&once);

    assert_eq!(once, twice);
    let b = &twice[1];
    assert_eq!(b.connections.iter().filter(|id| *id == "a").count(), 1);
    Ok(())
}

#[test]
fn earlier_dates_sit_further_left() -> Result<()> {
    let nodes = vec![
        CareerNodeInput::new("late", "Late").with_date("2023-03-01"),
        CareerNodeInput::new("early", "Early").with_date("2016"),
        CareerNodeInput::new("middle", "Middle").with_date("2019-09"),
    ];
    let layout = Layout::compute(&nodes, &LayoutConfig::default())?;

    let x = |id: &str| layout.node(id).map(|node| node.x).unwrap_or(f64::NAN);
    assert!(x("early") <= x("middle") + 1e-6);
    assert!(x("middle") <= x("late") + 1e-6);
    Ok(())
}

#[test]
fn coincident_nodes_never_produce_nan() -> Result<()> {
    let inputs = [
        parse_nodes(
            r#"[
                {"id": "a", "label": "First", "x": 300, "y": 300},
                {"id": "b", "label": "Second", "x": 300, "y": 300}
            ]"#,
        )?,
        vec![
            CareerNodeInput::new("a", "First").with_date("2020-05"),
            CareerNodeInput::new("b", "Second").with_date("2020-05").branch(),
        ],
        vec![
            CareerNodeInput::new("a", "First").pinned(300.0, 300.0),
            CareerNodeInput::new("b", "Second"),
        ],
    ];

    for input in inputs {
        let layout = Layout::compute(&input, &LayoutConfig::default())?;
        for node in &layout.nodes {
            assert!(node.x.is_finite() && node.y.is_finite(), "{node:?}");
        }
    }
    Ok(())
}

#[test]
fn random_twenty_node_layouts_have_no_overlaps() -> Result<()> {
    let config = LayoutConfig::default();
    for seed in [7, 42, 2024] {
        let layout = Layout::compute(&random_nodes(seed, 20), &config)?;

        let mut violations = 0;
        for (i, a) in layout.nodes.iter().enumerate() {
            for b in &layout.nodes[i + 1..] {
                let required = config.overlap_factor * (a.radius + b.radius);
                if a.position().distance(b.position()) < required - 1e-6 {
                    violations += 1;
                }
            }
        }

        assert_eq!(violations, 0, "seed {seed} left overlapping pairs");
        assert_eq!(layout.report.remaining_overlaps, 0);
        assert!(layout.nodes.iter().all(|node| node.position().is_finite()));
    }
    Ok(())
}

#[test]
fn random_layouts_fit_inside_the_canvas() -> Result<()> {
    let config = LayoutConfig::default();
    for seed in [7, 11, 99, 2024] {
        let layout = Layout::compute(&random_nodes(seed, 20), &config)?;
        for node in &layout.nodes {
            assert!(
                node.x - node.radius >= 0.0 && node.y - node.radius >= 0.0,
                "seed {seed}: {} is clipped at ({:.1}, {:.1})",
                node.id(),
                node.x,
                node.y
            );
            assert!(node.x + node.radius <= layout.canvas.width);
            assert!(node.y + node.radius <= layout.canvas.height);
        }
    }
    Ok(())
}

#[test]
fn main_path_keeps_date_order_after_resolution() -> Result<()> {
    let config = LayoutConfig::default();
    for seed in [7, 42, 395, 2024] {
        let layout = Layout::compute(&random_nodes(seed, 20), &config)?;
        let main: Vec<_> = layout.nodes.iter().filter(|node| node.is_main_path()).collect();
        for a in &main {
            for b in &main {
                if a.timeline_months < b.timeline_months {
                    assert!(
                        a.x <= b.x + 1e-6,
                        "seed {seed}: {} ({:.1}) sits right of later {} ({:.1})",
                        a.id(),
                        a.x,
                        b.id(),
                        b.x
                    );
                }
            }
        }
        assert_eq!(layout.report.remaining_overlaps, 0);
    }
    Ok(())
}

#[test]
fn drag_stays_within_elastic_bound() -> Result<()> {
    let nodes = vec![CareerNodeInput::new("a", "Start").pinned(100.0, 100.0)];
    let layout = Layout::compute(&nodes, &LayoutConfig::default())?;
    let mut canvas = CanvasController::new(Arc::new(layout), InteractionConfig::default());

    let origin = Point::new(100.0, 100.0);
    assert_eq!(canvas.position("a"), Some(origin));

    canvas.pointer_down(origin);
    canvas.pointer_move(Point::new(600.0, 100.0));

    let dragged = canvas.position("a").unwrap_or_default();
    assert!(dragged.distance(origin) <= 100.0 + 1e-9);
    assert!(dragged.x > origin.x);
    Ok(())
}

#[test]
fn every_node_springs_back_after_release() -> Result<()> {
    let nodes = vec![
        CareerNodeInput::new("a", "Graduate").with_date("2018").with_next("b"),
        CareerNodeInput::new("b", "Engineer").with_date("2019"),
        CareerNodeInput::new("c", "Lead").with_date("2021"),
    ];
    let layout = Layout::compute(&nodes, &LayoutConfig::default())?;
    let mut canvas = CanvasController::new(Arc::new(layout), InteractionConfig::default());

    let start = canvas.position("b").unwrap_or_default();
    canvas.pointer_down(start);
    for step in 1..=10 {
        canvas.pointer_move(start + Point::new(-12.0 * step as f64, 8.0 * step as f64));
    }
    canvas.pointer_up();

    for id in ["a", "b", "c"] {
        assert_eq!(canvas.position(id), canvas.initial_position(id), "{id}");
    }
    Ok(())
}

#[test]
fn single_undated_node_sits_at_default_position() -> Result<()> {
    let nodes = parse_nodes(r#"[{"id": "a", "label": "Start", "type": "milestone"}]"#)?;
    let layout = Layout::compute(&nodes, &LayoutConfig::default())?;

    assert_eq!(layout.nodes.len(), 1);
    let node = &layout.nodes[0];
    assert_eq!(node.position(), Point::new(200.0, 400.0));
    assert!(node.radius >= 50.0);
    Ok(())
}

#[test]
fn linear_chain_runs_left_to_right() -> Result<()> {
    let nodes = parse_nodes(
        r#"[
            {"id": "a", "label": "A", "next": "b", "date": "2020"},
            {"id": "b", "label": "B", "date": "2021"}
        ]"#,
    )?;

    let normalized = normalize_connections(&nodes);
    assert!(normalized[1].connections.contains(&"a".to_string()));

    let layout = Layout::compute(&nodes, &LayoutConfig::default())?;
    let (a, b) = (&layout.nodes[0], &layout.nodes[1]);
    assert!(a.x < b.x);
    assert_eq!(layout.edges.len(), 1);
    Ok(())
}

#[test]
fn empty_input_renders_placeholder() -> Result<()> {
    let odyssey = CareerOdyssey::from_json("[]", OdysseyConfig::default())?;
    assert!(odyssey.is_placeholder());

    let svg = odyssey.render_svg("white")?;
    assert!(svg.contains("<svg"));
    assert!(svg.contains(PLACEHOLDER_TEXT));
    Ok(())
}

#[test]
fn career_data_envelope_is_accepted() -> Result<()> {
    let nodes = parse_nodes(r#"{"nodes": [{"id": "a", "label": "A"}]}"#)?;
    assert_eq!(nodes.len(), 1);
    assert!(parse_nodes(r#""not nodes""#).is_err());
    Ok(())
}

#[test]
fn layout_serializes_to_json() -> Result<()> {
    let nodes = vec![
        CareerNodeInput::new("a", "A").with_date("2020").with_next("b"),
        CareerNodeInput::new("b", "B").with_date("2021"),
    ];
    let layout = Layout::compute(&nodes, &LayoutConfig::default())?;
    let value = serde_json::to_value(&layout)?;

    assert_eq!(value["nodes"][0]["id"], "a");
    assert!(value["nodes"][0]["x"].is_number());
    assert_eq!(value["edges"][0]["from"], "b");
    assert_eq!(value["edges"][0]["to"], "a");
    assert!(value["report"]["remainingOverlaps"].is_number());
    Ok(())
}
