use std::fmt::Write as FmtWrite;

use crate::canvas::{
    CanvasController, NODE_CARD_HEIGHT, NodeInteraction, PanelPlacement, PanelSide, Viewport,
};
use crate::error::Result;
use crate::geometry::{Point, anchor_segment};
use crate::layout::Layout;
use crate::measure::{LABEL_FONT_FAMILY, LABEL_FONT_SIZE, LABEL_FONT_WEIGHT};
use crate::model::{CareerNode, EdgeKind};

pub const PLACEHOLDER_TEXT: &str = "Loading career nodes...";

const PLACEHOLDER_WIDTH: f64 = 480.0;
const PLACEHOLDER_HEIGHT: f64 = 160.0;
const CARD_CORNER_RADIUS: f64 = 12.0;
const DATE_FONT_SIZE: f64 = 12.0;
const PANEL_LINE_HEIGHT: f64 = 20.0;
const PANEL_PADDING: f64 = 16.0;
const RETURN_TRANSITION: &str = "transform 0.4s cubic-bezier(0.34, 1.56, 0.64, 1)";

const BORDER_COLOR: &str = "var(--color-border, #cbd5e0)";
const TEXT_COLOR: &str = "var(--color-text, #1a202c)";
const SURFACE_COLOR: &str = "var(--color-surface, #ffffff)";
const MUTED_COLOR: &str = "var(--color-text-muted, #718096)";
const ACCENT_COLOR: &str = "var(--color-accent, #3182ce)";

pub fn escape_xml(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        let replacement = match ch {
            '&' => "&amp;",
            '<' => "&lt;",
            '>' => "&gt;",
            '"' => "&quot;",
            '\'' => "&apos;",
            other => {
                escaped.push(other);
                continue;
            }
        };
        escaped.push_str(replacement);
    }
    escaped
}

/// Static render of a layout at its resolved positions.
pub fn render_svg(layout: &Layout, background: &str) -> Result<String> {
    render_scene(&Scene {
        layout,
        viewport: Viewport::default(),
        background,
        position_of: &|node: &CareerNode| node.position(),
        state_of: &|_: &CareerNode| NodeInteraction::Idle,
        selected: None,
        panel: None,
    })
}

/// Render of a live canvas: current drag positions, viewport transform,
/// interaction classes and the detail panel.
pub fn render_canvas_svg(canvas: &CanvasController, background: &str) -> Result<String> {
    let panel = canvas.detail_panel();
    render_scene(&Scene {
        layout: canvas.layout(),
        viewport: canvas.viewport(),
        background,
        position_of: &|node: &CareerNode| canvas.position(node.id()).unwrap_or(node.position()),
        state_of: &|node: &CareerNode| canvas.node_state(node.id()),
        selected: canvas.selected(),
        panel: panel.as_ref(),
    })
}

struct Scene<'a> {
    layout: &'a Layout,
    viewport: Viewport,
    background: &'a str,
    position_of: &'a dyn Fn(&CareerNode) -> Point,
    state_of: &'a dyn Fn(&CareerNode) -> NodeInteraction,
    selected: Option<&'a str>,
    panel: Option<&'a PanelPlacement>,
}

fn render_scene(scene: &Scene<'_>) -> Result<String> {
    if scene.layout.is_empty() {
        return render_placeholder(scene.background);
    }

    let layout = scene.layout;
    let mut svg = String::new();
    write!(
        svg,
        r##"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="{:.0}" height="{:.0}" viewBox="0 0 {:.0} {:.0}" font-family="{}">
  <rect width="100%" height="100%" fill="{}" />
  <g class="odyssey-viewport" transform="{}">
"##,
        layout.canvas.width,
        layout.canvas.height,
        layout.canvas.width,
        layout.canvas.height,
        LABEL_FONT_FAMILY,
        escape_xml(scene.background),
        scene.viewport.transform()
    )?;

    write_edges(&mut svg, scene)?;
    write_nodes(&mut svg, scene)?;

    if let (Some(panel), Some(id)) = (scene.panel, scene.selected) {
        if let Some(node) = layout.node(id) {
            write_panel(&mut svg, node, panel)?;
        }
    }

    svg.push_str("  </g>\n</svg>\n");
    Ok(svg)
}

fn render_placeholder(background: &str) -> Result<String> {
    let mut svg = String::new();
    write!(
        svg,
        r##"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.0} {h:.0}" font-family="{font}">
  <rect width="100%" height="100%" fill="{bg}" />
  <text class="odyssey-placeholder" x="{cx:.1}" y="{cy:.1}" fill="{color}" font-size="{size:.0}" text-anchor="middle" dominant-baseline="middle">{text}</text>
</svg>
"##,
        w = PLACEHOLDER_WIDTH,
        h = PLACEHOLDER_HEIGHT,
        font = LABEL_FONT_FAMILY,
        bg = escape_xml(background),
        cx = PLACEHOLDER_WIDTH / 2.0,
        cy = PLACEHOLDER_HEIGHT / 2.0,
        color = MUTED_COLOR,
        size = LABEL_FONT_SIZE,
        text = PLACEHOLDER_TEXT
    )?;
    Ok(svg)
}

fn write_edges(svg: &mut String, scene: &Scene<'_>) -> Result<()> {
    writeln!(
        svg,
        "    <g class=\"odyssey-edges\" fill=\"none\" stroke=\"{BORDER_COLOR}\" stroke-width=\"2\">"
    )?;

    for edge in &scene.layout.edges {
        // Dangling ends are skipped rather than reported.
        let (Some(from), Some(to)) = (scene.layout.node(&edge.from), scene.layout.node(&edge.to))
        else {
            continue;
        };
        let (start, end) = ((scene.position_of)(from), (scene.position_of)(to));
        let (a, b) = anchor_segment(start, from.radius, end, to.radius).unwrap_or((start, end));
        let dash = match edge.kind {
            EdgeKind::Declared => "",
            EdgeKind::Inferred => " stroke-dasharray=\"6 6\" opacity=\"0.6\"",
        };
        writeln!(
            svg,
            "      <line data-from=\"{}\" data-to=\"{}\" x1=\"{:.1}\" y1=\"{:.1}\" x2=\"{:.1}\" y2=\"{:.1}\"{} />",
            escape_xml(&edge.from),
            escape_xml(&edge.to),
            a.x,
            a.y,
            b.x,
            b.y,
            dash
        )?;
    }

    svg.push_str("    </g>\n");
    Ok(())
}

fn write_nodes(svg: &mut String, scene: &Scene<'_>) -> Result<()> {
    svg.push_str("    <g class=\"odyssey-nodes\">\n");

    for node in &scene.layout.nodes {
        let center = (scene.position_of)(node);
        let state = (scene.state_of)(node);
        let selected = scene.selected == Some(node.id());
        let path = if node.is_main_path() { "taken" } else { "branch" };
        let transition = if state == NodeInteraction::Returning {
            format!(" style=\"transition: {RETURN_TRANSITION}\"")
        } else {
            String::new()
        };
        let stroke = if selected { ACCENT_COLOR } else { BORDER_COLOR };
        let opacity = if node.is_main_path() { "1" } else { "0.75" };

        writeln!(
            svg,
            "      <g class=\"career-node career-node-{} path-{} is-{}{}\" data-id=\"{}\" transform=\"translate({:.1} {:.1})\" opacity=\"{}\"{}>",
            node.input.kind.as_str(),
            path,
            state.as_str(),
            if selected { " is-selected" } else { "" },
            escape_xml(node.id()),
            center.x,
            center.y,
            opacity,
            transition
        )?;
        writeln!(
            svg,
            "        <rect x=\"{:.1}\" y=\"{:.1}\" width=\"{:.1}\" height=\"{:.1}\" rx=\"{r:.0}\" ry=\"{r:.0}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"2\"{} />",
            -node.radius,
            -NODE_CARD_HEIGHT / 2.0,
            node.radius * 2.0,
            NODE_CARD_HEIGHT,
            SURFACE_COLOR,
            stroke,
            if node.is_main_path() { "" } else { " stroke-dasharray=\"4 4\"" },
            r = CARD_CORNER_RADIUS
        )?;

        let label_y = if node.input.date.is_some() { -6.0 } else { 0.0 };
        writeln!(
            svg,
            "        <text y=\"{:.1}\" fill=\"{}\" font-size=\"{:.0}\" font-weight=\"{}\" text-anchor=\"middle\" dominant-baseline=\"middle\">{}</text>",
            label_y,
            TEXT_COLOR,
            LABEL_FONT_SIZE,
            LABEL_FONT_WEIGHT,
            escape_xml(&node.input.label)
        )?;

        if let Some(date) = &node.input.date {
            writeln!(
                svg,
                "        <text y=\"14.0\" fill=\"{}\" font-size=\"{:.0}\" text-anchor=\"middle\" dominant-baseline=\"middle\">{}</text>",
                MUTED_COLOR,
                DATE_FONT_SIZE,
                escape_xml(date)
            )?;
        }

        svg.push_str("      </g>\n");
    }

    svg.push_str("    </g>\n");
    Ok(())
}

fn write_panel(svg: &mut String, node: &CareerNode, panel: &PanelPlacement) -> Result<()> {
    let mut lines: Vec<(&str, &str)> = vec![("odyssey-detail-title", node.input.label.as_str())];
    if let Some(date) = &node.input.date {
        lines.push(("odyssey-detail-date", date.as_str()));
    }
    if let Some(description) = &node.input.description {
        lines.push(("odyssey-detail-description", description.as_str()));
    }
    if let Some(link) = &node.input.link {
        lines.push(("odyssey-detail-link", link.as_str()));
    }
    let height = PANEL_PADDING * 2.0 + PANEL_LINE_HEIGHT * lines.len() as f64;

    writeln!(
        svg,
        "    <g class=\"odyssey-detail odyssey-detail-{}\" data-id=\"{}\">",
        match panel.side {
            PanelSide::Right => "right",
            PanelSide::Left => "left",
        },
        escape_xml(node.id())
    )?;
    writeln!(
        svg,
        "      <rect x=\"{:.1}\" y=\"{:.1}\" width=\"{:.1}\" height=\"{:.1}\" rx=\"{r:.0}\" ry=\"{r:.0}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"1\" />",
        panel.x,
        panel.y,
        panel.width,
        height,
        SURFACE_COLOR,
        BORDER_COLOR,
        r = CARD_CORNER_RADIUS
    )?;

    for (idx, (class, text)) in lines.iter().enumerate() {
        let y = panel.y + PANEL_PADDING + PANEL_LINE_HEIGHT * (idx as f64 + 0.5);
        let color = if *class == "odyssey-detail-link" {
            ACCENT_COLOR
        } else if idx == 0 {
            TEXT_COLOR
        } else {
            MUTED_COLOR
        };
        writeln!(
            svg,
            "      <text class=\"{}\" x=\"{:.1}\" y=\"{:.1}\" fill=\"{}\" font-size=\"{:.0}\" dominant-baseline=\"middle\">{}</text>",
            class,
            panel.x + PANEL_PADDING,
            y,
            color,
            if idx == 0 { LABEL_FONT_SIZE } else { DATE_FONT_SIZE + 1.0 },
            escape_xml(text)
        )?;
    }

    svg.push_str("    </g>\n");
    Ok(())
}
