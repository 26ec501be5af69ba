use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{OdysseyError, Result};
use crate::geometry::Point;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    #[default]
    Milestone,
    Company,
    Event,
    Transition,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Milestone => "milestone",
            NodeType::Company => "company",
            NodeType::Event => "event",
            NodeType::Transition => "transition",
        }
    }
}

/// Author-pinned coordinates. Only present when both `x` and `y` were given.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ManualPosition {
    pub x: f64,
    pub y: f64,
}

impl From<ManualPosition> for Point {
    fn from(value: ManualPosition) -> Self {
        Point::new(value.x, value.y)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "NodeRecord", into = "NodeRecord")]
pub struct CareerNodeInput {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
    pub kind: NodeType,
    pub connections: Vec<String>,
    pub next: Option<String>,
    pub image: Option<String>,
    pub link: Option<String>,
    pub date: Option<String>,
    pub path_taken: Option<bool>,
    pub manual: Option<ManualPosition>,
}

impl CareerNodeInput {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: None,
            kind: NodeType::default(),
            connections: Vec::new(),
            next: None,
            image: None,
            link: None,
            date: None,
            path_taken: None,
            manual: None,
        }
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn with_next(mut self, next: impl Into<String>) -> Self {
        self.next = Some(next.into());
        self
    }

    pub fn with_connections<I, S>(mut self, connections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.connections = connections.into_iter().map(Into::into).collect();
        self
    }

    pub fn branch(mut self) -> Self {
        self.path_taken = Some(false);
        self
    }

    pub fn pinned(mut self, x: f64, y: f64) -> Self {
        self.manual = Some(ManualPosition { x, y });
        self
    }

    /// Nodes are on the main path unless explicitly marked otherwise.
    pub fn is_main_path(&self) -> bool {
        self.path_taken != Some(false)
    }
}

/// Wire shape of a node, with loosely optional coordinates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeRecord {
    id: String,
    label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(rename = "type", default)]
    kind: NodeType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    connections: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    next: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    path_taken: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    y: Option<f64>,
}

impl From<NodeRecord> for CareerNodeInput {
    fn from(record: NodeRecord) -> Self {
        let manual = match (record.x, record.y) {
            (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Some(ManualPosition { x, y }),
            _ => None,
        };
        Self {
            id: record.id,
            label: record.label,
            description: record.description,
            kind: record.kind,
            connections: record.connections,
            next: record.next,
            image: record.image,
            link: record.link,
            date: record.date,
            path_taken: record.path_taken,
            manual,
        }
    }
}

impl From<CareerNodeInput> for NodeRecord {
    fn from(node: CareerNodeInput) -> Self {
        Self {
            id: node.id,
            label: node.label,
            description: node.description,
            kind: node.kind,
            connections: node.connections,
            next: node.next,
            image: node.image,
            link: node.link,
            date: node.date,
            path_taken: node.path_taken,
            x: node.manual.map(|m| m.x),
            y: node.manual.map(|m| m.y),
        }
    }
}

/// A node after layout and collision resolution.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(into = "PlacedRecord")]
pub struct CareerNode {
    pub input: CareerNodeInput,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    /// Months since the earliest event on the timeline axis.
    pub timeline_months: f64,
    pub cluster: usize,
}

impl CareerNode {
    pub fn id(&self) -> &str {
        &self.input.id
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn set_position(&mut self, point: Point) {
        self.x = point.x;
        self.y = point.y;
    }

    pub fn is_main_path(&self) -> bool {
        self.input.is_main_path()
    }

    pub fn is_pinned(&self) -> bool {
        self.input.manual.is_some()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlacedRecord {
    #[serde(flatten)]
    node: NodeRecord,
    pinned: bool,
    x: f64,
    y: f64,
    radius: f64,
    timeline_months: f64,
    cluster: usize,
}

impl From<CareerNode> for PlacedRecord {
    fn from(placed: CareerNode) -> Self {
        let pinned = placed.is_pinned();
        let mut node = NodeRecord::from(placed.input);
        node.x = None;
        node.y = None;
        Self {
            node,
            pinned,
            x: placed.x,
            y: placed.y,
            radius: placed.radius,
            timeline_months: placed.timeline_months,
            cluster: placed.cluster,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    /// Comes from a node's `connections` (including normalised `next`).
    Declared,
    /// Proximity link drawn for a branch node that declared nothing.
    Inferred,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub kind: EdgeKind,
}

/// Parses career nodes from either a bare array or a `{ "nodes": [...] }` envelope.
pub fn parse_nodes(json: &str) -> Result<Vec<CareerNodeInput>> {
    let value: Value = serde_json::from_str(json)?;
    nodes_from_value(value)
}

pub fn nodes_from_value(value: Value) -> Result<Vec<CareerNodeInput>> {
    let array = match value {
        Value::Array(_) => value,
        Value::Object(mut map) => match map.remove("nodes") {
            Some(nodes @ Value::Array(_)) => nodes,
            Some(other) => {
                return Err(OdysseyError::InvalidInput {
                    found: json_kind(&other),
                });
            }
            None => return Err(OdysseyError::InvalidInput { found: "object" }),
        },
        other => {
            return Err(OdysseyError::InvalidInput {
                found: json_kind(&other),
            });
        }
    };
    Ok(serde_json::from_value(array)?)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
