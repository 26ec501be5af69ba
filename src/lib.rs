//! Timeline layout and interactive canvas model for career node graphs.
//!
//! Input is a list of [`CareerNodeInput`] records. [`Layout::compute`] places
//! them left to right by date, separates colliding nodes and lines, and
//! returns the resolved positions with an edge list. [`CareerOdyssey`] wraps a
//! layout together with a [`CanvasController`] that a host UI drives with
//! pointer and wheel events.

pub mod canvas;
pub mod config;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod measure;
pub mod model;
pub mod normalize;
pub mod odyssey;
pub mod render;
pub mod resolve;
pub mod timeline;

pub use canvas::{CanvasController, NodeInteraction, PanelPlacement, PanelSide, Viewport};
pub use config::{InteractionConfig, LayoutConfig, OdysseyConfig};
pub use error::{OdysseyError, Result};
pub use geometry::{CanvasSize, Point};
pub use layout::Layout;
pub use measure::{GlyphWidthMeasure, NoMeasure, TextMeasure};
pub use model::{
    CareerNode, CareerNodeInput, Edge, EdgeKind, ManualPosition, NodeType, parse_nodes,
};
pub use normalize::normalize_connections;
pub use odyssey::CareerOdyssey;
pub use render::{PLACEHOLDER_TEXT, render_canvas_svg, render_svg};
pub use resolve::ResolutionReport;
