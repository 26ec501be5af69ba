use std::sync::Arc;

use crate::canvas::CanvasController;
use crate::config::OdysseyConfig;
use crate::error::Result;
use crate::layout::Layout;
use crate::measure::{GlyphWidthMeasure, TextMeasure};
use crate::model::{CareerNodeInput, parse_nodes};
use crate::render;

/// One mounted career canvas.
///
/// Owns its input, the layout computed from it and the interaction state.
/// The layout is recomputed only when a different node set is supplied;
/// interaction never touches it.
pub struct CareerOdyssey {
    input: Vec<CareerNodeInput>,
    config: OdysseyConfig,
    measure: Box<dyn TextMeasure>,
    layout: Arc<Layout>,
    canvas: CanvasController,
}

impl CareerOdyssey {
    pub fn new(input: Vec<CareerNodeInput>, config: OdysseyConfig) -> Result<Self> {
        Self::with_measure(input, config, Box::new(GlyphWidthMeasure::default()))
    }

    pub fn with_measure(
        input: Vec<CareerNodeInput>,
        config: OdysseyConfig,
        measure: Box<dyn TextMeasure>,
    ) -> Result<Self> {
        let layout = Arc::new(Layout::compute_with(&input, &config.layout, measure.as_ref())?);
        let mut canvas = CanvasController::new(Arc::clone(&layout), config.interaction.clone());
        canvas.center_on_anchor();
        Ok(Self {
            input,
            config,
            measure,
            layout,
            canvas,
        })
    }

    pub fn from_json(json: &str, config: OdysseyConfig) -> Result<Self> {
        Self::new(parse_nodes(json)?, config)
    }

    /// Replaces the node set. Returns `true` when the layout was recomputed,
    /// `false` when the input was unchanged and the current state was kept.
    pub fn set_nodes(&mut self, input: Vec<CareerNodeInput>) -> Result<bool> {
        if input == self.input {
            return Ok(false);
        }

        let layout = Arc::new(Layout::compute_with(
            &input,
            &self.config.layout,
            self.measure.as_ref(),
        )?);
        let container = self.canvas.container();
        let mut canvas =
            CanvasController::new(Arc::clone(&layout), self.config.interaction.clone());
        canvas.set_container_size(container);
        canvas.center_on_anchor();

        self.input = input;
        self.layout = layout;
        self.canvas = canvas;
        Ok(true)
    }

    pub fn input(&self) -> &[CareerNodeInput] {
        &self.input
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn config(&self) -> &OdysseyConfig {
        &self.config
    }

    pub fn canvas(&self) -> &CanvasController {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut CanvasController {
        &mut self.canvas
    }

    /// True when there is nothing to lay out and the placeholder is shown.
    pub fn is_placeholder(&self) -> bool {
        self.layout.is_empty()
    }

    pub fn render_svg(&self, background: &str) -> Result<String> {
        render::render_canvas_svg(&self.canvas, background)
    }
}
