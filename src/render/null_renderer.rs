use crate::core::{Decoration, ElementGraph};
use crate::error::ChartResult;
use crate::render::Renderer;

/// No-op renderer used by tests and headless generation.
///
/// It still validates the graph so tests catch dangling scale ids or row
/// ranges before a real backend is introduced.
#[derive(Debug, Default)]
pub struct NullRenderer {
    pub last_element_count: usize,
    pub last_legend_count: usize,
    pub last_trend_count: usize,
    pub renders: usize,
}

impl Renderer for NullRenderer {
    fn render(&mut self, graph: &ElementGraph) -> ChartResult<()> {
        graph.validate()?;
        self.last_element_count = graph.elements.len();
        self.last_legend_count = graph.legends.len();
        self.last_trend_count = graph
            .decorations
            .iter()
            .filter(|decoration| matches!(decoration, Decoration::Trend(_)))
            .count();
        self.renders += 1;
        Ok(())
    }
}
