mod null_renderer;

pub use null_renderer::NullRenderer;

pub use crate::core::Color;

use crate::core::ElementGraph;
use crate::error::ChartResult;

/// Contract implemented by any paint stage.
///
/// Backends receive a fully resolved, deterministic `ElementGraph` so drawing
/// code stays isolated from binding and scale logic.
pub trait Renderer {
    fn render(&mut self, graph: &ElementGraph) -> ChartResult<()>;
}
