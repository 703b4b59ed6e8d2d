//! chart-graph: compiles chart bindings into typed element graphs.
//!
//! A [`ChartBinding`] says which columns drive which roles, a
//! [`StyleDescriptor`] configures the look, and a [`dataset::DataSource`]
//! supplies the rows. [`ChartGenerator::generate`] turns the three into an
//! [`ElementGraph`] of scales, a coordinate tree, geometric elements, visual
//! frames, legends and decorations. Painting the graph is left to a
//! [`render::Renderer`].

pub mod api;
pub mod core;
pub mod dataset;
pub mod error;
pub mod render;
pub mod telemetry;

pub use api::{ChartBinding, ChartGenerator, GenerateRequest, StyleDescriptor};
pub use core::ElementGraph;
pub use error::{BindingErrorReason, ChartError, ChartResult};
