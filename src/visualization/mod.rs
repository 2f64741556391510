//! Rendering of the aggregate tables.
//!
//! SVG charts live in [`plotter`], the interactive HTML species table
//! in [`grid`]. Rendering is a pure function of its input aggregate: it
//! holds no state and writes only into the configured output directory.

pub mod grid;
pub mod plotter;

pub use plotter::Visualizer;

use plotters::drawing::DrawingAreaErrorKind;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisualizationError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Plot error: {0}")]
    PlotError(String),

    #[error("Template error: {0}")]
    TemplateError(String),
}

impl<E: std::error::Error + Send + Sync> From<DrawingAreaErrorKind<E>> for VisualizationError {
    fn from(err: DrawingAreaErrorKind<E>) -> Self {
        VisualizationError::PlotError(err.to_string())
    }
}
