pub mod runner;

pub use runner::{InputSummary, ReportError, ReportRunner, RunSummary};
