//! Output side of the pipeline: PNG charts and the text/JSON report.

pub mod plot;
pub mod report;
