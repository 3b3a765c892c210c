//! metricgate-exposition — the Prometheus text exposition format.
//!
//! Renders the catalogue for scraping and parses pushed text bodies into
//! the same `MetricInput` batches the JSON API accepts.

pub mod parse;
pub mod render;

pub use parse::parse_exposition;
pub use render::render_exposition;
