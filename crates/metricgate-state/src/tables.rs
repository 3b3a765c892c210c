//! redb table definitions.

use redb::TableDefinition;

/// Metric records keyed by normalized metric name; values are JSON.
pub const SERIES: TableDefinition<&str, &[u8]> = TableDefinition::new("series");
