//! Parsing of merged benchmark logs into metric records.

pub mod mem_report;
pub mod parse;
pub mod row;

pub use parse::{parse_log_file, parse_log_text};
pub use row::{FieldValue, MemBreakdown, MetricRecord, ParsedLog};

/// A marker line was recognized but its payload is unusable.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("malformed memory report for {mode}/N={keys}: {source}")]
    MalformedReport {
        mode: String,
        keys: u64,
        #[source]
        source: serde_json::Error,
    },

    #[error("memory report attributes {attributed} bytes but its root total is {total}")]
    OverAttributed { attributed: u64, total: u64 },

    #[error("memory report byte counts overflow at node {node}")]
    SizeOverflow { node: String },
}
