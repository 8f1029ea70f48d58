use thiserror::Error;

/// Everything that can abort a run; nothing is recovered.
#[derive(Debug, Error)]
pub enum PlotError {
    #[error("could not read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: invalid record: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("line {line}: expected an object with exactly one top-level key, found {found}")]
    NotSingleKey { line: usize, found: usize },

    #[error("timestamp {timestamp:?} does not match format {format:?}: {source}")]
    Timestamp {
        timestamp: String,
        format: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("{parent} at {timestamp} has no field {child:?}")]
    MissingField {
        parent: String,
        timestamp: String,
        child: String,
    },

    #[error("could not draw chart for {parent}: {reason}")]
    Chart { parent: String, reason: String },

    #[error("invalid size {0:?}, expected WIDTHxHEIGHT")]
    InvalidSize(String),
}
