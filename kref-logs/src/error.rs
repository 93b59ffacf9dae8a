//! Error handling in [`kref_logs`][crate]
use thiserror::Error;

/// Possible errors when configuring logging
#[derive(Error, Debug)]
pub enum Error {
    /// The requested log format is not one of `json` or `text`
    #[error("unknown log format {0:?}, expected one of \"json\" or \"text\"")]
    UnknownFormat(String),

    /// The filter directives could not be parsed
    #[error("invalid log filter {directives:?}: {source}")]
    InvalidFilter {
        /// The directives as given
        directives: String,
        /// The parse failure reported by `tracing-subscriber`
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },
}

/// Convenient alias for `Result<T, Error>`
pub type Result<T, E = Error> = std::result::Result<T, E>;
