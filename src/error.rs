//! Unified error type.

/// The error type returned by waypost's fallible operations.
///
/// Application-level failures (404, 502, ...) travel as HTTP
/// [`Response`](crate::Response) values or through
/// [`Request::abort`](crate::Request::abort), not as `Error`s. This type
/// surfaces configuration and infrastructure faults: bad patterns, unreadable
/// config files, template compilation, binding a port.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid route pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("template: {0}")]
    Template(#[from] tera::Error),

    #[error("no template set serves `{0}`")]
    NoTemplate(String),
}
