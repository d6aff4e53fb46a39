use thiserror::Error;
use url::Url;

/// Failure of a single candidate-path attempt. Contained to one host
/// element; the resolver logs it and moves on to the next candidate.
#[derive(Debug, Error)]
pub enum IncludeError {
    #[error("cannot resolve `{path}` against {base}: {source}")]
    PathResolve {
        path: String,
        base: Url,
        #[source]
        source: url::ParseError,
    },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Script(#[from] ScriptError),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{status} {reason} for {url}")]
    Status { url: Url, status: u16, reason: String },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: Url,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to read response body from {url}: {source}")]
    Body {
        url: Url,
        #[source]
        source: reqwest::Error,
    },

    #[error("cannot read {url}: {source}")]
    Io {
        url: Url,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported URL scheme `{scheme}` for {url}")]
    Scheme { url: Url, scheme: String },
}

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to load script {src}: {source}")]
    Load {
        src: Url,
        #[source]
        source: FetchError,
    },

    #[error("script source `{src}` does not resolve against {base}: {source}")]
    BadSource {
        src: String,
        base: Url,
        #[source]
        source: url::ParseError,
    },

    #[error("script execution failed: {reason}")]
    Execution { reason: String },
}
