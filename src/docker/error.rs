use hyper::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unsupported docker host `{0}` (expected unix:// or tcp://)")]
    InvalidHost(String),
    #[error("failed to connect to `{endpoint}`: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },
    #[error("HTTP handshake with `{endpoint}` failed: {source}")]
    Handshake {
        endpoint: String,
        #[source]
        source: hyper::Error,
    },
    #[error("failed to build request: {0}")]
    Request(#[from] hyper::http::Error),
    #[error("request `{uri}` failed: {source}")]
    Send {
        uri: String,
        #[source]
        source: hyper::Error,
    },
    #[error("request `{uri}` returned {status}: {body}")]
    Status {
        uri: String,
        status: StatusCode,
        body: String,
    },
    #[error("failed to decode response of `{uri}`: {source}")]
    Decode {
        uri: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
