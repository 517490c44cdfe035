/// Device request that did not produce a response body.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to `{url}` timed out")]
    Timeout { url: String },

    #[error("`{url}` responded with HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("failed to connect to `{url}`")]
    Connection {
        url: String,

        #[source]
        source: ureq::Error,
    },
}

impl FetchError {
    pub(super) fn from_ureq(url: &str, error: ureq::Error) -> Self {
        let url = url.to_owned();
        match error {
            ureq::Error::StatusCode(status) => Self::HttpStatus { url, status },
            ureq::Error::Timeout(_) => Self::Timeout { url },
            ureq::Error::Io(ref io_error) if io_error.kind() == std::io::ErrorKind::TimedOut => {
                Self::Timeout { url }
            }
            source => Self::Connection { url, source },
        }
    }
}

/// Response body that could not be turned into readings.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("the response is not well-formed XML")]
    Malformed(#[from] roxmltree::Error),

    #[error("the response does not match any known schema (root element `{root}`)")]
    UnknownSchema { root: String },
}
