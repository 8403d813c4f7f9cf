use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid response: {0}")]
    Decode(String),
}

impl ClientError {
    /// A 404 means "no result yet" for result fetches, not a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub(crate) fn from_status(status: StatusCode, url: &str, body: String) -> Self {
        if status == StatusCode::NOT_FOUND {
            Self::NotFound(url.to_string())
        } else {
            Self::Status { status: status.as_u16(), body }
        }
    }
}
