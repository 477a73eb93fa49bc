use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Lock for {id} was rejected: {reason}")]
    ClaimRejected { id: String, reason: String },

    #[error("Invalid base URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("User {0} not found on this page")]
    UserNotFound(String),

    #[error("User {0} is already locked")]
    AlreadyLocked(String),

    #[error("Page {page} is out of range (1..={total_pages})")]
    PageOutOfRange { page: u32, total_pages: u64 },

    #[error("Clipboard error: {0}")]
    Clipboard(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

pub mod exit_code {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const INVALID_ARGUMENTS: i32 = 2;
    pub const REQUEST_FAILED: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CLIPBOARD_ERROR: i32 = 5;
}

impl Error {
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Http(_)
            | Error::Status { .. }
            | Error::RequestFailed(_)
            | Error::ClaimRejected { .. } => exit_code::REQUEST_FAILED,
            Error::InvalidUrl { .. } | Error::InvalidArgument(_) | Error::PageOutOfRange { .. } => {
                exit_code::INVALID_ARGUMENTS
            }
            Error::UserNotFound(_) => exit_code::NOT_FOUND,
            Error::Clipboard(_) => exit_code::CLIPBOARD_ERROR,
            _ => exit_code::GENERAL_ERROR,
        }
    }

    /// True for the single "request failed" outcome (transport or non-2xx)
    pub fn is_request_failure(&self) -> bool {
        matches!(
            self,
            Error::Http(_)
                | Error::Status { .. }
                | Error::RequestFailed(_)
                | Error::ClaimRejected { .. }
        )
    }
}

impl From<arboard::Error> for Error {
    fn from(err: arboard::Error) -> Self {
        Error::Clipboard(err.to_string())
    }
}
