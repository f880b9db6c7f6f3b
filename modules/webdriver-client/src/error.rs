use thiserror::Error;

pub type Result<T> = std::result::Result<T, WebDriverError>;

#[derive(Debug, Error)]
pub enum WebDriverError {
    #[error("Network error: {0}")]
    Network(String),

    /// A W3C error response. `code` is the protocol error code, e.g.
    /// "no such element" or "element click intercepted".
    #[error("WebDriver error (status {status}, {code}): {message}")]
    Command {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Unexpected response: {0}")]
    Protocol(String),
}

impl WebDriverError {
    pub fn code(&self) -> Option<&str> {
        match self {
            WebDriverError::Command { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn is_no_such_element(&self) -> bool {
        matches!(self.code(), Some("no such element" | "stale element reference"))
    }

    pub fn is_click_intercepted(&self) -> bool {
        matches!(
            self.code(),
            Some("element click intercepted" | "element not interactable")
        )
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.code(), Some("timeout" | "script timeout"))
    }
}

impl From<reqwest::Error> for WebDriverError {
    fn from(err: reqwest::Error) -> Self {
        WebDriverError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for WebDriverError {
    fn from(err: serde_json::Error) -> Self {
        WebDriverError::Protocol(err.to_string())
    }
}
