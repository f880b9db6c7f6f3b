use thiserror::Error;

pub type Result<T> = std::result::Result<T, RankerError>;

#[derive(Error, Debug)]
pub enum RankerError {
    /// Network or HTTP failure talking to the search API or a thread page.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Expected markup was not on the page.
    #[error("Extraction miss: {0}")]
    ExtractionMiss(String),

    /// A bounded browser wait ran out.
    #[error("Automation timeout: {0}")]
    AutomationTimeout(String),

    /// The relevance check could not get an answer from the model.
    #[error("Classifier failure: {0}")]
    ClassifierFailure(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("LLM error: {0}")]
    Llm(#[from] ai_client::AiError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for RankerError {
    fn from(err: reqwest::Error) -> Self {
        RankerError::Transport(err.to_string())
    }
}
