use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArtefactError {
    #[error("missing input: please provide {0}")] MissingInput(String),
    #[error("can't extract list: {0}")] Extraction(String),
    #[error("rate limited: {0}")] RateLimited(String),
    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },
    #[error("please provide an OpenAI API key first")] MissingCredential,
    #[error("provider error: {0}")] Provider(String),
    #[error("invalid response: {0}")] InvalidResponse(String),
    #[error("config error: {0}")] Config(String),
}

impl ArtefactError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ArtefactError::RateLimited(_))
    }
}

pub type Result<T> = std::result::Result<T, ArtefactError>;
