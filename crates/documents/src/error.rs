use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("chunk {id} is malformed: {reason}")]
    MalformedChunk { id: String, reason: String },

    #[error("conversion error: {0}")]
    Other(String),
}

impl ConvertError {
    pub fn malformed(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedChunk {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
