use crate::models::LogLevel;

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("Fragment {index} has no payload")]
    EmptyFragment { index: usize },

    #[error("Fragment {index} payload is not valid base64: {source}")]
    FragmentDecode {
        index: usize,
        #[source]
        source: base64::DecodeError,
    },

    #[error("Fragment {index} is outside the declared range of {total}")]
    IndexOutOfRange { index: usize, total: usize },

    #[error("Declared fragment count {total} is outside 1..={limit}")]
    InvalidTotal { total: usize, limit: usize },

    #[error("Transfer incomplete, missing fragments {missing:?}")]
    Incomplete { missing: Vec<usize> },
}

impl TransferError {
    /// Only an aborted transfer is an error; fragment-level problems leave the transfer open.
    pub fn level(&self) -> LogLevel {
        match self {
            TransferError::Incomplete { .. } => LogLevel::Error,
            _ => LogLevel::Warning,
        }
    }
}
