#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("Malformed image: {0}")]
    Malformed(&'static str),

    #[error("Image io error: {0}")]
    Io(#[from] std::io::Error),
}
