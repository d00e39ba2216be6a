use thiserror::Error;

#[derive(Error, Debug)]
pub enum WebError {
    #[error("Missing required setting: {0}")]
    MissingCredential(&'static str),

    #[error("Failed to listen on {addr}: {source}")]
    Bind {
        addr: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}
