use thiserror::Error;

pub type Result<T> = std::result::Result<T, StatusError>;

#[derive(Error, Debug)]
pub enum StatusError {
    #[error("Invalid block pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings decode error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Settings encode error: {0}")]
    TomlEncode(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Chat line {line}: {source}")]
    ChatLine {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Invalid import: {0}")]
    InvalidImport(String),
}
