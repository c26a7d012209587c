/// Errors surfaced while loading or parsing the layered configuration (§10.3).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("signing key must be 32 bytes of hex: {0}")]
    BadSigningKey(String),
}
