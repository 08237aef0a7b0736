/// Why a connection was refused before upgrade.
///
/// The only error class a client ever sees: everything after
/// admission stays local to the affected connection.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("no credential presented")]
    Missing,

    #[error("invalid credential: {0}")]
    Invalid(String),
}

impl AuthError {
    /// Short classification string for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Invalid(_) => "invalid",
        }
    }
}
