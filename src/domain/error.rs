//! Domain error types.

/// Top-level error type for fxlab.
#[derive(Debug, thiserror::Error)]
pub enum FxlabError {
    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("malformed input at bar {index}: {reason}")]
    MalformedInput { index: usize, reason: String },

    #[error("no data for {symbol} on {timeframe}")]
    NoData { symbol: String, timeframe: String },

    #[error("report output error: {reason}")]
    Report { reason: String },

    #[error("trade {id} is already closed")]
    TradeAlreadyClosed { id: usize },

    #[error("unknown trade {id}")]
    UnknownTrade { id: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FxlabError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        FxlabError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    /// Process exit status for this error family.
    pub fn exit_status(&self) -> u8 {
        match self {
            FxlabError::Io(_) | FxlabError::Report { .. } => 1,
            FxlabError::ConfigParse { .. }
            | FxlabError::ConfigMissing { .. }
            | FxlabError::ConfigInvalid { .. } => 2,
            FxlabError::DataSource { .. } => 3,
            FxlabError::MalformedInput { .. } => 4,
            FxlabError::NoData { .. } => 5,
            FxlabError::TradeAlreadyClosed { .. } | FxlabError::UnknownTrade { .. } => 6,
        }
    }
}

impl From<&FxlabError> for std::process::ExitCode {
    fn from(err: &FxlabError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}
