//! Runtime settings shared by the router and its handlers.

use clap::ValueEnum;

/// Deployment mode. Controls how much failure detail reaches clients.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Generic error text only.
    #[default]
    Production,
    /// Error text includes the underlying cause.
    Development,
}

impl Mode {
    pub fn exposes_detail(self) -> bool {
        matches!(self, Self::Development)
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Production => write!(f, "production"),
            Self::Development => write!(f, "development"),
        }
    }
}
