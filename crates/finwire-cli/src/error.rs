use finwire_core::{CoreError, ProviderError, ValidationError};
use finwire_warehouse::WarehouseError;
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Provider(#[from] ProviderError),

    #[error("command error: {0}")]
    Command(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("warehouse error: {0}")]
    Warehouse(#[from] WarehouseError),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) | Self::Provider(_) | Self::Command(_) => 2,
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
            Self::Warehouse(_) => 11,
        }
    }
}

impl From<CoreError> for CliError {
    fn from(error: CoreError) -> Self {
        match error {
            CoreError::Validation(error) => Self::Validation(error),
            CoreError::Provider(error) => Self::Provider(error),
            CoreError::Warehouse(error) => Self::Warehouse(error),
            CoreError::Serialization(error) => Self::Serialization(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_category() {
        assert_eq!(CliError::Command(String::from("x")).exit_code(), 2);
        assert_eq!(
            CliError::from(CoreError::Provider(ProviderError::not_found("gone"))).exit_code(),
            2
        );
        assert_eq!(
            CliError::Io(std::io::Error::other("disk")).exit_code(),
            10
        );
        assert_eq!(
            CliError::from(WarehouseError::InvalidRecord(String::from("bad"))).exit_code(),
            11
        );
    }
}
