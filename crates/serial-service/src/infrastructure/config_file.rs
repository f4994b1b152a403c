//! Loading [`ServiceConfig`] from a TOML file.
//!
//! Missing sections and fields fall back to their defaults, so a file only
//! needs to name what it changes.  Values are not range-checked here: the
//! caller layers command-line overrides on top and validates the result with
//! [`ServiceConfig::validate`].

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::domain::ServiceConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Reads and parses the file at `path`.
///
/// # Errors
///
/// [`ConfigError::Io`] if the file cannot be read, [`ConfigError::Parse`] for
/// malformed TOML or wrongly typed values.
pub fn load_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&text)
}

/// Parses TOML text.
pub fn parse_config(text: &str) -> Result<ServiceConfig, ConfigError> {
    Ok(toml::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ValidationError;

    #[test]
    fn test_empty_document_yields_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config, ServiceConfig::default());
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        // Arrange
        let text = r#"
            [controller]
            channel = "tcp://127.0.0.1:10001"
        "#;

        // Act
        let config = parse_config(text).unwrap();

        // Assert
        assert_eq!(config.controller.channel, "tcp://127.0.0.1:10001");
        assert_eq!(config.controller.baud_rate, 115_200);
        assert_eq!(config.interface.listen_port, 10000);
    }

    #[test]
    fn test_full_document_round_trips_every_field() {
        let text = r#"
            [interface]
            listen_address = "0.0.0.0"
            listen_port = 12000
            backlog = 4

            [controller]
            channel = "/dev/ttyUSB0"
            baud_rate = 9600

            [runtime]
            poll_interval_ms = 20
            shutdown_grace_ms = 250
            log_level = "debug"
        "#;

        let config = parse_config(text).unwrap();

        assert_eq!(config.interface.listen_address, "0.0.0.0");
        assert_eq!(config.interface.listen_port, 12000);
        assert_eq!(config.interface.backlog, 4);
        assert_eq!(config.controller.channel, "/dev/ttyUSB0");
        assert_eq!(config.controller.baud_rate, 9600);
        assert_eq!(config.runtime.poll_interval_ms, 20);
        assert_eq!(config.runtime.shutdown_grace_ms, 250);
        assert_eq!(config.runtime.log_level, "debug");
    }

    #[test]
    fn test_wrong_type_is_a_parse_error() {
        let result = parse_config("[interface]\nlisten_port = \"ten thousand\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_out_of_range_value_parses_and_fails_validation() {
        // Act
        let config = parse_config("[runtime]\npoll_interval_ms = 0\n").unwrap();

        // Assert: parsing keeps the value, validation is a separate step
        assert_eq!(config.runtime.poll_interval_ms, 0);
        assert_eq!(config.validate(), Err(ValidationError::ZeroPollInterval));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let path = Path::new("/nonexistent/serial-service.toml");
        match load_config(path) {
            Err(ConfigError::Io { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected Io error, got {other:?}"),
        }
    }
}
