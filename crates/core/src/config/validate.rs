use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Archive section exists (enforced by serde)
/// - Archive server is non-empty
/// - Indexing has projects to index
///
/// Worker counts are not validated here; zero collapses to sequential
/// execution at dispatch time.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.archive.server.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "archive.server cannot be empty".to_string(),
        ));
    }

    if config.run.index && config.filters.projects.is_empty() {
        return Err(ConfigError::ValidationError(
            "run.index requires at least one project in filters.projects".to_string(),
        ));
    }

    Ok(())
}
