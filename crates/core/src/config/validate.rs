use std::collections::HashSet;

use super::{types::Config, ConfigError};
use crate::relocate::is_within;

/// Validate configuration
/// Currently validates:
/// - At least one category, with unique names and non-empty directories
/// - A category never stages into its own library
/// - Download directories do not nest inside each other
/// - The destination wait interval is not 0
/// - The Deluge URL is set
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.categories.is_empty() {
        return Err(ConfigError::ValidationError(
            "at least one [[categories]] entry is required".to_string(),
        ));
    }

    let mut names = HashSet::new();
    for category in &config.categories {
        if category.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "categories.name cannot be empty".to_string(),
            ));
        }
        if !names.insert(category.name.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate category name: {}",
                category.name
            )));
        }
        if category.download_dir.as_os_str().is_empty() || category.final_dir.as_os_str().is_empty()
        {
            return Err(ConfigError::ValidationError(format!(
                "category {} needs both download_dir and final_dir",
                category.name
            )));
        }
        if is_within(&category.final_dir, &category.download_dir) {
            return Err(ConfigError::ValidationError(format!(
                "category {}: final_dir must not be inside download_dir",
                category.name
            )));
        }
    }

    for (i, a) in config.categories.iter().enumerate() {
        for b in config.categories.iter().skip(i + 1) {
            if is_within(&a.download_dir, &b.download_dir)
                || is_within(&b.download_dir, &a.download_dir)
            {
                return Err(ConfigError::ValidationError(format!(
                    "download_dir of {} and {} overlap",
                    a.name, b.name
                )));
            }
        }
    }

    if config.mover.dest_wait_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "mover.dest_wait_interval_secs cannot be 0".to_string(),
        ));
    }

    if config.deluge.url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "deluge.url cannot be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;

    fn config_with(categories: &str) -> Config {
        load_config_from_str(categories).unwrap()
    }

    #[test]
    fn test_validate_valid_config() {
        let config = config_with(
            r#"
[[categories]]
name = "TV"
download_dir = "/dl/tv"
final_dir = "/lib/tv"

[[categories]]
name = "Movies"
download_dir = "/dl/movies"
final_dir = "/lib/movies"
"#,
        );
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validate_empty_categories_fails() {
        let config = config_with("categories = []");
        assert!(matches!(
            validate_config(&config),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_validate_duplicate_names_fails() {
        let config = config_with(
            r#"
[[categories]]
name = "TV"
download_dir = "/dl/a"
final_dir = "/lib/a"

[[categories]]
name = "TV"
download_dir = "/dl/b"
final_dir = "/lib/b"
"#,
        );
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_validate_final_inside_download_fails() {
        let config = config_with(
            r#"
[[categories]]
name = "TV"
download_dir = "/dl/tv"
final_dir = "/dl/tv/library"
"#,
        );
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_overlapping_download_dirs_fails() {
        let config = config_with(
            r#"
[[categories]]
name = "All"
download_dir = "/dl"
final_dir = "/lib/all"

[[categories]]
name = "TV"
download_dir = "/dl/tv"
final_dir = "/lib/tv"
"#,
        );
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("overlap"));
    }

    #[test]
    fn test_validate_zero_interval_fails() {
        let config = config_with(
            r#"
[mover]
dest_wait_interval_secs = 0

[[categories]]
name = "TV"
download_dir = "/dl/tv"
final_dir = "/lib/tv"
"#,
        );
        assert!(validate_config(&config).is_err());
    }
}
