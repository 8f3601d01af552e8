//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate configuration legality
//! - Generate `DispatchConfig`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("mtsh.toml")).unwrap();
//! println!("Backend: {}", config.backend.label());
//! ```

mod parser;
mod validator;

pub use contracts::DispatchConfig;
pub use parser::ConfigFormat;

use contracts::ContractError;
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<DispatchConfig, ContractError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<DispatchConfig, ContractError> {
        Self::parse_and_validate(content, format)
    }

    /// Validate an already assembled configuration (e.g. after CLI overrides)
    pub fn validate(config: &DispatchConfig) -> Result<(), ContractError> {
        validator::validate(config)
    }

    /// Serialize DispatchConfig to TOML string
    pub fn to_toml(config: &DispatchConfig) -> Result<String, ContractError> {
        toml::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize DispatchConfig to JSON string
    pub fn to_json(config: &DispatchConfig) -> Result<String, ContractError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    /// Infer configuration format from file extension
    fn detect_format(path: &Path) -> Result<ConfigFormat, ContractError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            ContractError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            ContractError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, ContractError> {
        if !path.exists() {
            return Err(ContractError::missing_input(path));
        }
        Ok(std::fs::read_to_string(path)?)
    }

    /// Parse and validate configuration content
    fn parse_and_validate(
        content: &str,
        format: ConfigFormat,
    ) -> Result<DispatchConfig, ContractError> {
        let config = parser::parse(content, format)?;
        validator::validate(&config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::BackendKind;
    use std::io::Write;

    const BATCH_TOML: &str = r#"
working_dir = "/work/exp1"

[backend]
kind = "batch_queue"
queue = "ltg"
block_until_complete = false

[defaults]
name = "index"
threads = 4
max_malloc_gb = 0.5
after = "1001.pbs"
"#;

    #[test]
    fn test_load_from_str_toml() {
        let result = ConfigLoader::load_from_str(BATCH_TOML, ConfigFormat::Toml);
        assert!(result.is_ok(), "Failed: {:?}", result.err());
        let cfg = result.unwrap();
        assert_eq!(cfg.backend.label(), "batch_queue");
        assert_eq!(cfg.defaults.after.as_deref(), Some("1001.pbs"));
    }

    #[test]
    fn test_round_trip_toml() {
        let cfg = ConfigLoader::load_from_str(BATCH_TOML, ConfigFormat::Toml).unwrap();
        let serialized = ConfigLoader::to_toml(&cfg).unwrap();
        let cfg2 = ConfigLoader::load_from_str(&serialized, ConfigFormat::Toml).unwrap();
        assert_eq!(cfg.backend, cfg2.backend);
        assert_eq!(cfg.defaults, cfg2.defaults);
    }

    #[test]
    fn test_round_trip_json() {
        let cfg = ConfigLoader::load_from_str(BATCH_TOML, ConfigFormat::Toml).unwrap();
        let json = ConfigLoader::to_json(&cfg).unwrap();
        let cfg2 = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(cfg.working_dir, cfg2.working_dir);
    }

    #[test]
    fn test_validation_runs_after_parse() {
        let content = r#"
[backend]
kind = "distributed_ranks"
hosts = ["node01"]
hosts_file = "/etc/mpi/hosts"
"#;
        let result = ConfigLoader::load_from_str(content, ConfigFormat::Toml);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("mutually exclusive"));
    }

    #[test]
    fn test_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mtsh.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[backend]\nkind = \"thread_pool\"\nthreads = 3").unwrap();

        let cfg = ConfigLoader::load_from_path(&path).unwrap();
        assert!(matches!(cfg.backend, BackendKind::ThreadPool(ref s) if s.threads == 3));
    }

    #[test]
    fn test_load_missing_file() {
        let err = ConfigLoader::load_from_path(Path::new("/nonexistent/mtsh.toml")).unwrap_err();
        assert!(matches!(err, ContractError::MissingInput { .. }));
    }

    #[test]
    fn test_unsupported_extension() {
        let err = ConfigLoader::load_from_path(Path::new("mtsh.yaml")).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }
}
