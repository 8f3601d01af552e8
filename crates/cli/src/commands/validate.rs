//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::{BackendKind, DispatchConfig};

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    backend: String,
    job_name: String,
    threads: u32,
    max_malloc_gb: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    working_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    toolkit_dir: Option<String>,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    backend: config.backend.label().to_string(),
                    job_name: config.defaults.name.clone(),
                    threads: config.defaults.threads,
                    max_malloc_gb: config.defaults.max_malloc_gb,
                    working_dir: config.working_dir.map(|d| d.display().to_string()),
                    toolkit_dir: config.toolkit_dir.map(|d| d.display().to_string()),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &DispatchConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    match &config.backend {
        BackendKind::ThreadPool(_) | BackendKind::DistributedRanks(_)
            if config.toolkit_dir.is_none() =>
        {
            warnings.push(
                "toolkit_dir not set - worker shims are searched next to the mtsh executable"
                    .to_string(),
            );
        }
        BackendKind::BatchQueue(spec) if !spec.block_until_complete => {
            warnings.push(
                "block_until_complete is false - wait returns before batch jobs finish"
                    .to_string(),
            );
        }
        _ => {}
    }

    if config.defaults.logfile.is_some() && !matches!(config.backend, BackendKind::Local) {
        warnings.push(
            "defaults.logfile is shared by every job - later jobs overwrite earlier output"
                .to_string(),
        );
    }

    if config.defaults.max_malloc_gb == 0.0 && matches!(config.backend, BackendKind::BatchQueue(_)) {
        warnings.push("max_malloc_gb is 0 - batch jobs request no memory".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Backend: {}", summary.backend);
            println!("  Job name: {}", summary.job_name);
            println!("  Threads: {}", summary.threads);
            println!("  Max malloc (GB): {}", summary.max_malloc_gb);
            if let Some(ref dir) = summary.working_dir {
                println!("  Working dir: {}", dir);
            }
            if let Some(ref dir) = summary.toolkit_dir {
                println!("  Toolkit dir: {}", dir);
            }
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(file, "{body}").unwrap();
        file
    }

    #[test]
    fn test_valid_config_summary() {
        let file = write_config("[backend]\nkind = \"batch_queue\"\nqueue = \"ltg\"\n");
        let result = validate_config(&ValidateArgs {
            config: file.path().to_path_buf(),
            json: true,
        });

        assert!(result.valid);
        let summary = result.summary.unwrap();
        assert_eq!(summary.backend, "batch_queue");
        assert_eq!(summary.job_name, "mtsh");
        assert!(result.warnings.is_none());
    }

    #[test]
    fn test_invalid_config_reports_error() {
        let file = write_config("[backend]\nkind = \"thread_pool\"\nthreads = 0\n");
        let result = validate_config(&ValidateArgs {
            config: file.path().to_path_buf(),
            json: false,
        });

        assert!(!result.valid);
        assert!(result.error.is_some());
    }

    #[test]
    fn test_warnings() {
        let file = write_config("[backend]\nkind = \"thread_pool\"\n");
        let result = validate_config(&ValidateArgs {
            config: file.path().to_path_buf(),
            json: false,
        });
        assert_eq!(result.warnings.unwrap().len(), 1);
    }
}
