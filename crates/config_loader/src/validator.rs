//! 配置校验模块
//!
//! 校验规则：
//! - defaults.threads >= 1, defaults.max_malloc_gb >= 0 且有限
//! - defaults.name 非空且不含空白 (PBS 作业名)
//! - thread_pool.threads >= 1
//! - distributed_ranks: hosts 与 hosts_file 互斥，主机名非空
//! - batch_queue: queue 非空且不含空白，submit_program 非空

use contracts::{BackendKind, BatchSpec, ContractError, DispatchConfig, JobDefaults, RankSpec};
use ::validator::Validate;

/// 校验 DispatchConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &DispatchConfig) -> Result<(), ContractError> {
    validate_defaults(&config.defaults)?;
    validate_backend(&config.backend)?;
    Ok(())
}

/// 校验作业默认值
fn validate_defaults(defaults: &JobDefaults) -> Result<(), ContractError> {
    defaults
        .validate()
        .map_err(|e| ContractError::config_validation("defaults", e.to_string()))?;

    if !defaults.max_malloc_gb.is_finite() {
        return Err(ContractError::config_validation(
            "defaults.max_malloc_gb",
            format!("must be finite, got {}", defaults.max_malloc_gb),
        ));
    }

    if defaults.name.chars().any(char::is_whitespace) {
        return Err(ContractError::config_validation(
            "defaults.name",
            format!("job name '{}' must not contain whitespace", defaults.name),
        ));
    }

    Ok(())
}

/// 校验后端配置
fn validate_backend(backend: &BackendKind) -> Result<(), ContractError> {
    match backend {
        BackendKind::Local => Ok(()),
        BackendKind::ThreadPool(spec) => spec
            .validate()
            .map_err(|e| ContractError::config_validation("backend.threads", e.to_string())),
        BackendKind::DistributedRanks(spec) => validate_ranks(spec),
        BackendKind::BatchQueue(spec) => validate_batch(spec),
    }
}

fn validate_ranks(spec: &RankSpec) -> Result<(), ContractError> {
    if !spec.hosts.is_empty() && spec.hosts_file.is_some() {
        return Err(ContractError::config_validation(
            "backend.hosts / backend.hosts_file",
            "hosts and hosts_file are mutually exclusive",
        ));
    }

    if let Some(idx) = spec.hosts.iter().position(|h| h.trim().is_empty()) {
        return Err(ContractError::config_validation(
            format!("backend.hosts[{idx}]"),
            "host name cannot be empty",
        ));
    }

    Ok(())
}

fn validate_batch(spec: &BatchSpec) -> Result<(), ContractError> {
    if let Some(ref queue) = spec.queue {
        if queue.is_empty() || queue.chars().any(char::is_whitespace) {
            return Err(ContractError::config_validation(
                "backend.queue",
                format!("invalid queue name '{queue}'"),
            ));
        }
    }

    if spec.submit_program.trim().is_empty() {
        return Err(ContractError::config_validation(
            "backend.submit_program",
            "submit program cannot be empty",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::PoolSpec;
    use std::path::PathBuf;

    fn ranks(hosts: &[&str], hosts_file: Option<&str>) -> DispatchConfig {
        DispatchConfig {
            backend: BackendKind::DistributedRanks(RankSpec {
                processes: 4,
                hosts: hosts.iter().map(|h| h.to_string()).collect(),
                hosts_file: hosts_file.map(PathBuf::from),
                mpi_dir: None,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&DispatchConfig::default()).is_ok());
        assert!(validate(&ranks(&["a", "b"], None)).is_ok());
        assert!(validate(&ranks(&[], Some("hosts.txt"))).is_ok());
    }

    #[test]
    fn test_hosts_and_hosts_file_conflict() {
        let result = validate(&ranks(&["node01"], Some("hosts.txt")));
        let err = result.unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("mutually exclusive"), "got: {err}");
    }

    #[test]
    fn test_empty_host_name() {
        let err = validate(&ranks(&["node01", " "], None)).unwrap_err();
        assert!(err.to_string().contains("backend.hosts[1]"), "got: {err}");
    }

    #[test]
    fn test_zero_pool_threads() {
        let cfg = DispatchConfig {
            backend: BackendKind::ThreadPool(PoolSpec { threads: 0 }),
            ..Default::default()
        };
        let err = validate(&cfg).unwrap_err();
        assert!(err.to_string().contains("backend.threads"), "got: {err}");
    }

    #[test]
    fn test_negative_memory() {
        let mut cfg = DispatchConfig::default();
        cfg.defaults.max_malloc_gb = -1.0;
        assert!(validate(&cfg).is_err());

        cfg.defaults.max_malloc_gb = f64::INFINITY;
        let err = validate(&cfg).unwrap_err();
        assert!(err.to_string().contains("must be finite"), "got: {err}");
    }

    #[test]
    fn test_job_name_with_whitespace() {
        let mut cfg = DispatchConfig::default();
        cfg.defaults.name = "two words".into();
        let err = validate(&cfg).unwrap_err();
        assert!(err.to_string().contains("whitespace"), "got: {err}");
    }

    #[test]
    fn test_bad_queue_name() {
        let cfg = DispatchConfig {
            backend: BackendKind::BatchQueue(BatchSpec {
                queue: Some("long queue".into()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let err = validate(&cfg).unwrap_err();
        assert!(err.to_string().contains("invalid queue name"), "got: {err}");
    }
}
