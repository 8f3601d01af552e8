//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 端到端测试：通过伪造的 thrsh / mpish / mpirun / qsub 驱动真实子进程

#[cfg(test)]
mod contract_tests {
    use contracts::{BackendKind, DispatchConfig};

    #[test]
    fn test_default_config_snapshot() {
        let config = DispatchConfig::default();
        assert_eq!(config.backend, BackendKind::Local);
        assert_eq!(config.defaults.name, "mtsh");
        assert_eq!(config.defaults.threads, 1);
        assert_eq!(config.defaults.max_malloc_gb, 4.0);
    }

    #[test]
    fn test_config_roundtrips_through_loader() {
        let toml = r#"
            [backend]
            kind = "batch_queue"
            queue = "ltg"

            [defaults]
            name = "extract"
            max_malloc_gb = 0.5
        "#;
        let config =
            config_loader::ConfigLoader::load_from_str(toml, config_loader::ConfigFormat::Toml)
                .unwrap();
        let json = config_loader::ConfigLoader::to_json(&config).unwrap();
        let back =
            config_loader::ConfigLoader::load_from_str(&json, config_loader::ConfigFormat::Json)
                .unwrap();
        assert_eq!(back.backend, config.backend);
        assert_eq!(back.defaults, config.defaults);
    }
}

#[cfg(all(test, unix))]
mod e2e_tests {
    use std::fs;
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{CommandLine, ContractError, DispatchConfig, EnvSnapshot};
    use dispatcher::{Dispatcher, DispatcherError};

    const JOBS: usize = 5;

    /// Fake worker shim: log each line, then run it
    const LOGGING_WORKER: &str = r#"while IFS= read -r line; do
  echo "$line" >> invocations.log
  sh -c "$line"
done"#;

    /// Fake mpirun: exec the mpish argument
    const FAKE_MPIRUN: &str = r#"for a in "$@"; do case "$a" in */mpish) shim="$a";; esac; done
exec "$shim" --debug"#;

    /// Fake qsub: keep the script, print an id, run it
    const FAKE_QSUB: &str = r#"f=$(mktemp "$PWD/qsub-XXXXXX")
cat > "$f"
echo "$(basename "$f").fake"
grep -v '^#' "$f" | tail -n 1 >> invocations.log
sh "$f""#;

    fn write_script(path: &Path, body: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        {
            let mut file = fs::File::create(path).unwrap();
            writeln!(file, "#!/bin/sh\n{body}").unwrap();
            file.sync_all().unwrap();
        }
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    /// Scratch area with a toolkit, an MPI prefix and a fake submitter
    struct Sandbox {
        dir: tempfile::TempDir,
    }

    impl Sandbox {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let root = dir.path();
            write_script(&root.join("toolkit/bin/thrsh"), LOGGING_WORKER);
            write_script(&root.join("toolkit/scripts/mpish"), LOGGING_WORKER);
            write_script(&root.join("mpi/bin/mpirun"), FAKE_MPIRUN);
            write_script(&root.join("pbs/qsub"), FAKE_QSUB);
            fs::create_dir(root.join("work")).unwrap();
            Self { dir }
        }

        fn path(&self, rel: &str) -> PathBuf {
            self.dir.path().join(rel)
        }

        /// Parse a TOML backend section and point it at the sandbox
        fn config(&self, backend_toml: &str) -> DispatchConfig {
            let toml = format!(
                "toolkit_dir = {:?}\nworking_dir = {:?}\n\n{}",
                self.path("toolkit").display().to_string(),
                self.path("work").display().to_string(),
                backend_toml.replace("@ROOT@", &self.dir.path().display().to_string()),
            );
            ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap()
        }

        fn lines(&self, rel: &str) -> Vec<String> {
            fs::read_to_string(self.path(rel))
                .map(|s| s.lines().map(str::to_string).collect())
                .unwrap_or_default()
        }
    }

    /// Run `JOBS` jobs and check each ran exactly once
    async fn assert_each_job_runs_once(sandbox: &Sandbox, config: DispatchConfig) {
        let mut dispatcher = Dispatcher::from_config(&config, EnvSnapshot::empty())
            .await
            .unwrap();

        for i in 0..JOBS {
            dispatcher
                .run_command(CommandLine::shell(format!("echo job-{i} >> out.txt")))
                .await
                .unwrap();
        }
        let report = dispatcher.wait().await.unwrap();
        assert_eq!(report.failed, 0);

        let mut out = sandbox.lines("work/out.txt");
        out.sort();
        let expected: Vec<String> = (0..JOBS).map(|i| format!("job-{i}")).collect();
        assert_eq!(out, expected);
        assert_eq!(dispatcher.metrics().submitted, JOBS as u64);
    }

    #[tokio::test]
    async fn test_local_runs_each_job_once() {
        let sandbox = Sandbox::new();
        let config = sandbox.config("[backend]\nkind = \"local\"\n");
        assert_each_job_runs_once(&sandbox, config).await;
    }

    #[tokio::test]
    async fn test_thread_pool_runs_each_job_once() {
        let sandbox = Sandbox::new();
        let config = sandbox.config("[backend]\nkind = \"thread_pool\"\nthreads = 3\n");
        assert_each_job_runs_once(&sandbox, config).await;
        assert_eq!(sandbox.lines("work/invocations.log").len(), JOBS);
    }

    #[tokio::test]
    async fn test_distributed_ranks_runs_each_job_once() {
        let sandbox = Sandbox::new();
        let config = sandbox.config(
            "[backend]\nkind = \"distributed_ranks\"\nprocesses = 2\nmpi_dir = \"@ROOT@/mpi\"\n",
        );
        assert_each_job_runs_once(&sandbox, config).await;
        assert_eq!(sandbox.lines("work/invocations.log").len(), JOBS);
    }

    #[tokio::test]
    async fn test_batch_queue_runs_each_job_once() {
        let sandbox = Sandbox::new();
        let config = sandbox.config(
            "[backend]\nkind = \"batch_queue\"\nsubmit_program = \"@ROOT@/pbs/qsub\"\n",
        );
        assert_each_job_runs_once(&sandbox, config).await;
        assert_eq!(sandbox.lines("work/invocations.log").len(), JOBS);
    }

    #[tokio::test]
    async fn test_echo_then_wait_does_not_hang() {
        let sandbox = Sandbox::new();
        let config = sandbox.config("[backend]\nkind = \"thread_pool\"\n");
        let mut dispatcher = Dispatcher::from_config(&config, EnvSnapshot::empty())
            .await
            .unwrap();

        dispatcher
            .run_command(CommandLine::shell("echo hi > hi.txt"))
            .await
            .unwrap();
        let report = tokio::time::timeout(std::time::Duration::from_secs(10), dispatcher.wait())
            .await
            .expect("wait timed out")
            .unwrap();

        assert_eq!(report.joined, 1);
        assert_eq!(sandbox.lines("work/hi.txt"), vec!["hi"]);
    }

    #[tokio::test]
    async fn test_local_signal_is_fatal_and_synchronous() {
        let sandbox = Sandbox::new();
        let config = sandbox.config("[backend]\nkind = \"local\"\n");
        let mut dispatcher = Dispatcher::from_config(&config, EnvSnapshot::empty())
            .await
            .unwrap();

        let err = dispatcher
            .run_command(CommandLine::shell("kill -9 $$"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DispatcherError::Contract(ContractError::JobExecution { .. })
        ));
        assert_eq!(dispatcher.metrics().job_failures, 1);

        dispatcher
            .run_command(CommandLine::shell("true"))
            .await
            .unwrap();
        dispatcher.wait().await.unwrap();
    }

    #[tokio::test]
    async fn test_second_wait_is_a_no_op() {
        let sandbox = Sandbox::new();
        let config = sandbox.config(
            "[backend]\nkind = \"batch_queue\"\nsubmit_program = \"@ROOT@/pbs/qsub\"\n",
        );
        let mut dispatcher = Dispatcher::from_config(&config, EnvSnapshot::empty())
            .await
            .unwrap();

        dispatcher
            .run_command(CommandLine::shell("echo once >> out.txt"))
            .await
            .unwrap();
        let first = dispatcher.wait().await.unwrap();
        let second = dispatcher.wait().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(sandbox.lines("work/out.txt"), vec!["once"]);
        assert_eq!(sandbox.lines("work/invocations.log").len(), 1);
        assert!(matches!(
            dispatcher.run_command(CommandLine::shell("true")).await,
            Err(DispatcherError::Spent { .. })
        ));
    }

    #[tokio::test]
    async fn test_env_snapshot_reaches_batch_jobs() {
        let sandbox = Sandbox::new();
        let config = sandbox.config(
            "[backend]\nkind = \"batch_queue\"\nsubmit_program = \"@ROOT@/pbs/qsub\"\n",
        );
        let env = EnvSnapshot::from_pairs([("TMPDIR_SPEC", "/scratch/spec")]);
        let mut dispatcher = Dispatcher::from_config(&config, env).await.unwrap();

        dispatcher
            .run_command(CommandLine::shell("echo \"$TMPDIR_SPEC\" > env.txt"))
            .await
            .unwrap();
        dispatcher.wait().await.unwrap();

        assert_eq!(sandbox.lines("work/env.txt"), vec!["/scratch/spec"]);
    }

    #[tokio::test]
    async fn test_config_file_to_dispatcher() {
        let sandbox = Sandbox::new();
        let path = sandbox.path("mtsh.toml");
        fs::write(
            &path,
            format!(
                "working_dir = {:?}\n\n[defaults]\nlogfile = \"job.log\"\n",
                sandbox.path("work").display().to_string()
            ),
        )
        .unwrap();

        let config = ConfigLoader::load_from_path(&path).unwrap();
        let mut dispatcher = dispatcher::create_dispatcher(config).await.unwrap();
        dispatcher
            .run_command(CommandLine::shell("echo to-log >&2"))
            .await
            .unwrap();
        dispatcher.wait().await.unwrap();

        assert_eq!(sandbox.lines("work/job.log"), vec!["to-log"]);
    }

    #[tokio::test]
    async fn test_missing_shim_fails_before_any_launch() {
        let sandbox = Sandbox::new();
        fs::remove_file(sandbox.path("toolkit/scripts/mpish")).unwrap();
        let config = sandbox.config(
            "[backend]\nkind = \"distributed_ranks\"\nmpi_dir = \"@ROOT@/mpi\"\n",
        );

        let err = Dispatcher::from_config(&config, EnvSnapshot::empty())
            .await
            .err()
            .unwrap();
        assert!(err.is_configuration());
        assert!(sandbox.lines("work/invocations.log").is_empty());
    }
}
