//! 作业分发指标收集模块
//!
//! 记录提交、启动失败与排空 (wait) 指标，并在内存中聚合提交延迟。

use contracts::DrainReport;
use metrics::{counter, gauge, histogram};

/// 记录作业提交成功
pub fn record_job_submitted(backend: &str) {
    counter!(
        "mtsh_jobs_submitted_total",
        "backend" => backend.to_string()
    )
    .increment(1);
}

/// 记录后端拒绝提交 (LaunchError)
pub fn record_launch_failure(backend: &str) {
    counter!(
        "mtsh_launch_failures_total",
        "backend" => backend.to_string()
    )
    .increment(1);
}

/// 记录本地作业执行失败 (仅 local 后端可见)
pub fn record_job_failed(backend: &str) {
    counter!(
        "mtsh_jobs_failed_total",
        "backend" => backend.to_string()
    )
    .increment(1);
}

/// 记录单次提交耗时
pub fn record_submit_latency_ms(backend: &str, latency_ms: f64) {
    histogram!(
        "mtsh_submit_latency_ms",
        "backend" => backend.to_string()
    )
    .record(latency_ms);
}

/// 记录 wait 结果
pub fn record_drain(backend: &str, report: &DrainReport, elapsed_secs: f64) {
    gauge!(
        "mtsh_drain_joined",
        "backend" => backend.to_string()
    )
    .set(report.joined as f64);
    if report.failed > 0 {
        counter!(
            "mtsh_drain_failed_total",
            "backend" => backend.to_string()
        )
        .increment(report.failed as u64);
    }
    histogram!(
        "mtsh_drain_duration_seconds",
        "backend" => backend.to_string()
    )
    .record(elapsed_secs);
}

/// 分发统计聚合器
///
/// 在内存中聚合指标，便于在运行结束时输出摘要。
#[derive(Debug, Clone, Default)]
pub struct DispatchStats {
    /// 成功提交的作业数
    pub submitted: u64,
    /// 提交失败数
    pub failed: u64,
    /// 提交耗时统计
    pub submit_latency_ms: RunningStats,
    /// wait 结果
    pub drain: Option<DrainReport>,
}

impl DispatchStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次提交
    pub fn record_submit(&mut self, latency_ms: f64, success: bool) {
        if success {
            self.submitted += 1;
        } else {
            self.failed += 1;
        }
        self.submit_latency_ms.push(latency_ms);
    }

    pub fn record_drain(&mut self, report: DrainReport) {
        self.drain = Some(report);
    }
}

impl std::fmt::Display for DispatchStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Dispatch Summary ===")?;
        writeln!(f, "Submitted: {}", self.submitted)?;
        writeln!(f, "Failed submissions: {}", self.failed)?;
        writeln!(f, "Submit latency (ms): {}", StatsSummary::from(&self.submit_latency_ms))?;
        match self.drain {
            Some(report) => writeln!(
                f,
                "Drained: {} joined, {} unsuccessful",
                report.joined, report.failed
            ),
            None => writeln!(f, "Drained: not yet"),
        }
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count(),
            min: stats.min(),
            max: stats.max(),
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "mean={:.2}, std={:.2}, min={:.2}, max={:.2} (n={})",
                self.mean, self.std_dev, self.min, self.max, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
