//! # Dispatcher
//!
//! 作业分发模块。
//!
//! 负责：
//! - 按配置选择执行后端（本地 / 线程池 / MPI / PBS）
//! - 定位工具包中的 worker shim 与 mpirun
//! - 统一的 `run` / `wait` 生命周期

pub mod backends;
pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod toolkit;
pub mod worker;

#[cfg(all(test, unix))]
mod testutil;

pub use backends::{
    render_script, AnyBackend, BatchQueueBackend, DistributedRanksBackend, LocalBackend,
    RankPlacement, ThreadPoolBackend,
};
pub use contracts::{Job, JobBackend};
pub use dispatcher::{create_dispatcher, Dispatcher, DispatcherBuilder};
pub use error::DispatcherError;
pub use metrics::{DispatchMetrics, MetricsSnapshot};
pub use toolkit::{locate_mpirun, Toolkit};
pub use worker::WorkerHandle;
