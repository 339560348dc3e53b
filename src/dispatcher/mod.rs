//! 异步删除调度器
//!
//! HTTP 处理器通过 `submit` 投递删除任务后立即返回 202，由后台 worker 池异步执行软删除：
//! - 有界队列，按 `user_id` 哈希分区到各 worker，同一用户的任务按投递顺序执行
//! - 队列满时最多等待 `enqueue_timeout`，之后返回 `QueueFull`，不会卡住请求
//! - 生命周期 `Running -> Draining -> Stopped`，关闭时处理完已入队的任务
//! - 单条失败只记录日志；连续的系统性失败或 worker panic 通过故障通道上报给主循环

mod worker;

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use futures_util::future::join_all;
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::DispatcherConfig;
use crate::errors::{Result, ShortenerError};
use crate::repository::UrlRepository;

use worker::Worker;

/// 一次删除请求：某个用户的一组短 ID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteTask {
    pub user_id: String,
    pub short_ids: Vec<String>,
}

impl DeleteTask {
    pub fn new(user_id: impl Into<String>, short_ids: Vec<String>) -> Self {
        Self {
            user_id: user_id.into(),
            short_ids,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::AsRefStr, strum::Display)]
pub enum DispatcherState {
    Running,
    Draining,
    Stopped,
}

impl DispatcherState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => DispatcherState::Running,
            1 => DispatcherState::Draining,
            _ => DispatcherState::Stopped,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            DispatcherState::Running => 0,
            DispatcherState::Draining => 1,
            DispatcherState::Stopped => 2,
        }
    }
}

/// 上报给主循环的故障
#[derive(Debug, Clone)]
pub enum DispatcherFault {
    /// 连续系统性失败达到阈值
    Systemic {
        worker: usize,
        consecutive: u32,
        error: ShortenerError,
    },
    /// worker 执行任务时 panic，该 worker 已退出
    WorkerPanicked { worker: usize, message: String },
}

impl std::fmt::Display for DispatcherFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatcherFault::Systemic {
                worker,
                consecutive,
                error,
            } => write!(
                f,
                "delete worker {} failed {} times in a row: {}",
                worker, consecutive, error
            ),
            DispatcherFault::WorkerPanicked { worker, message } => {
                write!(f, "delete worker {} panicked: {}", worker, message)
            }
        }
    }
}

pub type FaultReceiver = mpsc::Receiver<DispatcherFault>;

/// 关闭结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DrainReport {
    /// 在宽限期内正常退出的 worker 数
    pub completed: usize,
    /// 超时后被强制中止的 worker 数
    pub aborted: usize,
}

pub struct DeleteDispatcher {
    /// 关闭时置为 None，worker 在队列耗尽后自然退出
    senders: RwLock<Option<Vec<mpsc::Sender<DeleteTask>>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    state: AtomicU8,
    enqueue_timeout: Duration,
}

impl DeleteDispatcher {
    /// 启动 worker 池，返回调度器与故障接收端
    ///
    /// 必须在 tokio 运行时内调用。
    pub fn start(
        repository: Arc<UrlRepository>,
        config: &DispatcherConfig,
    ) -> (Arc<Self>, FaultReceiver) {
        let worker_count = config.workers.max(1);
        let partition_capacity = (config.queue_capacity / worker_count).max(1);
        let (fault_tx, fault_rx) = mpsc::channel(worker_count * 2);

        let mut senders = Vec::with_capacity(worker_count);
        let mut handles = Vec::with_capacity(worker_count);
        for id in 0..worker_count {
            let (tx, rx) = mpsc::channel(partition_capacity);
            let worker = Worker::new(
                id,
                repository.clone(),
                rx,
                fault_tx.clone(),
                config.max_batch.max(1),
                config.fault_threshold.max(1),
            );
            senders.push(tx);
            handles.push(tokio::spawn(worker.run()));
        }

        info!(
            "Delete dispatcher started: {} worker(s), {} slot(s) per worker",
            worker_count, partition_capacity
        );

        let dispatcher = Arc::new(Self {
            senders: RwLock::new(Some(senders)),
            workers: Mutex::new(handles),
            state: AtomicU8::new(DispatcherState::Running.as_u8()),
            enqueue_timeout: Duration::from_millis(config.enqueue_timeout_ms),
        });

        (dispatcher, fault_rx)
    }

    pub fn state(&self) -> DispatcherState {
        DispatcherState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// 当前排队中的任务数
    pub fn queued(&self) -> usize {
        self.senders
            .read()
            .as_ref()
            .map(|senders| {
                senders
                    .iter()
                    .map(|s| s.max_capacity() - s.capacity())
                    .sum()
            })
            .unwrap_or(0)
    }

    /// 投递删除任务，不等待执行结果
    pub async fn submit(&self, task: DeleteTask) -> Result<()> {
        if task.short_ids.is_empty() {
            return Ok(());
        }

        let sender = {
            let guard = self.senders.read();
            match guard.as_ref() {
                Some(senders) if self.state() == DispatcherState::Running => {
                    senders[partition(&task.user_id, senders.len())].clone()
                }
                _ => {
                    return Err(ShortenerError::dispatcher_closed(
                        "delete dispatcher is shutting down",
                    ));
                }
            }
        };

        match sender.send_timeout(task, self.enqueue_timeout).await {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(task)) => {
                warn!(
                    "Delete queue full, rejecting {} id(s) for user {}",
                    task.short_ids.len(),
                    task.user_id
                );
                Err(ShortenerError::queue_full(format!(
                    "delete queue is full (waited {:?})",
                    self.enqueue_timeout
                )))
            }
            Err(SendTimeoutError::Closed(_)) => Err(ShortenerError::dispatcher_closed(
                "delete worker is no longer running",
            )),
        }
    }

    /// 优雅关闭
    ///
    /// 进入 `Draining` 后拒绝新任务，worker 处理完已入队的任务后退出；
    /// 超过 `grace` 仍未退出的 worker 会被中止。
    pub async fn shutdown(&self, grace: Duration) -> DrainReport {
        if self
            .state
            .compare_exchange(
                DispatcherState::Running.as_u8(),
                DispatcherState::Draining.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return DrainReport::default();
        }

        info!("Delete dispatcher draining ({} queued)", self.queued());

        // 丢弃发送端，队列耗尽后 recv 返回 None
        drop(self.senders.write().take());

        let mut handles = std::mem::take(&mut *self.workers.lock());
        let total = handles.len();

        if tokio::time::timeout(grace, join_all(handles.iter_mut()))
            .await
            .is_err()
        {
            warn!("Delete dispatcher did not drain within {:?}", grace);
        }

        let mut aborted = 0;
        for handle in &handles {
            if !handle.is_finished() {
                handle.abort();
                aborted += 1;
            }
        }

        self.state
            .store(DispatcherState::Stopped.as_u8(), Ordering::Release);

        let report = DrainReport {
            completed: total - aborted,
            aborted,
        };
        info!(
            "Delete dispatcher stopped: {} worker(s) finished, {} aborted",
            report.completed, report.aborted
        );
        report
    }
}

/// 同一用户总是落在同一个分区
fn partition(user_id: &str, partitions: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    user_id.hash(&mut hasher);
    (hasher.finish() % partitions as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::IdGenerator;
    use crate::storage::{IdKind, UrlEntity, UrlStorage};
    use async_trait::async_trait;
    use tokio::sync::{Notify, Semaphore};

    /// 记录调用的 mock 存储，可选阻塞 / 失败 / panic
    #[derive(Default)]
    struct MockStorage {
        calls: parking_lot::Mutex<Vec<(String, Vec<String>)>>,
        entered: Notify,
        gate: Option<Semaphore>,
        fail_with: Option<ShortenerError>,
        panic: bool,
    }

    impl MockStorage {
        fn gated() -> Self {
            Self {
                gate: Some(Semaphore::new(0)),
                ..Default::default()
            }
        }

        fn failing(err: ShortenerError) -> Self {
            Self {
                fail_with: Some(err),
                ..Default::default()
            }
        }

        fn calls(&self) -> Vec<(String, Vec<String>)> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl UrlStorage for MockStorage {
        fn backend_name(&self) -> &str {
            "mock"
        }
        fn id_kind(&self) -> IdKind {
            IdKind::Random
        }
        async fn add_entity(&self, _: UrlEntity) -> Result<()> {
            Ok(())
        }
        async fn select_by_long_url(&self, _: &str) -> Result<Option<UrlEntity>> {
            Ok(None)
        }
        async fn select_by_short_id(&self, _: &str) -> Result<Option<UrlEntity>> {
            Ok(None)
        }
        async fn select_by_user(&self, _: &str) -> Result<Vec<UrlEntity>> {
            Ok(Vec::new())
        }
        async fn add_entity_batch(&self, _: &str, _: Vec<UrlEntity>) -> Result<()> {
            Ok(())
        }
        async fn set_deleted_batch(&self, user_id: &str, short_ids: &[String]) -> Result<u64> {
            self.entered.notify_one();
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
            if self.panic {
                panic!("storage exploded");
            }
            if let Some(err) = &self.fail_with {
                return Err(err.clone());
            }
            self.calls
                .lock()
                .push((user_id.to_string(), short_ids.to_vec()));
            Ok(short_ids.len() as u64)
        }
        async fn ping(&self) -> Result<()> {
            Ok(())
        }
    }

    fn repository(storage: Arc<MockStorage>) -> Arc<UrlRepository> {
        Arc::new(UrlRepository::new(
            storage,
            Duration::from_secs(5),
            IdGenerator::new(IdKind::Random, 5, 10),
        ))
    }

    fn config(workers: usize, capacity: usize) -> DispatcherConfig {
        DispatcherConfig {
            workers,
            queue_capacity: capacity,
            enqueue_timeout_ms: 20,
            max_batch: 16,
            fault_threshold: 3,
        }
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_partition_is_stable() {
        for partitions in 1..8 {
            let p = partition("user-a", partitions);
            assert!(p < partitions);
            assert_eq!(p, partition("user-a", partitions));
        }
    }

    #[tokio::test]
    async fn test_submitted_tasks_are_applied_on_drain() {
        let storage = Arc::new(MockStorage::default());
        let (dispatcher, _faults) = DeleteDispatcher::start(repository(storage.clone()), &config(2, 64));
        assert_eq!(dispatcher.state(), DispatcherState::Running);

        dispatcher
            .submit(DeleteTask::new("alice", ids(&["a1", "a2"])))
            .await
            .unwrap();
        dispatcher
            .submit(DeleteTask::new("bob", ids(&["b1"])))
            .await
            .unwrap();

        let report = dispatcher.shutdown(Duration::from_secs(5)).await;
        assert_eq!(report, DrainReport { completed: 2, aborted: 0 });
        assert_eq!(dispatcher.state(), DispatcherState::Stopped);

        let mut applied: Vec<String> = storage
            .calls()
            .into_iter()
            .flat_map(|(_, ids)| ids)
            .collect();
        applied.sort();
        assert_eq!(applied, ids(&["a1", "a2", "b1"]));
    }

    #[tokio::test]
    async fn test_per_user_order_is_preserved() {
        let storage = Arc::new(MockStorage::default());
        let (dispatcher, _faults) = DeleteDispatcher::start(repository(storage.clone()), &config(4, 256));

        for i in 0..50 {
            dispatcher
                .submit(DeleteTask::new("alice", vec![format!("id{}", i)]))
                .await
                .unwrap();
        }
        dispatcher.shutdown(Duration::from_secs(5)).await;

        let applied: Vec<String> = storage
            .calls()
            .into_iter()
            .filter(|(user, _)| user == "alice")
            .flat_map(|(_, ids)| ids)
            .collect();
        let expected: Vec<String> = (0..50).map(|i| format!("id{}", i)).collect();
        assert_eq!(applied, expected);
    }

    #[tokio::test]
    async fn test_submit_after_shutdown_is_rejected() {
        let storage = Arc::new(MockStorage::default());
        let (dispatcher, _faults) = DeleteDispatcher::start(repository(storage), &config(1, 8));
        dispatcher.shutdown(Duration::from_secs(1)).await;

        let err = dispatcher
            .submit(DeleteTask::new("alice", ids(&["x"])))
            .await
            .unwrap_err();
        assert!(matches!(err, ShortenerError::DispatcherClosed(_)));
    }

    #[tokio::test]
    async fn test_empty_task_is_noop() {
        let storage = Arc::new(MockStorage::default());
        let (dispatcher, _faults) = DeleteDispatcher::start(repository(storage.clone()), &config(1, 8));
        dispatcher
            .submit(DeleteTask::new("alice", Vec::new()))
            .await
            .unwrap();
        dispatcher.shutdown(Duration::from_secs(1)).await;
        assert!(storage.calls().is_empty());
    }

    #[tokio::test]
    async fn test_full_queue_returns_error_instead_of_blocking() {
        let storage = Arc::new(MockStorage::gated());
        let (dispatcher, _faults) = DeleteDispatcher::start(repository(storage.clone()), &config(1, 1));

        // 第一个任务占住 worker
        dispatcher
            .submit(DeleteTask::new("alice", ids(&["first"])))
            .await
            .unwrap();
        storage.entered.notified().await;

        // 第二个任务占满队列
        dispatcher
            .submit(DeleteTask::new("alice", ids(&["second"])))
            .await
            .unwrap();
        assert_eq!(dispatcher.queued(), 1);

        let started = std::time::Instant::now();
        let err = dispatcher
            .submit(DeleteTask::new("alice", ids(&["third"])))
            .await
            .unwrap_err();
        assert!(matches!(err, ShortenerError::QueueFull(_)));
        assert!(started.elapsed() < Duration::from_secs(1));

        storage.gate.as_ref().unwrap().add_permits(10);
        dispatcher.shutdown(Duration::from_secs(5)).await;

        let applied: Vec<String> = storage
            .calls()
            .into_iter()
            .flat_map(|(_, ids)| ids)
            .collect();
        assert_eq!(applied, ids(&["first", "second"]));
    }

    #[tokio::test]
    async fn test_stuck_worker_is_aborted_after_grace() {
        let storage = Arc::new(MockStorage::gated());
        let (dispatcher, _faults) = DeleteDispatcher::start(repository(storage.clone()), &config(1, 4));

        dispatcher
            .submit(DeleteTask::new("alice", ids(&["stuck"])))
            .await
            .unwrap();
        storage.entered.notified().await;

        let report = dispatcher.shutdown(Duration::from_millis(50)).await;
        assert_eq!(report, DrainReport { completed: 0, aborted: 1 });
        assert_eq!(dispatcher.state(), DispatcherState::Stopped);
    }

    #[tokio::test]
    async fn test_item_failures_do_not_stop_worker() {
        let storage = Arc::new(MockStorage::failing(ShortenerError::validation("bad id")));
        let (dispatcher, mut faults) = DeleteDispatcher::start(repository(storage.clone()), &config(1, 16));

        for _ in 0..5 {
            dispatcher
                .submit(DeleteTask::new("alice", ids(&["x"])))
                .await
                .unwrap();
        }
        let report = dispatcher.shutdown(Duration::from_secs(5)).await;
        assert_eq!(report.completed, 1);
        assert!(faults.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_systemic_failures_are_reported() {
        let storage = Arc::new(MockStorage::failing(ShortenerError::database_connection(
            "connection refused",
        )));
        let mut cfg = config(1, 16);
        // 关闭合并，保证每个任务单独执行
        cfg.max_batch = 1;
        let (dispatcher, mut faults) = DeleteDispatcher::start(repository(storage), &cfg);

        for i in 0..3 {
            dispatcher
                .submit(DeleteTask::new("alice", vec![format!("id{}", i)]))
                .await
                .unwrap();
        }

        let fault = tokio::time::timeout(Duration::from_secs(5), faults.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(
            fault,
            DispatcherFault::Systemic { consecutive: 3, .. }
        ));
        dispatcher.shutdown(Duration::from_secs(1)).await;
    }

    #[tokio::test]
    async fn test_worker_panic_is_reported() {
        let storage = Arc::new(MockStorage {
            panic: true,
            ..Default::default()
        });
        let (dispatcher, mut faults) = DeleteDispatcher::start(repository(storage), &config(1, 16));

        dispatcher
            .submit(DeleteTask::new("alice", ids(&["boom"])))
            .await
            .unwrap();

        let fault = tokio::time::timeout(Duration::from_secs(5), faults.recv())
            .await
            .unwrap()
            .unwrap();
        match fault {
            DispatcherFault::WorkerPanicked { worker, message } => {
                assert_eq!(worker, 0);
                assert!(message.contains("storage exploded"));
            }
            other => panic!("unexpected fault: {:?}", other),
        }

        // 已退出的 worker 不再接收任务
        let err = dispatcher
            .submit(DeleteTask::new("alice", ids(&["after"])))
            .await
            .unwrap_err();
        assert!(matches!(err, ShortenerError::DispatcherClosed(_)));
    }
}
