use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::{DeleteTask, DispatcherFault};
use crate::errors::ShortenerError;
use crate::repository::UrlRepository;

// worker panic 依赖展开才能被捕获并上报
#[cfg(panic = "abort")]
compile_error!("delete workers require panic = \"unwind\" to report panics as faults");

/// 删除 worker：从自己的分区队列取任务，合并后批量软删除
pub(super) struct Worker {
    id: usize,
    repository: Arc<UrlRepository>,
    receiver: mpsc::Receiver<DeleteTask>,
    faults: mpsc::Sender<DispatcherFault>,
    max_batch: usize,
    fault_threshold: u32,
    consecutive_failures: u32,
}

impl Worker {
    pub(super) fn new(
        id: usize,
        repository: Arc<UrlRepository>,
        receiver: mpsc::Receiver<DeleteTask>,
        faults: mpsc::Sender<DispatcherFault>,
        max_batch: usize,
        fault_threshold: u32,
    ) -> Self {
        Self {
            id,
            repository,
            receiver,
            faults,
            max_batch,
            fault_threshold,
            consecutive_failures: 0,
        }
    }

    pub(super) async fn run(mut self) {
        debug!("Delete worker {} started", self.id);

        while let Some(first) = self.receiver.recv().await {
            let mut tasks = vec![first];
            while tasks.len() < self.max_batch {
                match self.receiver.try_recv() {
                    Ok(task) => tasks.push(task),
                    Err(_) => break,
                }
            }

            for (user_id, short_ids) in coalesce(tasks) {
                let outcome = AssertUnwindSafe(
                    self.repository.set_deleted_batch(&user_id, &short_ids),
                )
                .catch_unwind()
                .await;

                match outcome {
                    Ok(Ok(affected)) => {
                        self.consecutive_failures = 0;
                        debug!(
                            "Worker {} marked {}/{} id(s) deleted for user {}",
                            self.id,
                            affected,
                            short_ids.len(),
                            user_id
                        );
                    }
                    Ok(Err(e)) => self.on_failure(&user_id, short_ids.len(), e),
                    Err(payload) => {
                        let message = panic_message(payload.as_ref());
                        error!("Delete worker {} panicked: {}", self.id, message);
                        self.report(DispatcherFault::WorkerPanicked {
                            worker: self.id,
                            message,
                        });
                        return;
                    }
                }
            }
        }

        info!("Delete worker {} stopped", self.id);
    }

    fn on_failure(&mut self, user_id: &str, count: usize, err: ShortenerError) {
        if !err.is_systemic() {
            self.consecutive_failures = 0;
            warn!(
                "Worker {} dropped delete of {} id(s) for user {}: {}",
                self.id, count, user_id, err
            );
            return;
        }

        self.consecutive_failures += 1;
        warn!(
            "Worker {} failed to delete {} id(s) for user {} ({} in a row): {}",
            self.id, count, user_id, self.consecutive_failures, err
        );

        // 每轮连续失败只上报一次
        if self.consecutive_failures == self.fault_threshold {
            error!(
                "Delete worker {} reached failure threshold ({})",
                self.id, self.fault_threshold
            );
            self.report(DispatcherFault::Systemic {
                worker: self.id,
                consecutive: self.consecutive_failures,
                error: err,
            });
        }
    }

    fn report(&self, fault: DispatcherFault) {
        if let Err(e) = self.faults.try_send(fault) {
            debug!("Fault channel unavailable, dropping report: {}", e);
        }
    }
}

/// 按用户合并任务，保持用户首次出现的顺序以及各用户内部的 ID 顺序
fn coalesce(tasks: Vec<DeleteTask>) -> Vec<(String, Vec<String>)> {
    let mut batches: Vec<(String, Vec<String>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for task in tasks {
        match index.get(&task.user_id) {
            Some(&pos) => batches[pos].1.extend(task.short_ids),
            None => {
                index.insert(task.user_id.clone(), batches.len());
                batches.push((task.user_id, task.short_ids));
            }
        }
    }

    batches
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
