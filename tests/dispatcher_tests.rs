//! Delete dispatcher tests
//!
//! 调度器 + 仓储 + 真实存储（SQLite / 文件日志）的端到端行为。

use std::sync::Arc;
use std::time::Duration;

use shortener::config::DispatcherConfig;
use shortener::dispatcher::{DeleteDispatcher, DeleteTask, DispatcherState};
use shortener::repository::{IdGenerator, UrlRepository};
use shortener::storage::{FileStorage, IdKind, SeaOrmStorage, UrlEntity, UrlStorage};
use tempfile::TempDir;

fn dispatcher_config() -> DispatcherConfig {
    DispatcherConfig {
        workers: 3,
        queue_capacity: 256,
        enqueue_timeout_ms: 200,
        max_batch: 8,
        fault_threshold: 5,
    }
}

async fn sqlite_repository() -> (Arc<UrlRepository>, TempDir) {
    let dir = TempDir::new().unwrap();
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
    let storage = SeaOrmStorage::new(&url, "sqlite", 1).await.unwrap();
    let repository = UrlRepository::new(
        Arc::new(storage),
        Duration::from_secs(5),
        IdGenerator::new(IdKind::Uuid, 0, 1),
    );
    (Arc::new(repository), dir)
}

fn file_repository() -> (Arc<UrlRepository>, TempDir) {
    let dir = TempDir::new().unwrap();
    let storage = FileStorage::open(dir.path().join("storage.txt")).unwrap();
    let repository = UrlRepository::new(
        Arc::new(storage),
        Duration::from_secs(5),
        IdGenerator::new(IdKind::Random, 5, 10),
    );
    (Arc::new(repository), dir)
}

/// 为每个用户写入 `per_user` 条记录，返回 (user, short_ids)
async fn seed(repository: &UrlRepository, users: usize, per_user: usize) -> Vec<(String, Vec<String>)> {
    let mut seeded = Vec::new();
    for u in 0..users {
        let user = format!("user-{}", u);
        let mut ids = Vec::new();
        for i in 0..per_user {
            let id = format!("u{}i{}", u, i);
            repository
                .add_entity(UrlEntity::new(
                    user.clone(),
                    id.clone(),
                    format!("https://example.com/{}/{}", u, i),
                ))
                .await
                .unwrap();
            ids.push(id);
        }
        seeded.push((user, ids));
    }
    seeded
}

// =============================================================================
// 端到端删除
// =============================================================================

#[cfg(test)]
mod pipeline_tests {
    use super::*;

    async fn concurrent_deletes_are_applied(repository: Arc<UrlRepository>) {
        let seeded = seed(&repository, 6, 10).await;
        let (dispatcher, _faults) = DeleteDispatcher::start(repository.clone(), &dispatcher_config());

        // 每个用户的请求来自独立任务，并发投递
        let mut handles = Vec::new();
        for (user, ids) in seeded.clone() {
            let dispatcher = dispatcher.clone();
            handles.push(tokio::spawn(async move {
                for chunk in ids.chunks(3) {
                    dispatcher
                        .submit(DeleteTask::new(user.clone(), chunk.to_vec()))
                        .await
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let report = dispatcher.shutdown(Duration::from_secs(10)).await;
        assert_eq!(report.aborted, 0);
        assert_eq!(dispatcher.state(), DispatcherState::Stopped);

        for (user, ids) in seeded {
            for id in ids {
                assert!(
                    repository.select_by_short_id(&id).await.unwrap().is_none(),
                    "{} of {} should be deleted",
                    id,
                    user
                );
                let raw = repository.lookup(&id).await.unwrap().unwrap();
                assert!(raw.deleted);
            }
        }
    }

    #[tokio::test]
    async fn test_concurrent_deletes_sqlite() {
        let (repository, _dir) = sqlite_repository().await;
        concurrent_deletes_are_applied(repository).await;
    }

    #[tokio::test]
    async fn test_concurrent_deletes_file() {
        let (repository, _dir) = file_repository();
        concurrent_deletes_are_applied(repository).await;
    }

    #[tokio::test]
    async fn test_foreign_ids_are_untouched() {
        let (repository, _dir) = sqlite_repository().await;
        let seeded = seed(&repository, 2, 3).await;
        let (dispatcher, _faults) = DeleteDispatcher::start(repository.clone(), &dispatcher_config());

        let (_, victim_ids) = &seeded[0];
        let (attacker, _) = &seeded[1];
        dispatcher
            .submit(DeleteTask::new(attacker.clone(), victim_ids.clone()))
            .await
            .unwrap();
        dispatcher.shutdown(Duration::from_secs(5)).await;

        for id in victim_ids {
            assert!(repository.select_by_short_id(id).await.unwrap().is_some());
        }
    }

    #[tokio::test]
    async fn test_unknown_and_repeated_ids_are_ignored() {
        let (repository, _dir) = file_repository();
        let seeded = seed(&repository, 1, 2).await;
        let (user, ids) = seeded[0].clone();
        let (dispatcher, mut faults) = DeleteDispatcher::start(repository.clone(), &dispatcher_config());

        let mut request = ids.clone();
        request.push("missing".to_string());
        request.push(ids[0].clone());
        dispatcher
            .submit(DeleteTask::new(user.clone(), request.clone()))
            .await
            .unwrap();
        dispatcher
            .submit(DeleteTask::new(user.clone(), request))
            .await
            .unwrap();
        dispatcher.shutdown(Duration::from_secs(5)).await;

        assert!(repository.select_by_user(&user).await.unwrap().iter().all(|e| e.deleted));
        assert!(faults.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_file_deletes_survive_restart() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("storage.txt");

        {
            let storage = FileStorage::open(&path).unwrap();
            let repository = Arc::new(UrlRepository::new(
                Arc::new(storage),
                Duration::from_secs(5),
                IdGenerator::new(IdKind::Random, 5, 10),
            ));
            let seeded = seed(&repository, 1, 3).await;
            let (user, ids) = seeded[0].clone();

            let (dispatcher, _faults) = DeleteDispatcher::start(repository.clone(), &dispatcher_config());
            dispatcher
                .submit(DeleteTask::new(user, ids[..2].to_vec()))
                .await
                .unwrap();
            dispatcher.shutdown(Duration::from_secs(5)).await;
            repository.close().await.unwrap();
        }

        let storage = FileStorage::open(&path).unwrap();
        assert!(storage.select_by_short_id("u0i0").await.unwrap().unwrap().deleted);
        assert!(storage.select_by_short_id("u0i1").await.unwrap().unwrap().deleted);
        assert!(!storage.select_by_short_id("u0i2").await.unwrap().unwrap().deleted);
    }
}
