//! 文件日志存储后端
//!
//! 内存中保存 `short_id -> UrlEntity` 映射，每次写入以 JSON 行追加到日志文件。
//! 启动时逐行回放日志重建内存状态。删除通过追加 `deleted: true` 的记录实现，
//! 从不改写已有内容。映射、长链接索引与日志写入由同一把锁保护。

use std::collections::{HashMap, HashSet};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::UrlStorage;
use super::models::{IdKind, UrlEntity};
use crate::errors::{Result, ShortenerError};

/// 回放统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplayStats {
    pub applied: usize,
    pub skipped: usize,
}

struct FileState {
    entities: HashMap<String, UrlEntity>,
    /// 未删除记录的 long_url -> short_id
    by_long_url: HashMap<String, String>,
    journal: File,
}

impl FileState {
    fn apply(&mut self, mut entity: UrlEntity) {
        // 删除是单调的，回放时不允许恢复
        if let Some(existing) = self.entities.get(&entity.short_id)
            && existing.deleted
        {
            entity.deleted = true;
        }

        if entity.deleted {
            if self.by_long_url.get(&entity.long_url) == Some(&entity.short_id) {
                self.by_long_url.remove(&entity.long_url);
            }
        } else {
            self.by_long_url
                .entry(entity.long_url.clone())
                .or_insert_with(|| entity.short_id.clone());
        }

        self.entities.insert(entity.short_id.clone(), entity);
    }

    fn check_insert(&self, entity: &UrlEntity) -> Result<()> {
        if self.entities.contains_key(&entity.short_id) {
            return Err(ShortenerError::short_id_taken(&entity.short_id));
        }
        if self.by_long_url.contains_key(&entity.long_url) {
            return Err(ShortenerError::unique_violation(&entity.long_url));
        }
        Ok(())
    }

    /// 一次性写入并刷盘，成功后才更新内存
    fn append(&mut self, records: &[UrlEntity]) -> Result<()> {
        let mut buf = Vec::new();
        for record in records {
            serde_json::to_writer(&mut buf, record)?;
            buf.push(b'\n');
        }
        self.journal.write_all(&buf)?;
        self.journal.flush()?;
        Ok(())
    }
}

pub struct FileStorage {
    path: PathBuf,
    state: Mutex<FileState>,
}

impl FileStorage {
    /// 打开（或创建）日志文件并回放已有记录
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        let mut journal = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| {
                ShortenerError::file_operation(format!(
                    "Failed to open storage file {}: {}",
                    path.display(),
                    e
                ))
            })?;

        // 上次写入被截断时补一个换行，避免新记录与残缺行粘连
        if ends_without_newline(&path)? {
            journal.write_all(b"\n")?;
        }

        let mut state = FileState {
            entities: HashMap::new(),
            by_long_url: HashMap::new(),
            journal,
        };

        let reader = BufReader::new(File::open(&path)?);
        let stats = replay(reader, &mut state)?;
        if stats.skipped > 0 {
            warn!(
                "Skipped {} corrupted record(s) while replaying {}",
                stats.skipped,
                path.display()
            );
        }
        info!(
            "File storage loaded {} record(s) from {}",
            stats.applied,
            path.display()
        );

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 内存中的记录数（包括已删除）
    pub fn len(&self) -> usize {
        self.state.lock().entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn ends_without_newline(path: &Path) -> Result<bool> {
    let mut file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

fn replay<R: BufRead>(reader: R, state: &mut FileState) -> Result<ReplayStats> {
    let mut stats = ReplayStats::default();

    // 按字节切行：截断在多字节字符中间的行只算作损坏，不中断回放
    for (index, line) in reader.split(b'\n').enumerate() {
        let line = line?;
        if line.trim_ascii().is_empty() {
            continue;
        }
        match serde_json::from_slice::<UrlEntity>(&line) {
            Ok(entity) => {
                state.apply(entity);
                stats.applied += 1;
            }
            Err(e) => {
                debug!("Journal line {} is not a valid record: {}", index + 1, e);
                stats.skipped += 1;
            }
        }
    }

    Ok(stats)
}

#[async_trait]
impl UrlStorage for FileStorage {
    fn backend_name(&self) -> &str {
        "file"
    }

    fn id_kind(&self) -> IdKind {
        IdKind::Random
    }

    async fn add_entity(&self, entity: UrlEntity) -> Result<()> {
        let mut state = self.state.lock();
        state.check_insert(&entity)?;
        state.append(std::slice::from_ref(&entity))?;
        state.apply(entity);
        Ok(())
    }

    async fn select_by_long_url(&self, long_url: &str) -> Result<Option<UrlEntity>> {
        let state = self.state.lock();
        Ok(state
            .by_long_url
            .get(long_url)
            .and_then(|id| state.entities.get(id))
            .cloned())
    }

    async fn select_by_short_id(&self, short_id: &str) -> Result<Option<UrlEntity>> {
        Ok(self.state.lock().entities.get(short_id).cloned())
    }

    async fn select_by_user(&self, user_id: &str) -> Result<Vec<UrlEntity>> {
        let state = self.state.lock();
        Ok(state
            .entities
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn add_entity_batch(&self, user_id: &str, entities: Vec<UrlEntity>) -> Result<()> {
        if entities.is_empty() {
            return Ok(());
        }

        let mut state = self.state.lock();

        // 先整体校验（含批次内部重复），再一次性写入
        let mut seen_ids = HashSet::new();
        let mut seen_urls = HashSet::new();
        let mut records = Vec::with_capacity(entities.len());
        for mut entity in entities {
            entity.user_id = user_id.to_string();
            state.check_insert(&entity)?;
            if !seen_ids.insert(entity.short_id.clone()) {
                return Err(ShortenerError::short_id_taken(&entity.short_id));
            }
            if !seen_urls.insert(entity.long_url.clone()) {
                return Err(ShortenerError::unique_violation(&entity.long_url));
            }
            records.push(entity);
        }

        state.append(&records)?;
        for entity in records {
            state.apply(entity);
        }
        Ok(())
    }

    async fn set_deleted_batch(&self, user_id: &str, short_ids: &[String]) -> Result<u64> {
        let mut state = self.state.lock();

        let mut seen = HashSet::new();
        let tombstones: Vec<UrlEntity> = short_ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .filter_map(|id| state.entities.get(id))
            .filter(|e| e.user_id == user_id && !e.deleted)
            .map(|e| UrlEntity {
                deleted: true,
                ..e.clone()
            })
            .collect();

        if tombstones.is_empty() {
            return Ok(0);
        }

        state.append(&tombstones)?;
        let count = tombstones.len() as u64;
        for entity in tombstones {
            state.apply(entity);
        }
        Ok(count)
    }

    async fn ping(&self) -> Result<()> {
        std::fs::metadata(&self.path).map_err(|e| {
            ShortenerError::file_operation(format!(
                "Storage file {} is not accessible: {}",
                self.path.display(),
                e
            ))
        })?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.state.lock().journal.sync_all()?;
        Ok(())
    }
}
