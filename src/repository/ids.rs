//! 短 ID 生成策略

use crate::storage::IdKind;
use crate::utils::generate_random_code;

#[derive(Debug, Clone, Copy)]
pub struct IdGenerator {
    kind: IdKind,
    length: usize,
    attempts: u32,
}

impl IdGenerator {
    pub fn new(kind: IdKind, length: usize, attempts: u32) -> Self {
        Self {
            kind,
            length: length.max(1),
            attempts: attempts.max(1),
        }
    }

    pub fn kind(&self) -> IdKind {
        self.kind
    }

    /// 允许的最大尝试次数；UUID 只尝试一次
    pub fn attempts(&self) -> u32 {
        match self.kind {
            IdKind::Random => self.attempts,
            IdKind::Uuid => 1,
        }
    }

    pub fn next_id(&self) -> String {
        match self.kind {
            IdKind::Random => generate_random_code(self.length),
            IdKind::Uuid => uuid::Uuid::new_v4().to_string(),
        }
    }
}
