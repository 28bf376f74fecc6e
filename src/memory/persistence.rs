//! 历史诊断转储
//!
//! 每次交互结束后把会话的完整历史（含脱敏标记）写成 JSON 文件，只写不读，失败只记日志。
//! 序列化在调用方完成，文件 I/O 走 `tokio::fs`。

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs;

use crate::memory::{Entry, History};

#[derive(Serialize)]
struct DumpFile<'a> {
    session_id: &'a str,
    dumped_at: String,
    entries: &'a [Entry],
}

/// 单目录的 JSON 转储，每个会话一个文件（覆盖写）
#[derive(Debug, Clone)]
pub struct HistoryDump {
    dir: PathBuf,
}

impl HistoryDump {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 会话对应的文件路径：非 `[A-Za-z0-9_-]` 字符替换为 `_`，再附上原始 id 的短哈希，
    /// 使 `a/b` 与 `a_b` 落在不同文件
    pub fn path_for(&self, session_id: &str) -> PathBuf {
        let safe: String = session_id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let digest = uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_OID, session_id.as_bytes())
            .simple()
            .to_string();
        self.dir
            .join(format!("history_{safe}_{}.json", &digest[..8]))
    }

    /// 写入；父目录不存在时自动创建
    pub async fn write(&self, session_id: &str, history: &History) -> anyhow::Result<PathBuf> {
        let path = self.path_for(session_id);
        let file = DumpFile {
            session_id,
            dumped_at: chrono::Utc::now().to_rfc3339(),
            entries: history.entries(),
        };
        let body = serde_json::to_string_pretty(&file)?;
        fs::create_dir_all(&self.dir).await?;
        fs::write(&path, body).await?;
        Ok(path)
    }

    /// 尽力写入，失败只告警
    pub async fn write_best_effort(&self, session_id: &str, history: &History) {
        match self.write(session_id, history).await {
            Ok(path) => tracing::debug!(session_id, path = %path.display(), "history dumped"),
            Err(e) => tracing::warn!(session_id, error = %e, "failed to dump history"),
        }
    }
}
