//! 历史压缩
//!
//! 每次调用 Planner 前执行：只保留最近 K 条带页面快照的动作结果，更早的快照段替换为占位文本。
//! 仅翻转 `History` 中的脱敏标记，重复执行结果相同。

use crate::memory::conversation::redact_snapshot;
use crate::memory::{History, Message};

/// 默认保留的最近快照条数
pub const DEFAULT_KEEP_SNAPSHOTS: usize = 2;

/// 单次压缩的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompactionReport {
    /// 带快照的条目总数
    pub qualifying: usize,
    /// 本次新脱敏的条目数
    pub newly_redacted: usize,
    /// 本次估算节省的 token 数
    pub tokens_reclaimed: usize,
}

/// 粗略 token 估算：ASCII 约 4 字符/token，其它字符约 1.5 字符/token
pub fn estimate_tokens(text: &str) -> usize {
    let (ascii, other) = text.chars().fold((0usize, 0usize), |(a, o), c| {
        if c.is_ascii() {
            (a + 1, o)
        } else {
            (a, o + 1)
        }
    });
    ascii / 4 + (other * 2).div_ceil(3)
}

#[derive(Debug, Clone)]
pub struct HistoryCompactor {
    keep: usize,
}

impl HistoryCompactor {
    pub fn new(keep: usize) -> Self {
        Self { keep }
    }

    pub fn keep(&self) -> usize {
        self.keep
    }

    /// 按位置选出除最后 K 条外的所有快照条目并脱敏；最后 K 条保持原样
    pub fn compact(&self, history: &mut History) -> CompactionReport {
        let positions = history.snapshot_positions();
        let cutoff = positions.len().saturating_sub(self.keep);
        let mut report = CompactionReport {
            qualifying: positions.len(),
            ..Default::default()
        };

        for (rank, &index) in positions.iter().enumerate() {
            let redact = rank < cutoff;
            let was = history.set_redacted(index, redact);
            if redact && !was {
                report.newly_redacted += 1;
                if let Some(Message::ActionOutcome { output, .. }) =
                    history.entries().get(index).map(|e| e.message())
                {
                    let before = estimate_tokens(output);
                    let after = redact_snapshot(output)
                        .map(|r| estimate_tokens(&r))
                        .unwrap_or(before);
                    report.tokens_reclaimed += before.saturating_sub(after);
                }
            }
        }

        if report.newly_redacted > 0 {
            tracing::debug!(
                redacted = report.newly_redacted,
                qualifying = report.qualifying,
                tokens_reclaimed = report.tokens_reclaimed,
                "cleared older page_content snapshots"
            );
        }
        report
    }
}

impl Default for HistoryCompactor {
    fn default() -> Self {
        Self::new(DEFAULT_KEEP_SNAPSHOTS)
    }
}
