//! 单个浏览器会话
//!
//! 会话独占一个 Actuator；历史、ready 标记和轮数上限只在持有会话锁时修改。

use crate::core::AgentError;
use crate::memory::History;
use crate::tools::{Actuator, ActuatorHandle};

/// 默认单次交互轮数上限
pub const DEFAULT_TURN_BUDGET: usize = 10;

pub struct Session {
    id: String,
    history: History,
    actuator: ActuatorHandle,
    turn_budget: usize,
}

impl Session {
    /// 以 system prompt 为历史基线创建；turn_budget 为 0 时按 1 处理
    pub fn new(
        id: impl Into<String>,
        system_prompt: impl Into<String>,
        actuator: Box<dyn Actuator>,
        turn_budget: usize,
    ) -> Self {
        Self {
            id: id.into(),
            history: History::with_system(system_prompt),
            actuator: ActuatorHandle::new(actuator),
            turn_budget: turn_budget.max(1),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    pub fn actuator_ready(&self) -> bool {
        self.actuator.is_ready()
    }

    pub(crate) fn actuator_mut(&mut self) -> &mut ActuatorHandle {
        &mut self.actuator
    }

    pub fn turn_budget(&self) -> usize {
        self.turn_budget
    }

    pub fn set_turn_budget(&mut self, budget: usize) -> Result<(), AgentError> {
        if budget < 1 {
            return Err(AgentError::InvalidTurnBudget(budget));
        }
        self.turn_budget = budget;
        Ok(())
    }

    /// 清空历史到 system prompt 基线；浏览器状态不变
    pub fn reset_history(&mut self) {
        self.history.reset_to_baseline();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("messages", &self.history.len())
            .field("actuator", &self.actuator)
            .field("turn_budget", &self.turn_budget)
            .finish()
    }
}
