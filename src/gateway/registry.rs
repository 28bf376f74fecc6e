//! 会话注册表
//!
//! 键空间由一把 `RwLock` 保护，只在创建 / 移除时持写锁；每个会话有自己的 `tokio::sync::Mutex`，
//! 同一会话的请求串行（后到者阻塞等待），不同会话互不竞争。
//! close 先移除条目并取消令牌，再等待会话锁（进行中的动作跑完、交互在回合边界停下），最后关闭浏览器。

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::core::AgentError;
use crate::gateway::Session;
use crate::memory::Message;
use crate::react::{InteractionResult, TurnEngine};
use crate::tools::{Action, ActionRequest, ActuatorFactory};

/// 状态查询中的单个会话
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub browser_started: bool,
    pub messages_count: usize,
    pub busy: bool,
}

/// 注册表中的一个会话；状态字段在每次持锁操作结束时刷新，查询时无需拿会话锁
pub struct SessionEntry {
    id: String,
    session: Mutex<Session>,
    cancel: CancellationToken,
    busy: AtomicBool,
    ready: AtomicBool,
    history_len: AtomicUsize,
}

impl SessionEntry {
    fn new(session: Session) -> Self {
        Self {
            id: session.id().to_string(),
            ready: AtomicBool::new(session.actuator_ready()),
            history_len: AtomicUsize::new(session.history().len()),
            session: Mutex::new(session),
            cancel: CancellationToken::new(),
            busy: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn refresh(&self, session: &Session) {
        self.ready.store(session.actuator_ready(), Ordering::SeqCst);
        self.history_len
            .store(session.history().len(), Ordering::SeqCst);
    }

    fn status(&self) -> SessionStatus {
        SessionStatus {
            browser_started: self.ready.load(Ordering::SeqCst),
            messages_count: self.history_len.load(Ordering::SeqCst),
            busy: self.is_busy(),
        }
    }
}

/// 持锁期间标记 busy，离开作用域自动清除
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn set(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<SessionEntry>>>,
    engine: Arc<TurnEngine>,
    factory: Arc<dyn ActuatorFactory>,
    system_prompt: String,
    default_turn_budget: usize,
}

impl SessionRegistry {
    pub fn new(
        engine: TurnEngine,
        factory: Arc<dyn ActuatorFactory>,
        system_prompt: impl Into<String>,
        default_turn_budget: usize,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            engine: Arc::new(engine),
            factory,
            system_prompt: system_prompt.into(),
            default_turn_budget: default_turn_budget.max(1),
        }
    }

    pub fn default_turn_budget(&self) -> usize {
        self.default_turn_budget
    }

    /// 取已有会话或新建；turn_budget 只在新建时生效，已有会话在 interact 时持锁更新
    pub async fn get_or_create(
        &self,
        key: &str,
        turn_budget: Option<usize>,
    ) -> Result<Arc<SessionEntry>, AgentError> {
        if let Some(0) = turn_budget {
            return Err(AgentError::InvalidTurnBudget(0));
        }
        if let Some(entry) = self.sessions.read().await.get(key) {
            return Ok(Arc::clone(entry));
        }

        let mut sessions = self.sessions.write().await;
        let entry = sessions.entry(key.to_string()).or_insert_with(|| {
            tracing::info!(session_id = key, "session created");
            let session = Session::new(
                key,
                self.system_prompt.clone(),
                self.factory.create(key),
                turn_budget.unwrap_or(self.default_turn_budget),
            );
            Arc::new(SessionEntry::new(session))
        });
        Ok(Arc::clone(entry))
    }

    async fn lookup(&self, key: &str) -> Result<Arc<SessionEntry>, AgentError> {
        self.sessions
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| AgentError::SessionNotFound(key.to_string()))
    }

    /// 在会话上运行一次交互；所有错误都转为 failed 结果。
    ///
    /// 交互在独立任务中运行并持有会话锁，调用方的 future 被丢弃（超时、客户端断开）时
    /// 交互照常跑完，历史中每个动作请求都会有对应的结果。
    pub async fn interact(
        &self,
        key: &str,
        command: &str,
        turn_budget: Option<usize>,
    ) -> InteractionResult {
        let entry = match self.get_or_create(key, turn_budget).await {
            Ok(entry) => entry,
            Err(e) => return InteractionResult::failed(e.to_string()),
        };

        let engine = Arc::clone(&self.engine);
        let command = command.to_string();
        let task = tokio::spawn(async move {
            let mut session = entry.session.lock().await;
            if entry.is_closed() {
                return InteractionResult::failed(AgentError::Cancelled.to_string());
            }
            let _busy = BusyGuard::set(&entry.busy);
            if let Some(budget) = turn_budget {
                if let Err(e) = session.set_turn_budget(budget) {
                    return InteractionResult::failed(e.to_string());
                }
            }

            let result = engine.run(&mut session, &command, &entry.cancel).await;
            entry.refresh(&session);
            result
        });

        match task.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(session_id = key, error = %e, "interaction task failed");
                InteractionResult::failed(format!("Error processing command: {e}"))
            }
        }
    }

    /// 会话当前的历史（压缩标记已应用）；等待进行中的交互结束
    pub async fn messages(&self, key: &str) -> Result<Vec<Message>, AgentError> {
        let entry = self.lookup(key).await?;
        let session = entry.session.lock().await;
        Ok(session.history().messages())
    }

    /// 清空会话历史；stop_actuator 为 true 且浏览器在运行时一并关闭
    pub async fn reset(&self, key: &str, stop_actuator: bool) -> Result<String, AgentError> {
        let entry = self.lookup(key).await?;
        let mut session = entry.session.lock().await;
        let _busy = BusyGuard::set(&entry.busy);
        session.reset_history();

        let mut message = "Session reset.".to_string();
        if stop_actuator && session.actuator_ready() {
            let outcome = self
                .engine
                .executor()
                .execute(session.actuator_mut(), &ActionRequest::new("reset", Action::Stop))
                .await;
            message = if outcome.is_ok() {
                "Session reset and browser closed.".to_string()
            } else {
                format!("Session reset; closing browser failed: {}", outcome.message)
            };
        }
        entry.refresh(&session);
        tracing::info!(session_id = key, stop_actuator, "session reset");
        Ok(message)
    }

    /// 关闭会话：移除条目、取消进行中的交互、等它在回合边界停下后关闭浏览器
    pub async fn close(&self, key: &str) -> Result<(), AgentError> {
        let entry = self
            .sessions
            .write()
            .await
            .remove(key)
            .ok_or_else(|| AgentError::SessionNotFound(key.to_string()))?;
        entry.cancel.cancel();

        let mut session = entry.session.lock().await;
        if session.actuator_ready() {
            let outcome = self
                .engine
                .executor()
                .execute(session.actuator_mut(), &ActionRequest::new("close", Action::Stop))
                .await;
            if !outcome.is_ok() {
                tracing::warn!(session_id = key, error = %outcome.message, "failed to close browser");
            }
        }
        entry.refresh(&session);
        tracing::info!(session_id = key, "session closed");
        Ok(())
    }

    /// 批量关闭；None 表示全部。返回实际关闭的会话 id，未知 id 跳过
    pub async fn bulk_close(&self, keys: Option<&[String]>) -> Vec<String> {
        let targets: Vec<String> = match keys {
            Some(keys) => keys.to_vec(),
            None => self.sessions.read().await.keys().cloned().collect(),
        };
        let results = futures_util::future::join_all(targets.iter().map(|key| async move {
            match self.close(key).await {
                Ok(()) => Some(key.clone()),
                Err(e) => {
                    tracing::debug!(session_id = %key, error = %e, "skip close");
                    None
                }
            }
        }))
        .await;
        results.into_iter().flatten().collect()
    }

    /// 关闭全部会话（进程退出前调用）
    pub async fn close_all(&self) -> Vec<String> {
        self.bulk_close(None).await
    }

    /// 所有会话的状态快照
    pub async fn status(&self) -> BTreeMap<String, SessionStatus> {
        self.sessions
            .read()
            .await
            .iter()
            .map(|(id, entry)| (id.clone(), entry.status()))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.sessions.read().await.contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::llm::{LlmClient, MockLlmClient};
    use crate::memory::HistoryCompactor;
    use crate::react::{InteractionStatus, Planner};
    use crate::tools::{ActionExecutor, MockActuatorFactory};

    fn registry(llm: Arc<dyn LlmClient>, factory: MockActuatorFactory) -> SessionRegistry {
        let engine = TurnEngine::new(
            Planner::new(llm),
            ActionExecutor::new(5),
            HistoryCompactor::default(),
        );
        SessionRegistry::new(engine, Arc::new(factory), "sys", 10)
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let reg = registry(Arc::new(MockLlmClient::new()), MockActuatorFactory::new());
        let a = reg.get_or_create("k", None).await.unwrap();
        let b = reg.get_or_create("k", Some(3)).await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(reg.len().await, 1);
        assert!(matches!(
            reg.get_or_create("z", Some(0)).await,
            Err(AgentError::InvalidTurnBudget(0))
        ));
        assert!(!reg.contains("z").await);
    }

    #[tokio::test]
    async fn test_interact_creates_and_reports_status() {
        let llm = Arc::new(
            MockLlmClient::new()
                .push_call("c1", "start_browser", "{}")
                .push_text("started"),
        );
        let reg = registry(llm, MockActuatorFactory::new());
        let r = reg.interact("u1", "start", None).await;
        assert_eq!(r.status, InteractionStatus::Completed);

        let status = reg.status().await;
        let s = &status["u1"];
        assert!(s.browser_started);
        assert_eq!(s.messages_count, 5);
        assert!(!s.busy);
    }

    #[tokio::test]
    async fn test_interact_rejects_zero_budget() {
        let reg = registry(Arc::new(MockLlmClient::new()), MockActuatorFactory::new());
        let r = reg.interact("u1", "go", Some(0)).await;
        assert_eq!(r.status, InteractionStatus::Failed);
        assert!(r.message.contains("max_turns"));
    }

    #[tokio::test]
    async fn test_reset_keeps_browser_unless_asked() {
        let llm = Arc::new(
            MockLlmClient::new()
                .push_call("c1", "start_browser", "{}")
                .push_text("started"),
        );
        let factory = MockActuatorFactory::new();
        let probe = factory.probe();
        let reg = registry(llm, factory);
        reg.interact("u1", "start", None).await;

        assert_eq!(reg.reset("u1", false).await.unwrap(), "Session reset.");
        let s = &reg.status().await["u1"];
        assert_eq!(s.messages_count, 1);
        assert!(s.browser_started);

        assert_eq!(
            reg.reset("u1", true).await.unwrap(),
            "Session reset and browser closed."
        );
        assert!(!reg.status().await["u1"].browser_started);
        assert_eq!(probe.stops(), 1);

        assert!(matches!(
            reg.reset("nope", false).await,
            Err(AgentError::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_close_stops_browser_and_removes() {
        let llm = Arc::new(
            MockLlmClient::new()
                .push_call("c1", "start_browser", "{}")
                .push_text("started"),
        );
        let factory = MockActuatorFactory::new();
        let probe = factory.probe();
        let reg = registry(llm, factory);
        reg.interact("u1", "start", None).await;
        reg.close("u1").await.unwrap();
        assert!(!reg.contains("u1").await);
        assert_eq!(probe.stops(), 1);
        assert!(matches!(
            reg.close("u1").await,
            Err(AgentError::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_close_without_browser_does_not_stop() {
        let reg = registry(Arc::new(MockLlmClient::new()), MockActuatorFactory::new());
        reg.get_or_create("idle", None).await.unwrap();
        reg.close("idle").await.unwrap();
        assert!(reg.is_empty().await);
    }

    #[tokio::test]
    async fn test_bulk_close_subset_and_all() {
        let reg = registry(Arc::new(MockLlmClient::new()), MockActuatorFactory::new());
        for k in ["a", "b", "c"] {
            reg.get_or_create(k, None).await.unwrap();
        }
        let mut closed = reg
            .bulk_close(Some(&["a".to_string(), "missing".to_string()]))
            .await;
        closed.sort();
        assert_eq!(closed, vec!["a"]);

        let mut rest = reg.bulk_close(None).await;
        rest.sort();
        assert_eq!(rest, vec!["b", "c"]);
        assert!(reg.is_empty().await);
    }

    #[tokio::test]
    async fn test_dropped_caller_still_pairs_requests_with_outcomes() {
        let llm = Arc::new(
            MockLlmClient::new()
                .push_call("c1", "start_browser", "{}")
                .push_text("started"),
        );
        let factory = MockActuatorFactory::new().with_delay(Duration::from_millis(300));
        let reg = registry(llm, factory);

        let cut = tokio::time::timeout(Duration::from_millis(50), reg.interact("s", "start", None)).await;
        assert!(cut.is_err());

        // messages 等待会话锁，即等待后台交互结束
        let messages = reg.messages("s").await.unwrap();
        let requests = messages
            .iter()
            .filter(|m| matches!(m, Message::ActionRequest { .. }))
            .count();
        let outcomes = messages
            .iter()
            .filter(|m| matches!(m, Message::ActionOutcome { .. }))
            .count();
        assert_eq!(requests, 1);
        assert_eq!(requests, outcomes);
        assert!(!matches!(messages.last(), Some(Message::ActionRequest { .. })));
        assert_eq!(messages.last(), Some(&Message::assistant("started")));

        let status = &reg.status().await["s"];
        assert!(status.browser_started);
        assert!(!status.busy);
    }
}
