//! Actuator：浏览器原语的抽象边界
//!
//! 每个会话独占一个 Actuator；错误以字符串返回，由 ActionExecutor 归为 ActuatorFailure。

use async_trait::async_trait;

use crate::tools::PageSnapshot;

/// 一次原语调用的结果
#[derive(Debug, Clone, PartialEq)]
pub struct ActuatorReport {
    pub message: String,
    /// 动作完成且页面稳定后抓取的快照
    pub snapshot: Option<PageSnapshot>,
}

impl ActuatorReport {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            snapshot: None,
        }
    }

    pub fn with_snapshot(mut self, snapshot: PageSnapshot) -> Self {
        self.snapshot = Some(snapshot);
        self
    }
}

pub type ActuatorResult = Result<ActuatorReport, String>;

#[async_trait]
pub trait Actuator: Send + Sync {
    async fn start(&self) -> ActuatorResult;

    async fn navigate(&self, url: &str) -> ActuatorResult;

    async fn click(&self, x: f64, y: f64) -> ActuatorResult;

    async fn type_text(&self, x: f64, y: f64, text: &str) -> ActuatorResult;

    /// 相对滚动，正值向右 / 向下
    async fn scroll(&self, dx: i64, dy: i64) -> ActuatorResult;

    /// 不做任何操作，只重新抓取快照
    async fn observe(&self) -> ActuatorResult;

    async fn stop(&self) -> ActuatorResult;
}

/// 为新会话创建 Actuator
pub trait ActuatorFactory: Send + Sync {
    fn create(&self, session_id: &str) -> Box<dyn Actuator>;
}

impl<F> ActuatorFactory for F
where
    F: Fn(&str) -> Box<dyn Actuator> + Send + Sync,
{
    fn create(&self, session_id: &str) -> Box<dyn Actuator> {
        self(session_id)
    }
}

/// 会话持有的 Actuator 与「已启动」标记；只由当前交互的执行器修改
pub struct ActuatorHandle {
    actuator: Box<dyn Actuator>,
    ready: bool,
}

impl ActuatorHandle {
    pub fn new(actuator: Box<dyn Actuator>) -> Self {
        Self {
            actuator,
            ready: false,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub(crate) fn set_ready(&mut self, ready: bool) {
        self.ready = ready;
    }

    pub fn actuator(&self) -> &dyn Actuator {
        self.actuator.as_ref()
    }
}

impl std::fmt::Debug for ActuatorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActuatorHandle")
            .field("ready", &self.ready)
            .finish_non_exhaustive()
    }
}
