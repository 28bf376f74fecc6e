//! Mock Actuator（用于测试与离线运行，不启动浏览器）
//!
//! 模拟一个只有一页的「浏览器」：navigate 改变 URL，其余动作返回当前页快照。
//! 所有实例可共享一个 `MockProbe`，记录调用日志、并发峰值、启动/关闭次数。

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::tools::{
    ActionKind, Actuator, ActuatorFactory, ActuatorReport, ActuatorResult, ElementBox,
    PageElement, PageSnapshot,
};

/// 可跨实例共享的观测数据
#[derive(Debug, Default, Clone)]
pub struct MockProbe {
    inner: Arc<ProbeInner>,
}

#[derive(Debug, Default)]
struct ProbeInner {
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    /// 单个实例上观测到的最大并发（应始终 ≤ 1）
    max_in_flight_per_actuator: AtomicUsize,
    starts: AtomicUsize,
    stops: AtomicUsize,
}

impl MockProbe {
    pub fn calls(&self) -> Vec<String> {
        self.inner.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn max_in_flight(&self) -> usize {
        self.inner.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn max_in_flight_per_actuator(&self) -> usize {
        self.inner.max_in_flight_per_actuator.load(Ordering::SeqCst)
    }

    pub fn starts(&self) -> usize {
        self.inner.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.inner.stops.load(Ordering::SeqCst)
    }

    fn record(&self, call: String) {
        if let Ok(mut calls) = self.inner.calls.lock() {
            calls.push(call);
        }
    }
}

/// 进入/离开调用时维护并发计数
struct InFlight<'a> {
    probe: &'a MockProbe,
    local: &'a AtomicUsize,
}

impl<'a> InFlight<'a> {
    fn enter(probe: &'a MockProbe, local: &'a AtomicUsize) -> Self {
        let global = probe.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        probe.inner.max_in_flight.fetch_max(global, Ordering::SeqCst);
        let mine = local.fetch_add(1, Ordering::SeqCst) + 1;
        probe
            .inner
            .max_in_flight_per_actuator
            .fetch_max(mine, Ordering::SeqCst);
        Self { probe, local }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.probe.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.local.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Debug)]
pub struct MockActuator {
    label: String,
    probe: MockProbe,
    delay: Duration,
    slow: HashMap<ActionKind, Duration>,
    fail_on: HashSet<ActionKind>,
    url: Mutex<String>,
    in_flight: AtomicUsize,
}

impl MockActuator {
    pub fn new() -> Self {
        Self::with_probe("mock", MockProbe::default())
    }

    pub fn with_probe(label: impl Into<String>, probe: MockProbe) -> Self {
        Self {
            label: label.into(),
            probe,
            delay: Duration::ZERO,
            slow: HashMap::new(),
            fail_on: HashSet::new(),
            url: Mutex::new("about:blank".to_string()),
            in_flight: AtomicUsize::new(0),
        }
    }

    /// 每次调用的模拟耗时
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// 单独给某类动作设定耗时，覆盖 with_delay
    pub fn slow_on(mut self, kind: ActionKind, delay: Duration) -> Self {
        self.slow.insert(kind, delay);
        self
    }

    /// 指定动作返回失败
    pub fn failing_on(mut self, kind: ActionKind) -> Self {
        self.fail_on.insert(kind);
        self
    }

    pub fn probe(&self) -> MockProbe {
        self.probe.clone()
    }

    fn current_url(&self) -> String {
        self.url
            .lock()
            .map(|u| u.clone())
            .unwrap_or_else(|_| "about:blank".to_string())
    }

    fn snapshot(&self) -> PageSnapshot {
        let url = self.current_url();
        PageSnapshot {
            title: format!("Mock page {url}"),
            url,
            elements: vec![
                PageElement {
                    highlight_index: 1,
                    tag_name: "input".into(),
                    role: "input".into(),
                    text: String::new(),
                    attributes: [("name".to_string(), "q".to_string())].into_iter().collect(),
                    coordinates: ElementBox {
                        x: 100.0,
                        y: 40.0,
                        width: 300.0,
                        height: 30.0,
                    },
                },
                PageElement {
                    highlight_index: 2,
                    tag_name: "button".into(),
                    role: "button".into(),
                    text: "Search".into(),
                    attributes: Default::default(),
                    coordinates: ElementBox {
                        x: 420.0,
                        y: 40.0,
                        width: 80.0,
                        height: 30.0,
                    },
                },
            ],
        }
    }

    async fn run(
        &self,
        kind: ActionKind,
        call: String,
        message: String,
        with_snapshot: bool,
    ) -> ActuatorResult {
        let _guard = InFlight::enter(&self.probe, &self.in_flight);
        self.probe.record(format!("{}:{}", self.label, call));
        let delay = self.slow.get(&kind).copied().unwrap_or(self.delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_on.contains(&kind) {
            return Err(format!("mock {} failed", kind.tool_name()));
        }
        let report = ActuatorReport::new(message);
        Ok(if with_snapshot {
            report.with_snapshot(self.snapshot())
        } else {
            report
        })
    }
}

impl Default for MockActuator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Actuator for MockActuator {
    async fn start(&self) -> ActuatorResult {
        let result = self
            .run(ActionKind::Start, "start".into(), "Browser started".into(), false)
            .await;
        if result.is_ok() {
            self.probe.inner.starts.fetch_add(1, Ordering::SeqCst);
        }
        result
    }

    async fn navigate(&self, url: &str) -> ActuatorResult {
        if !self.fail_on.contains(&ActionKind::Navigate) {
            if let Ok(mut current) = self.url.lock() {
                *current = url.to_string();
            }
        }
        self.run(
            ActionKind::Navigate,
            format!("navigate {url}"),
            format!("Navigated to {url}"),
            true,
        )
        .await
    }

    async fn click(&self, x: f64, y: f64) -> ActuatorResult {
        self.run(
            ActionKind::Click,
            format!("click {x},{y}"),
            format!("Clicked at ({x}, {y})"),
            true,
        )
        .await
    }

    async fn type_text(&self, x: f64, y: f64, text: &str) -> ActuatorResult {
        self.run(
            ActionKind::Type,
            format!("type {x},{y} {text}"),
            format!("Typed text at ({x}, {y})"),
            true,
        )
        .await
    }

    async fn scroll(&self, dx: i64, dy: i64) -> ActuatorResult {
        self.run(
            ActionKind::Scroll,
            format!("scroll {dx},{dy}"),
            format!("Scrolled smoothly by ({dx}, {dy}) pixels"),
            true,
        )
        .await
    }

    async fn observe(&self) -> ActuatorResult {
        self.run(
            ActionKind::Observe,
            "observe".into(),
            "Page content refreshed successfully".into(),
            true,
        )
        .await
    }

    async fn stop(&self) -> ActuatorResult {
        let result = self
            .run(ActionKind::Stop, "stop".into(), "Browser closed".into(), false)
            .await;
        if result.is_ok() {
            self.probe.inner.stops.fetch_add(1, Ordering::SeqCst);
        }
        result
    }
}

/// 为每个会话创建共享同一个 probe 的 MockActuator
#[derive(Debug, Clone, Default)]
pub struct MockActuatorFactory {
    probe: MockProbe,
    delay: Duration,
}

impl MockActuatorFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn probe(&self) -> MockProbe {
        self.probe.clone()
    }
}

impl ActuatorFactory for MockActuatorFactory {
    fn create(&self, session_id: &str) -> Box<dyn Actuator> {
        Box::new(MockActuator::with_probe(session_id, self.probe.clone()).with_delay(self.delay))
    }
}
