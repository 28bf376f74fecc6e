//! Chrome Actuator：使用 headless_chrome 操控一个真实浏览器窗口
//!
//! 需启用 feature "browser" 且系统已安装 Chrome/Chromium。
//! headless_chrome 是同步 API，每次调用都放进 `spawn_blocking`；动作完成后等待页面稳定，
//! 再注入 `visible_elements.js` 抓取视口内的交互元素作为快照。

use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};

use crate::config::BrowserSection;
use crate::tools::{Actuator, ActuatorFactory, ActuatorReport, ActuatorResult, PageSnapshot};

const VISIBLE_ELEMENTS_JS: &str = include_str!("visible_elements.js");

/// 浏览器启动与等待参数
#[derive(Debug, Clone)]
pub struct ChromeOptions {
    pub headless: bool,
    pub chrome_path: Option<PathBuf>,
    pub window_size: (u32, u32),
    /// navigate / click / type / scroll 之后的等待
    pub settle: Duration,
    /// observe 之前的等待
    pub observe_settle: Duration,
}

impl Default for ChromeOptions {
    fn default() -> Self {
        Self {
            headless: false,
            chrome_path: None,
            window_size: (1080, 1080),
            settle: Duration::from_millis(5000),
            observe_settle: Duration::from_millis(2000),
        }
    }
}

impl From<&BrowserSection> for ChromeOptions {
    fn from(cfg: &BrowserSection) -> Self {
        Self {
            headless: cfg.headless,
            chrome_path: cfg.chrome_path.clone(),
            window_size: (cfg.window_width, cfg.window_height),
            settle: Duration::from_millis(cfg.settle_ms),
            observe_settle: Duration::from_millis(cfg.observe_settle_ms),
        }
    }
}

/// 已启动的浏览器；Browser 被 drop 时进程随之退出
struct ChromeSession {
    _browser: Browser,
    tab: Arc<Tab>,
}

/// 单会话的 Chrome Actuator
pub struct ChromeActuator {
    options: ChromeOptions,
    session: Arc<Mutex<Option<ChromeSession>>>,
}

impl ChromeActuator {
    pub fn new(options: ChromeOptions) -> Self {
        Self {
            options,
            session: Arc::new(Mutex::new(None)),
        }
    }

    /// 在阻塞线程中对当前 tab 执行 `f`，之后等待 `settle`，再抓快照
    async fn with_tab<F>(&self, settle: Duration, f: F) -> ActuatorResult
    where
        F: FnOnce(&Arc<Tab>) -> Result<String, String> + Send + 'static,
    {
        let session = Arc::clone(&self.session);
        tokio::task::spawn_blocking(move || {
            let guard = session.lock().map_err(|e| e.to_string())?;
            let chrome = guard
                .as_ref()
                .ok_or_else(|| "Browser not started".to_string())?;
            let message = f(&chrome.tab)?;
            std::thread::sleep(settle);
            let snapshot = capture_snapshot(&chrome.tab)?;
            Ok(ActuatorReport::new(message).with_snapshot(snapshot))
        })
        .await
        .map_err(|e| format!("Task join: {}", e))?
    }
}

/// 注入提取脚本并解析为 PageSnapshot
fn capture_snapshot(tab: &Arc<Tab>) -> Result<PageSnapshot, String> {
    let result = tab
        .evaluate(VISIBLE_ELEMENTS_JS, false)
        .map_err(|e| format!("Get page content failed: {}", e))?;
    let raw = result
        .value
        .as_ref()
        .and_then(|v| v.as_str())
        .ok_or_else(|| "Page content script returned nothing".to_string())?;
    serde_json::from_str(raw).map_err(|e| format!("Page content parse failed: {}", e))
}

/// 坐标处的元素（优先可点击的子元素）上执行一段 JS；没有元素时返回 false
fn at_point(tab: &Arc<Tab>, x: f64, y: f64, body: &str) -> Result<bool, String> {
    let js = format!(
        r#"
        (() => {{
            const hit = document.elementFromPoint({x}, {y});
            if (!hit) return false;
            const clickable = ['a', 'button', 'input', 'label', 'select', 'textarea'];
            const el = clickable.includes(hit.tagName.toLowerCase())
                ? hit
                : (hit.querySelector('a, button, input, label') || hit);
            {body}
            return true;
        }})()
        "#
    );
    let result = tab
        .evaluate(&js, false)
        .map_err(|e| format!("Script failed at ({x}, {y}): {e}"))?;
    Ok(result.value.and_then(|v| v.as_bool()).unwrap_or(false))
}

#[async_trait]
impl Actuator for ChromeActuator {
    async fn start(&self) -> ActuatorResult {
        let session = Arc::clone(&self.session);
        let options = self.options.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = session.lock().map_err(|e| e.to_string())?;
            if guard.is_some() {
                return Err("Browser already started".to_string());
            }
            let launch = LaunchOptions::default_builder()
                .headless(options.headless)
                .window_size(Some(options.window_size))
                .path(options.chrome_path.clone())
                .idle_browser_timeout(Duration::from_secs(60 * 60))
                .args(vec![OsStr::new("--log-level=3")])
                .build()
                .map_err(|e| format!("Failed to start browser: {}", e))?;
            let browser =
                Browser::new(launch).map_err(|e| format!("Failed to start browser: {}", e))?;
            let tab = browser
                .new_tab()
                .map_err(|e| format!("Failed to start browser: {}", e))?;
            *guard = Some(ChromeSession {
                _browser: browser,
                tab,
            });
            tracing::info!(headless = options.headless, "chrome started");
            Ok(ActuatorReport::new("Browser started"))
        })
        .await
        .map_err(|e| format!("Task join: {}", e))?
    }

    async fn navigate(&self, url: &str) -> ActuatorResult {
        let url = url.to_string();
        tracing::info!(url = %url, "browser navigate");
        self.with_tab(self.options.settle, move |tab| {
            tab.navigate_to(&url)
                .and_then(|t| t.wait_until_navigated())
                .map_err(|e| format!("Navigation failed: {}", e))?;
            Ok(format!("Navigated to {}", url))
        })
        .await
    }

    async fn click(&self, x: f64, y: f64) -> ActuatorResult {
        self.with_tab(self.options.settle, move |tab| {
            if at_point(tab, x, y, "el.click();")? {
                Ok(format!("Clicked at ({x}, {y})"))
            } else {
                Err(format!("Click failed at ({x}, {y}): no element at point"))
            }
        })
        .await
    }

    async fn type_text(&self, x: f64, y: f64, text: &str) -> ActuatorResult {
        let text = text.to_string();
        self.with_tab(self.options.settle, move |tab| {
            if !at_point(tab, x, y, "el.focus(); el.click();")? {
                return Err(format!("Text input failed at ({x}, {y}): no element at point"));
            }
            tab.type_str(&text)
                .map_err(|e| format!("Text input failed at ({x}, {y}): {e}"))?;
            Ok(format!("Typed text at ({x}, {y})"))
        })
        .await
    }

    async fn scroll(&self, dx: i64, dy: i64) -> ActuatorResult {
        self.with_tab(self.options.settle, move |tab| {
            let js = format!("window.scrollBy({{ top: {dy}, left: {dx}, behavior: 'smooth' }})");
            tab.evaluate(&js, false)
                .map_err(|e| format!("Scroll failed: {}", e))?;
            Ok(format!("Scrolled smoothly by ({dx}, {dy}) pixels"))
        })
        .await
    }

    async fn observe(&self) -> ActuatorResult {
        self.with_tab(self.options.observe_settle, |_| {
            Ok("Page content refreshed successfully".to_string())
        })
        .await
    }

    async fn stop(&self) -> ActuatorResult {
        let session = Arc::clone(&self.session);
        tokio::task::spawn_blocking(move || {
            let mut guard = session.lock().map_err(|e| e.to_string())?;
            match guard.take() {
                Some(chrome) => {
                    drop(chrome);
                    tracing::info!("chrome closed");
                    Ok(ActuatorReport::new("Browser closed"))
                }
                None => Err("Browser not started or already closed".to_string()),
            }
        })
        .await
        .map_err(|e| format!("Task join: {}", e))?
    }
}

/// 每个会话一个独立的 Chrome 进程
#[derive(Debug, Clone)]
pub struct ChromeActuatorFactory {
    options: ChromeOptions,
}

impl ChromeActuatorFactory {
    pub fn new(options: ChromeOptions) -> Self {
        Self { options }
    }
}

impl ActuatorFactory for ChromeActuatorFactory {
    fn create(&self, session_id: &str) -> Box<dyn Actuator> {
        tracing::debug!(session_id, "creating chrome actuator");
        Box::new(ChromeActuator::new(self.options.clone()))
    }
}
