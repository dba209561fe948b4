use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use async_trait::async_trait;
use chromiumoxide::{
    browser::{Browser, BrowserConfig},
    cdp::browser_protocol::{
        browser::{SetDownloadBehaviorBehavior, SetDownloadBehaviorParams},
        input::{DispatchMouseEventParams, DispatchMouseEventType, MouseButton},
        page::{CaptureScreenshotFormat, EventJavascriptDialogOpening, HandleJavaScriptDialogParams},
    },
    error::CdpError,
    page::ScreenshotParams,
    Page,
};
use futures::StreamExt;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{
    config::DriverConfig,
    error::{DriverError, DriverErrorKind},
    locator::{ClickMethod, ElementRef, FrameTarget, Locator},
    scripts, Driver,
};

/// [`Driver`] backed by a Chromium instance over the DevTools protocol.
pub struct ChromiumDriver {
    browser: tokio::sync::Mutex<Option<Browser>>,
    page: Page,
    frame: Mutex<FrameTarget>,
    dialog_open: Arc<AtomicBool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl ChromiumDriver {
    /// Launch a browser, open a blank page and route downloads to `config.download_dir`.
    pub async fn launch(config: &DriverConfig) -> Result<Self, DriverError> {
        let mut builder = BrowserConfig::builder()
            .user_data_dir(&config.profile_dir)
            .window_size(config.window_width, config.window_height)
            .launch_timeout(config.launch_timeout())
            .request_timeout(config.request_timeout())
            .no_sandbox()
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check");
        if let Some(executable) = config.resolved_executable() {
            builder = builder.chrome_executable(executable);
        }
        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(agent) = &config.user_agent {
            builder = builder.arg(format!("--user-agent={agent}"));
        }
        let browser_config = builder.build().map_err(|err| {
            DriverError::new(DriverErrorKind::Launch).with_hint(format!("browser config error: {err}"))
        })?;

        let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|err| {
            DriverError::new(DriverErrorKind::Launch).with_hint(err.to_string())
        })?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(target: "cdp", error = %err, "browser handler event error");
                }
            }
        });

        std::fs::create_dir_all(&config.download_dir).map_err(|err| {
            DriverError::new(DriverErrorKind::Io)
                .with_hint(format!("download dir {}: {err}", config.download_dir.display()))
        })?;
        let download_path = config
            .download_dir
            .canonicalize()
            .unwrap_or_else(|_| config.download_dir.clone());
        let download = SetDownloadBehaviorParams::builder()
            .behavior(SetDownloadBehaviorBehavior::Allow)
            .download_path(download_path.to_string_lossy().to_string())
            .build()
            .map_err(|err| DriverError::new(DriverErrorKind::Internal).with_hint(err))?;
        browser.execute(download).await.map_err(map_cdp)?;

        let page = browser.new_page("about:blank").await.map_err(map_cdp)?;

        let dialog_open = Arc::new(AtomicBool::new(false));
        let mut dialogs = page
            .event_listener::<EventJavascriptDialogOpening>()
            .await
            .map_err(map_cdp)?;
        let flag = Arc::clone(&dialog_open);
        let dialog_task = tokio::spawn(async move {
            while let Some(event) = dialogs.next().await {
                debug!(target: "cdp", message = %event.message, "javascript dialog opened");
                flag.store(true, Ordering::SeqCst);
            }
        });

        info!(
            target: "cdp",
            headless = config.headless,
            downloads = %download_path.display(),
            "browser launched"
        );

        Ok(Self {
            browser: tokio::sync::Mutex::new(Some(browser)),
            page,
            frame: Mutex::new(FrameTarget::Root),
            dialog_open,
            tasks: Mutex::new(vec![handler_task, dialog_task]),
        })
    }

    async fn eval(&self, expression: String) -> Result<Value, DriverError> {
        let result = self.page.evaluate(expression).await.map_err(map_cdp)?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn element_call(
        &self,
        element: &ElementRef,
        op: &str,
        arg: Option<&str>,
    ) -> Result<Value, DriverError> {
        let value = self.eval(scripts::element_op(element, op, arg)).await?;
        match scripts::status(&value) {
            "ok" => Ok(value),
            "stale" => Err(DriverError::new(DriverErrorKind::StaleElement)
                .with_hint(format!("element {element} no longer attached"))),
            other => Err(DriverError::new(DriverErrorKind::Script)
                .with_hint(format!("{op} returned {other}"))),
        }
    }

    async fn locate(
        &self,
        frame: &FrameTarget,
        locator: &Locator,
        scope: Option<&ElementRef>,
    ) -> Result<Vec<ElementRef>, DriverError> {
        let value = self.eval(scripts::find(frame, locator, scope)).await?;
        match scripts::status(&value) {
            "ok" => Ok(value
                .get("refs")
                .and_then(|v| v.as_array())
                .map(|refs| {
                    refs.iter()
                        .filter_map(|r| r.as_str())
                        .map(|id| ElementRef::new(id, frame.clone()))
                        .collect()
                })
                .unwrap_or_default()),
            "missing_frame" => {
                Err(DriverError::new(DriverErrorKind::FrameNotFound).with_hint(frame.to_string()))
            }
            "stale" => Err(DriverError::new(DriverErrorKind::StaleElement)
                .with_hint(format!("scope for {locator} no longer attached"))),
            other => Err(DriverError::new(DriverErrorKind::Script)
                .with_hint(format!("find returned {other}"))),
        }
    }

    async fn mouse(&self, kind: DispatchMouseEventType, x: f64, y: f64) -> Result<(), DriverError> {
        let mut builder = DispatchMouseEventParams::builder().r#type(kind.clone()).x(x).y(y);
        if !matches!(kind, DispatchMouseEventType::MouseMoved) {
            builder = builder.button(MouseButton::Left).click_count(1);
        }
        let params = builder
            .build()
            .map_err(|err| DriverError::new(DriverErrorKind::Internal).with_hint(err))?;
        self.page.execute(params).await.map_err(map_cdp)?;
        Ok(())
    }

    async fn center(&self, element: &ElementRef) -> Result<(f64, f64), DriverError> {
        let value = self.element_call(element, "center", None).await?;
        let x = value.get("x").and_then(|v| v.as_f64()).unwrap_or_default();
        let y = value.get("y").and_then(|v| v.as_f64()).unwrap_or_default();
        let w = value.get("w").and_then(|v| v.as_f64()).unwrap_or_default();
        let h = value.get("h").and_then(|v| v.as_f64()).unwrap_or_default();
        if w <= 0.0 || h <= 0.0 {
            return Err(DriverError::new(DriverErrorKind::NotInteractable)
                .with_hint(format!("element {element} has no box")));
        }
        Ok((x, y))
    }
}

#[async_trait]
impl Driver for ChromiumDriver {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        self.page.goto(url).await.map_err(map_cdp)?;
        self.page.wait_for_navigation().await.map_err(map_cdp)?;
        *self.frame.lock() = FrameTarget::Root;
        info!(target: "cdp", url, "navigated");
        Ok(())
    }

    async fn switch_to_frame(&self, target: &FrameTarget) -> Result<(), DriverError> {
        let value = self.eval(scripts::frame_probe(target)).await?;
        if scripts::status(&value) != "ok" {
            return Err(DriverError::new(DriverErrorKind::FrameNotFound).with_hint(target.to_string()));
        }
        *self.frame.lock() = target.clone();
        Ok(())
    }

    async fn current_frame(&self) -> FrameTarget {
        self.frame.lock().clone()
    }

    async fn find_all(&self, locator: &Locator) -> Result<Vec<ElementRef>, DriverError> {
        let frame = self.frame.lock().clone();
        self.locate(&frame, locator, None).await
    }

    async fn find_within(
        &self,
        scope: &ElementRef,
        locator: &Locator,
    ) -> Result<Vec<ElementRef>, DriverError> {
        self.locate(&scope.frame, locator, Some(scope)).await
    }

    async fn click(&self, element: &ElementRef, method: ClickMethod) -> Result<(), DriverError> {
        match method {
            ClickMethod::Synthetic => {
                self.element_call(element, "click", None).await?;
            }
            ClickMethod::Pointer => {
                let (x, y) = self.center(element).await?;
                self.mouse(DispatchMouseEventType::MouseMoved, x, y).await?;
                self.mouse(DispatchMouseEventType::MousePressed, x, y).await?;
                self.mouse(DispatchMouseEventType::MouseReleased, x, y).await?;
            }
            ClickMethod::Direct => {
                let (x, y) = self.center(element).await?;
                self.mouse(DispatchMouseEventType::MousePressed, x, y).await?;
                self.mouse(DispatchMouseEventType::MouseReleased, x, y).await?;
            }
        }
        debug!(target: "cdp", element = %element, method = method.name(), "click dispatched");
        Ok(())
    }

    async fn attribute(
        &self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, DriverError> {
        let value = self.element_call(element, "attr", Some(name)).await?;
        Ok(value
            .get("value")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()))
    }

    async fn text(&self, element: &ElementRef) -> Result<String, DriverError> {
        let value = self.element_call(element, "text", None).await?;
        Ok(value
            .get("value")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string())
    }

    async fn is_displayed(&self, element: &ElementRef) -> Result<bool, DriverError> {
        let value = self.element_call(element, "displayed", None).await?;
        Ok(value.get("value").and_then(|v| v.as_bool()).unwrap_or(false))
    }

    async fn is_enabled(&self, element: &ElementRef) -> Result<bool, DriverError> {
        let value = self.element_call(element, "enabled", None).await?;
        Ok(value.get("value").and_then(|v| v.as_bool()).unwrap_or(false))
    }

    async fn scroll_into_view(&self, element: &ElementRef) -> Result<(), DriverError> {
        self.element_call(element, "scroll", None).await.map(|_| ())
    }

    async fn wheel(&self, element: &ElementRef, delta_y: f64) -> Result<(), DriverError> {
        let (x, y) = self.center(element).await?;
        let params = DispatchMouseEventParams::builder()
            .r#type(DispatchMouseEventType::MouseWheel)
            .x(x)
            .y(y)
            .delta_x(0.0)
            .delta_y(delta_y)
            .build()
            .map_err(|err| DriverError::new(DriverErrorKind::Internal).with_hint(err))?;
        self.page.execute(params).await.map_err(map_cdp)?;
        Ok(())
    }

    async fn execute_script(&self, script: &str, args: &[ElementRef]) -> Result<Value, DriverError> {
        self.eval(scripts::user_script(script, args)).await
    }

    async fn accept_dialog(&self) -> Result<bool, DriverError> {
        if !self.dialog_open.swap(false, Ordering::SeqCst) {
            return Ok(false);
        }
        match self.page.execute(HandleJavaScriptDialogParams::new(true)).await {
            Ok(_) => Ok(true),
            Err(err) => {
                // Already dismissed by the page itself.
                debug!(target: "cdp", error = %err, "dialog accept failed");
                Ok(false)
            }
        }
    }

    async fn screenshot(&self) -> Result<Vec<u8>, DriverError> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        self.page.screenshot(params).await.map_err(map_cdp)
    }

    async fn page_source(&self) -> Result<String, DriverError> {
        let frame = self.frame.lock().clone();
        let value = self.eval(scripts::page_source(&frame)).await?;
        match scripts::status(&value) {
            "ok" => Ok(value
                .get("value")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()),
            _ => Err(DriverError::new(DriverErrorKind::FrameNotFound).with_hint(frame.to_string())),
        }
    }

    async fn close(&self) -> Result<(), DriverError> {
        let browser = self.browser.lock().await.take();
        let Some(mut browser) = browser else {
            return Ok(());
        };
        if let Err(err) = browser.close().await {
            warn!(target: "cdp", error = %err, "browser close failed");
        }
        if let Err(err) = browser.wait().await {
            warn!(target: "cdp", error = %err, "browser wait failed");
        }
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
        info!(target: "cdp", "browser closed");
        Ok(())
    }
}

fn map_cdp(err: CdpError) -> DriverError {
    match err {
        CdpError::Timeout => DriverError::new(DriverErrorKind::NavTimeout),
        CdpError::JavascriptException(details) => {
            DriverError::new(DriverErrorKind::Script).with_hint(format!("{details:?}"))
        }
        CdpError::ChannelSendError(_) | CdpError::NoResponse => {
            DriverError::new(DriverErrorKind::Closed).with_hint(err.to_string())
        }
        other => DriverError::new(DriverErrorKind::Io).with_hint(other.to_string()),
    }
}
