//! Browser driver capability surface.
//!
//! Upper layers only talk to [`Driver`]: navigate, address a frame, find
//! elements, click them a few different ways and read their state. The
//! Chromium implementation drives a real browser over the DevTools protocol;
//! the `fixture` feature adds an in-memory driver for tests.

use async_trait::async_trait;
use serde_json::Value;

mod chromium;
pub mod config;
pub mod error;
#[cfg(any(test, feature = "fixture"))]
pub mod fixture;
pub mod locator;
mod scripts;
mod util;

pub use chromium::ChromiumDriver;
pub use config::DriverConfig;
pub use error::{DriverError, DriverErrorKind};
pub use locator::{xpath_literal, By, ClickMethod, ElementRef, FrameTarget, Locator};
pub use util::detect_chrome_executable;

/// Minimal capability surface the acquisition layers are written against.
///
/// Element handles returned by one driver are only meaningful to that driver.
#[async_trait]
pub trait Driver: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<(), DriverError>;

    /// Address a named sub-frame or the document root for subsequent lookups.
    async fn switch_to_frame(&self, target: &FrameTarget) -> Result<(), DriverError>;

    async fn current_frame(&self) -> FrameTarget;

    async fn find_all(&self, locator: &Locator) -> Result<Vec<ElementRef>, DriverError>;

    async fn find(&self, locator: &Locator) -> Result<Option<ElementRef>, DriverError> {
        Ok(self.find_all(locator).await?.into_iter().next())
    }

    /// Lookup relative to `scope` (locator expressions like `.//div`).
    async fn find_within(
        &self,
        scope: &ElementRef,
        locator: &Locator,
    ) -> Result<Vec<ElementRef>, DriverError>;

    async fn click(&self, element: &ElementRef, method: ClickMethod) -> Result<(), DriverError>;

    /// Script-dispatched click that bypasses hit-testing.
    async fn synthetic_click(&self, element: &ElementRef) -> Result<(), DriverError> {
        self.click(element, ClickMethod::Synthetic).await
    }

    async fn attribute(
        &self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, DriverError>;

    async fn text(&self, element: &ElementRef) -> Result<String, DriverError>;

    async fn is_displayed(&self, element: &ElementRef) -> Result<bool, DriverError>;

    async fn is_enabled(&self, element: &ElementRef) -> Result<bool, DriverError>;

    async fn scroll_into_view(&self, element: &ElementRef) -> Result<(), DriverError>;

    /// Mouse-wheel increment over `element`.
    async fn wheel(&self, element: &ElementRef, delta_y: f64) -> Result<(), DriverError>;

    /// Run `script` with `args` bound to `arguments[..]`.
    async fn execute_script(&self, script: &str, args: &[ElementRef])
        -> Result<Value, DriverError>;

    /// Accept a pending native dialog. Returns whether one was showing.
    async fn accept_dialog(&self) -> Result<bool, DriverError>;

    /// PNG bytes of the current viewport.
    async fn screenshot(&self) -> Result<Vec<u8>, DriverError>;

    /// Markup of the currently addressed document.
    async fn page_source(&self) -> Result<String, DriverError>;

    async fn close(&self) -> Result<(), DriverError>;
}
