use std::time::Instant;

use action_primitives::SettleRange;
use cdp_adapter::{ClickMethod, Locator};
use serde::{Deserialize, Serialize};

/// Options for one action-button click.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClickOpt {
    /// Delivery methods, in the order they are tried.
    pub methods: Vec<ClickMethod>,
    /// Pause after scrolling the button into view.
    pub scroll_settle: SettleRange,
}

impl Default for ClickOpt {
    fn default() -> Self {
        Self {
            methods: vec![ClickMethod::Pointer, ClickMethod::Synthetic, ClickMethod::Direct],
            scroll_settle: SettleRange::fixed(1_000),
        }
    }
}

/// State of the button right before clicking.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PrecheckSnapshot {
    pub visible: bool,
    pub enabled: bool,
    pub scrolled: bool,
}

#[derive(Clone, Debug)]
pub struct ActionReport {
    pub locator: Locator,
    pub strategy: &'static str,
    pub precheck: PrecheckSnapshot,
    pub latency_ms: u64,
}

impl ActionReport {
    pub(crate) fn new(
        locator: Locator,
        strategy: &'static str,
        precheck: PrecheckSnapshot,
        started: Instant,
    ) -> Self {
        Self {
            locator,
            strategy,
            precheck,
            latency_ms: started.elapsed().as_millis() as u64,
        }
    }
}
