use std::time::Duration;

use action_primitives::SettleRange;
use serde::{Deserialize, Serialize};

/// Waits and pacing used while driving one dropdown.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DropdownTimings {
    /// How long a toggle click may take to flip `aria-expanded`.
    pub open_wait_ms: u64,
    /// How long to look for the option list in each document context.
    pub listbox_wait_ms: u64,
    /// Pause after clicks on the control or an option.
    pub click_settle: SettleRange,
    pub wheel_delta: f64,
    pub max_wheel_steps: u32,
    pub wheel_pause_ms: u64,
}

impl Default for DropdownTimings {
    fn default() -> Self {
        Self {
            open_wait_ms: 2_000,
            listbox_wait_ms: 3_000,
            click_settle: SettleRange::new(1_000, 1_500),
            wheel_delta: 150.0,
            max_wheel_steps: 50,
            wheel_pause_ms: 150,
        }
    }
}

impl DropdownTimings {
    pub fn open_wait(&self) -> Duration {
        Duration::from_millis(self.open_wait_ms)
    }

    pub fn listbox_wait(&self) -> Duration {
        Duration::from_millis(self.listbox_wait_ms)
    }

    pub fn wheel_pause(&self) -> Duration {
        Duration::from_millis(self.wheel_pause_ms)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectOutcome {
    /// Displayed value already matched; the control was not opened.
    AlreadySet,
    /// Option clicked and read back on the given attempt.
    Selected { attempt: u32, scrolls: u32 },
}

impl SelectOutcome {
    pub fn opened(&self) -> bool {
        matches!(self, SelectOutcome::Selected { .. })
    }
}
