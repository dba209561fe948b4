//! Application configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional YAML
//! file, then `KOFIA__SECTION__KEY` environment variables. Command-line
//! flags are applied by the caller afterwards.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use ::config::{Config, Environment, File, FileFormat};
use action_locator::ResolveOptions;
use action_primitives::{RetryPolicy, SettleRange};
use cdp_adapter::{DriverConfig, Locator};
use fundstat_acquisition::{
    site::{BASE_URL, FRAME_NAME, LANDMARK},
    AcquireSettings, DetectorSettings, NavPacing, SiteProfile,
};
use fundstat_core_types::{builtin_catalog, validate_catalog, DatasetConfig};
use fundstat_scheduler::OrchestratorConfig;
use serde::{Deserialize, Serialize};
use tool_select_option::DropdownTimings;
use tracing::debug;

use crate::errors::AppError;

pub const ENV_PREFIX: &str = "KOFIA";
const APP_DIR: &str = "kofia-fundstat";

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub site: SiteSection,
    pub browser: BrowserSection,
    pub paths: PathsSection,
    pub timeouts: TimeoutSection,
    pub retry: RetrySection,
    pub pacing: PacingSection,
    pub download: DetectorSettings,
    pub sessions: SessionSection,
    /// Replaces the built-in catalog when present.
    pub datasets: Option<Vec<DatasetConfig>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSection {
    pub base_url: String,
    pub frame_name: String,
    pub landmark: String,
}

impl Default for SiteSection {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            frame_name: FRAME_NAME.to_string(),
            landmark: LANDMARK.to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserSection {
    /// Discovered on `PATH` when unset.
    pub executable: Option<PathBuf>,
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
    pub user_agent: Option<String>,
    pub launch_timeout_ms: u64,
}

impl Default for BrowserSection {
    fn default() -> Self {
        Self {
            executable: None,
            headless: true,
            window_width: 1920,
            window_height: 1080,
            user_agent: None,
            launch_timeout_ms: 30_000,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsSection {
    pub download_dir: PathBuf,
    /// Screenshots and page sources captured on failures.
    pub artifact_dir: PathBuf,
    pub log_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Per-session browser profiles live below this directory.
    pub profile_dir: PathBuf,
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("downloads"),
            artifact_dir: PathBuf::from("artifacts"),
            log_dir: PathBuf::from("logs"),
            output_dir: PathBuf::from("output"),
            profile_dir: PathBuf::from(".fundstat-profile"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutSection {
    pub element_ms: u64,
    pub download_ms: u64,
    pub results_ms: u64,
    pub form_ready_ms: u64,
    pub dropdown_open_ms: u64,
    pub listbox_ms: u64,
}

impl Default for TimeoutSection {
    fn default() -> Self {
        Self {
            element_ms: 30_000,
            download_ms: 120_000,
            results_ms: 15_000,
            form_ready_ms: 20_000,
            dropdown_open_ms: 2_000,
            listbox_ms: 3_000,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    pub max_retries: u32,
    pub delay_ms: u64,
    pub jitter_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay_ms: 5_000,
            jitter_ms: 2_000,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingSection {
    /// Multiplies every settle interval; 0 disables pacing.
    pub scale: f64,
    pub navigation: NavPacing,
    pub before_search: SettleRange,
    pub before_export: SettleRange,
    pub after_download: SettleRange,
    pub dropdown_click: SettleRange,
}

impl Default for PacingSection {
    fn default() -> Self {
        let acquire = AcquireSettings::default();
        Self {
            scale: 1.0,
            navigation: NavPacing::default(),
            before_search: acquire.before_search,
            before_export: acquire.before_export,
            after_download: acquire.after_download,
            dropdown_click: acquire.dropdown.click_settle,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// 1 runs sequentially; more runs parallel sessions plus a retry pass.
    pub count: usize,
    pub stagger_ms: u64,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            count: 1,
            stagger_ms: 2_000,
        }
    }
}

/// `<config_dir>/kofia-fundstat/config.yaml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.yaml"))
}

impl AppConfig {
    /// Load defaults, then `path` (required when given explicitly, optional
    /// at the default location), then the environment.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let defaults = Config::try_from(&AppConfig::default())?;
        let mut builder = Config::builder().add_source(defaults);
        match path {
            Some(path) => {
                if !path.exists() {
                    return Err(AppError::MissingConfig(path.to_path_buf()));
                }
                builder = builder.add_source(File::from(path).format(FileFormat::Yaml));
            }
            None => {
                if let Some(default) = default_config_path() {
                    debug!(path = %default.display(), "looking for default configuration");
                    builder = builder
                        .add_source(File::from(default).format(FileFormat::Yaml).required(false));
                }
            }
        }
        let config: AppConfig = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.sessions.count == 0 {
            return Err(AppError::invalid("sessions.count", "must be at least 1"));
        }
        if !(self.pacing.scale >= 0.0) {
            return Err(AppError::invalid("pacing.scale", "must be zero or positive"));
        }
        if self.retry.max_retries == 0 {
            return Err(AppError::invalid("retry.max_retries", "must be at least 1"));
        }
        if self.site.base_url.trim().is_empty() {
            return Err(AppError::invalid("site.base_url", "must not be empty"));
        }
        validate_catalog(&self.catalog())?;
        Ok(())
    }

    /// Configured datasets, or the built-in eleven.
    pub fn catalog(&self) -> Vec<DatasetConfig> {
        self.datasets.clone().unwrap_or_else(builtin_catalog)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry.max_retries, self.retry.delay_ms, self.retry.jitter_ms)
    }

    pub fn site_profile(&self) -> SiteProfile {
        let mut site = SiteProfile::kofia(&self.site.base_url, self.pacing.navigation.clone());
        site.frame_name = self.site.frame_name.clone();
        site.landmark = Locator::xpath(&self.site.landmark);
        site
    }

    pub fn acquire_settings(&self) -> AcquireSettings {
        let dropdown = DropdownTimings {
            open_wait_ms: self.timeouts.dropdown_open_ms,
            listbox_wait_ms: self.timeouts.listbox_ms,
            click_settle: self.pacing.dropdown_click,
            ..DropdownTimings::default()
        };
        AcquireSettings {
            retry: self.retry_policy(),
            results_ms: self.timeouts.results_ms,
            form_ready_ms: self.timeouts.form_ready_ms,
            download_ms: self.timeouts.download_ms,
            before_search: self.pacing.before_search,
            before_export: self.pacing.before_export,
            after_download: self.pacing.after_download,
            dropdown,
            detector: self.download.clone(),
        }
    }

    pub fn element_options(&self) -> ResolveOptions {
        ResolveOptions::new(
            Duration::from_millis(self.timeouts.element_ms),
            RetryPolicy::new(3, 1_000, 500),
        )
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig::new(
            self.site_profile(),
            self.acquire_settings(),
            self.paths.download_dir.clone(),
        )
        .with_element(self.element_options())
        .with_stagger(Duration::from_millis(self.sessions.stagger_ms))
    }

    /// Browser launch settings for session `index`, downloading into `staging`.
    pub fn driver_config(&self, index: usize, staging: &Path) -> DriverConfig {
        DriverConfig {
            executable: self.browser.executable.clone(),
            profile_dir: self.paths.profile_dir.join(format!("session-{index}")),
            download_dir: staging.to_path_buf(),
            headless: self.browser.headless,
            window_width: self.browser.window_width,
            window_height: self.browser.window_height,
            user_agent: self.browser.user_agent.clone(),
            launch_timeout_ms: self.browser.launch_timeout_ms,
            ..DriverConfig::default()
        }
    }
}
