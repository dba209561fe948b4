use std::{env, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::util::detect_chrome_executable;

/// Configuration for launching one browser instance.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DriverConfig {
    pub executable: Option<PathBuf>,
    pub profile_dir: PathBuf,
    pub download_dir: PathBuf,
    pub headless: bool,
    pub window_width: u32,
    pub window_height: u32,
    pub user_agent: Option<String>,
    pub launch_timeout_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            executable: None,
            profile_dir: default_profile_dir(),
            download_dir: PathBuf::from("downloads"),
            headless: resolve_headless_default(),
            window_width: 1920,
            window_height: 1080,
            user_agent: None,
            launch_timeout_ms: 30_000,
            request_timeout_ms: 60_000,
        }
    }
}

impl DriverConfig {
    /// Configured executable, falling back to a discovered Chrome install.
    pub fn resolved_executable(&self) -> Option<PathBuf> {
        self.executable
            .clone()
            .filter(|path| !path.as_os_str().is_empty())
            .or_else(detect_chrome_executable)
    }

    pub fn launch_timeout(&self) -> Duration {
        Duration::from_millis(self.launch_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn resolve_headless_default() -> bool {
    // "0", "false", "no", "off" means headful
    match env::var("KOFIA_HEADLESS") {
        Ok(value) => {
            let lower = value.to_ascii_lowercase();
            !matches!(lower.as_str(), "0" | "false" | "no" | "off")
        }
        Err(_) => true,
    }
}

fn default_profile_dir() -> PathBuf {
    if let Ok(path) = env::var("KOFIA_CHROME_PROFILE") {
        return PathBuf::from(path);
    }
    PathBuf::from("./.fundstat-profile")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeouts_from_millis() {
        let config = DriverConfig {
            launch_timeout_ms: 1_500,
            ..DriverConfig::default()
        };
        assert_eq!(config.launch_timeout(), Duration::from_millis(1_500));
        assert_eq!(config.window_width, 1920);
    }

    #[test]
    fn test_explicit_executable_wins() {
        let config = DriverConfig {
            executable: Some(PathBuf::from("/opt/chrome/chrome")),
            ..DriverConfig::default()
        };
        assert_eq!(
            config.resolved_executable(),
            Some(PathBuf::from("/opt/chrome/chrome"))
        );
    }
}
