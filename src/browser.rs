//! Chromium-backed sessions.

use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use cdp_adapter::{ChromiumDriver, Driver, DriverError};
use fundstat_scheduler::SessionFactory;
use tracing::info;

use crate::config::AppConfig;

/// Launches one Chromium per session with its own profile and download
/// directory.
pub struct ChromiumSessionFactory {
    config: Arc<AppConfig>,
}

impl ChromiumSessionFactory {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SessionFactory for ChromiumSessionFactory {
    async fn launch(&self, index: usize, staging: &Path) -> Result<Arc<dyn Driver>, DriverError> {
        let driver_config = self.config.driver_config(index, staging);
        info!(
            session = index,
            headless = driver_config.headless,
            profile = %driver_config.profile_dir.display(),
            "launching browser"
        );
        let driver = ChromiumDriver::launch(&driver_config).await?;
        Ok(Arc::new(driver))
    }
}
