//! Element resolver with ordered fallback

use std::time::Duration;

use action_primitives::{wait_until, ActionError, Pacer, RetryDecision, RetryPolicy, POLL_INTERVAL};
use cdp_adapter::{Driver, DriverError, ElementRef, Locator};
use tracing::{debug, info, instrument, warn};

use crate::{
    diagnostics::DiagnosticSink,
    disambiguate::Disambiguator,
    errors::LocatorError,
    types::{LocatorSet, Resolved},
};

/// Presence timeout per locator plus the retry policy around full passes.
#[derive(Debug, Clone, Copy)]
pub struct ResolveOptions {
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl ResolveOptions {
    pub fn new(timeout: Duration, retry: RetryPolicy) -> Self {
        Self { timeout, retry }
    }

    /// One pass without waiting, used for cheap probes.
    pub fn probe() -> Self {
        Self::new(Duration::ZERO, RetryPolicy::once())
    }
}

/// Resolves [`LocatorSet`]s against one driver.
pub struct ElementResolver<'a> {
    driver: &'a dyn Driver,
    pacer: &'a Pacer,
    diagnostics: &'a dyn DiagnosticSink,
}

impl<'a> ElementResolver<'a> {
    pub fn new(driver: &'a dyn Driver, pacer: &'a Pacer, diagnostics: &'a dyn DiagnosticSink) -> Self {
        Self {
            driver,
            pacer,
            diagnostics,
        }
    }

    /// First element found by the earliest locator in `set`.
    pub async fn resolve(
        &self,
        set: &LocatorSet,
        options: &ResolveOptions,
    ) -> Result<Resolved, LocatorError> {
        self.resolve_inner(set, options, None).await
    }

    /// Like [`ElementResolver::resolve`], but only candidates accepted by
    /// `filter` count as found. All matches of a locator are inspected in
    /// document order before moving to the next locator.
    pub async fn resolve_where(
        &self,
        set: &LocatorSet,
        options: &ResolveOptions,
        filter: &dyn Disambiguator,
    ) -> Result<Resolved, LocatorError> {
        self.resolve_inner(set, options, Some(filter)).await
    }

    /// Steps:
    /// 1. For each locator in order, wait up to `timeout` for an acceptable match.
    /// 2. The first match ends the search; later locators are not tried.
    /// 3. A pass with no match sleeps the retry backoff and starts over.
    /// 4. When the attempt budget is spent, capture diagnostics and fail.
    #[instrument(skip_all, fields(locator_set = set.name()))]
    async fn resolve_inner(
        &self,
        set: &LocatorSet,
        options: &ResolveOptions,
        filter: Option<&dyn Disambiguator>,
    ) -> Result<Resolved, LocatorError> {
        if set.is_empty() {
            return Err(LocatorError::Internal(format!("locator set {} is empty", set.name())));
        }
        let mut attempts = 0;
        let outcome = options
            .retry
            .run_if(
                self.pacer,
                set.name(),
                |attempt| {
                    attempts = attempt;
                    self.pass(set, options.timeout, filter, attempt)
                },
                |err: &LocatorError| {
                    if matches!(err, LocatorError::ElementNotFound { .. }) {
                        RetryDecision::Retry
                    } else {
                        RetryDecision::Abort
                    }
                },
            )
            .await;
        match outcome {
            Ok(resolved) => {
                info!(
                    target: "locator",
                    locator = %resolved.locator,
                    index = resolved.index,
                    attempt = resolved.attempt,
                    "element resolved"
                );
                Ok(resolved)
            }
            Err(LocatorError::ElementNotFound { target, .. }) => {
                warn!(target: "locator", element = %target, attempts, "all locators exhausted");
                self.diagnostics
                    .capture(self.driver, &format!("{}_not_found", set.name()))
                    .await;
                Err(LocatorError::not_found(target, attempts))
            }
            Err(other) => Err(other),
        }
    }

    async fn pass(
        &self,
        set: &LocatorSet,
        timeout: Duration,
        filter: Option<&dyn Disambiguator>,
        attempt: u32,
    ) -> Result<Resolved, LocatorError> {
        for (index, locator) in set.locators().iter().enumerate() {
            debug!(target: "locator", attempt, %locator, "trying locator");
            let found = wait_until(self.pacer, set.name(), timeout, POLL_INTERVAL, || {
                self.candidate(locator, filter)
            })
            .await;
            match found {
                Ok(element) => {
                    return Ok(Resolved {
                        element,
                        locator: locator.clone(),
                        index,
                        attempt,
                    })
                }
                Err(ActionError::WaitTimeout(_)) => {
                    debug!(target: "locator", attempt, %locator, "locator failed, trying next");
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(LocatorError::not_found(set.name(), attempt))
    }

    async fn candidate(
        &self,
        locator: &Locator,
        filter: Option<&dyn Disambiguator>,
    ) -> Result<Option<ElementRef>, ActionError> {
        let candidates = match self.driver.find_all(locator).await {
            Ok(candidates) => candidates,
            Err(err) => return soft_miss(err),
        };
        let Some(filter) = filter else {
            return Ok(candidates.into_iter().next());
        };
        for candidate in candidates {
            match filter.accept(self.driver, &candidate).await {
                Ok(true) => return Ok(Some(candidate)),
                Ok(false) => {}
                Err(err) if err.is_fatal() => return Err(err.into()),
                Err(err) => {
                    debug!(target: "locator", %candidate, error = %err, "candidate check failed");
                }
            }
        }
        Ok(None)
    }
}

/// Driver hiccups during a lookup count as "not found yet" unless the
/// browser itself is gone.
fn soft_miss(err: DriverError) -> Result<Option<ElementRef>, ActionError> {
    if err.is_fatal() {
        return Err(err.into());
    }
    debug!(target: "locator", error = %err, "lookup error treated as miss");
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{disambiguate::Interactable, NoDiagnostics};
    use async_trait::async_trait;
    use cdp_adapter::fixture::{ElementSpec, FixtureDriver};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Labels(Mutex<Vec<String>>);

    #[async_trait]
    impl DiagnosticSink for Labels {
        async fn capture(&self, _driver: &dyn Driver, label: &str) {
            self.0.lock().unwrap().push(label.to_string());
        }

        async fn snapshot_source(&self, _driver: &dyn Driver, _label: &str) {}
    }

    fn set() -> LocatorSet {
        LocatorSet::xpaths(
            "fund_tab",
            &[
                "//img[@alt='펀드']",
                "//a[img[@alt='펀드']]",
                "//a[contains(@href,'MSIS40100000000000')]",
            ],
        )
    }

    fn options(attempts: u32) -> ResolveOptions {
        ResolveOptions::new(Duration::from_millis(20), RetryPolicy::new(attempts, 0, 0))
    }

    #[tokio::test]
    async fn test_only_nth_locator_matches() {
        let driver = FixtureDriver::new();
        driver.add(ElementSpec::new("tab").locator("//a[contains(@href,'MSIS40100000000000')]"));
        let pacer = Pacer::immediate();
        let resolver = ElementResolver::new(&driver, &pacer, &NoDiagnostics);

        let resolved = resolver.resolve(&set(), &options(3)).await.unwrap();
        assert_eq!(resolved.index, 2);
        assert_eq!(resolved.attempt, 1);

        let first = driver.first_lookup("//img[@alt='펀드']").unwrap();
        let second = driver.first_lookup("//a[img[@alt='펀드']]").unwrap();
        let third = driver
            .first_lookup("//a[contains(@href,'MSIS40100000000000')]")
            .unwrap();
        assert!(first < second && second < third);
    }

    #[tokio::test]
    async fn test_first_success_stops_search() {
        let driver = FixtureDriver::new();
        driver.add(ElementSpec::new("img").locator("//img[@alt='펀드']"));
        driver.add(ElementSpec::new("link").locator("//a[img[@alt='펀드']]"));
        let pacer = Pacer::immediate();
        let resolver = ElementResolver::new(&driver, &pacer, &NoDiagnostics);

        let resolved = resolver.resolve(&set(), &options(1)).await.unwrap();
        assert_eq!(resolved.index, 0);
        assert!(driver.first_lookup("//a[img[@alt='펀드']]").is_none());
    }

    #[tokio::test]
    async fn test_exhaustion_captures_diagnostics() {
        let driver = FixtureDriver::new();
        let pacer = Pacer::immediate();
        let sink = Labels::default();
        let resolver = ElementResolver::new(&driver, &pacer, &sink);

        let err = resolver.resolve(&set(), &options(2)).await.unwrap_err();
        match err {
            LocatorError::ElementNotFound { target, attempts } => {
                assert_eq!(target, "fund_tab");
                assert_eq!(attempts, 2);
            }
            other => panic!("unexpected error {other:?}"),
        }
        let lookups = driver
            .calls()
            .iter()
            .filter(|call| *call == "find //img[@alt='펀드']")
            .count();
        assert!(lookups >= 2);
        assert_eq!(*sink.0.lock().unwrap(), vec!["fund_tab_not_found".to_string()]);
    }

    #[tokio::test]
    async fn test_filter_skips_hidden_duplicates() {
        let driver = FixtureDriver::new();
        driver.add(ElementSpec::new("hidden").locator("//a[@role='button']").hidden());
        driver.add(ElementSpec::new("shown").locator("//a[@role='button']"));
        let pacer = Pacer::immediate();
        let resolver = ElementResolver::new(&driver, &pacer, &NoDiagnostics);
        let set = LocatorSet::xpaths("search", &["//a[@role='button']"]);

        let resolved = resolver
            .resolve_where(&set, &options(1), &Interactable)
            .await
            .unwrap();
        assert!(resolved.element.id.starts_with("shown#"));
    }

    #[tokio::test]
    async fn test_closed_driver_aborts_without_retry() {
        let driver = FixtureDriver::new();
        driver.close().await.unwrap();
        let pacer = Pacer::immediate();
        let resolver = ElementResolver::new(&driver, &pacer, &NoDiagnostics);
        let err = resolver.resolve(&set(), &options(3)).await.unwrap_err();
        assert!(matches!(err, LocatorError::Driver(_)));
    }
}
