//! Core types for the locator system

use std::fmt;

use cdp_adapter::{ElementRef, Locator};

/// Ordered, immutable alternatives for one logical element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorSet {
    name: String,
    locators: Vec<Locator>,
}

impl LocatorSet {
    pub fn new(name: impl Into<String>, locators: Vec<Locator>) -> Self {
        Self {
            name: name.into(),
            locators,
        }
    }

    /// Set made only of XPath expressions.
    pub fn xpaths(name: impl Into<String>, exprs: &[&str]) -> Self {
        Self::new(name, exprs.iter().map(|expr| Locator::xpath(*expr)).collect())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn locators(&self) -> &[Locator] {
        &self.locators
    }

    pub fn len(&self) -> usize {
        self.locators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locators.is_empty()
    }
}

impl fmt::Display for LocatorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} locator(s))", self.name, self.locators.len())
    }
}

/// Successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub element: ElementRef,
    pub locator: Locator,
    /// Position of the winning locator within its set.
    pub index: usize,
    pub attempt: u32,
}
