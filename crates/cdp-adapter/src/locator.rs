//! Locator and element handle types

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lookup strategy for a locator expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum By {
    XPath,
    Css,
    Id,
}

impl By {
    pub fn name(&self) -> &'static str {
        match self {
            By::XPath => "xpath",
            By::Css => "css",
            By::Id => "id",
        }
    }
}

/// A `(strategy, expression)` pair identifying one element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    pub by: By,
    pub expr: String,
}

impl Locator {
    pub fn new(by: By, expr: impl Into<String>) -> Self {
        Self {
            by,
            expr: expr.into(),
        }
    }

    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::new(By::XPath, expr)
    }

    pub fn css(expr: impl Into<String>) -> Self {
        Self::new(By::Css, expr)
    }

    pub fn id(expr: impl Into<String>) -> Self {
        Self::new(By::Id, expr)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.by.name(), self.expr)
    }
}

/// Quote `text` as an XPath string literal.
pub fn xpath_literal(text: &str) -> String {
    if !text.contains('\'') {
        return format!("'{text}'");
    }
    if !text.contains('"') {
        return format!("\"{text}\"");
    }
    let parts: Vec<String> = text.split('\'').map(|part| format!("'{part}'")).collect();
    format!("concat({})", parts.join(", \"'\", "))
}

/// Document addressed by lookups: the top-level document or a named frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum FrameTarget {
    #[default]
    Root,
    Named(String),
}

impl FrameTarget {
    pub fn named(name: impl Into<String>) -> Self {
        FrameTarget::Named(name.into())
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            FrameTarget::Root => None,
            FrameTarget::Named(name) => Some(name.as_str()),
        }
    }
}

impl fmt::Display for FrameTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameTarget::Root => f.write_str("root"),
            FrameTarget::Named(name) => write!(f, "frame:{name}"),
        }
    }
}

/// Opaque handle to an element found by a driver.
///
/// The handle remembers the document it was found in, so operations keep
/// working after the driver's addressed frame changes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementRef {
    pub id: String,
    pub frame: FrameTarget,
}

impl ElementRef {
    pub fn new(id: impl Into<String>, frame: FrameTarget) -> Self {
        Self {
            id: id.into(),
            frame,
        }
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.frame)
    }
}

/// How a click is delivered to the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickMethod {
    /// Pointer moved onto the element, then pressed and released.
    Pointer,
    /// `element.click()` dispatched from script.
    Synthetic,
    /// Press and release at the element centre without a hover phase.
    Direct,
}

impl ClickMethod {
    pub fn name(&self) -> &'static str {
        match self {
            ClickMethod::Pointer => "pointer",
            ClickMethod::Synthetic => "synthetic",
            ClickMethod::Direct => "direct",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_display() {
        let locator = Locator::xpath("//img[@alt='펀드']");
        assert_eq!(locator.to_string(), "xpath=//img[@alt='펀드']");
    }

    #[test]
    fn test_xpath_literal_quoting() {
        assert_eq!(xpath_literal("전체"), "'전체'");
        assert_eq!(xpath_literal("it's"), "\"it's\"");
        assert_eq!(
            xpath_literal("a'b\"c"),
            "concat('a', \"'\", 'b\"c')"
        );
    }

    #[test]
    fn test_frame_target_name() {
        assert_eq!(FrameTarget::named("main").name(), Some("main"));
        assert_eq!(FrameTarget::Root.name(), None);
        assert_eq!(FrameTarget::default(), FrameTarget::Root);
    }
}
