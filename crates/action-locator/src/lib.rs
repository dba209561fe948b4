//! Element resolution
//!
//! A [`LocatorSet`] lists equivalent ways of finding one logical element in
//! preference order. The [`ElementResolver`] tries them in that order with a
//! bounded retry around each full pass, optionally filtering candidates
//! through a [`Disambiguator`], and captures diagnostics when it gives up.

pub mod diagnostics;
pub mod disambiguate;
pub mod errors;
pub mod resolver;
mod runtime;
pub mod types;

pub use diagnostics::{ArtifactDiagnostics, DiagnosticSink, NoDiagnostics};
pub use disambiguate::{AllOf, Disambiguator, Interactable, SiblingVocabulary};
pub use errors::LocatorError;
pub use resolver::{ElementResolver, ResolveOptions};
pub use runtime::RuntimeDeps;
pub use types::{LocatorSet, Resolved};
