//! Radio group driver.
//!
//! The same label ("전체") appears in several groups on one form, and hidden
//! duplicates of whole groups sit in the DOM. The intended control is the
//! visible, enabled candidate whose group siblings match the group's
//! vocabulary.

pub mod errors;
pub mod model;

mod locators;
mod runner;

pub use errors::RadioError;
pub use locators::{radio_by_label, GROUP_XPATH, INNER_INPUT_XPATH, LABEL_XPATH, MEMBER_XPATH};
pub use model::{RadioGroup, RadioOutcome, VerifyPolicy};
pub use runner::RadioDriver;
