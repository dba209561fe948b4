//! Synthetic dropdown driver.
//!
//! Script-rendered comboboxes need click-to-open, a search through a
//! possibly virtualized option list (which may be appended to the outer
//! document), a click on the option and a read-back of the displayed value.

pub mod errors;
pub mod model;

mod identify;
mod locators;
mod runner;

pub use errors::DropdownError;
pub use identify::VocabularyProbe;
pub use locators::{
    listbox_locator, option_exact_xpaths, option_substring_xpaths, CURRENT_TEXT_XPATH,
    LISTBOX_XPATH, OPTION_TEXT_XPATH,
};
pub use model::{DropdownTimings, SelectOutcome};
pub use runner::DropdownDriver;
