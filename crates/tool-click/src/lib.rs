pub mod errors;
pub mod model;

mod precheck;
mod runner;

pub use errors::ClickError;
pub use model::{ActionReport, ClickOpt, PrecheckSnapshot};
pub use runner::ActionButton;
