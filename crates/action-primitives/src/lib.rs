//! Action primitives - shared building blocks for site interaction
//!
//! - Bounded retry with jittered delay, reused at widget, dataset and session level
//! - Settle-interval pacing that honours cancellation
//! - Frame/context tracking with landmark probes
//! - Click cascades that fall through delivery strategies until an effect is observed
//! - Polling waits

mod click;
pub mod errors;
mod frame;
mod pacing;
mod retry;
mod waiting;

pub use click::*;
pub use errors::*;
pub use frame::*;
pub use pacing::*;
pub use retry::*;
pub use waiting::*;
