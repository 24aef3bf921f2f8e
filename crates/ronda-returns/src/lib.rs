#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Forward-return computation for the Ronda framework.
//!
//! Forward returns are computed by stepping through the price panel's
//! sorted index, never by calendar arithmetic, so holidays and weekends
//! can never miscount a horizon. The panel's periodicity (daily, weekly,
//! ...) is inferred from the index itself and drives horizon labeling and
//! annualization.

pub mod calendar;
pub mod forward;

// Re-export main types
pub use calendar::Periodicity;
pub use forward::{ForwardReturns, PriceViolation, compute_forward_returns};
