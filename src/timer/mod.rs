pub mod state;
pub mod ticker;

pub use state::{format_remaining, Countdown, TickOutcome};
pub use ticker::Ticker;
