//! Paired-connection relay session.
//!
//! A session owns one caller link and one agent link and keeps their
//! lifecycles coupled: when either side closes or fails, the other is closed
//! in the same step.
//!
//! - [`state`]: the synchronous state machine (`Initializing -> Active ->
//!   Closing -> Terminated`)
//! - [`driver`]: the async loop that owns the links and feeds the machine

pub mod driver;
pub mod state;

#[cfg(test)]
mod tests;

pub use driver::run_session;
pub use state::{LinkState, Session, SessionAction, SessionEvent, SessionState};
