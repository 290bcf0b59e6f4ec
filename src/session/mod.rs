//! Session lifecycle: clock, state, controller and the async driver.

pub mod clock;
pub mod controller;
pub mod driver;
pub mod state;

pub use clock::{ClockTick, SessionClock};
pub use controller::{
    FixRequest, FixTicket, SessionController, SessionError, SessionSources, SessionStatus,
};
pub use driver::{SessionCommand, SessionDriver, SessionHandle, SessionUpdate};
pub use state::{SessionDiagnostics, SessionState, TelemetrySnapshot};
