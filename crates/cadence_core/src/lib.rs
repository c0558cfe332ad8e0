//! Cadence Core
//!
//! Foundational pieces shared by the Cadence animation engine:
//!
//! - **Frame Clock**: the platform callback source that pulses the engine once
//!   per display cycle, plus a hand-driven [`ManualClock`]
//! - **Timing Configuration**: the shared duration-scale knob
//! - **Errors**: configuration errors

pub mod clock;
pub mod config;
pub mod error;

pub use clock::{CallbackKind, FrameClock, ManualClock};
pub use config::{scale_ms, TimingConfig};
pub use error::{CoreError, Result};
