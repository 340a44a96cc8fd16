//! One-shot commands sent straight to the remote device

mod led;

pub use led::{run_led, LedState};
