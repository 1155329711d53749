//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the automation core and the outside world.
//! They are defined here (in `app`) so that both the use-case layer and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod clock;
pub mod rebooter;
pub mod relay_controller;
pub mod sample_sink;

pub use clock::{Clock, SystemClock};
pub use rebooter::Rebooter;
pub use relay_controller::RelayController;
pub use sample_sink::SampleSink;
