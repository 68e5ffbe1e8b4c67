//! The locomotive registry and run-loop scheduler of the DCC command
//! station: tracks locomotives, continuously streams their packets to the
//! bound driver, and accepts runtime mutations and one-shot commands from
//! arbitrary threads while never stopping the packet stream.

pub mod config;
pub mod controller;
pub mod locomotive;

pub use config::SchedulerConfig;
pub use controller::Controller;
pub use locomotive::Locomotive;
