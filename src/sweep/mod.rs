//! Band/power sweep: data model, SCPI vocabulary, and the controller
//! state machine.

pub mod controller;
pub mod record;
pub mod scpi;

pub use controller::{SweepController, SweepReport};
pub use record::{MeasurementRecord, PointFailure, StepPolicy, SweepPoint, SweepStep};
