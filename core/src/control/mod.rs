pub mod override_gate;

pub use override_gate::{ControlMode, OverrideGate};
