pub mod actuator;
pub mod dispatch;
pub mod geodesic;
pub mod solver;

pub use actuator::{LoggingActuator, PtzActuator};
pub use dispatch::CommandDispatcher;
pub use solver::{solve, CameraCalibration, PtzSolution, PtzTarget};
