pub mod actuator;
pub mod config;
pub mod runner;
