pub mod matrix;

pub use matrix::MatrixHelper;
