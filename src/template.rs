pub mod compiled;
pub mod raw;
