pub mod generator;
pub mod types;
