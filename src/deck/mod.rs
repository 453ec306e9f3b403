pub mod gesture;
pub mod state;
pub mod store;
