pub mod constants;
pub mod input;
pub mod math;
pub mod physics;
pub mod room;
pub mod scheduler;
pub mod settings;
pub mod types;
