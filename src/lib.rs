pub mod beans;
pub mod controller;
pub mod equipment;
pub mod events;
pub mod notes;
pub mod param_info;
pub mod params;
pub mod recipes;
pub mod stages;
pub mod storage;
pub mod timer;
pub mod types;

pub use controller::*;
pub use types::*;
