pub mod config;
pub mod constants;
pub mod correlation;
pub mod duration;
pub mod engine;
pub mod errors;
pub mod flags;
pub mod logging;
pub mod model;
