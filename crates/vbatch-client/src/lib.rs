pub mod aws;
pub mod backend;
pub mod client;
pub mod error;
pub mod lock;
pub mod orchestrator;
pub mod report;
pub mod status;
pub mod store;

pub use client::Client;
