pub mod config;
pub mod event;
pub mod logging;
pub mod material;
pub mod types;
