pub mod backend;
pub mod config;
pub mod errors;
pub mod export;
pub mod init;
pub mod novel_config;
pub mod orchestrator;
pub mod persistence;
pub mod project;
pub mod review;
pub mod signals;
pub mod ui;
pub mod util;
pub mod workflow;
