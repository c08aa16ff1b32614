//! Control plane: workspace layout, persistence, discovery, and the
//! orchestrator that composes them.

pub mod broker;
pub mod config;
pub mod db;
pub mod discovery;
pub mod error;
pub mod logging;
pub mod memory;
pub mod orchestrator;
pub mod output;
pub mod project;
pub mod results;
pub mod schemas;
pub mod time;
pub mod tools;
pub mod workspace;
