//! Core services for toolgrid: configuration, item discovery, child-process
//! execution, logging and signal handling. Nothing in here draws.

pub mod config;
pub mod exec;
pub mod interrupt;
pub mod items;
pub mod logging;
