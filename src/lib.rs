//! Daemon recording how long each application runs on this machine, per day.
//! Every few seconds it lists running processes, resolves them to application names and adds the
//! elapsed time to the totals of the current day, which are kept in one json file per day.
//!

pub mod cli;
pub mod daemon;
pub mod fs;
pub mod identity;
pub mod process_api;
pub mod utils;
