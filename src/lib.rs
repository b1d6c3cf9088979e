//! Collectify Library
//!
//! Spreadsheet-backed catalog of tools, ChatGPT prompts and a todo tracker,
//! served as a web dashboard and a CLI.

pub mod app;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod format;
pub mod logging;
pub mod records;
pub mod sheet;
pub mod todo;
