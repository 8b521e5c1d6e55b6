//! Infrastructure layer module
//!
//! This module contains the adapters behind the domain ports:
//! - Configuration management
//! - Logging infrastructure
//! - Process management
//! - Stage adapters for the external tools
//! - Built-in index and report tools
//!
//! Infrastructure implementations satisfy the port traits defined in the domain layer.

pub mod builtin;
pub mod config;
pub mod logging;
pub mod process;
pub mod tools;
