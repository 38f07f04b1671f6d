//! Sitepipe - static site asset pipeline
//!
//! This library provides functionality to:
//! - Copy images and fonts into an output directory
//! - Compile SCSS, lower and bundle scripts, and render the entry page
//! - Serve the output with live reload and rebuild on change

pub mod build;
pub mod cli;
pub mod config;
pub mod js;
pub mod logging;
pub mod pug;
pub mod server;
pub mod watch;
