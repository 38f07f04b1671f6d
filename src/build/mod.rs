//! Build pipeline for static site assets.
//!
//! Turns a source tree into a deployable output directory:
//!
//! - **Clean**: remove the output directory
//! - **Copy**: images and fonts, byte for byte
//! - **Transform**: SCSS to `styles.min.css`, scripts to `scripts.min.js`,
//!   the entry view to `index.html`
//!
//! # Example
//!
//! ```ignore
//! use sitepipe::build::{BuildContext, BuildMode, BuildPipeline};
//! use sitepipe::config::load_config;
//!
//! let config = load_config(None)?;
//! let context = BuildContext::new(config, project_root, BuildMode::Production);
//! let pipeline = BuildPipeline::new(context);
//!
//! let result = pipeline.full_build()?;
//! println!("{}", result.summary());
//! ```

pub mod assets;
pub mod context;
pub mod error;
pub mod markup;
pub mod pipeline;
pub mod result;
pub mod scripts;
pub mod step;
pub mod styles;

pub use context::*;
pub use error::*;
pub use pipeline::*;
pub use result::*;
pub use step::*;
