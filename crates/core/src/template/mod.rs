//! Filename templates.
//!
//! A template is plain text with `{placeholder}` tokens, e.g.
//! `{source}_{filename}_{quality}`. The [`TemplateEngine`] substitutes file
//! and video metadata into a template and filters the result into a safe
//! file name; the [`TemplateLibrary`] keeps named templates.
//!
//! # Example
//!
//! ```
//! use std::path::Path;
//! use vidbatch_core::template::TemplateEngine;
//!
//! let engine = TemplateEngine::new();
//! let name = engine.resolve("{filename}_{quality}", Path::new("/x/movie.mp4"), None, "720p");
//! assert_eq!(name, "movie_720p");
//! ```

mod engine;
mod error;
mod library;
mod placeholder;
mod sanitize;

pub use engine::{
    check_template, validate_template, SequenceCounter, TemplateContext, TemplateEngine,
};
pub use error::TemplateError;
pub use library::{NamedTemplate, TemplateLibrary, BUILTIN_TEMPLATES, DEFAULT_TEMPLATE_NAME};
pub use placeholder::{placeholders, Placeholder};
pub use sanitize::{safe_filename, FALLBACK_NAME, ILLEGAL_CHARS};
