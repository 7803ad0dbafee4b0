//! Resource Index Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, text utilities, and error handling for the resource index workspace.
//!
//! # Overview
//!
//! - **Types**: [`Resource`], [`Structure`], [`Context`] and [`Element`], the
//!   normalized shape every connector produces
//! - **Text**: normalization of scraped text before it lands in an ET table
//! - **Logging**: tracing subscriber setup shared by every binary
//! - **Errors**: [`RiError`] and the [`Result`] alias
//!
//! # Example
//!
//! ```
//! use rindex_common::{Element, Structure};
//!
//! let structure = Structure::builder("GEO")
//!     .context("title", 1.0, None)
//!     .context("summary", 0.8, None)
//!     .build();
//!
//! let element = Element::new("GSE1").with("GEO_title", "Tumor samples");
//! let conformed = structure.conform(element).unwrap();
//! assert_eq!(conformed.field("GEO_summary"), Some(""));
//! ```

pub mod error;
pub mod logging;
pub mod text;
pub mod types;

pub use error::{Result, RiError};
pub use types::{Context, Element, Resource, Structure};
