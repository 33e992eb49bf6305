//! # viewset - view/partial template collections
//!
//! `viewset` manages a collection of page-level "view" templates that all
//! share a set of "partial" fragments (headers, navigation, scripts), and
//! renders a chosen view into bytes or a writer, optionally through a named
//! base/wrapper template. Template syntax is delegated to
//! [`minijinja`](https://docs.rs/minijinja); this crate owns the
//! bookkeeping around it:
//!
//! - Every registered view has every registered partial attached, no matter
//!   the order the two were added in.
//! - Output buffers are pooled and reused across concurrent renders without
//!   cross-request contamination.
//!
//! ## Core Types
//!
//! - [`Templates`]: the collection (views, partials, functions, pool)
//! - [`BufferPool`] / [`PooledBuf`]: reusable render buffers
//! - [`RenderError`] / [`LoadError`]: registration/render and scan errors
//!
//! ## Quick Start
//!
//! ```
//! use serde::Serialize;
//! use viewset::Templates;
//!
//! #[derive(Serialize)]
//! struct Page {
//!     title: String,
//!     menu: String,
//! }
//!
//! # fn main() -> Result<(), viewset::RenderError> {
//! let mut templates = Templates::new();
//! templates.add_partial("nav", "<nav>{{ menu }}</nav>")?;
//! templates.add_view(
//!     "index",
//!     r#"<html>{% include "nav" %}<p>{{ title }}</p></html>"#,
//! )?;
//!
//! let page = Page { title: "Hi".into(), menu: "M".into() };
//! let html = templates.render_to_bytes(None, "index", &page)?;
//! assert_eq!(html, b"<html><nav>M</nav><p>Hi</p></html>");
//! # Ok(())
//! # }
//! ```
//!
//! ## Loading From a Directory
//!
//! A directory scan classifies files by path convention (anything under a
//! `view/` or `views/` segment is a view, everything else is a partial)
//! and registers the lot:
//!
//! ```rust,ignore
//! let mut templates = Templates::new();
//! templates.add_extensions(["html"]);
//! templates.parse_directory("templates/", "templates/")?;
//! ```
//!
//! ## Serving Concurrently
//!
//! Populate the collection during startup, then share it: all render
//! methods take `&self`, so an `Arc<Templates>` serves any number of
//! parallel renders. Each buffered render draws an exclusive buffer from
//! the internal pool.

mod error;
mod loader;
pub mod pool;
mod registry;

pub use error::{LoadError, RenderError};
pub use pool::{BufferPool, PooledBuf};
pub use registry::Templates;
