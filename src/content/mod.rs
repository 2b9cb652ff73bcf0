//! Revision content and its lazily rendered form.
//!
//! A [`RevisionContent`] holds the raw source of one revision. Its rendered
//! form is produced on first demand through a [`Renderer`] and memoized on the
//! instance:
//!
//! - at most one render call succeeds per instance, even with concurrent readers
//! - a failed render is not memoized, so the next reader retries
//! - empty source renders to an empty string without calling the renderer
//!
//! # Example
//!
//! ```ignore
//! let content = RevisionContent::new(RevisionNumber(1), "# Title".to_string());
//! let html = content.rendered(&ctx, &renderer)?;
//! ```

mod revision;

pub use revision::{Renderer, RevisionContent};
