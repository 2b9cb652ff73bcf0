//! Revision content with a memoized render.

use crate::context::RequestContext;
use crate::error::Result;
use crate::types::RevisionNumber;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Converts raw document source into its rendered form.
pub trait Renderer: Send + Sync {
    fn render(&self, ctx: &RequestContext, source: &str) -> Result<String>;
}

impl<F> Renderer for F
where
    F: Fn(&RequestContext, &str) -> Result<String> + Send + Sync,
{
    fn render(&self, ctx: &RequestContext, source: &str) -> Result<String> {
        self(ctx, source)
    }
}

/// One revision of a document.
pub struct RevisionContent {
    number: RevisionNumber,
    source: String,

    /// Rendered form, filled at most once.
    rendered: RwLock<Option<Arc<str>>>,
}

impl RevisionContent {
    /// Create a content with an empty render memo.
    pub fn new(number: RevisionNumber, source: String) -> Self {
        Self {
            number,
            source,
            rendered: RwLock::new(None),
        }
    }

    pub fn number(&self) -> RevisionNumber {
        self.number
    }

    /// Raw source of the revision.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether the rendered form is already memoized.
    pub fn is_rendered(&self) -> bool {
        self.rendered.read().is_some()
    }

    /// Rendered form, computed on first call.
    ///
    /// The exclusive lock is per instance: rendering one revision never blocks
    /// readers of another.
    pub fn rendered(&self, ctx: &RequestContext, renderer: &dyn Renderer) -> Result<Arc<str>> {
        if let Some(rendered) = self.rendered.read().as_ref() {
            return Ok(Arc::clone(rendered));
        }

        let mut slot = self.rendered.write();
        if let Some(rendered) = slot.as_ref() {
            return Ok(Arc::clone(rendered));
        }

        let rendered: Arc<str> = if self.source.is_empty() {
            Arc::from("")
        } else {
            ctx.check()?;
            Arc::from(renderer.render(ctx, &self.source)?)
        };

        *slot = Some(Arc::clone(&rendered));
        Ok(rendered)
    }
}

impl fmt::Debug for RevisionContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RevisionContent")
            .field("number", &self.number)
            .field("source_len", &self.source.len())
            .field("rendered", &self.is_rendered())
            .finish()
    }
}
