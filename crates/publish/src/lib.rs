//! The media sync and publish pipeline.
//!
//! ```text
//! scan ──▶ sync (cache + upload) ──▶ rewrite ──▶ commit / push
//! ```
//!
//! [`Context`] holds the collaborators (content corpus, media library, asset
//! store, upload cache, version control) and exposes one method per
//! operation: [`Context::scan_references()`], [`Context::sync_media()`],
//! [`Context::rewrite_urls()`], [`Context::url_mappings()`],
//! [`Context::publish()`], [`Context::repository_status()`] and
//! [`Context::pull()`].

mod context;
pub mod error;
pub mod publish;
pub mod rewrite;
pub mod scan;
pub mod sync;
pub mod upload;

#[cfg(test)]
mod tests;

pub use crate::context::{Context, ContextBuilder};
pub use crate::publish::{GitResult, PublishOptions, PublishOutcome};
pub use crate::rewrite::{FileRewrite, RewriteResult, Rewriter, SubstringRewriter};
pub use crate::sync::{SyncOptions, SyncResult, UploadRecord};
