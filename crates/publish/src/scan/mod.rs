//! Content reference scanning.
//!
//! Finds every media-library path that the content corpus refers to. This is
//! lexical matching over raw document text (see [`extract_references`]), not
//! a markdown parse: four shapes are recognised, and a path is reported once
//! no matter how many documents or shapes mention it.
//!
//! [`documents`] is the traversal on its own: a lazy, restartable stream of
//! the markdown files in each category, also used by the rewriter.

mod document;
pub mod error;
mod patterns;
mod stream;

pub use self::document::{Document, extract_references};
pub use self::stream::{DOCUMENT_EXTENSIONS, documents, scan_references};
