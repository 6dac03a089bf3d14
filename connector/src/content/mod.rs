//! Content normalization between the provider's rich-document format and
//! plain markdown-flavored text.

pub mod adf;
pub mod field;
pub mod markdown;

pub use adf::{document_to_text, AdfNode, Mark, NodeKind};
pub use field::{extract_value, FieldValue, ListMode, UNPARSEABLE_VALUE};
pub use markdown::text_to_document;
