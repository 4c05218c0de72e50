mod document;
mod fields;

pub use document::{Document, ARCHIVES, DOCUMENTS};
pub use fields::{DocumentPayload, FieldSet, FieldSetError, ATTACHMENT_FIELD, ID_FIELD};
