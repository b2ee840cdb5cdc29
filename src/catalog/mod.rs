//! Users, events and registrations: the records recommendations are built from.
//!
//! This is a thin key-lookup layer over SQLite. Embeddings are converted between
//! `Option<Vec<f32>>` and their stored text form here, at the boundary, so
//! nothing above this module sees the legacy encodings.

pub mod events;
pub mod profile;
pub mod registrations;
pub mod types;
pub mod users;

use crate::recommend::codec;

/// Decode a stored embedding column, logging and dropping corrupt values.
pub(crate) fn read_embedding(table: &str, id: &str, stored: Option<String>) -> Option<Vec<f32>> {
    match codec::decode_column(stored.as_deref()) {
        Ok(embedding) => embedding,
        Err(e) => {
            tracing::warn!(table, id, error = %e, "ignoring malformed stored embedding");
            None
        }
    }
}

/// Encode an embedding for storage; absent vectors are stored as SQL NULL.
pub(crate) fn write_embedding(embedding: Option<&[f32]>) -> Option<String> {
    let encoded = codec::encode(embedding);
    (encoded != "null").then_some(encoded)
}
