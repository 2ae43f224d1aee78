//! Acknowledgments returned by store write primitives.

use bson::Bson;

/// Result of inserting one document.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertOutcome {
    /// The identifier the store assigned to the new document.
    pub inserted_id: Bson,
}

/// Result of an update or upsert against the first matching document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateOutcome {
    /// Number of documents the filter matched (0 or 1).
    pub matched_count: u64,
    /// Number of documents whose content actually changed.
    pub modified_count: u64,
    /// Identifier of the document created by an upsert, if one was created.
    pub upserted_id: Option<Bson>,
}

impl UpdateOutcome {
    /// Returns `true` if the update created a new document.
    pub fn was_upserted(&self) -> bool {
        self.upserted_id.is_some()
    }
}

/// Result of deleting every matching document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub deleted_count: u64,
}
