//! Options accepted by store primitives and adaptor operations.
//!
//! Every option is optional so that caller-supplied options can be layered over the
//! adaptor's defaults with [`WriteOptions::merge`] and [`FindOptions::merge`]: any value
//! the caller sets wins, anything left unset falls back to the default.

use bson::Document;

/// The acknowledgment level requested for a write.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WriteConcern {
    /// Fire-and-forget (`w: 0`). Write failures are not reported.
    Unacknowledged,
    /// Acknowledged by the primary (`w: 1`).
    #[default]
    Acknowledged,
    /// Acknowledged by a majority of data-bearing members.
    Majority,
    /// Acknowledged by the given number of members.
    Nodes(u32),
}

/// Options for insert and update primitives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteOptions {
    /// Requested acknowledgment level.
    pub write_concern: Option<WriteConcern>,
    /// Whether an update creates the document when nothing matches.
    pub upsert: Option<bool>,
}

impl WriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acknowledged writes, the default durability for every adaptor write.
    pub fn safe() -> Self {
        Self::new().write_concern(WriteConcern::Acknowledged)
    }

    pub fn write_concern(mut self, write_concern: WriteConcern) -> Self {
        self.write_concern = Some(write_concern);
        self
    }

    pub fn upsert(mut self, upsert: bool) -> Self {
        self.upsert = Some(upsert);
        self
    }

    /// Layers `overrides` over `self`. Every value set in `overrides` wins.
    pub fn merge(self, overrides: WriteOptions) -> Self {
        Self {
            write_concern: overrides.write_concern.or(self.write_concern),
            upsert: overrides.upsert.or(self.upsert),
        }
    }

    pub fn is_upsert(&self) -> bool {
        self.upsert.unwrap_or(false)
    }
}

/// Options for find primitives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    /// Store-native projection document, e.g. `{ "name": 1 }`.
    pub projection: Option<Document>,
    /// Store-native sort document, e.g. `{ "age": -1 }`.
    pub sort: Option<Document>,
    /// Number of matching documents to skip.
    pub skip: Option<u64>,
    /// Maximum number of documents to return.
    pub limit: Option<i64>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn projection(mut self, projection: Document) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn sort(mut self, sort: Document) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Layers `overrides` over `self`. Every value set in `overrides` wins.
    pub fn merge(self, overrides: FindOptions) -> Self {
        Self {
            projection: overrides.projection.or(self.projection),
            sort: overrides.sort.or(self.sort),
            skip: overrides.skip.or(self.skip),
            limit: overrides.limit.or(self.limit),
        }
    }
}

/// Options for delete primitives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteOptions {
    /// Requested acknowledgment level.
    pub write_concern: Option<WriteConcern>,
}

impl DeleteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_concern(mut self, write_concern: WriteConcern) -> Self {
        self.write_concern = Some(write_concern);
        self
    }
}
