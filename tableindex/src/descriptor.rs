//! Static facts about an index.
//!
//! An [`IndexDescriptor`] is created once when the index or its owning
//! constraint is created and shared read-only afterwards. Only the clustering
//! flag and the storage position may change, and only through schema
//! operations that hold the descriptor exclusively.
//!
//! # Index ordering
//!
//! The indexes of a table are kept in a fixed order, exposed through
//! [`IndexDescriptor::index_order_value`]:
//!
//! 1. primary key index
//! 2. unique constraint indexes
//! 3. foreign key indexes for keys referencing this table or tables created
//!    before it
//! 4. user created indexes (`CREATE INDEX`)
//! 5. foreign key indexes for keys referencing tables created after this one
//!
//! Within a group indexes are ordered by creation.

use serde::{Deserialize, Serialize};

use crate::types::{PersistenceId, SqlType};

/// Uniqueness kind of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Uniqueness {
    /// No key columns; entries are ordered by row identity alone.
    None,
    /// Duplicate keys are allowed.
    NonUnique,
    /// No two live entries may have equal keys.
    Unique,
    /// Unique index backing the table's primary key.
    PrimaryKey,
}

impl Uniqueness {
    /// Returns true for `Unique` and `PrimaryKey`.
    #[must_use]
    pub const fn is_unique(self) -> bool {
        matches!(self, Self::Unique | Self::PrimaryKey)
    }

    /// Catalog code of the uniqueness kind (0 none, 1 non-unique, 2 unique).
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::None => 0,
            Self::NonUnique => 1,
            Self::Unique | Self::PrimaryKey => 2,
        }
    }
}

/// Why an index exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexRole {
    /// Backs the primary key constraint.
    PrimaryKey,
    /// Backs a `UNIQUE` constraint.
    UniqueConstraint,
    /// Backs a foreign key. `forward` is set when the key references a table
    /// created after this one.
    ForeignKey { forward: bool },
    /// Created with `CREATE INDEX`.
    User,
}

impl IndexRole {
    const fn order_group(self) -> u8 {
        match self {
            Self::PrimaryKey => 0,
            Self::UniqueConstraint => 1,
            Self::ForeignKey { forward: false } => 2,
            Self::User => 3,
            Self::ForeignKey { forward: true } => 4,
        }
    }
}

/// Position of an index in its table's index list.
///
/// Orders by role group first, then by creation ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IndexOrder {
    group: u8,
    creation_ordinal: u64,
}

impl IndexOrder {
    /// Get the role group (0 primary key through 4 forward foreign key).
    #[must_use]
    pub const fn group(self) -> u8 {
        self.group
    }

    /// Get the creation ordinal used as tie-break inside a group.
    #[must_use]
    pub const fn creation_ordinal(self) -> u64 {
        self.creation_ordinal
    }
}

/// One key column of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexColumn {
    /// Ordinal of the column in the table row.
    pub ordinal: usize,
    /// Type handle used to order the column.
    pub sql_type: SqlType,
    /// Descending columns invert their ordering, nulls included.
    pub descending: bool,
    /// Whether the column admits nulls.
    pub nullable: bool,
}

impl IndexColumn {
    /// An ascending, nullable key column.
    #[must_use]
    pub const fn new(ordinal: usize, sql_type: SqlType) -> Self {
        Self {
            ordinal,
            sql_type,
            descending: false,
            nullable: true,
        }
    }

    /// Order this column descending.
    #[must_use]
    pub const fn descending(mut self) -> Self {
        self.descending = true;
        self
    }

    /// Declare the column `NOT NULL`.
    #[must_use]
    pub const fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}

/// A usable leading prefix of an index, offered to the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexUse {
    /// Number of leading key columns covered.
    pub column_count: usize,
}

/// Immutable description of one index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDescriptor {
    name: String,
    persistence_id: PersistenceId,
    columns: Vec<IndexColumn>,
    uniqueness: Uniqueness,
    role: IndexRole,
    creation_ordinal: u64,
    clustered: bool,
    position: usize,
}

impl IndexDescriptor {
    /// Create a descriptor without key columns.
    ///
    /// Add the key columns with [`IndexDescriptor::with_column`].
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        persistence_id: PersistenceId,
        uniqueness: Uniqueness,
        role: IndexRole,
        creation_ordinal: u64,
    ) -> Self {
        Self {
            name: name.into(),
            persistence_id,
            columns: Vec::new(),
            uniqueness,
            role,
            creation_ordinal,
            clustered: false,
            position: 0,
        }
    }

    /// Append a key column.
    #[must_use]
    pub fn with_column(mut self, column: IndexColumn) -> Self {
        self.columns.push(column);
        self
    }

    /// Check the descriptor's internal consistency.
    ///
    /// # Panics
    ///
    /// Panics if the uniqueness kind contradicts the column list or the role:
    /// `None` must have no columns, every other kind needs at least one, a
    /// primary key role needs the primary key kind and a unique constraint
    /// needs a unique kind.
    pub fn validate(&self) {
        assert_eq!(
            self.uniqueness == Uniqueness::None,
            self.columns.is_empty(),
            "index {}: only an index of uniqueness kind None may have zero columns",
            self.name
        );
        match self.role {
            IndexRole::PrimaryKey => assert_eq!(
                self.uniqueness,
                Uniqueness::PrimaryKey,
                "index {}: primary key role requires the primary key kind",
                self.name
            ),
            IndexRole::UniqueConstraint => assert!(
                self.uniqueness.is_unique(),
                "index {}: unique constraint role requires a unique kind",
                self.name
            ),
            IndexRole::ForeignKey { .. } | IndexRole::User => {}
        }
    }

    /// Get the index name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the catalog identifier.
    #[must_use]
    pub const fn persistence_id(&self) -> PersistenceId {
        self.persistence_id
    }

    /// Get the key columns.
    #[must_use]
    pub fn columns(&self) -> &[IndexColumn] {
        &self.columns
    }

    /// Get the number of key columns.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Get the table column ordinals of the key columns.
    #[must_use]
    pub fn column_ordinals(&self) -> Vec<usize> {
        self.columns.iter().map(|c| c.ordinal).collect()
    }

    /// Get the type handles of the key columns.
    #[must_use]
    pub fn column_types(&self) -> Vec<SqlType> {
        self.columns.iter().map(|c| c.sql_type).collect()
    }

    /// Get the descending flags of the key columns.
    #[must_use]
    pub fn column_desc(&self) -> Vec<bool> {
        self.columns.iter().map(|c| c.descending).collect()
    }

    /// Get the nullability of the key columns.
    #[must_use]
    pub fn column_nullable(&self) -> Vec<bool> {
        self.columns.iter().map(|c| c.nullable).collect()
    }

    /// Get the identity column map `0..column_count`.
    #[must_use]
    pub fn default_column_map(&self) -> Vec<usize> {
        (0..self.columns.len()).collect()
    }

    /// Get the uniqueness kind.
    #[must_use]
    pub const fn uniqueness(&self) -> Uniqueness {
        self.uniqueness
    }

    /// Get the role.
    #[must_use]
    pub const fn role(&self) -> IndexRole {
        self.role
    }

    /// Is this the primary key index?
    #[must_use]
    pub fn is_primary_key(&self) -> bool {
        self.uniqueness == Uniqueness::PrimaryKey
    }

    /// Does this index enforce uniqueness?
    #[must_use]
    pub const fn is_unique(&self) -> bool {
        self.uniqueness.is_unique()
    }

    /// Does this index belong to a constraint?
    #[must_use]
    pub const fn is_constraint(&self) -> bool {
        !matches!(self.role, IndexRole::User)
    }

    /// Is this a foreign key index referencing a table created later?
    #[must_use]
    pub const fn is_forward(&self) -> bool {
        matches!(self.role, IndexRole::ForeignKey { forward: true })
    }

    /// Get the position of this index in the table's index list.
    #[must_use]
    pub const fn index_order_value(&self) -> IndexOrder {
        IndexOrder {
            group: self.role.order_group(),
            creation_ordinal: self.creation_ordinal,
        }
    }

    /// Does the table's physical row order follow this index?
    #[must_use]
    pub const fn is_clustered(&self) -> bool {
        self.clustered
    }

    /// Set the clustering flag (table rebuilds).
    pub const fn set_clustered(&mut self, clustered: bool) {
        self.clustered = clustered;
    }

    /// Get the storage position of this index within its table.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Set the storage position (table rebuilds).
    pub const fn set_position(&mut self, position: usize) {
        self.position = position;
    }

    /// Get every usable leading prefix, longest first.
    #[must_use]
    pub fn as_index_uses(&self) -> Vec<IndexUse> {
        (1..=self.columns.len())
            .rev()
            .map(|column_count| IndexUse { column_count })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Collation;

    fn descriptor(name: &str, uniqueness: Uniqueness, role: IndexRole, ordinal: u64) -> IndexDescriptor {
        IndexDescriptor::new(name, PersistenceId(ordinal), uniqueness, role, ordinal)
            .with_column(IndexColumn::new(0, SqlType::Integer))
    }

    #[test]
    fn test_index_order_groups() {
        let pk = descriptor("pk", Uniqueness::PrimaryKey, IndexRole::PrimaryKey, 9);
        let uq = descriptor("uq", Uniqueness::Unique, IndexRole::UniqueConstraint, 1);
        let fk_back = descriptor("fk1", Uniqueness::NonUnique, IndexRole::ForeignKey { forward: false }, 5);
        let user = descriptor("ix", Uniqueness::NonUnique, IndexRole::User, 2);
        let fk_fwd = descriptor("fk2", Uniqueness::NonUnique, IndexRole::ForeignKey { forward: true }, 0);

        let mut all = [&fk_fwd, &user, &fk_back, &uq, &pk];
        all.sort_by_key(|d| d.index_order_value());
        let names: Vec<&str> = all.iter().map(|d| d.name()).collect();
        assert_eq!(names, vec!["pk", "uq", "fk1", "ix", "fk2"]);
    }

    #[test]
    fn test_creation_order_breaks_ties() {
        let older = descriptor("a", Uniqueness::NonUnique, IndexRole::User, 3);
        let newer = descriptor("b", Uniqueness::NonUnique, IndexRole::User, 4);
        assert!(older.index_order_value() < newer.index_order_value());
        assert_eq!(newer.index_order_value().group(), 3);
        assert_eq!(newer.index_order_value().creation_ordinal(), 4);
    }

    #[test]
    fn test_column_facts() {
        let d = IndexDescriptor::new("ix", PersistenceId(1), Uniqueness::NonUnique, IndexRole::User, 0)
            .with_column(IndexColumn::new(2, SqlType::Integer).not_null())
            .with_column(IndexColumn::new(0, SqlType::Text(Collation::Binary)).descending());
        d.validate();

        assert_eq!(d.column_count(), 2);
        assert_eq!(d.column_ordinals(), vec![2, 0]);
        assert_eq!(d.column_desc(), vec![false, true]);
        assert_eq!(d.column_nullable(), vec![false, true]);
        assert_eq!(d.default_column_map(), vec![0, 1]);
        assert_eq!(
            d.as_index_uses(),
            vec![IndexUse { column_count: 2 }, IndexUse { column_count: 1 }]
        );
        assert!(!d.is_constraint());
        assert!(!d.is_unique());
    }

    #[test]
    fn test_mutable_facts() {
        let mut d = descriptor("pk", Uniqueness::PrimaryKey, IndexRole::PrimaryKey, 0);
        assert!(!d.is_clustered());
        d.set_clustered(true);
        d.set_position(3);
        assert!(d.is_clustered());
        assert_eq!(d.position(), 3);
        assert!(d.is_primary_key());
        assert_eq!(d.uniqueness().code(), 2);
    }

    #[test]
    #[should_panic(expected = "zero columns")]
    fn test_validate_rejects_keyless_unique() {
        IndexDescriptor::new("bad", PersistenceId(1), Uniqueness::Unique, IndexRole::User, 0).validate();
    }

    #[test]
    fn test_serde_roundtrip() {
        let d = descriptor("fk", Uniqueness::NonUnique, IndexRole::ForeignKey { forward: true }, 7);
        let json = serde_json::to_string(&d).expect("serialize");
        let back: IndexDescriptor = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, d);
        assert!(back.is_forward());
    }
}
