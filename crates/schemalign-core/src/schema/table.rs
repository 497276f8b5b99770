//! Table definitions and their builder.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{CascadeAction, Column, ForeignKey, Index};
use crate::error::SchemaError;
use crate::identifier::{truncate_identifier, Identifier};

/// Identifier length limit used when none is configured (PostgreSQL's).
pub const DEFAULT_MAX_IDENTIFIER_LENGTH: usize = 63;

/// How a table is partitioned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionStrategy {
    /// Not partitioned.
    #[default]
    None,
    /// `PARTITION BY RANGE (...)`.
    Range,
}

/// Partitioning declaration of a table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Partitioning {
    /// Partitioning strategy.
    #[serde(default)]
    pub strategy: PartitionStrategy,
    /// Partition key expressions, in order.
    #[serde(default)]
    pub expressions: Vec<String>,
}

impl Partitioning {
    /// Range partitioning over the given expressions.
    #[must_use]
    pub fn range<S: Into<String>>(expressions: impl IntoIterator<Item = S>) -> Self {
        Self {
            strategy: PartitionStrategy::Range,
            expressions: expressions.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether two declarations describe the same partitioning.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        let norm = |e: &String| {
            e.split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .to_ascii_lowercase()
        };
        self.strategy == other.strategy
            && self.expressions.iter().map(norm).eq(other.expressions.iter().map(norm))
    }

    /// Whether the table is partitioned at all.
    #[must_use]
    pub fn is_partitioned(&self) -> bool {
        self.strategy != PartitionStrategy::None
    }
}

/// The declarative description of one table.
///
/// Built through [`TableBuilder`], which enforces the construction-time
/// invariants: unique column and index names, no declared index that is
/// also ignored, indexes and foreign keys that only reference existing
/// columns, and non-empty range partition keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TableDefinition", into = "TableDefinition")]
pub struct Table {
    identifier: Identifier,
    columns: Vec<Column>,
    indexes: Vec<Index>,
    foreign_keys: Vec<ForeignKey>,
    ignored_indexes: Vec<String>,
    primary_key_name: Option<String>,
    partitioning: Partitioning,
    max_identifier_length: usize,
    known_empty: bool,
}

impl Table {
    /// Starts building a table.
    #[must_use]
    pub fn builder(identifier: impl Into<Identifier>) -> TableBuilder {
        TableBuilder::new(identifier.into())
    }

    /// Returns the table identifier.
    #[must_use]
    pub const fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    /// Columns in physical order.
    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Looks a column up by name (case-insensitive).
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Declared indexes.
    #[must_use]
    pub fn indexes(&self) -> &[Index] {
        &self.indexes
    }

    /// Declared foreign keys.
    #[must_use]
    pub fn foreign_keys(&self) -> &[ForeignKey] {
        &self.foreign_keys
    }

    /// Names of live indexes the comparison must leave alone.
    #[must_use]
    pub fn ignored_indexes(&self) -> &[String] {
        &self.ignored_indexes
    }

    /// Whether an index with this name is ignored.
    #[must_use]
    pub fn is_index_ignored(&self, name: &str) -> bool {
        self.ignored_indexes
            .iter()
            .any(|i| i.eq_ignore_ascii_case(name))
    }

    /// The primary key columns: exactly the columns flagged as primary
    /// key, in table column order.
    #[must_use]
    pub fn primary_key_columns(&self) -> Vec<&Column> {
        self.columns.iter().filter(|c| c.primary_key).collect()
    }

    /// Names of the primary key columns, in table column order.
    #[must_use]
    pub fn primary_key_column_names(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.clone())
            .collect()
    }

    /// The primary key constraint name: explicit, or `pk_<table>`,
    /// truncated to the identifier limit.
    #[must_use]
    pub fn primary_key_name(&self) -> String {
        let name = self
            .primary_key_name
            .clone()
            .unwrap_or_else(|| format!("pk_{}", self.identifier.name()).to_ascii_lowercase());
        truncate_identifier(&name, self.max_identifier_length)
    }

    /// Partitioning declaration.
    #[must_use]
    pub const fn partitioning(&self) -> &Partitioning {
        &self.partitioning
    }

    /// Longest identifier the database accepts; generated names are
    /// truncated to it.
    #[must_use]
    pub const fn max_identifier_length(&self) -> usize {
        self.max_identifier_length
    }

    /// Whether the catalog reported the live table as holding no rows.
    #[must_use]
    pub const fn is_known_empty(&self) -> bool {
        self.known_empty
    }

    /// Returns this table moved to another container. Unnamed indexes,
    /// foreign keys and the primary key keep deriving their names from
    /// the table name.
    #[must_use]
    pub fn moved_to(&self, container: impl Into<String>) -> Self {
        Self {
            identifier: self.identifier.with_container(container),
            ..self.clone()
        }
    }

    /// Returns a builder seeded with this table's definition.
    #[must_use]
    pub fn to_builder(&self) -> TableBuilder {
        TableBuilder {
            table: self.clone(),
        }
    }

    pub(crate) fn columns_mut(&mut self) -> &mut Vec<Column> {
        &mut self.columns
    }

    pub(crate) fn indexes_mut(&mut self) -> &mut Vec<Index> {
        &mut self.indexes
    }

    pub(crate) fn foreign_keys_mut(&mut self) -> &mut Vec<ForeignKey> {
        &mut self.foreign_keys
    }

    pub(crate) fn set_primary_key(&mut self, name: Option<String>, columns: &[String]) {
        self.primary_key_name = name;
        for column in &mut self.columns {
            column.primary_key = columns.iter().any(|c| c.eq_ignore_ascii_case(&column.name));
            if column.primary_key {
                column.nullable = false;
            }
        }
    }

    fn validate(&self) -> Result<(), SchemaError> {
        let mut seen = HashSet::new();
        for column in &self.columns {
            if !seen.insert(column.name.to_ascii_lowercase()) {
                return Err(SchemaError::DuplicateColumn {
                    table: self.identifier.clone(),
                    column: column.name.clone(),
                });
            }
        }

        let mut index_names = HashSet::new();
        for index in &self.indexes {
            if index.columns.is_empty() {
                return Err(SchemaError::EmptyColumnList {
                    table: self.identifier.clone(),
                    what: "Index",
                });
            }
            self.check_columns_exist(index.columns.iter().filter(|c| is_plain_name(c)))?;

            let name = index.effective_name(self);
            if self.is_index_ignored(&name) {
                return Err(SchemaError::IgnoredIndexDeclared {
                    table: self.identifier.clone(),
                    index: name,
                });
            }
            if !index_names.insert(name.to_ascii_lowercase()) {
                return Err(SchemaError::DuplicateIndex {
                    table: self.identifier.clone(),
                    index: name,
                });
            }
        }

        let mut foreign_key_names = HashSet::new();
        for fk in &self.foreign_keys {
            if fk.columns.is_empty() {
                return Err(SchemaError::EmptyColumnList {
                    table: self.identifier.clone(),
                    what: "Foreign key",
                });
            }
            self.check_columns_exist(fk.columns.iter())?;

            let name = fk.effective_name(self);
            if fk.columns.len() != fk.referenced_columns.len() {
                return Err(SchemaError::ForeignKeyArity {
                    table: self.identifier.clone(),
                    foreign_key: name,
                    columns: fk.columns.len(),
                    referenced: fk.referenced_columns.len(),
                });
            }
            if !foreign_key_names.insert(name.to_ascii_lowercase()) {
                return Err(SchemaError::DuplicateForeignKey {
                    table: self.identifier.clone(),
                    foreign_key: name,
                });
            }
        }

        if self.partitioning.strategy == PartitionStrategy::Range
            && self.partitioning.expressions.is_empty()
        {
            return Err(SchemaError::EmptyPartitionExpressions {
                table: self.identifier.clone(),
            });
        }

        Ok(())
    }

    fn check_columns_exist<'c>(
        &self,
        names: impl Iterator<Item = &'c String>,
    ) -> Result<(), SchemaError> {
        for name in names {
            if self.column(name).is_none() {
                return Err(SchemaError::UnknownColumn {
                    table: self.identifier.clone(),
                    column: name.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Index entries such as `lower(email)` are expressions, not column names.
pub(crate) fn is_plain_name(entry: &str) -> bool {
    !entry.is_empty() && entry.chars().all(|c| c.is_alphanumeric() || c == '_')
}

/// Builds a [`Table`].
///
/// Attachment methods hand back short-lived handles that borrow the
/// builder, so attributes can be chained onto the element just added:
///
/// ```rust
/// use schemalign_core::schema::{CascadeAction, Table};
///
/// let mut builder = Table::builder("public.orders");
/// builder.column("id", "bigint").primary_key();
/// builder.column("customer_id", "bigint").not_null();
/// builder.column("email", "varchar(255)").not_null();
/// builder.index(["email"]).unique();
/// builder
///     .foreign_key(["customer_id"], "public.customers", ["id"])
///     .on_delete(CascadeAction::Cascade);
/// let orders = builder.build().unwrap();
///
/// assert_eq!(orders.primary_key_column_names(), vec!["id"]);
/// ```
#[derive(Debug, Clone)]
pub struct TableBuilder {
    table: Table,
}

impl TableBuilder {
    fn new(identifier: Identifier) -> Self {
        Self {
            table: Table {
                identifier,
                columns: Vec::new(),
                indexes: Vec::new(),
                foreign_keys: Vec::new(),
                ignored_indexes: Vec::new(),
                primary_key_name: None,
                partitioning: Partitioning::default(),
                max_identifier_length: DEFAULT_MAX_IDENTIFIER_LENGTH,
                known_empty: false,
            },
        }
    }

    /// Appends a nullable column.
    pub fn column(
        &mut self,
        name: impl Into<String>,
        data_type: impl Into<String>,
    ) -> ColumnHandle<'_> {
        self.add_column(Column::new(name, data_type))
    }

    /// Appends a prepared column.
    pub fn add_column(&mut self, column: Column) -> ColumnHandle<'_> {
        self.table.columns.push(column);
        let last = self.table.columns.len() - 1;
        ColumnHandle {
            column: &mut self.table.columns[last],
        }
    }

    /// Reopens an existing column for modification.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownColumn`] if no column has that name.
    pub fn modify_column(&mut self, name: &str) -> Result<ColumnHandle<'_>, SchemaError> {
        let identifier = &self.table.identifier;
        self.table
            .columns
            .iter_mut()
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .map(|column| ColumnHandle { column })
            .ok_or_else(|| SchemaError::UnknownColumn {
                table: identifier.clone(),
                column: name.to_string(),
            })
    }

    /// Removes a column and every index or foreign key that uses it.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::UnknownColumn`] if no column has that name.
    pub fn drop_column(&mut self, name: &str) -> Result<&mut Self, SchemaError> {
        let position = self
            .table
            .columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| SchemaError::UnknownColumn {
                table: self.table.identifier.clone(),
                column: name.to_string(),
            })?;
        self.table.columns.remove(position);
        self.table
            .indexes
            .retain(|i| !i.columns.iter().any(|c| c.eq_ignore_ascii_case(name)));
        self.table
            .foreign_keys
            .retain(|fk| !fk.uses_any_column(std::iter::once(name)));
        Ok(self)
    }

    /// Adds an index over the given columns.
    pub fn index<S: Into<String>>(&mut self, columns: impl IntoIterator<Item = S>) -> IndexHandle<'_> {
        self.add_index(Index::new(columns))
    }

    /// Adds a prepared index.
    pub fn add_index(&mut self, index: Index) -> IndexHandle<'_> {
        self.table.indexes.push(index);
        let last = self.table.indexes.len() - 1;
        IndexHandle {
            index: &mut self.table.indexes[last],
        }
    }

    /// Adds a foreign key.
    pub fn foreign_key<S: Into<String>, R: Into<String>>(
        &mut self,
        columns: impl IntoIterator<Item = S>,
        referenced_table: impl Into<Identifier>,
        referenced_columns: impl IntoIterator<Item = R>,
    ) -> ForeignKeyHandle<'_> {
        self.add_foreign_key(ForeignKey::new(
            columns,
            referenced_table.into(),
            referenced_columns,
        ))
    }

    /// Adds a prepared foreign key.
    pub fn add_foreign_key(&mut self, foreign_key: ForeignKey) -> ForeignKeyHandle<'_> {
        self.table.foreign_keys.push(foreign_key);
        let last = self.table.foreign_keys.len() - 1;
        ForeignKeyHandle {
            foreign_key: &mut self.table.foreign_keys[last],
        }
    }

    /// Marks a live index as ignored by the comparison.
    pub fn ignore_index(&mut self, name: impl Into<String>) -> &mut Self {
        self.table.ignored_indexes.push(name.into());
        self
    }

    /// Sets an explicit primary key constraint name.
    pub fn primary_key_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.table.primary_key_name = Some(name.into());
        self
    }

    /// Declares `PARTITION BY RANGE` over the given expressions. Plain
    /// column names among them become part of the primary key.
    pub fn partition_by_range<S: Into<String>>(
        &mut self,
        expressions: impl IntoIterator<Item = S>,
    ) -> &mut Self {
        self.table.partitioning = Partitioning::range(expressions);
        self
    }

    /// Sets the identifier length limit.
    pub fn max_identifier_length(&mut self, length: usize) -> &mut Self {
        self.table.max_identifier_length = length;
        self
    }

    /// Records whether the live table holds no rows.
    pub fn known_empty(&mut self, empty: bool) -> &mut Self {
        self.table.known_empty = empty;
        self
    }

    /// Validates and returns the table.
    ///
    /// # Errors
    ///
    /// Returns the first [`SchemaError`] found.
    pub fn build(self) -> Result<Table, SchemaError> {
        let mut table = self.table;

        if table.partitioning.strategy == PartitionStrategy::Range {
            let expressions = table.partitioning.expressions.clone();
            for column in &mut table.columns {
                if expressions
                    .iter()
                    .any(|e| e.trim().eq_ignore_ascii_case(&column.name))
                {
                    column.primary_key = true;
                }
            }
        }
        for column in &mut table.columns {
            if column.primary_key {
                column.nullable = false;
            }
        }

        table.validate()?;
        Ok(table)
    }
}

/// Chained view over a column being declared.
#[derive(Debug)]
pub struct ColumnHandle<'t> {
    column: &'t mut Column,
}

impl ColumnHandle<'_> {
    /// Sets the column as NOT NULL.
    pub fn not_null(self) -> Self {
        self.column.nullable = false;
        self
    }

    /// Sets the column as nullable.
    pub fn nullable(self) -> Self {
        self.column.nullable = true;
        self
    }

    /// Makes the column part of the primary key (implies NOT NULL).
    pub fn primary_key(self) -> Self {
        self.column.primary_key = true;
        self.column.nullable = false;
        self
    }

    /// Sets the default expression.
    pub fn default_expr(self, expr: impl Into<String>) -> Self {
        self.column.default = Some(expr.into());
        self
    }

    /// Removes the default expression.
    pub fn no_default(self) -> Self {
        self.column.default = None;
        self
    }

    /// Replaces the declared type.
    pub fn data_type(self, data_type: impl Into<String>) -> Self {
        self.column.data_type = data_type.into();
        self
    }
}

/// Chained view over an index being declared.
#[derive(Debug)]
pub struct IndexHandle<'t> {
    index: &'t mut Index,
}

impl IndexHandle<'_> {
    /// Sets an explicit name.
    pub fn named(self, name: impl Into<String>) -> Self {
        self.index.name = Some(name.into());
        self
    }

    /// Marks the index as UNIQUE.
    pub fn unique(self) -> Self {
        self.index.unique = true;
        self
    }

    /// Sets the partial-index condition.
    pub fn predicate(self, condition: impl Into<String>) -> Self {
        self.index.predicate = Some(condition.into());
        self
    }

    /// Sets the access method.
    pub fn using(self, method: impl Into<String>) -> Self {
        self.index.method = Some(method.into());
        self
    }
}

/// Chained view over a foreign key being declared.
#[derive(Debug)]
pub struct ForeignKeyHandle<'t> {
    foreign_key: &'t mut ForeignKey,
}

impl ForeignKeyHandle<'_> {
    /// Sets an explicit constraint name.
    pub fn named(self, name: impl Into<String>) -> Self {
        self.foreign_key.name = Some(name.into());
        self
    }

    /// Sets the ON DELETE action.
    pub fn on_delete(self, action: CascadeAction) -> Self {
        self.foreign_key.on_delete = action;
        self
    }

    /// Sets the ON UPDATE action.
    pub fn on_update(self, action: CascadeAction) -> Self {
        self.foreign_key.on_update = action;
        self
    }
}

/// Serialized form of a [`Table`]; loading goes through the builder so
/// documents are validated like code-declared tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDefinition {
    /// Qualified table name.
    pub name: Identifier,
    /// Columns in physical order.
    pub columns: Vec<Column>,
    /// Indexes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<Index>,
    /// Foreign keys.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub foreign_keys: Vec<ForeignKey>,
    /// Ignored live index names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignored_indexes: Vec<String>,
    /// Explicit primary key constraint name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_key_name: Option<String>,
    /// Partitioning declaration.
    #[serde(default)]
    pub partitioning: Partitioning,
    /// Identifier length limit.
    #[serde(default = "default_max_identifier_length")]
    pub max_identifier_length: usize,
    /// Live table holds no rows.
    #[serde(default)]
    pub known_empty: bool,
}

const fn default_max_identifier_length() -> usize {
    DEFAULT_MAX_IDENTIFIER_LENGTH
}

impl TryFrom<TableDefinition> for Table {
    type Error = SchemaError;

    fn try_from(def: TableDefinition) -> Result<Self, Self::Error> {
        let mut builder = Self::builder(def.name);
        for column in def.columns {
            builder.add_column(column);
        }
        for index in def.indexes {
            builder.add_index(index);
        }
        for fk in def.foreign_keys {
            builder.add_foreign_key(fk);
        }
        for ignored in def.ignored_indexes {
            builder.ignore_index(ignored);
        }
        if let Some(name) = def.primary_key_name {
            builder.primary_key_name(name);
        }
        builder.table.partitioning = def.partitioning;
        builder
            .max_identifier_length(def.max_identifier_length)
            .known_empty(def.known_empty);
        builder.build()
    }
}

impl From<Table> for TableDefinition {
    fn from(table: Table) -> Self {
        Self {
            name: table.identifier,
            columns: table.columns,
            indexes: table.indexes,
            foreign_keys: table.foreign_keys,
            ignored_indexes: table.ignored_indexes,
            primary_key_name: table.primary_key_name,
            partitioning: table.partitioning,
            max_identifier_length: table.max_identifier_length,
            known_empty: table.known_empty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orders() -> Table {
        let mut b = Table::builder("public.orders");
        b.column("id", "bigint").primary_key();
        b.column("email", "varchar(255)").not_null();
        b.column("created_at", "timestamp").default_expr("now()");
        b.index(["email"]).unique();
        b.build().unwrap()
    }

    #[test]
    fn test_builder_collects_columns_in_order() {
        let t = orders();
        let names: Vec<&str> = t.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["id", "email", "created_at"]);
        assert_eq!(t.primary_key_column_names(), vec!["id"]);
        assert_eq!(t.primary_key_name(), "pk_orders");
    }

    #[test]
    fn test_primary_key_columns_follow_table_order() {
        let mut b = Table::builder("line_items");
        b.column("order_id", "bigint");
        b.column("line_no", "int").primary_key();
        b.modify_column("ORDER_ID").unwrap().primary_key();
        let t = b.build().unwrap();
        assert_eq!(t.primary_key_column_names(), vec!["order_id", "line_no"]);
        assert!(t.primary_key_columns().iter().all(|c| !c.nullable));
    }

    #[test]
    fn test_modify_unknown_column_fails() {
        let mut b = Table::builder("orders");
        b.column("id", "int");
        let err = b.modify_column("nope").unwrap_err();
        assert!(matches!(err, SchemaError::UnknownColumn { .. }));
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let mut b = Table::builder("orders");
        b.column("id", "int");
        b.column("ID", "bigint");
        assert!(matches!(b.build(), Err(SchemaError::DuplicateColumn { .. })));
    }

    #[test]
    fn test_ignored_index_cannot_be_declared() {
        let mut b = Table::builder("orders");
        b.column("email", "text");
        b.index(["email"]).named("ix_email");
        b.ignore_index("IX_EMAIL");
        assert!(matches!(
            b.build(),
            Err(SchemaError::IgnoredIndexDeclared { .. })
        ));
    }

    #[test]
    fn test_index_on_unknown_column_rejected() {
        let mut b = Table::builder("orders");
        b.column("id", "int");
        b.index(["missing"]);
        assert!(matches!(b.build(), Err(SchemaError::UnknownColumn { .. })));

        let mut b = Table::builder("orders");
        b.column("email", "text");
        b.index(["lower(email)"]);
        assert!(b.build().is_ok());
    }

    #[test]
    fn test_foreign_keys_sharing_a_derived_name_rejected() {
        let mut b = Table::builder("orders");
        b.column("customer_id", "bigint");
        b.foreign_key(["customer_id"], "customers", ["id"]);
        b.foreign_key(["customer_id"], "legacy_customers", ["id"]);
        let err = b.build().unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicateForeignKey {
                table: Identifier::parse("orders"),
                foreign_key: "fk_orders_customer_id".into(),
            }
        );

        let mut b = Table::builder("orders");
        b.column("customer_id", "bigint");
        b.foreign_key(["customer_id"], "customers", ["id"]);
        b.foreign_key(["customer_id"], "legacy_customers", ["id"])
            .named("fk_orders_legacy_customer");
        assert!(b.build().is_ok());
    }

    #[test]
    fn test_foreign_key_column_counts_must_match() {
        let mut b = Table::builder("line_items");
        b.column("order_id", "bigint");
        b.column("line_no", "int");
        b.foreign_key(["order_id", "line_no"], "order_lines", ["order_id"]);
        assert!(matches!(
            b.build(),
            Err(SchemaError::ForeignKeyArity {
                columns: 2,
                referenced: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_range_partition_requires_expressions() {
        let mut b = Table::builder("events");
        b.column("id", "bigint");
        b.partition_by_range(Vec::<String>::new());
        assert!(matches!(
            b.build(),
            Err(SchemaError::EmptyPartitionExpressions { .. })
        ));
    }

    #[test]
    fn test_range_partition_column_joins_primary_key() {
        let mut b = Table::builder("events");
        b.column("id", "bigint").primary_key();
        b.column("occurred_at", "timestamptz");
        b.partition_by_range(["occurred_at"]);
        let t = b.build().unwrap();
        assert_eq!(t.primary_key_column_names(), vec!["id", "occurred_at"]);
        assert!(!t.column("occurred_at").unwrap().nullable);
    }

    #[test]
    fn test_derived_names_are_truncated() {
        let mut b = Table::builder("a_table_with_a_rather_long_name");
        b.column("some_column_name", "int");
        b.index(["some_column_name"]);
        b.max_identifier_length(24);
        let t = b.build().unwrap();
        let name = t.indexes()[0].effective_name(&t);
        assert_eq!(name.len(), 24);
        assert_eq!(name, t.indexes()[0].effective_name(&t));
    }

    #[test]
    fn test_moved_to_replaces_identifier() {
        let t = orders();
        let moved = t.moved_to("archive");
        assert_eq!(moved.identifier(), &Identifier::new("archive", "orders"));
        assert_eq!(t.identifier(), &Identifier::new("public", "orders"));
        assert_eq!(moved.columns(), t.columns());
    }

    #[test]
    fn test_drop_column_removes_dependents() {
        let mut b = orders().to_builder();
        b.drop_column("email").unwrap();
        let t = b.build().unwrap();
        assert!(t.column("email").is_none());
        assert!(t.indexes().is_empty());
    }
}
