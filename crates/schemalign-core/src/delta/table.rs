//! Classification and statement ordering for one table.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ItemChange, ItemDelta, UnsafeReason};
use crate::ddl::{DdlWriter, Statement};
use crate::difference::Difference;
use crate::error::DeltaError;
use crate::identifier::Identifier;
use crate::schema::{Column, ForeignKey, Index, Table};

/// Difference between the expected definition of a table and the live
/// one, if any.
///
/// Construction classifies every aspect. Statements can be requested for
/// any delta that is not [`Difference::Unsafe`]; the forward script moves
/// the live table to the expected definition, the rollback script moves it
/// back.
#[derive(Debug, Clone)]
pub struct TableDelta<'a> {
    expected: &'a Table,
    actual: Option<&'a Table>,
    columns: ItemDelta<'a, Column>,
    indexes: ItemDelta<'a, Index>,
    foreign_keys: ItemDelta<'a, ForeignKey>,
    primary_key: Difference,
    difference: Difference,
    unsafe_reasons: Vec<UnsafeReason>,
}

impl<'a> TableDelta<'a> {
    /// Compares `expected` with the live table. `None` means the table does
    /// not exist yet.
    #[must_use]
    pub fn compare(expected: &'a Table, actual: Option<&'a Table>) -> Self {
        let Some(actual) = actual else {
            debug!(table = %expected.identifier(), "table does not exist");
            return Self {
                expected,
                actual: None,
                columns: ItemDelta::default(),
                indexes: ItemDelta::default(),
                foreign_keys: ItemDelta::default(),
                primary_key: Difference::None,
                difference: Difference::Create,
                unsafe_reasons: Vec::new(),
            };
        };

        let columns = ItemDelta::compare(
            expected.columns(),
            |c| c.name.clone(),
            actual.columns(),
            |c| c.name.clone(),
            |e, a| !e.differs_from(a),
        );

        let ignored = |index: &Index, owner: &Table| {
            let name = index.effective_name(owner);
            expected.is_index_ignored(&name) || actual.is_index_ignored(&name)
        };
        let indexes = ItemDelta::compare(
            expected.indexes().iter().filter(|i| !ignored(*i, expected)),
            |i| i.effective_name(expected),
            actual.indexes().iter().filter(|i| !ignored(*i, actual)),
            |i| i.effective_name(actual),
            |e, a| e.matches(expected, a, actual),
        );

        let foreign_keys = ItemDelta::compare(
            expected.foreign_keys(),
            |fk| fk.effective_name(expected),
            actual.foreign_keys(),
            |fk| fk.effective_name(actual),
            |e, a| e.matches(expected, a, actual),
        );

        let primary_key = primary_key_difference(
            &expected.primary_key_column_names(),
            &actual.primary_key_column_names(),
        );

        let mut unsafe_reasons = Vec::new();
        let difference = if !expected.partitioning().matches(actual.partitioning()) {
            unsafe_reasons.push(UnsafeReason::PartitioningChanged);
            Difference::Unsafe
        } else if !(columns.has_changes()
            || indexes.has_changes()
            || foreign_keys.has_changes()
            || primary_key.has_changes())
        {
            Difference::None
        } else {
            let populated = !actual.is_known_empty();
            let escalate = |change: ItemChange<'_, Column>| match change {
                ItemChange::Different {
                    expected: e,
                    actual: a,
                } if !e.can_alter_from(a) => Some(UnsafeReason::ColumnNotAlterable {
                    column: e.name.clone(),
                    from: a.data_type.clone(),
                    to: e.data_type.clone(),
                }),
                ItemChange::Missing(column) if !column.is_safely_addable(populated) => {
                    Some(UnsafeReason::ColumnNotAddable {
                        column: column.name.clone(),
                    })
                }
                _ => None,
            };
            unsafe_reasons.extend(columns.changes().filter_map(escalate));
            let column_difference = columns.difference_with(|change| {
                if escalate(change).is_some() {
                    Difference::Unsafe
                } else {
                    Difference::None
                }
            });
            Difference::dominant([
                column_difference,
                indexes.difference(),
                foreign_keys.difference(),
                primary_key,
            ])
        };

        debug!(
            table = %expected.identifier(),
            columns = %columns.difference(),
            indexes = %indexes.difference(),
            foreign_keys = %foreign_keys.difference(),
            primary_key = %primary_key,
            difference = %difference,
            "Classified table delta"
        );

        Self {
            expected,
            actual: Some(actual),
            columns,
            indexes,
            foreign_keys,
            primary_key,
            difference,
            unsafe_reasons,
        }
    }

    /// The table identifier.
    #[must_use]
    pub fn identifier(&self) -> &'a Identifier {
        self.expected.identifier()
    }

    /// The expected definition.
    #[must_use]
    pub const fn expected(&self) -> &'a Table {
        self.expected
    }

    /// The live definition, if the table exists.
    #[must_use]
    pub const fn actual(&self) -> Option<&'a Table> {
        self.actual
    }

    /// Column differences.
    #[must_use]
    pub const fn columns(&self) -> &ItemDelta<'a, Column> {
        &self.columns
    }

    /// Index differences, ignored indexes excluded.
    #[must_use]
    pub const fn indexes(&self) -> &ItemDelta<'a, Index> {
        &self.indexes
    }

    /// Foreign key differences.
    #[must_use]
    pub const fn foreign_keys(&self) -> &ItemDelta<'a, ForeignKey> {
        &self.foreign_keys
    }

    /// Primary key severity.
    #[must_use]
    pub const fn primary_key(&self) -> Difference {
        self.primary_key
    }

    /// Overall severity.
    #[must_use]
    pub const fn difference(&self) -> Difference {
        self.difference
    }

    /// Why the delta is unsafe; empty unless it is.
    #[must_use]
    pub fn unsafe_reasons(&self) -> &[UnsafeReason] {
        &self.unsafe_reasons
    }

    /// Statements that move the live table to the expected definition.
    ///
    /// # Errors
    ///
    /// Returns [`DeltaError::UnsafeDelta`] if the delta is unsafe.
    pub fn forward_statements(&self) -> Result<Vec<Statement>, DeltaError> {
        self.ensure_applicable()?;
        let Some(actual) = self.actual else {
            return Ok(Statement::create_all(self.expected));
        };
        if !self.difference.has_changes() {
            return Ok(Vec::new());
        }
        let expected = self.expected;
        let mut out = Vec::new();

        // Indexes that go away or get rebuilt.
        for index in self
            .indexes
            .extras()
            .iter()
            .chain(self.indexes.different().iter().map(|(_, a)| a))
        {
            out.push(self.drop_index(actual, index));
        }

        for column in self.columns.missing() {
            out.push(self.add_column(column));
        }

        let old_key = actual.primary_key_column_names();
        let new_key = expected.primary_key_column_names();
        // A column cannot drop NOT NULL while the old key still covers it.
        let drop_key_first = self.primary_key == Difference::Alter
            && self
                .columns
                .different()
                .iter()
                .any(|(e, _)| relaxes_key_column(&old_key, e));
        if drop_key_first {
            out.push(self.drop_primary_key(actual, false));
        }
        for (e, a) in self.columns.different() {
            out.push(self.alter_column(a, e));
        }

        for fk in self.foreign_keys.missing() {
            out.push(self.add_foreign_key(expected, fk));
        }
        for fk in self.foreign_keys.extras() {
            out.push(self.drop_foreign_key(actual, fk));
        }
        for (e, a) in self.foreign_keys.different() {
            out.push(self.drop_foreign_key(actual, a));
            out.push(self.add_foreign_key(expected, e));
        }

        for index in self
            .indexes
            .missing()
            .iter()
            .chain(self.indexes.different().iter().map(|(e, _)| e))
        {
            out.push(self.create_index(expected, index));
        }

        for column in self.columns.extras() {
            out.push(self.drop_column(column));
        }

        match self.primary_key {
            Difference::Alter => {
                if !old_key.is_empty() && !drop_key_first {
                    // Dropping a key column drops the constraint with it.
                    let dropped_with_column = self
                        .columns
                        .extras()
                        .iter()
                        .any(|c| old_key.iter().any(|k| k.eq_ignore_ascii_case(&c.name)));
                    out.push(self.drop_primary_key(actual, dropped_with_column));
                }
                if !new_key.is_empty() {
                    out.push(self.add_primary_key(expected, new_key));
                }
            }
            Difference::Create => out.push(self.add_primary_key(expected, new_key)),
            Difference::None | Difference::Unsafe => {}
        }

        Ok(out)
    }

    /// Statements that undo [`forward_statements`](Self::forward_statements),
    /// returning the table to its live definition.
    ///
    /// # Errors
    ///
    /// Returns [`DeltaError::UnsafeDelta`] if the delta is unsafe.
    pub fn rollback_statements(&self) -> Result<Vec<Statement>, DeltaError> {
        self.ensure_applicable()?;
        let Some(actual) = self.actual else {
            return Ok(vec![Statement::DropTable {
                table: self.identifier().clone(),
            }]);
        };
        if !self.difference.has_changes() {
            return Ok(Vec::new());
        }
        let expected = self.expected;
        let mut out = Vec::new();

        let added_columns: Vec<&str> = self
            .columns
            .missing()
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        let tied = |fk: &ForeignKey| fk.uses_any_column(added_columns.iter().copied());

        // Keys on columns the forward script added go first.
        for fk in self
            .foreign_keys
            .missing()
            .iter()
            .chain(self.foreign_keys.different().iter().map(|(e, _)| e))
            .filter(|fk| tied(**fk))
        {
            out.push(self.drop_foreign_key(expected, fk));
        }

        for column in self.columns.extras() {
            out.push(self.add_column(column));
        }

        let new_key = expected.primary_key_column_names();
        let drop_key_first = self.primary_key.has_changes()
            && self
                .columns
                .different()
                .iter()
                .any(|(_, a)| relaxes_key_column(&new_key, a));
        if drop_key_first {
            // The forward script may have stopped before adding it.
            out.push(self.drop_primary_key(expected, true));
        }
        for (e, a) in self.columns.different() {
            out.push(self.alter_column(e, a));
        }

        for fk in self.foreign_keys.missing().iter().filter(|fk| !tied(**fk)) {
            out.push(self.drop_foreign_key(expected, fk));
        }
        for (e, a) in self.foreign_keys.different() {
            if !tied(*e) {
                out.push(self.drop_foreign_key(expected, e));
            }
            out.push(self.add_foreign_key(actual, a));
        }

        for index in self
            .indexes
            .missing()
            .iter()
            .chain(self.indexes.different().iter().map(|(e, _)| e))
        {
            out.push(self.drop_index(expected, index));
        }
        for index in self
            .indexes
            .extras()
            .iter()
            .chain(self.indexes.different().iter().map(|(_, a)| a))
        {
            out.push(self.create_index(actual, index));
        }

        for column in self.columns.missing() {
            out.push(self.drop_column(column));
        }

        for fk in self.foreign_keys.extras() {
            out.push(self.add_foreign_key(actual, fk));
        }

        if self.primary_key.has_changes() {
            if !new_key.is_empty() && !drop_key_first {
                out.push(self.drop_primary_key(expected, true));
            }
            let old_key = actual.primary_key_column_names();
            if !old_key.is_empty() {
                out.push(self.add_primary_key(actual, old_key));
            }
        }

        Ok(out)
    }

    /// Renders [`forward_statements`](Self::forward_statements).
    ///
    /// # Errors
    ///
    /// Returns [`DeltaError::UnsafeDelta`] if the delta is unsafe.
    pub fn forward_sql(&self, writer: &DdlWriter) -> Result<Vec<String>, DeltaError> {
        Ok(writer.render_all(&self.forward_statements()?))
    }

    /// Renders [`rollback_statements`](Self::rollback_statements).
    ///
    /// # Errors
    ///
    /// Returns [`DeltaError::UnsafeDelta`] if the delta is unsafe.
    pub fn rollback_sql(&self, writer: &DdlWriter) -> Result<Vec<String>, DeltaError> {
        Ok(writer.render_all(&self.rollback_statements()?))
    }

    /// A name-level summary, suitable for reports.
    #[must_use]
    pub fn summary(&self) -> DeltaSummary {
        let expected = self.expected;
        let names = |cols: &[&Column]| -> Vec<String> { cols.iter().map(|c| c.name.clone()).collect() };
        let (index_owner, fk_owner) = match self.actual {
            Some(actual) => (actual, actual),
            None => (expected, expected),
        };
        DeltaSummary {
            table: self.identifier().clone(),
            difference: self.difference,
            added_columns: names(self.columns.missing()),
            dropped_columns: names(self.columns.extras()),
            altered_columns: self
                .columns
                .different()
                .iter()
                .map(|(e, _)| e.name.clone())
                .collect(),
            added_indexes: self
                .indexes
                .missing()
                .iter()
                .map(|i| i.effective_name(expected))
                .collect(),
            dropped_indexes: self
                .indexes
                .extras()
                .iter()
                .map(|i| i.effective_name(index_owner))
                .collect(),
            changed_indexes: self
                .indexes
                .different()
                .iter()
                .map(|(e, _)| e.effective_name(expected))
                .collect(),
            added_foreign_keys: self
                .foreign_keys
                .missing()
                .iter()
                .map(|fk| fk.effective_name(expected))
                .collect(),
            dropped_foreign_keys: self
                .foreign_keys
                .extras()
                .iter()
                .map(|fk| fk.effective_name(fk_owner))
                .collect(),
            changed_foreign_keys: self
                .foreign_keys
                .different()
                .iter()
                .map(|(e, _)| e.effective_name(expected))
                .collect(),
            primary_key: self.primary_key,
            unsafe_reasons: self.unsafe_reasons.clone(),
        }
    }

    fn ensure_applicable(&self) -> Result<(), DeltaError> {
        if self.difference.is_applicable() {
            Ok(())
        } else {
            Err(DeltaError::UnsafeDelta {
                table: self.identifier().clone(),
                reasons: self.unsafe_reasons.clone(),
            })
        }
    }

    fn target(&self) -> Identifier {
        self.identifier().clone()
    }

    fn add_column(&self, column: &Column) -> Statement {
        Statement::AddColumn {
            table: self.target(),
            column: column.clone(),
        }
    }

    fn alter_column(&self, from: &Column, to: &Column) -> Statement {
        Statement::AlterColumn {
            table: self.target(),
            from: from.clone(),
            to: to.clone(),
        }
    }

    fn drop_column(&self, column: &Column) -> Statement {
        Statement::DropColumn {
            table: self.target(),
            column: column.name.clone(),
        }
    }

    fn create_index(&self, owner: &Table, index: &Index) -> Statement {
        Statement::CreateIndex {
            table: self.target(),
            name: index.effective_name(owner),
            index: index.clone(),
        }
    }

    fn drop_index(&self, owner: &Table, index: &Index) -> Statement {
        Statement::DropIndex {
            table: self.target(),
            name: index.effective_name(owner),
        }
    }

    fn add_foreign_key(&self, owner: &Table, fk: &ForeignKey) -> Statement {
        Statement::AddForeignKey {
            table: self.target(),
            name: fk.effective_name(owner),
            foreign_key: fk.clone(),
        }
    }

    fn drop_foreign_key(&self, owner: &Table, fk: &ForeignKey) -> Statement {
        Statement::DropForeignKey {
            table: self.target(),
            name: fk.effective_name(owner),
        }
    }

    fn add_primary_key(&self, owner: &Table, columns: Vec<String>) -> Statement {
        Statement::AddPrimaryKey {
            table: self.target(),
            name: owner.primary_key_name(),
            columns,
        }
    }

    fn drop_primary_key(&self, owner: &Table, if_exists: bool) -> Statement {
        Statement::DropPrimaryKey {
            table: self.target(),
            name: owner.primary_key_name(),
            if_exists,
        }
    }
}

fn primary_key_difference(expected: &[String], actual: &[String]) -> Difference {
    let same = expected.len() == actual.len()
        && expected
            .iter()
            .zip(actual)
            .all(|(e, a)| e.eq_ignore_ascii_case(a));
    match (expected.is_empty(), actual.is_empty()) {
        (true, true) => Difference::None,
        (true, false) => Difference::Alter,
        (false, true) => Difference::Create,
        (false, false) if same => Difference::None,
        (false, false) => Difference::Alter,
    }
}

/// Whether altering to `column` makes a member of `key` nullable.
fn relaxes_key_column(key: &[String], column: &Column) -> bool {
    column.nullable && key.iter().any(|k| k.eq_ignore_ascii_case(&column.name))
}

/// Names of everything a [`TableDelta`] would change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeltaSummary {
    /// Table identifier.
    pub table: Identifier,
    /// Overall severity.
    pub difference: Difference,
    /// Columns to add.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub added_columns: Vec<String>,
    /// Columns to drop.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dropped_columns: Vec<String>,
    /// Columns to alter.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub altered_columns: Vec<String>,
    /// Indexes to create.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub added_indexes: Vec<String>,
    /// Indexes to drop.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dropped_indexes: Vec<String>,
    /// Indexes to rebuild.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changed_indexes: Vec<String>,
    /// Foreign keys to add.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub added_foreign_keys: Vec<String>,
    /// Foreign keys to drop.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dropped_foreign_keys: Vec<String>,
    /// Foreign keys to replace.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub changed_foreign_keys: Vec<String>,
    /// Primary key severity.
    pub primary_key: Difference,
    /// Why the delta is unsafe.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unsafe_reasons: Vec<UnsafeReason>,
}
