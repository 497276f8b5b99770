//! In-memory replay of DDL statements.
//!
//! [`SchemaState`] applies [`Statement`] values to a set of tables the way
//! a database would, which makes it possible to preview a script or to
//! check that a rollback script really undoes its forward script.

use crate::ddl::Statement;
use crate::error::StateError;
use crate::identifier::Identifier;
use crate::schema::Table;

/// A set of tables that statements can be applied to.
#[derive(Debug, Clone, Default)]
pub struct SchemaState {
    tables: Vec<Table>,
}

impl SchemaState {
    /// Creates an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a state holding the given tables.
    #[must_use]
    pub fn with_tables(tables: impl IntoIterator<Item = Table>) -> Self {
        Self {
            tables: tables.into_iter().collect(),
        }
    }

    /// All tables.
    #[must_use]
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Looks a table up.
    #[must_use]
    pub fn table(&self, identifier: &Identifier) -> Option<&Table> {
        self.tables.iter().find(|t| t.identifier() == identifier)
    }

    /// Consumes the state and returns its tables.
    #[must_use]
    pub fn into_tables(self) -> Vec<Table> {
        self.tables
    }

    /// Applies statements in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the [`StateError`] of the first statement that cannot be
    /// applied.
    pub fn apply_all<'s>(
        &mut self,
        statements: impl IntoIterator<Item = &'s Statement>,
    ) -> Result<(), StateError> {
        for statement in statements {
            self.apply(statement)?;
        }
        Ok(())
    }

    /// Applies a single statement.
    ///
    /// # Errors
    ///
    /// Returns a [`StateError`] when the statement references a missing
    /// object or would duplicate an existing one.
    pub fn apply(&mut self, statement: &Statement) -> Result<(), StateError> {
        match statement {
            Statement::CreateTable(table) => {
                if self.table(table.identifier()).is_some() {
                    return Err(StateError::AlreadyExists {
                        table: table.identifier().clone(),
                        what: "definition",
                        name: table.identifier().qualified_name(),
                    });
                }
                let mut table = (**table).clone();
                table.indexes_mut().clear();
                self.tables.push(table);
            }

            Statement::DropTable { table } => {
                self.tables.retain(|t| t.identifier() != table);
            }

            Statement::AddColumn { table, column } => {
                let t = self.table_mut(table)?;
                if t.column(&column.name).is_some() {
                    return Err(already_exists(table, "column", &column.name));
                }
                let mut column = column.clone();
                column.primary_key = false;
                t.columns_mut().push(column);
            }

            Statement::AlterColumn { table, to, .. } => {
                let t = self.table_mut(table)?;
                let column = t
                    .columns_mut()
                    .iter_mut()
                    .find(|c| c.same_column(to))
                    .ok_or_else(|| missing(table, "column", &to.name))?;
                if column.primary_key && to.nullable {
                    return Err(StateError::NullablePrimaryKeyColumn {
                        table: table.clone(),
                        column: column.name.clone(),
                    });
                }
                column.data_type.clone_from(&to.data_type);
                column.nullable = to.nullable;
                column.default.clone_from(&to.default);
            }

            Statement::DropColumn { table, column } => {
                let t = self.table_mut(table)?;
                let position = t
                    .columns()
                    .iter()
                    .position(|c| c.name.eq_ignore_ascii_case(column))
                    .ok_or_else(|| missing(table, "column", column))?;
                let removed = t.columns_mut().remove(position);
                t.indexes_mut()
                    .retain(|i| !i.columns.iter().any(|c| c.eq_ignore_ascii_case(column)));
                t.foreign_keys_mut()
                    .retain(|fk| !fk.uses_any_column(std::iter::once(column.as_str())));
                if removed.primary_key {
                    t.set_primary_key(None, &[]);
                }
            }

            Statement::CreateIndex { table, name, index } => {
                let t = self.table_mut(table)?;
                if t
                    .indexes()
                    .iter()
                    .any(|i| i.effective_name(t).eq_ignore_ascii_case(name))
                {
                    return Err(already_exists(table, "index", name));
                }
                let mut index = index.clone();
                index.name = Some(name.clone());
                t.indexes_mut().push(index);
            }

            Statement::DropIndex { table, name } => {
                let t = self.table_mut(table)?;
                let position = t
                    .indexes()
                    .iter()
                    .position(|i| i.effective_name(t).eq_ignore_ascii_case(name))
                    .ok_or_else(|| missing(table, "index", name))?;
                t.indexes_mut().remove(position);
            }

            Statement::AddForeignKey {
                table,
                name,
                foreign_key,
            } => {
                let t = self.table_mut(table)?;
                if t
                    .foreign_keys()
                    .iter()
                    .any(|fk| fk.effective_name(t).eq_ignore_ascii_case(name))
                {
                    return Err(already_exists(table, "foreign key", name));
                }
                if let Some(unknown) = foreign_key.columns.iter().find(|c| t.column(c).is_none()) {
                    return Err(missing(table, "column", unknown));
                }
                let mut foreign_key = foreign_key.clone();
                foreign_key.name = Some(name.clone());
                t.foreign_keys_mut().push(foreign_key);
            }

            Statement::DropForeignKey { table, name } => {
                let t = self.table_mut(table)?;
                let position = t
                    .foreign_keys()
                    .iter()
                    .position(|fk| fk.effective_name(t).eq_ignore_ascii_case(name))
                    .ok_or_else(|| missing(table, "foreign key", name))?;
                t.foreign_keys_mut().remove(position);
            }

            Statement::AddPrimaryKey {
                table,
                name,
                columns,
            } => {
                let t = self.table_mut(table)?;
                if !t.primary_key_columns().is_empty() {
                    return Err(already_exists(table, "primary key", &t.primary_key_name()));
                }
                if let Some(unknown) = columns.iter().find(|c| t.column(c).is_none()) {
                    return Err(missing(table, "column", unknown));
                }
                t.set_primary_key(Some(name.clone()), columns);
            }

            Statement::DropPrimaryKey {
                table,
                name,
                if_exists,
            } => {
                let t = self.table_mut(table)?;
                if t.primary_key_columns().is_empty() {
                    if *if_exists {
                        return Ok(());
                    }
                    return Err(missing(table, "primary key", name));
                }
                t.set_primary_key(None, &[]);
            }
        }
        Ok(())
    }

    fn table_mut(&mut self, identifier: &Identifier) -> Result<&mut Table, StateError> {
        self.tables
            .iter_mut()
            .find(|t| t.identifier() == identifier)
            .ok_or_else(|| StateError::UnknownTable(identifier.clone()))
    }
}

fn already_exists(table: &Identifier, what: &'static str, name: &str) -> StateError {
    StateError::AlreadyExists {
        table: table.clone(),
        what,
        name: name.to_string(),
    }
}

fn missing(table: &Identifier, what: &'static str, name: &str) -> StateError {
    StateError::Missing {
        table: table.clone(),
        what,
        name: name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Column;

    fn users() -> Table {
        let mut b = Table::builder("users");
        b.column("id", "bigint").primary_key();
        b.column("email", "text").not_null();
        b.index(["email"]).unique();
        b.build().unwrap()
    }

    #[test]
    fn test_create_table_then_indexes() {
        let mut state = SchemaState::new();
        state.apply_all(&Statement::create_all(&users())).unwrap();
        let table = state.table(&Identifier::parse("users")).unwrap();
        assert_eq!(table.indexes().len(), 1);
        assert_eq!(table.primary_key_column_names(), vec!["id"]);
    }

    #[test]
    fn test_create_existing_table_fails() {
        let mut state = SchemaState::with_tables([users()]);
        let err = state
            .apply(&Statement::CreateTable(Box::new(users())))
            .unwrap_err();
        assert!(matches!(err, StateError::AlreadyExists { .. }));
    }

    #[test]
    fn test_drop_column_drops_dependents() {
        let mut state = SchemaState::with_tables([users()]);
        let id = Identifier::parse("users");
        state
            .apply(&Statement::DropColumn {
                table: id.clone(),
                column: "email".into(),
            })
            .unwrap();
        assert!(state.table(&id).unwrap().indexes().is_empty());

        state
            .apply(&Statement::DropColumn {
                table: id.clone(),
                column: "id".into(),
            })
            .unwrap();
        assert!(state.table(&id).unwrap().primary_key_columns().is_empty());
    }

    #[test]
    fn test_key_column_cannot_become_nullable() {
        let mut state = SchemaState::with_tables([users()]);
        let id = Identifier::parse("users");
        let relax = Statement::AlterColumn {
            table: id.clone(),
            from: Column::new("id", "bigint").primary_key(),
            to: Column::new("id", "bigint"),
        };
        assert_eq!(
            state.apply(&relax),
            Err(StateError::NullablePrimaryKeyColumn {
                table: id.clone(),
                column: "id".into(),
            })
        );

        state
            .apply(&Statement::DropPrimaryKey {
                table: id.clone(),
                name: "pk_users".into(),
                if_exists: false,
            })
            .unwrap();
        state.apply(&relax).unwrap();
        assert!(state.table(&id).unwrap().column("id").unwrap().nullable);
    }

    #[test]
    fn test_unknown_table() {
        let mut state = SchemaState::new();
        let err = state
            .apply(&Statement::AddColumn {
                table: Identifier::parse("nope"),
                column: Column::new("x", "int"),
            })
            .unwrap_err();
        assert_eq!(err, StateError::UnknownTable(Identifier::parse("nope")));
    }

    #[test]
    fn test_drop_primary_key_if_exists() {
        let mut state = SchemaState::with_tables([users()]);
        let drop_key = |if_exists| Statement::DropPrimaryKey {
            table: Identifier::parse("users"),
            name: "pk_users".into(),
            if_exists,
        };
        state.apply(&drop_key(false)).unwrap();
        state.apply(&drop_key(true)).unwrap();
        assert!(matches!(
            state.apply(&drop_key(false)),
            Err(StateError::Missing { .. })
        ));
    }
}
