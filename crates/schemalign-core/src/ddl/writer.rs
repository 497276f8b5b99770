//! SQL text generation.

use super::rules::{Formatting, MigratorRules, TableCreation};
use super::Statement;
use crate::identifier::{quote, Identifier};
use crate::schema::{
    is_plain_name, CascadeAction, Column, ForeignKey, Index, PartitionStrategy, Table,
};

const INDENT: &str = "    ";

/// Renders [`Statement`] values as SQL text.
///
/// Identifiers are always quoted and tables are always schema-qualified.
#[derive(Debug, Clone, Copy, Default)]
pub struct DdlWriter {
    rules: MigratorRules,
}

impl DdlWriter {
    /// Creates a writer with the given rules.
    #[must_use]
    pub const fn new(rules: MigratorRules) -> Self {
        Self { rules }
    }

    /// Returns the rules in use.
    #[must_use]
    pub const fn rules(&self) -> &MigratorRules {
        &self.rules
    }

    /// Renders one statement. Most statements render to a single string;
    /// table creation under [`TableCreation::DropThenCreate`] renders two.
    #[must_use]
    pub fn render(&self, statement: &Statement) -> Vec<String> {
        match statement {
            Statement::CreateTable(table) => match self.rules.table_creation {
                TableCreation::CreateIfNotExists => vec![self.create_table(table, true)],
                TableCreation::DropThenCreate => vec![
                    drop_table(table.identifier()),
                    self.create_table(table, false),
                ],
            },
            Statement::DropTable { table } => vec![drop_table(table)],
            Statement::AddColumn { table, column } => vec![format!(
                "ALTER TABLE {} ADD COLUMN {}",
                table.quoted(),
                column_definition(column)
            )],
            Statement::AlterColumn { table, from, to } => alter_column(table, from, to)
                .into_iter()
                .collect(),
            Statement::DropColumn { table, column } => vec![format!(
                "ALTER TABLE {} DROP COLUMN {}",
                table.quoted(),
                quote(column)
            )],
            Statement::CreateIndex { table, name, index } => {
                vec![create_index(table, name, index)]
            }
            Statement::DropIndex { table, name } => vec![format!(
                "DROP INDEX {}.{}",
                quote(table.container()),
                quote(name)
            )],
            Statement::AddForeignKey {
                table,
                name,
                foreign_key,
            } => vec![format!(
                "ALTER TABLE {} ADD {}",
                table.quoted(),
                foreign_key_constraint(name, foreign_key)
            )],
            Statement::DropForeignKey { table, name } => vec![format!(
                "ALTER TABLE {} DROP CONSTRAINT {}",
                table.quoted(),
                quote(name)
            )],
            Statement::AddPrimaryKey {
                table,
                name,
                columns,
            } => vec![format!(
                "ALTER TABLE {} ADD {}",
                table.quoted(),
                primary_key_constraint(name, columns)
            )],
            Statement::DropPrimaryKey {
                table,
                name,
                if_exists,
            } => vec![format!(
                "ALTER TABLE {} DROP CONSTRAINT {}{}",
                table.quoted(),
                if *if_exists { "IF EXISTS " } else { "" },
                quote(name)
            )],
        }
    }

    /// Renders a sequence of statements, in order.
    #[must_use]
    pub fn render_all(&self, statements: &[Statement]) -> Vec<String> {
        statements.iter().flat_map(|s| self.render(s)).collect()
    }

    fn create_table(&self, table: &Table, if_not_exists: bool) -> String {
        let mut sql = String::from("CREATE TABLE ");
        if if_not_exists {
            sql.push_str("IF NOT EXISTS ");
        }
        sql.push_str(&table.identifier().quoted());

        let primary_key = table.primary_key_column_names();
        let mut constraints = Vec::new();
        if !primary_key.is_empty() {
            constraints.push(primary_key_constraint(&table.primary_key_name(), &primary_key));
        }
        constraints.extend(
            table
                .foreign_keys()
                .iter()
                .map(|fk| foreign_key_constraint(&fk.effective_name(table), fk)),
        );

        match self.rules.formatting {
            Formatting::Concise => {
                let parts: Vec<String> = table
                    .columns()
                    .iter()
                    .map(column_definition)
                    .chain(constraints)
                    .collect();
                sql.push_str(" (");
                sql.push_str(&parts.join(", "));
                sql.push(')');
            }
            Formatting::Pretty => {
                let lines: Vec<String> = aligned_columns(table.columns())
                    .into_iter()
                    .chain(constraints)
                    .map(|line| format!("{INDENT}{line}"))
                    .collect();
                sql.push_str(" (\n");
                sql.push_str(&lines.join(",\n"));
                sql.push_str("\n)");
            }
        }

        let partitioning = table.partitioning();
        if partitioning.strategy == PartitionStrategy::Range {
            let keys: Vec<String> = partitioning
                .expressions
                .iter()
                .map(|e| index_entry(e))
                .collect();
            sql.push_str(&format!(" PARTITION BY RANGE ({})", keys.join(", ")));
        }

        sql
    }
}

fn drop_table(table: &Identifier) -> String {
    format!("DROP TABLE IF EXISTS {}", table.quoted())
}

/// Column definition without the primary key, which is always rendered as
/// a named table constraint.
fn column_definition(column: &Column) -> String {
    let mut sql = format!("{} {}", quote(&column.name), column.data_type);
    let rest = column_modifiers(column);
    if !rest.is_empty() {
        sql.push(' ');
        sql.push_str(&rest);
    }
    sql
}

fn column_modifiers(column: &Column) -> String {
    let mut parts = Vec::new();
    if !column.nullable {
        parts.push("NOT NULL".to_string());
    }
    if let Some(default) = &column.default {
        parts.push(format!("DEFAULT {default}"));
    }
    parts.join(" ")
}

fn aligned_columns(columns: &[Column]) -> Vec<String> {
    let names: Vec<String> = columns.iter().map(|c| quote(&c.name)).collect();
    let name_width = names.iter().map(|n| n.chars().count()).max().unwrap_or(0);
    let type_width = columns
        .iter()
        .map(|c| c.data_type.chars().count())
        .max()
        .unwrap_or(0);

    columns
        .iter()
        .zip(names)
        .map(|(column, name)| {
            let line = format!(
                "{name:<name_width$} {data_type:<type_width$} {rest}",
                data_type = column.data_type,
                rest = column_modifiers(column)
            );
            line.trim_end().to_string()
        })
        .collect()
}

fn alter_column(table: &Identifier, from: &Column, to: &Column) -> Option<String> {
    let column = quote(&to.name);
    let mut clauses = Vec::new();
    if to.type_changed(from) {
        clauses.push(format!("ALTER COLUMN {column} TYPE {}", to.data_type));
    }
    if to.nullability_changed(from) {
        let action = if to.nullable { "DROP NOT NULL" } else { "SET NOT NULL" };
        clauses.push(format!("ALTER COLUMN {column} {action}"));
    }
    if to.default_changed(from) {
        clauses.push(match &to.default {
            Some(default) => format!("ALTER COLUMN {column} SET DEFAULT {default}"),
            None => format!("ALTER COLUMN {column} DROP DEFAULT"),
        });
    }
    if clauses.is_empty() {
        return None;
    }
    Some(format!("ALTER TABLE {} {}", table.quoted(), clauses.join(", ")))
}

fn create_index(table: &Identifier, name: &str, index: &Index) -> String {
    let mut sql = String::from("CREATE ");
    if index.unique {
        sql.push_str("UNIQUE ");
    }
    sql.push_str(&format!("INDEX {} ON {}", quote(name), table.quoted()));
    if let Some(method) = &index.method {
        sql.push_str(&format!(" USING {method}"));
    }
    let entries: Vec<String> = index.columns.iter().map(|c| index_entry(c)).collect();
    sql.push_str(&format!(" ({})", entries.join(", ")));
    if let Some(predicate) = &index.predicate {
        sql.push_str(" WHERE ");
        sql.push_str(predicate);
    }
    sql
}

/// Plain column names are quoted, expressions are kept verbatim.
fn index_entry(entry: &str) -> String {
    if is_plain_name(entry) {
        quote(entry)
    } else {
        entry.to_string()
    }
}

fn quoted_list(names: &[String]) -> String {
    names.iter().map(|n| quote(n)).collect::<Vec<_>>().join(", ")
}

fn primary_key_constraint(name: &str, columns: &[String]) -> String {
    format!(
        "CONSTRAINT {} PRIMARY KEY ({})",
        quote(name),
        quoted_list(columns)
    )
}

fn foreign_key_constraint(name: &str, fk: &ForeignKey) -> String {
    let mut sql = format!(
        "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
        quote(name),
        quoted_list(&fk.columns),
        fk.referenced_table.quoted(),
        quoted_list(&fk.referenced_columns)
    );
    if fk.on_delete != CascadeAction::NoAction {
        sql.push_str(" ON DELETE ");
        sql.push_str(fk.on_delete.as_sql());
    }
    if fk.on_update != CascadeAction::NoAction {
        sql.push_str(" ON UPDATE ");
        sql.push_str(fk.on_update.as_sql());
    }
    sql
}
