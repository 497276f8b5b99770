//! Cross-table ordering by foreign key dependency.

use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use schemalign_core::Table;
use tracing::debug;

use crate::error::{MigrateError, Result};

/// Orders tables so that every table comes after the tables its foreign
/// keys reference.
///
/// Self references and references to tables outside `tables` do not
/// constrain the order.
///
/// # Errors
///
/// Returns [`MigrateError::CircularDependency`] naming the tables of the
/// first cycle found.
pub fn dependency_order(tables: &[Table]) -> Result<Vec<&Table>> {
    let mut graph: DiGraph<usize, ()> = DiGraph::new();
    let nodes: Vec<NodeIndex> = (0..tables.len()).map(|i| graph.add_node(i)).collect();

    for (child, table) in tables.iter().enumerate() {
        for fk in table.foreign_keys() {
            if &fk.referenced_table == table.identifier() {
                continue;
            }
            if let Some(parent) = tables
                .iter()
                .position(|t| t.identifier() == &fk.referenced_table)
            {
                graph.update_edge(nodes[parent], nodes[child], ());
            }
        }
    }

    match toposort(&graph, None) {
        Ok(sorted) => {
            let ordered: Vec<&Table> = sorted.into_iter().map(|n| &tables[graph[n]]).collect();
            debug!(
                order = ?ordered.iter().map(|t| t.identifier().to_string()).collect::<Vec<_>>(),
                "Resolved table order"
            );
            Ok(ordered)
        }
        Err(_) => {
            let cycle = tarjan_scc(&graph)
                .into_iter()
                .find(|component| component.len() > 1)
                .unwrap_or_default();
            let mut members: Vec<usize> = cycle.into_iter().map(|n| graph[n]).collect();
            members.sort_unstable();
            Err(MigrateError::CircularDependency {
                tables: members
                    .into_iter()
                    .map(|i| tables[i].identifier().clone())
                    .collect(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemalign_core::Identifier;

    fn table(name: &str, references: &[&str]) -> Table {
        let mut b = Table::builder(name);
        b.column("id", "bigint").primary_key();
        for (i, parent) in references.iter().enumerate() {
            let column = format!("ref_{i}");
            b.column(column.clone(), "bigint");
            b.foreign_key([column], *parent, ["id"]);
        }
        b.build().unwrap()
    }

    fn names(tables: &[&Table]) -> Vec<String> {
        tables.iter().map(|t| t.identifier().name().to_string()).collect()
    }

    fn index_of(order: &[String], name: &str) -> usize {
        order.iter().position(|n| n == name).unwrap()
    }

    #[test]
    fn test_parents_come_first() {
        let tables = vec![
            table("line_items", &["orders", "products"]),
            table("orders", &["customers"]),
            table("customers", &[]),
            table("products", &[]),
        ];
        let order = names(&dependency_order(&tables).unwrap());
        assert_eq!(order.len(), 4);
        assert!(index_of(&order, "customers") < index_of(&order, "orders"));
        assert!(index_of(&order, "orders") < index_of(&order, "line_items"));
        assert!(index_of(&order, "products") < index_of(&order, "line_items"));
    }

    #[test]
    fn test_self_and_external_references_are_ignored() {
        let tables = vec![table("employees", &["employees", "public.departments"])];
        let order = dependency_order(&tables).unwrap();
        assert_eq!(names(&order), vec!["employees"]);
    }

    #[test]
    fn test_cycle_is_reported() {
        let tables = vec![
            table("a", &["b"]),
            table("b", &["a"]),
            table("c", &[]),
        ];
        let err = dependency_order(&tables).unwrap_err();
        match err {
            MigrateError::CircularDependency { tables } => {
                assert_eq!(tables, vec![Identifier::parse("a"), Identifier::parse("b")]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
