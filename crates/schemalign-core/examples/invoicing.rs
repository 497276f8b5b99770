//! Invoicing schema evolution example.
//!
//! Compares a second version of an invoicing schema against the first and
//! prints the forward and rollback scripts for every table.
//!
//! Run with: cargo run --example invoicing

use schemalign_core::{CascadeAction, DdlWriter, Difference, Table, TableDelta};

// =============================================================================
// V1: what the database has
// =============================================================================

fn clients_v1() -> Table {
    let mut b = Table::builder("billing.clients");
    b.column("id", "bigint").primary_key();
    b.column("name", "varchar(100)").not_null();
    b.column("fax", "varchar(32)");
    b.build().expect("valid clients table")
}

fn invoices_v1() -> Table {
    let mut b = Table::builder("billing.invoices");
    b.column("id", "bigint").primary_key();
    b.column("client_id", "bigint").not_null();
    b.column("total", "numeric(10, 2)").not_null();
    b.foreign_key(["client_id"], "billing.clients", ["id"]);
    b.build().expect("valid invoices table")
}

// =============================================================================
// V2: what the application expects
// =============================================================================

fn clients_v2() -> Table {
    let mut b = clients_v1().to_builder();
    b.modify_column("name")
        .expect("name exists")
        .data_type("varchar(255)");
    b.drop_column("fax").expect("fax exists");
    b.column("email", "text");
    b.index(["email"]).unique();
    b.build().expect("valid clients table")
}

fn invoices_v2() -> Table {
    let mut b = Table::builder("billing.invoices");
    b.column("id", "bigint").primary_key();
    b.column("client_id", "bigint").not_null();
    b.column("total", "numeric(12, 2)").not_null();
    b.column("currency", "char(3)").not_null().default_expr("'EUR'");
    b.foreign_key(["client_id"], "billing.clients", ["id"])
        .on_delete(CascadeAction::Restrict);
    b.build().expect("valid invoices table")
}

fn credit_notes() -> Table {
    let mut b = Table::builder("billing.credit_notes");
    b.column("id", "bigint").primary_key();
    b.column("invoice_id", "bigint").not_null();
    b.column("amount", "numeric(12, 2)").not_null();
    b.foreign_key(["invoice_id"], "billing.invoices", ["id"])
        .on_delete(CascadeAction::Cascade);
    b.index(["invoice_id"]);
    b.build().expect("valid credit notes table")
}

fn main() {
    let writer = DdlWriter::default();
    let live = [clients_v1(), invoices_v1()];
    let declared = [clients_v2(), invoices_v2(), credit_notes()];

    for expected in &declared {
        let actual = live.iter().find(|t| t.identifier() == expected.identifier());
        let delta = TableDelta::compare(expected, actual);

        println!("-- {} ({})", expected.identifier(), delta.difference());
        if delta.difference() == Difference::Unsafe {
            for reason in delta.unsafe_reasons() {
                println!("--   unsafe: {reason}");
            }
            continue;
        }

        for sql in delta.forward_sql(&writer).expect("applicable delta") {
            println!("{sql};");
        }
        println!("-- rollback");
        for sql in delta.rollback_sql(&writer).expect("applicable delta") {
            println!("{sql};");
        }
        println!();
    }
}
