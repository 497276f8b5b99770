//! Behavioural properties of table deltas.
//!
//! Scripts are replayed on a `SchemaState` to check that forward moves the
//! live table to the expected definition and rollback moves it back.

use schemalign_core::{
    CascadeAction, DdlWriter, Difference, Formatting, MigratorRules, SchemaState, Statement,
    Table, TableDelta, truncate_identifier,
};

// =============================================================================
// Fixtures
// =============================================================================

fn live_orders() -> Table {
    let mut b = Table::builder("shop.orders");
    b.column("id", "bigint").primary_key();
    b.column("email", "varchar(100)");
    b.column("legacy_flag", "int");
    b.column("customer_id", "bigint");
    b.index(["legacy_flag"]);
    b.index(["email"]).named("ix_orders_email");
    b.foreign_key(["customer_id"], "shop.customers", ["id"]);
    b.foreign_key(["legacy_flag"], "shop.flags", ["id"]);
    b.build().unwrap()
}

fn declared_orders() -> Table {
    let mut b = Table::builder("shop.orders");
    b.column("id", "bigint").primary_key();
    b.column("email", "varchar(255)").not_null();
    b.column("customer_id", "bigint");
    b.column("placed_at", "timestamptz").default_expr("now()");
    b.column("region", "text")
        .not_null()
        .default_expr("'eu'")
        .primary_key();
    b.index(["email"]).named("ix_orders_email").unique();
    b.index(["placed_at"]);
    b.foreign_key(["customer_id"], "shop.customers", ["id"])
        .on_delete(CascadeAction::Cascade);
    b.foreign_key(["region"], "shop.regions", ["code"]);
    b.build().unwrap()
}

fn assert_round_trip(expected: &Table, actual: &Table) {
    let delta = TableDelta::compare(expected, Some(actual));
    assert!(delta.difference().is_applicable());

    let mut state = SchemaState::with_tables([actual.clone()]);
    state
        .apply_all(&delta.forward_statements().unwrap())
        .unwrap();
    let migrated = state.table(expected.identifier()).unwrap().clone();
    assert_eq!(
        TableDelta::compare(expected, Some(&migrated)).difference(),
        Difference::None,
        "forward script did not reach the expected definition"
    );

    state
        .apply_all(&delta.rollback_statements().unwrap())
        .unwrap();
    let restored = state.table(actual.identifier()).unwrap();
    assert_eq!(
        TableDelta::compare(actual, Some(restored)).difference(),
        Difference::None,
        "rollback script did not restore the live definition"
    );
}

fn position(statements: &[Statement], pred: impl Fn(&Statement) -> bool) -> usize {
    statements.iter().position(pred).unwrap()
}

// =============================================================================
// Creation and equality
// =============================================================================

#[test]
fn absent_table_emits_exactly_the_full_create() {
    let expected = declared_orders();
    let writer = DdlWriter::new(MigratorRules::new().formatting(Formatting::Concise));
    let delta = TableDelta::compare(&expected, None);

    assert_eq!(delta.difference(), Difference::Create);
    let sql = delta.forward_sql(&writer).unwrap();
    assert_eq!(sql, writer.render_all(&Statement::create_all(&expected)));
    assert_eq!(sql.len(), 3);
    assert!(sql[0].starts_with("CREATE TABLE IF NOT EXISTS \"shop\".\"orders\" ("));
    assert!(sql[0].contains("CONSTRAINT \"pk_orders\" PRIMARY KEY (\"id\", \"region\")"));
    assert!(sql[1].starts_with("CREATE UNIQUE INDEX \"ix_orders_email\""));
    assert!(sql[2].starts_with("CREATE INDEX \"ix_orders_placed_at\""));

    assert_eq!(
        delta.rollback_sql(&writer).unwrap(),
        vec!["DROP TABLE IF EXISTS \"shop\".\"orders\"".to_string()]
    );
}

#[test]
fn identical_copies_compare_equal_regardless_of_index_order() {
    let expected = declared_orders();

    let mut b = Table::builder("shop.orders");
    b.column("id", "bigint").primary_key();
    b.column("email", "varchar(255)").not_null();
    b.column("customer_id", "bigint");
    b.column("placed_at", "timestamptz").default_expr("now()");
    b.column("region", "text").default_expr("'eu'").primary_key();
    b.foreign_key(["region"], "shop.regions", ["code"]);
    b.foreign_key(["customer_id"], "shop.customers", ["id"])
        .on_delete(CascadeAction::Cascade);
    b.index(["placed_at"]);
    b.index(["email"]).named("ix_orders_email").unique();
    let shuffled = b.build().unwrap();

    let delta = TableDelta::compare(&expected, Some(&shuffled));
    assert_eq!(delta.difference(), Difference::None);
    assert!(delta.forward_statements().unwrap().is_empty());
    assert!(delta.rollback_statements().unwrap().is_empty());
}

// =============================================================================
// Severity
// =============================================================================

#[test]
fn one_unsafe_aspect_makes_the_whole_table_unsafe() {
    let actual = live_orders();
    let mut b = actual.to_builder();
    // Narrowing is unsafe; everything else here is merely alterable.
    b.modify_column("email").unwrap().data_type("varchar(20)");
    b.column("note", "text");
    b.index(["customer_id"]);
    let expected = b.build().unwrap();

    let delta = TableDelta::compare(&expected, Some(&actual));
    assert_eq!(delta.columns().difference(), Difference::Alter);
    assert_eq!(delta.indexes().difference(), Difference::Alter);
    assert_eq!(delta.difference(), Difference::Unsafe);
    assert!(delta.forward_statements().is_err());
}

#[test]
fn orders_example_tightens_nullability_in_place() {
    let mut b = Table::builder("orders");
    b.column("id", "int").primary_key();
    b.column("email", "varchar").not_null();
    let expected = b.build().unwrap();

    let mut b = Table::builder("orders");
    b.column("id", "int").primary_key();
    b.column("email", "varchar");
    b.column("legacy_flag", "int");
    let actual = b.build().unwrap();

    let delta = TableDelta::compare(&expected, Some(&actual));
    // NOT NULL tightening is alterable: the database rejects it inside the
    // migration transaction if nulls remain.
    assert_eq!(delta.difference(), Difference::Alter);
    assert_eq!(
        delta.forward_sql(&DdlWriter::default()).unwrap(),
        vec![
            "ALTER TABLE \"public\".\"orders\" ALTER COLUMN \"email\" SET NOT NULL".to_string(),
            "ALTER TABLE \"public\".\"orders\" DROP COLUMN \"legacy_flag\"".to_string(),
        ]
    );
    assert_eq!(
        delta.rollback_sql(&DdlWriter::default()).unwrap(),
        vec![
            "ALTER TABLE \"public\".\"orders\" ADD COLUMN \"legacy_flag\" int".to_string(),
            "ALTER TABLE \"public\".\"orders\" ALTER COLUMN \"email\" DROP NOT NULL".to_string(),
        ]
    );
    assert_round_trip(&expected, &actual);
}

// =============================================================================
// Ordering
// =============================================================================

#[test]
fn index_drop_precedes_column_drop() {
    let actual = live_orders();
    let mut b = Table::builder("shop.orders");
    b.column("id", "bigint").primary_key();
    b.column("email", "varchar(100)");
    b.column("customer_id", "bigint");
    b.index(["email"]).named("ix_orders_email");
    b.foreign_key(["customer_id"], "shop.customers", ["id"]);
    let expected = b.build().unwrap();

    let forward = TableDelta::compare(&expected, Some(&actual))
        .forward_statements()
        .unwrap();
    let drop_index = position(&forward, |s| {
        matches!(s, Statement::DropIndex { name, .. } if name == "ix_orders_legacy_flag")
    });
    let drop_fk = position(&forward, |s| {
        matches!(s, Statement::DropForeignKey { name, .. } if name == "fk_orders_legacy_flag")
    });
    let drop_column = position(&forward, |s| {
        matches!(s, Statement::DropColumn { column, .. } if column == "legacy_flag")
    });
    assert!(drop_index < drop_column);
    assert!(drop_fk < drop_column);
}

#[test]
fn forward_follows_dependency_order() {
    let actual = live_orders();
    let expected = declared_orders();
    let forward = TableDelta::compare(&expected, Some(&actual))
        .forward_statements()
        .unwrap();

    let kinds: Vec<&str> = forward
        .iter()
        .map(|s| match s {
            Statement::DropIndex { .. } => "drop_index",
            Statement::AddColumn { .. } => "add_column",
            Statement::AlterColumn { .. } => "alter_column",
            Statement::AddForeignKey { .. } => "add_fk",
            Statement::DropForeignKey { .. } => "drop_fk",
            Statement::CreateIndex { .. } => "create_index",
            Statement::DropColumn { .. } => "drop_column",
            Statement::DropPrimaryKey { .. } => "drop_pk",
            Statement::AddPrimaryKey { .. } => "add_pk",
            Statement::CreateTable(_) | Statement::DropTable { .. } => "table",
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            "drop_index",
            "drop_index",
            "add_column",
            "add_column",
            "alter_column",
            "add_fk",
            "drop_fk",
            "drop_fk",
            "add_fk",
            "create_index",
            "create_index",
            "drop_column",
            "drop_pk",
            "add_pk",
        ]
    );
    assert!(forward.contains(&Statement::DropPrimaryKey {
        table: expected.identifier().clone(),
        name: "pk_orders".into(),
        if_exists: false,
    }));
}

#[test]
fn rollback_drops_keys_on_added_columns_first() {
    let actual = live_orders();
    let expected = declared_orders();
    let rollback = TableDelta::compare(&expected, Some(&actual))
        .rollback_statements()
        .unwrap();

    assert!(matches!(
        &rollback[0],
        Statement::DropForeignKey { name, .. } if name == "fk_orders_region"
    ));
    assert!(matches!(
        rollback.last(),
        Some(Statement::AddPrimaryKey { columns, .. }) if columns == &vec!["id".to_string()]
    ));
    assert!(rollback.contains(&Statement::DropPrimaryKey {
        table: expected.identifier().clone(),
        name: "pk_orders".into(),
        if_exists: true,
    }));
}

// =============================================================================
// Round trip
// =============================================================================

#[test]
fn forward_then_rollback_restores_live_table() {
    assert_round_trip(&declared_orders(), &live_orders());
}

#[test]
fn round_trip_when_primary_key_column_is_dropped() {
    let mut b = Table::builder("line_items");
    b.column("order_id", "bigint").primary_key();
    b.column("line_no", "int").primary_key();
    b.column("sku", "text");
    b.index(["sku"]);
    let actual = b.build().unwrap();

    let mut b = Table::builder("line_items");
    b.column("order_id", "bigint").primary_key();
    b.column("sku", "varchar");
    let expected = b.build().unwrap();

    assert_round_trip(&expected, &actual);
}

#[test]
fn moving_the_primary_key_releases_the_old_key_column_first() {
    let mut b = Table::builder("vouchers");
    b.column("id", "int").primary_key();
    b.column("code", "text");
    let actual = b.build().unwrap();

    let mut b = Table::builder("vouchers");
    b.column("id", "int");
    b.column("code", "text").primary_key();
    let expected = b.build().unwrap();

    let delta = TableDelta::compare(&expected, Some(&actual));
    assert_eq!(delta.difference(), Difference::Alter);

    let forward = delta.forward_statements().unwrap();
    let drop_key = position(&forward, |s| matches!(s, Statement::DropPrimaryKey { .. }));
    let relax_id = position(
        &forward,
        |s| matches!(s, Statement::AlterColumn { to, .. } if to.name == "id"),
    );
    assert!(drop_key < relax_id);
    assert_eq!(
        forward
            .iter()
            .filter(|s| matches!(s, Statement::DropPrimaryKey { .. }))
            .count(),
        1
    );

    let rollback = delta.rollback_statements().unwrap();
    let drop_key = position(&rollback, |s| matches!(s, Statement::DropPrimaryKey { .. }));
    let relax_code = position(
        &rollback,
        |s| matches!(s, Statement::AlterColumn { to, .. } if to.name == "code"),
    );
    assert!(drop_key < relax_code);

    assert_round_trip(&expected, &actual);
}

#[test]
fn round_trip_for_a_new_table() {
    let expected = declared_orders();
    let delta = TableDelta::compare(&expected, None);
    let mut state = SchemaState::new();
    state
        .apply_all(&delta.forward_statements().unwrap())
        .unwrap();
    let created = state.table(expected.identifier()).unwrap().clone();
    assert_eq!(
        TableDelta::compare(&expected, Some(&created)).difference(),
        Difference::None
    );
    state
        .apply_all(&delta.rollback_statements().unwrap())
        .unwrap();
    assert!(state.table(expected.identifier()).is_none());
}

#[test]
fn round_trip_into_an_empty_table() {
    let actual = {
        let mut b = live_orders().to_builder();
        b.known_empty(true);
        b.build().unwrap()
    };
    let mut b = actual.to_builder();
    b.column("tenant_id", "bigint").not_null();
    let expected = b.build().unwrap();
    assert_round_trip(&expected, &actual);
}

// =============================================================================
// Identifiers
// =============================================================================

#[test]
fn derived_names_are_stable() {
    let build = || {
        let mut b = Table::builder("customer_subscription_renewal_events");
        b.column("customer_identifier", "bigint");
        b.column("renewal_window_start", "timestamptz");
        b.index(["customer_identifier", "renewal_window_start"]);
        b.max_identifier_length(40);
        b.build().unwrap()
    };
    let (first, second) = (build(), build());
    let a = first.indexes()[0].effective_name(&first);
    let b = second.indexes()[0].effective_name(&second);
    assert_eq!(a, b);
    assert_eq!(a.chars().count(), 40);
    assert_eq!(
        a,
        truncate_identifier(
            "ix_customer_subscription_renewal_events_customer_identifier_renewal_window_start",
            40
        )
    );

    let delta = TableDelta::compare(&first, Some(&second));
    assert_eq!(delta.difference(), Difference::None);
}
