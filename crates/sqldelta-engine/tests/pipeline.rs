//! End-to-end pipeline tests: snapshots in, script out.

use std::collections::HashSet;

use sqldelta_engine::prelude::*;
use sqldelta_model::prelude::*;

fn table_id(name: &str) -> ObjectId {
    ObjectId::new(ObjectKind::Table, QualifiedName::qualified("public", name))
}

fn statement_index(script: &Script, needle: &str) -> usize {
    script
        .statements()
        .iter()
        .position(|s| s.contains(needle))
        .unwrap_or_else(|| panic!("no statement containing {:?}", needle))
}

fn users_table() -> Statement {
    Statement::table("public", "users", TableDef::new())
        .child(Statement::column("public", "users", "id", ColumnDef::new("bigint").identity()))
        .child(Statement::constraint(
            "public",
            "users",
            "users_pkey",
            ConstraintDef::primary_key(vec!["id".into()]),
        ))
}

#[test]
fn diffing_a_snapshot_against_itself_is_empty() {
    let snap = Snapshot::new().with(
        Statement::schema("public")
            .child(users_table())
            .child(Statement::view("public", "v", ViewDef::new("SELECT * FROM users"))),
    );
    let script = diff_snapshots(&snap, &snap, &Settings::new(), &IgnoreList::new()).unwrap();
    assert!(script.is_empty(), "expected empty script, got {:?}", script.entries());
}

#[test]
fn adding_a_column_is_one_additive_alter() {
    let old = Snapshot::new().with(
        Statement::schema("s").child(
            Statement::table("s", "t", TableDef::new())
                .child(Statement::column("s", "t", "id", ColumnDef::new("int"))),
        ),
    );
    let new = Snapshot::new().with(
        Statement::schema("s").child(
            Statement::table("s", "t", TableDef::new())
                .child(Statement::column("s", "t", "id", ColumnDef::new("int")))
                .child(Statement::column("s", "t", "name", ColumnDef::new("text"))),
        ),
    );

    let script = diff_snapshots(&old, &new, &Settings::new(), &IgnoreList::new()).unwrap();
    let stmts = script.statements();
    assert_eq!(stmts.len(), 1);
    assert_eq!(stmts[0], "ALTER TABLE \"s\".\"t\" ADD COLUMN \"name\" text");
    let sql = script.to_sql(DialectKind::Postgres.dialect());
    assert!(!sql.contains("DROP"));
    assert!(!sql.contains("CREATE TABLE"));
}

#[test]
fn dependent_view_drops_before_its_table() {
    let old = Snapshot::new().with(
        Statement::schema("public")
            .child(users_table())
            .child(
                Statement::view("public", "v", ViewDef::new("SELECT * FROM users"))
                    .depends_on(table_id("users")),
            ),
    );
    let new = Snapshot::new().with(Statement::schema("public"));

    let script = diff_snapshots(&old, &new, &Settings::new(), &IgnoreList::new()).unwrap();
    assert!(statement_index(&script, "DROP VIEW") < statement_index(&script, "DROP TABLE"));
    // The pulled-in drop is annotated with its root cause.
    let annotated = script.entries().iter().any(|e| {
        matches!(e, ScriptEntry::Comment(text)
            if text == "-- DEPCY: VIEW public.v depends on TABLE public.users")
    });
    assert!(annotated);
}

#[test]
fn creates_order_dependencies_first() {
    let old = Snapshot::new();
    let new = Snapshot::new().with(
        Statement::schema("app")
            .child(
                Statement::table("app", "t", TableDef::new())
                    .child(Statement::column("app", "t", "id", ColumnDef::new("int"))),
            )
            .child(
                Statement::view("app", "v", ViewDef::new("SELECT * FROM t")).depends_on(
                    ObjectId::new(ObjectKind::Table, QualifiedName::qualified("app", "t")),
                ),
            ),
    );

    let script = diff_snapshots(&old, &new, &Settings::new(), &IgnoreList::new()).unwrap();
    let schema_pos = statement_index(&script, "CREATE SCHEMA");
    let table_pos = statement_index(&script, "CREATE TABLE");
    let view_pos = statement_index(&script, "CREATE VIEW");
    assert!(schema_pos < table_pos);
    assert!(table_pos < view_pos);
}

#[test]
fn mutually_referencing_tables_defer_their_foreign_keys() {
    let a = Statement::table("public", "a", TableDef::new())
        .child(Statement::column("public", "a", "id", ColumnDef::new("bigint")))
        .child(Statement::column("public", "a", "b_id", ColumnDef::new("bigint")))
        .child(Statement::constraint(
            "public",
            "a",
            "a_b_fk",
            ConstraintDef::foreign_key(
                vec!["b_id".into()],
                QualifiedName::qualified("public", "b"),
                vec!["id".into()],
            ),
        ));
    let b = Statement::table("public", "b", TableDef::new())
        .child(Statement::column("public", "b", "id", ColumnDef::new("bigint")))
        .child(Statement::column("public", "b", "a_id", ColumnDef::new("bigint")))
        .child(Statement::constraint(
            "public",
            "b",
            "b_a_fk",
            ConstraintDef::foreign_key(
                vec!["a_id".into()],
                QualifiedName::qualified("public", "a"),
                vec!["id".into()],
            ),
        ));
    let old = Snapshot::new().with(Statement::schema("public"));
    let new = Snapshot::new().with(Statement::schema("public").child(a).child(b));

    let script = diff_snapshots(&old, &new, &Settings::new(), &IgnoreList::new()).unwrap();
    let a_pos = statement_index(&script, "CREATE TABLE \"public\".\"a\"");
    let b_pos = statement_index(&script, "CREATE TABLE \"public\".\"b\"");
    let fk_a = statement_index(&script, "\"a_b_fk\"");
    let fk_b = statement_index(&script, "\"b_a_fk\"");
    assert!(a_pos < fk_a && a_pos < fk_b);
    assert!(b_pos < fk_a && b_pos < fk_b);
}

#[test]
fn excluded_kinds_leave_markers_instead_of_statements() {
    let old = Snapshot::new().with(Statement::schema("public"));
    let new = Snapshot::new().with(
        Statement::schema("public")
            .child(users_table())
            .child(Statement::view("public", "v", ViewDef::new("SELECT 1"))),
    );
    let settings = Settings::new().allow_kinds([
        ObjectKind::Schema,
        ObjectKind::Table,
        ObjectKind::Column,
        ObjectKind::Constraint,
    ]);

    let script = diff_snapshots(&old, &new, &settings, &IgnoreList::new()).unwrap();
    assert!(!script.statements().iter().any(|s| s.contains("CREATE VIEW")));
    assert!(script.entries().iter().any(|e| {
        matches!(e, ScriptEntry::Comment(text) if text == "-- HIDDEN: CREATE VIEW public.v")
    }));
    // Allowed objects are unaffected.
    assert!(script.statements().iter().any(|s| s.contains("CREATE TABLE")));
}

#[test]
fn strict_mode_fails_on_excluded_kinds() {
    let old = Snapshot::new().with(Statement::schema("public"));
    let new = Snapshot::new().with(
        Statement::schema("public")
            .child(Statement::view("public", "v", ViewDef::new("SELECT 1"))),
    );
    let settings = Settings::new()
        .allow_kinds([ObjectKind::Schema, ObjectKind::Table])
        .stop_on_not_allowed();

    let err = diff_snapshots(&old, &new, &settings, &IgnoreList::new()).unwrap_err();
    assert!(matches!(err, EngineError::DisallowedObject { .. }));
}

#[test]
fn dependency_pulled_objects_stay_hidden_in_selected_only_mode() {
    let old = Snapshot::new().with(Statement::schema("public"));
    let new = Snapshot::new().with(
        Statement::schema("public")
            .child(Statement::table("public", "t", TableDef::new()))
            .child(
                Statement::view("public", "v", ViewDef::new("SELECT * FROM t"))
                    .depends_on(table_id("t")),
            ),
    );

    // The user selected only the view; the table is a byproduct.
    let view = ObjectId::new(ObjectKind::View, QualifiedName::qualified("public", "v"));
    let mut tree = DiffTree::build(&old, &new);
    assert!(tree.select(&view));
    let elements = tree.flatten(&FlattenOptions {
        selected_only: true,
        ..FlattenOptions::default()
    });
    let selection: HashSet<ObjectId> = elements.iter().map(|e| e.id.clone()).collect();

    let settings = Settings::new().selected_only();
    let dialect = settings.dialect.dialect();
    let resolver = Resolver::new(DepGraph::build(&old), DepGraph::build(&new));
    let actions = resolver
        .resolve(&elements, dialect, &CancellationToken::new())
        .unwrap();
    let script = Assembler::new(&old, &new, &settings, dialect)
        .assemble(&actions, &selection, &CancellationToken::new())
        .unwrap();

    assert_eq!(script.statement_count(), 1);
    assert!(script.statements()[0].contains("CREATE VIEW"));
    assert!(script.entries().iter().any(|e| {
        matches!(e, ScriptEntry::Comment(text) if text.starts_with("-- HIDDEN: CREATE TABLE"))
    }));
}

#[test]
fn data_movement_round_trip_copies_the_column_intersection() {
    // The storage options disappear, which cannot be altered in
    // place, so the table is recreated; one column is renamed along
    // the way.
    let old = Snapshot::new().with(
        Statement::schema("public").child(
            Statement::table("public", "t", TableDef::new().option("fillfactor=70"))
                .child(Statement::column("public", "t", "id", ColumnDef::new("bigint").identity()))
                .child(Statement::column("public", "t", "fullname", ColumnDef::new("text"))),
        ),
    );
    let new = Snapshot::new().with(
        Statement::schema("public").child(
            Statement::table("public", "t", TableDef::new())
                .child(Statement::column("public", "t", "id", ColumnDef::new("bigint").identity()))
                .child(Statement::column("public", "t", "full_name", ColumnDef::new("text"))),
        ),
    );
    let settings = Settings::new().data_movement();

    let script = diff_snapshots(&old, &new, &settings, &IgnoreList::new()).unwrap();
    let rename = statement_index(&script, "RENAME TO \"t_sqldelta_tmp\"");
    let create = statement_index(&script, "CREATE TABLE \"public\".\"t\"");
    let copy = statement_index(&script, "INSERT INTO \"public\".\"t\"");
    let drop_tmp = statement_index(&script, "DROP TABLE \"public\".\"t_sqldelta_tmp\"");
    assert!(rename < create && create < copy && copy < drop_tmp);

    // The copy touches only columns present on both sides.
    let copy_sql = script.statements()[copy];
    assert!(copy_sql.contains("\"id\""));
    assert!(!copy_sql.contains("fullname"));
    assert!(!copy_sql.contains("full_name"));

    // An identity column participated, so the sequence is reseeded.
    let reseed = statement_index(&script, "pg_get_serial_sequence");
    assert!(reseed > drop_tmp);
}

#[test]
fn sequence_ownership_lands_after_the_owning_table() {
    let old = Snapshot::new();
    let new = Snapshot::new().with(
        Statement::schema("public")
            .child(Statement::sequence(
                "public",
                "t_id_seq",
                SequenceDef::new()
                    .start(1)
                    .owned_by(QualifiedName::sub("public", "t", "id")),
            ))
            .child(
                Statement::table("public", "t", TableDef::new()).child(Statement::column(
                    "public",
                    "t",
                    "id",
                    ColumnDef::new("bigint"),
                )),
            ),
    );

    let script = diff_snapshots(&old, &new, &Settings::new(), &IgnoreList::new()).unwrap();
    let create_table = statement_index(&script, "CREATE TABLE");
    let owned_by = statement_index(&script, "OWNED BY");
    assert!(owned_by > create_table);
    assert!(!script.statements()[statement_index(&script, "CREATE SEQUENCE")].contains("OWNED BY"));
}

#[test]
fn unchanged_mssql_view_over_recreated_table_is_refreshed() {
    let view = Statement::view("dbo", "v", ViewDef::new("SELECT * FROM t")).depends_on(
        ObjectId::new(ObjectKind::Table, QualifiedName::qualified("dbo", "t")),
    );
    let old = Snapshot::new().with(
        Statement::schema("dbo")
            .child(Statement::table("dbo", "t", TableDef::new().option("compression")))
            .child(view.clone()),
    );
    let new = Snapshot::new().with(
        Statement::schema("dbo")
            .child(Statement::table("dbo", "t", TableDef::new()))
            .child(view),
    );
    let settings = Settings::new().dialect(DialectKind::MsSql);

    let script = diff_snapshots(&old, &new, &settings, &IgnoreList::new()).unwrap();
    let sql = script.to_sql(settings.dialect.dialect());
    assert!(sql.contains("EXEC sp_refreshview N'[dbo].[v]'"));
    assert!(!sql.contains("DROP VIEW"));
    assert!(!sql.contains("CREATE VIEW"));
}

#[test]
fn ignored_objects_never_reach_the_script() {
    let old = Snapshot::new().with(Statement::schema("public"));
    let new = Snapshot::new().with(
        Statement::schema("public")
            .child(Statement::table("public", "t", TableDef::new()))
            .child(Statement::table("public", "tmp_scratch", TableDef::new())),
    );
    let ignore = IgnoreList::new().rule(IgnoreRule::hide_regex("^tmp_.*").unwrap());

    let script = diff_snapshots(&old, &new, &Settings::new(), &ignore).unwrap();
    let sql = script.to_sql(DialectKind::Postgres.dialect());
    assert!(sql.contains("CREATE TABLE \"public\".\"t\""));
    assert!(!sql.contains("tmp_scratch"));
}

#[test]
fn transaction_wrapper_brackets_the_script() {
    let old = Snapshot::new();
    let new = Snapshot::new().with(Statement::schema("public"));
    let settings = Settings::new().with_transaction();

    let script = diff_snapshots(&old, &new, &settings, &IgnoreList::new()).unwrap();
    let stmts = script.statements();
    assert_eq!(stmts.first().copied(), Some("START TRANSACTION"));
    assert_eq!(stmts.last().copied(), Some("COMMIT TRANSACTION"));
}

#[test]
fn identical_inputs_produce_identical_scripts() {
    let old = Snapshot::new().with(
        Statement::schema("public")
            .child(users_table())
            .child(Statement::table("public", "gone", TableDef::new())),
    );
    let new = Snapshot::new().with(
        Statement::schema("public")
            .child(users_table())
            .child(Statement::table("public", "added_a", TableDef::new()))
            .child(Statement::table("public", "added_b", TableDef::new())),
    );

    let first = diff_snapshots(&old, &new, &Settings::new(), &IgnoreList::new())
        .unwrap()
        .to_sql(DialectKind::Postgres.dialect());
    let second = diff_snapshots(&old, &new, &Settings::new(), &IgnoreList::new())
        .unwrap()
        .to_sql(DialectKind::Postgres.dialect());
    assert_eq!(first, second);
}

#[test]
fn cancellation_yields_no_partial_script() {
    let old = Snapshot::new();
    let new = Snapshot::new().with(Statement::schema("public").child(users_table()));
    let token = CancellationToken::new();
    token.cancel();

    let result =
        diff_snapshots_cancellable(&old, &new, &Settings::new(), &IgnoreList::new(), &token);
    assert!(matches!(result, Err(EngineError::Cancelled)));
}
