mod common;

use common::mock_connection;
use dbal::error::codes;
use dbal::{DatabaseBackend, Error, SelectQuery, SqlValue};

#[test]
fn test_select_renders_all_clauses_in_order() {
    let (mut db, _driver, _) = mock_connection(DatabaseBackend::MySQL);
    let sql = db
        .create_select_query()
        .unwrap()
        .select(["f"])
        .from(["t"])
        .where_("id=1")
        .unwrap()
        .group_by(["id"])
        .order_by("id", "ASC")
        .unwrap()
        .limit(5, 2)
        .get_sql()
        .unwrap();
    assert_eq!(
        sql,
        "SELECT f FROM t WHERE id=1 GROUP BY id ORDER BY id ASC LIMIT 5 OFFSET 2"
    );
}

#[test]
fn test_select_where_fragments_are_and_combined() {
    let (mut db, _driver, _) = mock_connection(DatabaseBackend::MySQL);
    let query = db.create_select_query().unwrap();
    let expr = query.expr();
    let sql = query
        .select(["uid", "title"])
        .from(["pages"])
        .where_([expr.equals("pid", 1), expr.is_null("endtime")])
        .unwrap()
        .where_(vec!["", "hidden = 0"])
        .unwrap()
        .get_sql()
        .unwrap();
    assert_eq!(
        sql,
        "SELECT uid, title FROM pages WHERE (pid = 1) AND (endtime IS NULL) AND (hidden = 0)"
    );
}

#[test]
fn test_select_distinct_join_having() {
    let (mut db, _driver, _) = mock_connection(DatabaseBackend::SQLite);
    let sql = db
        .create_select_query()
        .unwrap()
        .select_distinct(["p.pid", SelectQuery::alias("COUNT(*)", "cnt").as_str()])
        .from(["pages p"])
        .left_join("tt_content c", "c.pid = p.uid")
        .group_by(["p.pid"])
        .having("COUNT(*) > 1")
        .unwrap()
        .get_sql()
        .unwrap();
    assert_eq!(
        sql,
        "SELECT DISTINCT p.pid, COUNT(*) AS cnt FROM pages p LEFT JOIN tt_content c ON c.pid = p.uid GROUP BY p.pid HAVING COUNT(*) > 1"
    );
}

#[test]
fn test_select_missing_parts_fail_at_render_time() {
    let (mut db, _driver, _) = mock_connection(DatabaseBackend::MySQL);

    let err = db.create_select_query().unwrap().from(["t"]).get_sql().unwrap_err();
    assert!(matches!(err, Error::InvalidQuery { .. }));
    assert_eq!(err.code(), Some(codes::MISSING_SELECT));

    let err = db.create_select_query().unwrap().select(["*"]).get_sql().unwrap_err();
    assert_eq!(err.code(), Some(codes::MISSING_FROM));
}

#[test]
fn test_select_blank_parts_count_as_missing() {
    let (mut db, _driver, _) = mock_connection(DatabaseBackend::MySQL);

    let err = db
        .create_select_query()
        .unwrap()
        .select([""])
        .from(["pages"])
        .get_sql()
        .unwrap_err();
    assert_eq!(err.code(), Some(codes::MISSING_SELECT));

    let err = db
        .create_select_query()
        .unwrap()
        .select(["uid"])
        .from(["  "])
        .get_sql()
        .unwrap_err();
    assert_eq!(err.code(), Some(codes::MISSING_FROM));

    let sql = db
        .create_select_query()
        .unwrap()
        .select(["uid", " "])
        .from(["", "pages"])
        .get_sql()
        .unwrap();
    assert_eq!(sql, "SELECT uid FROM pages");
}

#[test]
fn test_select_raw_order_expression() {
    let (mut db, _driver, _) = mock_connection(DatabaseBackend::Postgres);
    let sql = db
        .create_select_query()
        .unwrap()
        .select(["uid"])
        .from(["pages"])
        .order_by_raw("title DESC NULLS LAST")
        .order_by("uid", "asc")
        .unwrap()
        .get_sql()
        .unwrap();
    assert_eq!(sql, "SELECT uid FROM pages ORDER BY title DESC NULLS LAST, uid ASC");
}

#[test]
fn test_select_rejects_invalid_direction_and_empty_where() {
    let (mut db, _driver, _) = mock_connection(DatabaseBackend::MySQL);

    let err = db
        .create_select_query()
        .unwrap()
        .order_by("uid", "SIDEWAYS")
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument { .. }));
    assert_eq!(err.code(), Some(codes::INVALID_ORDER_DIRECTION));

    let err = db
        .create_select_query()
        .unwrap()
        .where_(vec!["", "  "])
        .unwrap_err();
    assert_eq!(err.code(), Some(codes::EMPTY_WHERE_CLAUSE));
}

#[test]
fn test_select_offset_without_limit_per_platform() {
    let (mut db, _driver, _) = mock_connection(DatabaseBackend::MySQL);
    let sql = db
        .create_select_query()
        .unwrap()
        .select(["*"])
        .from(["t"])
        .offset(5)
        .get_sql()
        .unwrap();
    assert_eq!(sql, "SELECT * FROM t LIMIT 18446744073709551615 OFFSET 5");

    let (mut db, _driver, _) = mock_connection(DatabaseBackend::SQLite);
    let sql = db
        .create_select_query()
        .unwrap()
        .select(["*"])
        .from(["t"])
        .offset(5)
        .get_sql()
        .unwrap();
    assert_eq!(sql, "SELECT * FROM t LIMIT -1 OFFSET 5");
}

#[test]
fn test_select_rendering_reflects_later_mutation() {
    let (mut db, _driver, _) = mock_connection(DatabaseBackend::MySQL);
    let query = db.create_select_query().unwrap().select(["*"]).from(["t"]);
    assert_eq!(query.get_sql().unwrap(), "SELECT * FROM t");

    let query = query.where_("uid = 3").unwrap();
    assert_eq!(query.get_sql().unwrap(), "SELECT * FROM t WHERE uid = 3");
}

#[test]
fn test_select_execute_dispatches_rendered_sql() {
    let (mut db, driver, _) = mock_connection(DatabaseBackend::MySQL);
    driver.respond(
        "SELECT uid FROM pages",
        vec![common::row(&[("uid", 1.into())]), common::row(&[("uid", 2.into())])],
    );

    let mut stmt = db
        .create_select_query()
        .unwrap()
        .select(["uid"])
        .from(["pages"])
        .execute()
        .unwrap();
    assert_eq!(stmt.row_count(), 2);
    assert_eq!(stmt.fetch().unwrap()["uid"], SqlValue::Int(1));
    assert_eq!(driver.last_executed().as_deref(), Some("SELECT uid FROM pages"));
}

#[test]
fn test_insert_single_and_multiple_rows() {
    let (mut db, _driver, _) = mock_connection(DatabaseBackend::MySQL);
    let sql = db
        .create_insert_query()
        .unwrap()
        .into("t")
        .values([("f", "Foo")])
        .get_sql()
        .unwrap();
    assert_eq!(sql, "INSERT INTO t (f) VALUES ('Foo')");

    let sql = db
        .create_insert_query()
        .unwrap()
        .into("t")
        .columns(["f1", "f2"])
        .add_row([SqlValue::from("Foo"), SqlValue::from(100)])
        .unwrap()
        .add_row([SqlValue::from("Bar"), SqlValue::from(200)])
        .unwrap()
        .get_sql()
        .unwrap();
    assert_eq!(sql, "INSERT INTO t (f1, f2) VALUES ('Foo', '100'), ('Bar', '200')");
}

#[test]
fn test_insert_no_quote_fields_and_nulls() {
    let (mut db, _driver, _) = mock_connection(DatabaseBackend::MySQL);
    let sql = db
        .create_insert_query()
        .unwrap()
        .into("pages")
        .values([
            ("title", SqlValue::from("It's")),
            ("crdate", SqlValue::from("UNIX_TIMESTAMP()")),
            ("endtime", SqlValue::Null),
        ])
        .no_quote_fields(["crdate"])
        .get_sql()
        .unwrap();
    assert_eq!(
        sql,
        "INSERT INTO pages (title, crdate, endtime) VALUES ('It\\'s', UNIX_TIMESTAMP(), NULL)"
    );
}

#[test]
fn test_insert_errors() {
    let (mut db, _driver, _) = mock_connection(DatabaseBackend::MySQL);

    let err = db
        .create_insert_query()
        .unwrap()
        .into("t")
        .columns(["a", "b"])
        .add_row([1])
        .unwrap_err();
    assert_eq!(err.code(), Some(codes::MISMATCHED_VALUES));

    let err = db.create_insert_query().unwrap().into("t").get_sql().unwrap_err();
    assert_eq!(err.code(), Some(codes::MISSING_VALUES));

    let err = db
        .create_insert_query()
        .unwrap()
        .values([("a", 1)])
        .get_sql()
        .unwrap_err();
    assert_eq!(err.code(), Some(codes::MISSING_TABLE));
}

#[test]
fn test_insert_execute_returns_affected_rows() {
    let (mut db, driver, _) = mock_connection(DatabaseBackend::MySQL);
    driver.set_affected(1);
    let inserted = db
        .create_insert_query()
        .unwrap()
        .into("t")
        .values([("f", "Foo")])
        .execute()
        .unwrap();
    assert_eq!(inserted, 1);
    assert_eq!(db.affected_rows(), 1);
    assert_eq!(
        driver.last_executed().as_deref(),
        Some("INSERT INTO t (f) VALUES ('Foo')")
    );
}

#[test]
fn test_update_rejects_empty_or_numeric_table() {
    let (mut db, _driver, _) = mock_connection(DatabaseBackend::MySQL);
    for table in ["", "  ", "0", "123"] {
        let err = db
            .create_update_query()
            .unwrap()
            .update(table)
            .set("a", 1)
            .get_sql()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidQuery { .. }), "table {:?}", table);
        assert_eq!(err.code(), Some(codes::MISSING_TABLE));
    }

    let err = db
        .create_update_query()
        .unwrap()
        .update("pages")
        .get_sql()
        .unwrap_err();
    assert_eq!(err.code(), Some(codes::MISSING_VALUES));
}

#[test]
fn test_update_without_where_is_full_table() {
    let (mut db, _driver, _) = mock_connection(DatabaseBackend::MySQL);
    let sql = db
        .create_update_query()
        .unwrap()
        .update("t")
        .set("a", "x")
        .get_sql()
        .unwrap();
    assert_eq!(sql, "UPDATE t SET a = 'x'");
}

#[test]
fn test_update_parallel_lists_raw_values_and_where() {
    let (mut db, _driver, _) = mock_connection(DatabaseBackend::Postgres);
    let sql = db
        .create_update_query()
        .unwrap()
        .update("pages")
        .set_all(["title", "hidden"], [SqlValue::from("Home"), SqlValue::from(false)])
        .unwrap()
        .set_raw("hits", "hits + 1")
        .where_("uid = 7")
        .unwrap()
        .get_sql()
        .unwrap();
    assert_eq!(
        sql,
        "UPDATE pages SET title = 'Home', hidden = '0', hits = hits + 1 WHERE uid = 7"
    );

    let err = db
        .create_update_query()
        .unwrap()
        .update("pages")
        .set_all(["a", "b"], [1])
        .unwrap_err();
    assert_eq!(err.code(), Some(codes::MISMATCHED_VALUES));
}

#[test]
fn test_delete_without_where_is_full_table() {
    let (mut db, driver, _) = mock_connection(DatabaseBackend::MySQL);
    let query = db.create_delete_query().unwrap().delete("t", None);
    assert_eq!(query.get_sql().unwrap(), "DELETE FROM t");

    driver.set_affected(42);
    assert_eq!(query.execute().unwrap(), 42);
}

#[test]
fn test_delete_with_alias_and_where() {
    let (mut db, _driver, _) = mock_connection(DatabaseBackend::MySQL);
    let query = db.create_delete_query().unwrap();
    let expr = query.expr();
    let sql = query
        .delete("sys_log", Some("l"))
        .where_(expr.less_than("l.tstamp", 1000))
        .unwrap()
        .get_sql()
        .unwrap();
    assert_eq!(sql, "DELETE FROM sys_log l WHERE l.tstamp < 1000");

    let err = db.create_delete_query().unwrap().get_sql().unwrap_err();
    assert_eq!(err.code(), Some(codes::MISSING_TABLE));
}

#[test]
fn test_truncate_is_platform_specific() {
    let cases = [
        (DatabaseBackend::MySQL, "TRUNCATE TABLE cache"),
        (DatabaseBackend::Postgres, "TRUNCATE cache"),
        (DatabaseBackend::SQLite, "DELETE FROM cache"),
    ];
    for (backend, expected) in cases {
        let (mut db, _driver, _) = mock_connection(backend);
        let sql = db
            .create_truncate_query()
            .unwrap()
            .truncate("cache")
            .get_sql()
            .unwrap();
        assert_eq!(sql, expected);
        assert_eq!(db.truncate_sql("cache").unwrap(), expected);
    }

    let (mut db, driver, _) = mock_connection(DatabaseBackend::MySQL);
    let err = db.create_truncate_query().unwrap().get_sql().unwrap_err();
    assert_eq!(err.code(), Some(codes::MISSING_TABLE));

    db.create_truncate_query()
        .unwrap()
        .truncate("cache")
        .execute()
        .unwrap();
    assert_eq!(driver.last_executed().as_deref(), Some("TRUNCATE TABLE cache"));
}

#[test]
fn test_factories_fail_when_connection_is_refused() {
    let (mut db, driver, _) = mock_connection(DatabaseBackend::MySQL);
    driver.refuse_connections();
    let err = db.create_select_query().unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(err.code(), Some(codes::CONNECTION_REJECTED));
}

#[test]
fn test_prepared_statement_positional_binding() {
    let (mut db, driver, _) = mock_connection(DatabaseBackend::Postgres);
    driver.respond("SELECT title", vec![common::row(&[("title", "Home".into())])]);

    let mut stmt = db
        .prepare("SELECT title FROM pages WHERE uid = ? AND pid = ?")
        .unwrap();
    assert_eq!(stmt.sql(), "SELECT title FROM pages WHERE uid = $1 AND pid = $2");
    assert_eq!(stmt.parameter_count(), 2);

    stmt.bind_value(1, 7).unwrap();
    let err = stmt.execute().unwrap_err();
    assert_eq!(err.code(), Some(codes::UNKNOWN_PARAMETER));

    stmt.bind_value(2, 0).unwrap();
    stmt.execute().unwrap();
    assert_eq!(stmt.fetch().unwrap()["title"], SqlValue::from("Home"));
    assert_eq!(stmt.row_count(), 1);
    stmt.free();
    assert!(stmt.fetch().is_none());

    assert!(stmt.bind_value(3, 1).is_err());
    assert!(stmt.bind_value(0, 1).is_err());
    drop(stmt);

    let prepared = driver.state().prepared.clone();
    assert_eq!(prepared.len(), 1);
    assert_eq!(prepared[0].1, vec![SqlValue::Int(7), SqlValue::Int(0)]);
}

#[test]
fn test_prepared_statement_named_binding() {
    let (mut db, driver, _) = mock_connection(DatabaseBackend::MySQL);
    let mut stmt = db
        .prepare("UPDATE pages SET hidden = :hidden WHERE pid = :pid OR uid = :pid")
        .unwrap();
    assert_eq!(stmt.sql(), "UPDATE pages SET hidden = ? WHERE pid = ? OR uid = ?");

    stmt.bind_named(":hidden", true).unwrap();
    stmt.bind_named("pid", 3).unwrap();
    assert!(stmt.bind_named("missing", 1).is_err());
    stmt.execute().unwrap();
    drop(stmt);

    let prepared = driver.state().prepared.clone();
    assert_eq!(
        prepared[0].1,
        vec![SqlValue::Bool(true), SqlValue::Int(3), SqlValue::Int(3)]
    );
}
