use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dbal::database::adapters::sqlite::MEMORY_DATABASE;
use dbal::database::platforms::create_platform;
use dbal::database::quoting::Quoter;
use dbal::{ConnectionConfig, DatabaseBackend, DatabaseConnection, LegacyConnection};

fn memory_connection() -> DatabaseConnection {
    let config = ConnectionConfig::builder()
        .driver(DatabaseBackend::SQLite)
        .database_name(MEMORY_DATABASE)
        .build();
    let mut db = DatabaseConnection::new(config);
    db.connect().expect("in-memory SQLite must open");
    db
}

fn benchmark_select_rendering(c: &mut Criterion) {
    let mut db = memory_connection();

    c.bench_function("SelectQuery::get_sql", |b| {
        b.iter(|| {
            let query = db.create_select_query().unwrap();
            let expr = query.expr();
            let sql = query
                .select(["uid", "title", "pid"])
                .from(["pages"])
                .left_join("tt_content", "tt_content.pid = pages.uid")
                .where_([expr.equals("pages.deleted", 0), expr.in_("pages.doktype", &[1, 4, 254])])
                .unwrap()
                .order_by("sorting", "DESC")
                .unwrap()
                .limit(black_box(20), black_box(40))
                .get_sql()
                .unwrap();
            black_box(sql);
        })
    });
}

fn benchmark_legacy_select(c: &mut Criterion) {
    let mut db = LegacyConnection::new(memory_connection());

    c.bench_function("LegacyConnection::select_query", |b| {
        b.iter(|| {
            let sql = db
                .select_query(
                    black_box("uid, title"),
                    "pages",
                    "AND deleted = 0 AND hidden = 0",
                    "GROUP BY pid",
                    "ORDER BY sorting DESC, uid",
                    "10,20",
                )
                .unwrap();
            black_box(sql);
        })
    });
}

fn benchmark_insert_rendering(c: &mut Criterion) {
    let mut db = memory_connection();

    c.bench_function("InsertQuery::get_sql (10 rows)", |b| {
        b.iter(|| {
            let mut query = db
                .create_insert_query()
                .unwrap()
                .into("sys_log")
                .columns(["userid", "details", "tstamp"]);
            for i in 0..10 {
                query = query
                    .add_row([i.to_string(), format!("Entry {}", i), "1700000000".to_string()])
                    .unwrap();
            }
            black_box(query.get_sql().unwrap());
        })
    });
}

fn benchmark_quoting(c: &mut Criterion) {
    let mysql = Quoter::new(create_platform(DatabaseBackend::MySQL));
    let postgres = Quoter::new(create_platform(DatabaseBackend::Postgres));
    let input = "It's a \"quoted\" value with a \\ backslash and 100% wildcards";

    c.bench_function("Quoter::full_quote_str (MySQL)", |b| {
        b.iter(|| black_box(mysql.full_quote_str(black_box(input))))
    });

    c.bench_function("Quoter::full_quote_str (Postgres)", |b| {
        b.iter(|| black_box(postgres.full_quote_str(black_box(input))))
    });

    c.bench_function("Quoter::escape_str_for_like", |b| {
        b.iter(|| black_box(mysql.escape_str_for_like(black_box(input))))
    });
}

criterion_group!(
    benches,
    benchmark_select_rendering,
    benchmark_legacy_select,
    benchmark_insert_rendering,
    benchmark_quoting
);
criterion_main!(benches);
