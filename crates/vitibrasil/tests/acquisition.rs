//! End-to-end acquisition scenarios against a fake upstream.
//!
//! The upstream is a wiremock server serving VitiBrasil-shaped pages; the
//! store is a real SQLite file in a temp directory.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vitibrasil::*;

// ─────────────────────── helpers ───────────────────────

fn page(header: &[&str], rows: &[&[&str]]) -> String {
    let mut html = String::from(
        "<html><body><table class=\"tb_base tb_header\"><tr><td>nav</td></tr></table>\
         <table class=\"tb_base tb_dados\"><thead><tr>",
    );
    for h in header {
        html.push_str(&format!("<th>{h}</th>"));
    }
    html.push_str("</tr></thead><tbody>");
    for row in rows {
        html.push_str("<tr>");
        for cell in *row {
            html.push_str(&format!("<td>{cell}</td>"));
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table></body></html>");
    html
}

fn production_page() -> String {
    page(
        &["Produto", "Quantidade (L.)"],
        &[
            &["VINHO DE MESA", "169.762.429"],
            &["Tinto", "139.320.884"],
            &["Rosado", "-"],
        ],
    )
}

fn import_page() -> String {
    page(
        &["Países", "Quantidade (Kg)", "Valor (US$)"],
        &[
            &["Argentina", "4.350.720", "11.540.310"],
            &["", "12", "34"],
            &["Chile", "nan", "2.001"],
        ],
    )
}

struct Fixture {
    _dir: TempDir,
    server: MockServer,
    store: Arc<SqliteStore>,
    pipeline: AcquisitionPipeline,
}

async fn fixture() -> Fixture {
    fixture_with_timeout(DEFAULT_TIMEOUT).await
}

async fn fixture_with_timeout(timeout: Duration) -> Fixture {
    let dir = TempDir::new().unwrap();
    let server = MockServer::start().await;
    let store = Arc::new(SqliteStore::open(&dir.path().join("vitibrasil.db")).unwrap());
    let resolver = TableAddressResolver::new(format!("{}/index.php", server.uri()));
    let source = Arc::new(HttpTableSource::new(timeout).unwrap());
    let pipeline = AcquisitionPipeline::new(resolver, source, store.clone());
    Fixture {
        _dir: dir,
        server,
        store,
        pipeline,
    }
}

// ─────────────────────── scenarios ───────────────────────

#[tokio::test]
async fn test_miss_fetches_once_then_serves_from_store() {
    let f = fixture().await;
    Mock::given(method("GET"))
        .and(path("/index.php"))
        .and(query_param("opcao", "opt_02"))
        .and(query_param("ano", "2023"))
        .respond_with(ResponseTemplate::new(200).set_body_string(production_page()))
        .expect(1)
        .mount(&f.server)
        .await;

    let first = f
        .pipeline
        .acquire(Category::Production, None, Some(2023), false)
        .await
        .unwrap();
    assert_eq!(first.len(), 3);
    assert_eq!(first[0].label(), "VINHO DE MESA");
    assert_eq!(first[0].quantity(), Some(169_762_429));
    assert_eq!(first[2].quantity(), None);

    let key = f
        .pipeline
        .resolver()
        .resolve_category(Category::Production, None, Some(2023))
        .unwrap()
        .key;
    assert!(f.store.has(&key).unwrap());

    let second = f
        .pipeline
        .acquire(Category::Production, None, Some(2023), false)
        .await
        .unwrap();
    assert_eq!(first, second);

    f.server.verify().await;
}

#[tokio::test]
async fn test_forced_refresh_overwrites_stale_copy() {
    let f = fixture().await;
    let key = f
        .pipeline
        .resolver()
        .resolve_category(Category::Production, None, None)
        .unwrap()
        .key;
    let stale = vec![TypedRecord::from_parts(
        Category::Production,
        "VINHO ANTIGO".into(),
        Some(1),
        None,
    )];
    f.store.save(&key, &stale, 0).unwrap();

    Mock::given(method("GET"))
        .and(path("/index.php"))
        .and(query_param("opcao", "opt_02"))
        .respond_with(ResponseTemplate::new(200).set_body_string(production_page()))
        .expect(1)
        .mount(&f.server)
        .await;

    let fresh = f
        .pipeline
        .acquire_detailed(Category::Production, None, None, true)
        .await
        .unwrap();
    assert_eq!(fresh.origin, Origin::Remote);
    assert_ne!(fresh.records, stale);
    assert_eq!(f.store.load(&key).unwrap().records, fresh.records);

    f.server.verify().await;
}

#[tokio::test]
async fn test_upstream_500_without_local_copy_is_unavailable() {
    let f = fixture().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&f.server)
        .await;

    let err = f
        .pipeline
        .acquire(Category::Commercialization, None, Some(2001), false)
        .await
        .unwrap_err();
    assert_eq!(err.failure_mode(), Some(FailureMode::Unavailable));
    assert_eq!(err.to_string(), "Acquisition failed (unavailable)");

    let key = f
        .pipeline
        .resolver()
        .resolve_category(Category::Commercialization, None, Some(2001))
        .unwrap()
        .key;
    assert!(!f.store.has(&key).unwrap());
}

#[tokio::test]
async fn test_slow_upstream_times_out_as_unavailable() {
    let f = fixture_with_timeout(Duration::from_millis(300)).await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(production_page())
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&f.server)
        .await;

    let err = f
        .pipeline
        .acquire(Category::Production, None, Some(1999), false)
        .await
        .unwrap_err();
    assert_eq!(err.failure_mode(), Some(FailureMode::Unavailable));
    let cause = std::error::Error::source(&err).unwrap();
    assert!(
        cause.to_string().starts_with("Upstream unreachable"),
        "unexpected cause: {cause}"
    );

    let key = f
        .pipeline
        .resolver()
        .resolve_category(Category::Production, None, Some(1999))
        .unwrap()
        .key;
    assert!(!f.store.has(&key).unwrap());
}

#[tokio::test]
async fn test_local_read_proceeds_while_other_key_is_fetching() {
    let f = fixture().await;
    Mock::given(method("GET"))
        .and(query_param("opcao", "opt_02"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(production_page())
                .set_delay(Duration::from_millis(800)),
        )
        .mount(&f.server)
        .await;

    let stored_key = f
        .pipeline
        .resolver()
        .resolve_category(Category::Export, Some("Suco de uva"), Some(2012))
        .unwrap()
        .key;
    let stored = vec![TypedRecord::from_parts(
        Category::Export,
        "Japão".into(),
        Some(7),
        Some(70),
    )];
    f.store.save(&stored_key, &stored, 0).unwrap();

    let slow = f
        .pipeline
        .acquire_detailed(Category::Production, None, Some(2012), false);
    let fast = tokio::time::timeout(
        Duration::from_millis(400),
        f.pipeline
            .acquire_detailed(Category::Export, Some("Suco de uva"), Some(2012), false),
    );
    let (slow, fast) = tokio::join!(slow, fast);

    let fast = fast.expect("local read waited on the remote fetch").unwrap();
    assert_eq!(fast.origin, Origin::Local);
    assert_eq!(fast.records, stored);
    assert_eq!(slow.unwrap().origin, Origin::Remote);
}

#[tokio::test]
async fn test_forced_failure_does_not_fall_back_to_local() {
    let f = fixture().await;
    let key = f
        .pipeline
        .resolver()
        .resolve_category(Category::Export, Some("Espumantes"), Some(2015))
        .unwrap()
        .key;
    let stored = vec![TypedRecord::from_parts(
        Category::Export,
        "Paraguai".into(),
        Some(10),
        Some(20),
    )];
    f.store.save(&key, &stored, 0).unwrap();

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&f.server)
        .await;

    let err = f
        .pipeline
        .acquire(Category::Export, Some("Espumantes"), Some(2015), true)
        .await
        .unwrap_err();
    assert_eq!(err.failure_mode(), Some(FailureMode::Forced));
    assert_eq!(f.store.load(&key).unwrap().records, stored);
}

#[tokio::test]
async fn test_missing_table_marker_is_unavailable() {
    let f = fixture().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("<html><table><tr><td>x</td></tr></table></html>"),
        )
        .mount(&f.server)
        .await;

    let err = f
        .pipeline
        .acquire(Category::Processing, Some("Viníferas"), None, false)
        .await
        .unwrap_err();
    assert!(err.is_unavailable());
}

#[tokio::test]
async fn test_rejected_rows_are_counted_and_skipped() {
    let f = fixture().await;
    Mock::given(method("GET"))
        .and(query_param("opcao", "opt_05"))
        .and(query_param("subopcao", "subopt_01"))
        .respond_with(ResponseTemplate::new(200).set_body_string(import_page()))
        .mount(&f.server)
        .await;

    let acquisition = f
        .pipeline
        .acquire_detailed(Category::Import, Some("Vinhos de mesa"), None, false)
        .await
        .unwrap();
    assert_eq!(acquisition.rejected, 1);
    assert_eq!(acquisition.records.len(), 2);
    assert_eq!(acquisition.records[1].label(), "Chile");
    assert_eq!(acquisition.records[1].quantity(), None);
    assert_eq!(acquisition.records[1].value(), Some(2001));

    // The stored copy remembers how many rows were dropped.
    let local = f
        .pipeline
        .acquire_detailed(Category::Import, Some("Vinhos de mesa"), None, false)
        .await
        .unwrap();
    assert_eq!(local.origin, Origin::Local);
    assert_eq!(local.rejected, 1);
}

#[tokio::test]
async fn test_invalid_sub_table_never_reaches_upstream() {
    let f = fixture().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(production_page()))
        .expect(0)
        .mount(&f.server)
        .await;

    let err = f
        .pipeline
        .acquire(Category::Commercialization, Some("Espumantes"), None, true)
        .await
        .unwrap_err();
    assert!(err.is_caller_error());

    f.server.verify().await;
}
