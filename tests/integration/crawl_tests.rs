//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a small book catalog and run the full
//! crawl cycle end-to-end against it.

use bookshelf_crawl::config::{Config, CrawlerConfig, OutputConfig, UserAgentConfig};
use bookshelf_crawl::crawler::{crawl, publish_aggregate, Coordinator};
use bookshelf_crawl::output::{category_csv_path, load_records_from_dir, read_category_records, Stage};
use bookshelf_crawl::CrawlError;
use std::path::Path;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration rooted at the mock server
fn create_test_config(base_url: &str, dir: &Path) -> Config {
    Config {
        crawler: CrawlerConfig {
            root_url: format!("{}/index.html", base_url),
            max_concurrent_fetches: 4,
            concurrent_categories: 2,
            request_timeout_secs: 5,
            connect_timeout_secs: 2,
            follow_pagination: true,
            download_images: false,
            max_pages_per_category: 50,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        output: OutputConfig {
            data_dir: dir.join("data"),
            aggregate_path: dir.join("books_details_by_category.csv"),
            render_charts: true,
            charts_dir: dir.join("charts"),
        },
    }
}

async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

fn root_page(categories: &[(&str, &str)]) -> String {
    let items: String = categories
        .iter()
        .map(|(name, slug)| {
            format!(r#"<li><a href="catalogue/category/books/{slug}/index.html">{name}</a></li>"#)
        })
        .collect();
    format!(
        r#"<html><body>
        <div class="side_categories">
          <ul class="nav nav-list">
            <li><a href="catalogue/category/books_1/index.html">Books</a><ul>{items}</ul></li>
          </ul>
        </div>
        </body></html>"#
    )
}

fn listing_page(books: &[&str], next: Option<&str>) -> String {
    let items: String = books
        .iter()
        .map(|book| {
            format!(
                r#"<li><article class="product_pod"><h3><a href="../../../{book}/index.html">{book}</a></h3></article></li>"#
            )
        })
        .collect();
    let pager = next
        .map(|href| format!(r#"<ul class="pager"><li class="next"><a href="{href}">next</a></li></ul>"#))
        .unwrap_or_default();
    format!(r#"<html><body><ol class="row">{items}</ol>{pager}</body></html>"#)
}

fn detail_page(book: &str, category: &str, price: &str, rating: &str) -> String {
    format!(
        r#"<html><head><meta name="description" content="About {book}."></head><body>
        <ul class="breadcrumb">
          <li><a href="../../index.html">Home</a></li>
          <li><a href="../category/books_1/index.html">Books</a></li>
          <li><a href="../category/books/x/index.html">{category}</a></li>
          <li class="active">{book}</li>
        </ul>
        <div class="item active"><img src="../../media/{book}.jpg" alt="{book}"/></div>
        <h1>{book}</h1>
        <p class="star-rating {rating}"><i class="icon-star"></i></p>
        <table class="table table-striped">
          <tr><th>UPC</th><td>upc-{book}</td></tr>
          <tr><th>Product Type</th><td>Books</td></tr>
          <tr><th>Price (excl. tax)</th><td>£{price}</td></tr>
          <tr><th>Price (incl. tax)</th><td>£{price}</td></tr>
          <tr><th>Tax</th><td>£0.00</td></tr>
          <tr><th>Availability</th><td>In stock (7 available)</td></tr>
        </table>
        </body></html>"#
    )
}

/// Mounts a catalog with a two-page Travel category (2 + 1 books)
async fn mount_travel_catalog(server: &MockServer) {
    mount_page(server, "/index.html", root_page(&[("Travel", "travel_2")])).await;
    mount_page(
        server,
        "/catalogue/category/books/travel_2/index.html",
        listing_page(&["alpha_1", "beta_2"], Some("page-2.html")),
    )
    .await;
    mount_page(
        server,
        "/catalogue/category/books/travel_2/page-2.html",
        listing_page(&["gamma_3"], None),
    )
    .await;
    mount_page(
        server,
        "/catalogue/alpha_1/index.html",
        detail_page("alpha_1", "Travel", "10.00", "One"),
    )
    .await;
    mount_page(
        server,
        "/catalogue/beta_2/index.html",
        detail_page("beta_2", "Travel", "20.50", "Four"),
    )
    .await;
    mount_page(
        server,
        "/catalogue/gamma_3/index.html",
        detail_page("gamma_3", "Travel", "33.50", "Five"),
    )
    .await;
}

#[tokio::test]
async fn test_two_page_category_end_to_end() {
    let mock_server = MockServer::start().await;
    mount_travel_catalog(&mock_server).await;

    // The walk must stop after page 2
    Mock::given(method("GET"))
        .and(path("/catalogue/category/books/travel_2/page-3.html"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let tmp = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(&mock_server.uri(), tmp.path());

    let coordinator =
        Coordinator::new(config, CancellationToken::new()).expect("Failed to create coordinator");
    let report = coordinator.run().await.expect("Crawl failed");

    assert_eq!(report.categories_found, 1);
    assert_eq!(report.books_written, 3);
    assert!(report.is_clean());

    // Category CSV keeps listing order
    let csv_path = category_csv_path(&tmp.path().join("data"), "travel_2");
    let records = read_category_records(&csv_path).expect("Failed to read category CSV");
    let titles: Vec<_> = records.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["alpha_1", "beta_2", "gamma_3"]);
    assert_eq!(records[2].rating.value(), 5);
    assert_eq!(records[0].number_available, 7);
    assert_eq!(records[0].description, "About alpha_1.");
    assert_eq!(
        records[1].image_url,
        format!("{}/media/beta_2.jpg", mock_server.uri())
    );

    let raw = std::fs::read_to_string(&csv_path).unwrap();
    assert_eq!(raw.lines().count(), 4);

    // Aggregate: count 3, mean of 10.00, 20.50, 33.50
    let aggregate = std::fs::read_to_string(tmp.path().join("books_details_by_category.csv"))
        .expect("Aggregate not written");
    let mut lines = aggregate.lines();
    assert_eq!(lines.next(), Some("category,books_count,average_price"));
    let row: Vec<&str> = lines.next().unwrap().split(',').collect();
    assert_eq!(&row[..2], &["Travel", "3"]);
    let average: f64 = row[2].parse().unwrap();
    assert!((average - (10.00 + 20.50 + 33.50) / 3.0).abs() < 1e-9);
    assert!(lines.next().is_none());

    assert!(tmp.path().join("charts").join("circular_diagram.svg").exists());
    assert!(tmp.path().join("charts").join("histogram.svg").exists());
}

#[tokio::test]
async fn test_redirected_root_resolves_links_against_final_url() {
    let mock_server = MockServer::start().await;
    mount_travel_catalog(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/old/home.html"))
        .respond_with(
            ResponseTemplate::new(301)
                .insert_header("location", format!("{}/index.html", mock_server.uri()).as_str()),
        )
        .mount(&mock_server)
        .await;

    let tmp = TempDir::new().expect("Failed to create temp dir");
    let mut config = create_test_config(&mock_server.uri(), tmp.path());
    config.crawler.root_url = format!("{}/old/home.html", mock_server.uri());

    let coordinator =
        Coordinator::new(config, CancellationToken::new()).expect("Failed to create coordinator");
    let report = coordinator.run().await.expect("Crawl failed");

    // Category links are relative to /index.html, not /old/home.html
    assert_eq!(report.categories_found, 1);
    assert_eq!(report.categories_written, 1);
    assert_eq!(report.books_written, 3);
    assert!(report.failures.is_empty());
}

#[tokio::test]
async fn test_failing_detail_page_is_skipped() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/index.html", root_page(&[("Poetry", "poetry_23")])).await;
    mount_page(
        &mock_server,
        "/catalogue/category/books/poetry_23/index.html",
        listing_page(&["ok_1", "broken_2", "ok_3"], None),
    )
    .await;
    mount_page(
        &mock_server,
        "/catalogue/ok_1/index.html",
        detail_page("ok_1", "Poetry", "5.00", "Two"),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/catalogue/broken_2/index.html"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;
    mount_page(
        &mock_server,
        "/catalogue/ok_3/index.html",
        detail_page("ok_3", "Poetry", "7.00", "Three"),
    )
    .await;

    let tmp = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), tmp.path());
    let coordinator = Coordinator::new(config, CancellationToken::new()).unwrap();
    let report = coordinator.run().await.unwrap();

    assert_eq!(report.books_written, 2);
    assert_eq!(report.books_skipped, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].stage, Stage::Detail);
    assert!(report.failures[0].target.ends_with("/catalogue/broken_2/index.html"));
    assert!(report.failures[0].message.contains("500"));
    // A transport failure is not a structural failure
    assert!(report.is_clean());

    let records =
        read_category_records(&category_csv_path(&tmp.path().join("data"), "poetry_23")).unwrap();
    let titles: Vec<_> = records.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["ok_1", "ok_3"]);
}

#[tokio::test]
async fn test_unknown_rating_is_written_and_counted() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/index.html", root_page(&[("Art", "art_25")])).await;
    mount_page(
        &mock_server,
        "/catalogue/category/books/art_25/index.html",
        listing_page(&["odd_1"], None),
    )
    .await;
    mount_page(
        &mock_server,
        "/catalogue/odd_1/index.html",
        detail_page("odd_1", "Art", "12.00", "Six"),
    )
    .await;

    let tmp = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), tmp.path());
    let report = Coordinator::new(config, CancellationToken::new())
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.books_written, 1);
    assert_eq!(report.unrated_books, 1);

    let raw =
        std::fs::read_to_string(category_csv_path(&tmp.path().join("data"), "art_25")).unwrap();
    assert!(raw.lines().nth(1).unwrap().contains(",Art,0,"));
}

#[tokio::test]
async fn test_missing_navigation_is_structural_failure() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        "/index.html",
        "<html><body><h1>Down for maintenance</h1></body></html>".to_string(),
    )
    .await;

    let tmp = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), tmp.path());
    let err = Coordinator::new(config, CancellationToken::new())
        .unwrap()
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, CrawlError::Structure(_)));
    assert!(err.is_structural());
}

#[tokio::test]
async fn test_unreachable_root_is_fetch_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/index.html"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let tmp = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), tmp.path());
    let err = crawl(config, CancellationToken::new()).await.unwrap_err();

    match err {
        CrawlError::Fetch(e) => assert!(e.url.ends_with("/index.html")),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_images_are_downloaded_per_category() {
    let mock_server = MockServer::start().await;
    mount_travel_catalog(&mock_server).await;
    for book in ["alpha_1", "beta_2", "gamma_3"] {
        Mock::given(method("GET"))
            .and(path(format!("/media/{book}.jpg")))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(book.as_bytes().to_vec()))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let tmp = TempDir::new().unwrap();
    let mut config = create_test_config(&mock_server.uri(), tmp.path());
    config.crawler.download_images = true;

    let report = Coordinator::new(config, CancellationToken::new())
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.images_saved, 3);
    assert_eq!(report.images_failed, 0);

    let image_dir = tmp.path().join("data").join("travel_2").join("images");
    let mut names: Vec<String> = std::fs::read_dir(&image_dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names.len(), 3);
    for name in &names {
        assert!(name.starts_with("travel_2_"), "bad image name {name}");
        assert!(name.ends_with(".png"), "bad image name {name}");
    }
}

#[tokio::test]
async fn test_pagination_disabled_reads_first_page_only() {
    let mock_server = MockServer::start().await;
    mount_travel_catalog(&mock_server).await;

    let tmp = TempDir::new().unwrap();
    let mut config = create_test_config(&mock_server.uri(), tmp.path());
    config.crawler.follow_pagination = false;
    config.crawler.max_concurrent_fetches = 1;

    let report = Coordinator::new(config, CancellationToken::new())
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.books_written, 2);
}

#[tokio::test]
async fn test_aggregate_rebuilt_from_disk_matches_crawl() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        "/index.html",
        root_page(&[("Travel", "travel_2"), ("Poetry", "poetry_23")]),
    )
    .await;
    mount_page(
        &mock_server,
        "/catalogue/category/books/travel_2/index.html",
        listing_page(&["t_1", "t_2"], None),
    )
    .await;
    mount_page(
        &mock_server,
        "/catalogue/category/books/poetry_23/index.html",
        listing_page(&["p_1"], None),
    )
    .await;
    mount_page(
        &mock_server,
        "/catalogue/t_1/index.html",
        detail_page("t_1", "Travel", "11.00", "One"),
    )
    .await;
    mount_page(
        &mock_server,
        "/catalogue/t_2/index.html",
        detail_page("t_2", "Travel", "13.00", "One"),
    )
    .await;
    mount_page(
        &mock_server,
        "/catalogue/p_1/index.html",
        detail_page("p_1", "Poetry", "2.25", "One"),
    )
    .await;

    let tmp = TempDir::new().unwrap();
    let config = create_test_config(&mock_server.uri(), tmp.path());
    let output = config.output.clone();
    Coordinator::new(config, CancellationToken::new())
        .unwrap()
        .run()
        .await
        .unwrap();
    let from_crawl = std::fs::read_to_string(&output.aggregate_path).unwrap();

    std::fs::remove_file(&output.aggregate_path).unwrap();
    let records = load_records_from_dir(&output.data_dir).unwrap();
    assert_eq!(records.len(), 3);
    publish_aggregate(&output, &records).unwrap();
    let from_disk = std::fs::read_to_string(&output.aggregate_path).unwrap();

    assert_eq!(from_crawl, from_disk);
    assert_eq!(
        from_disk,
        "category,books_count,average_price\nPoetry,1,2.25\nTravel,2,12\n"
    );
}
