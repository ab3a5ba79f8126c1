use pagewright::assets::StaticAssets;
use pagewright::middleware::{from_fn, Flow, PageRoute};
use pagewright::render::PageRenderer;
use pagewright::runtime_config::{RuntimeConfig, StaticConfigSource};
use pagewright::server::{self, AssetMount, FrontendService, ServerHandle};
use pagewright::static_files::StaticFiles;
use std::net::TcpListener;
use std::sync::Arc;

mod common;
use common::fixtures;
use common::http::{get, parse_response, send_request};
use common::test_server::setup_may_runtime;

fn start_service() -> ServerHandle {
    setup_may_runtime();
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let assets = StaticAssets::load(fixtures::dist(), "/").unwrap();
    let service = FrontendService::builder(PageRenderer::with_default_templates(Arc::new(assets)))
        .assets(AssetMount::new("/", StaticFiles::immutable(fixtures::dist())))
        .handler(from_fn(|ctx| {
            ctx.set_render_value("section", "shop");
            Ok(Flow::Next)
        }))
        .handler(PageRoute::exact("/", "home"))
        .handler(PageRoute::prefix("/admin/", "admin"))
        .build();

    let config = RuntimeConfig {
        port,
        ..RuntimeConfig::default()
    };
    let handle = server::start(&StaticConfigSource::new(&config), service).unwrap();
    handle.wait_ready().unwrap();
    handle
}

#[test]
fn test_health_over_http() {
    let handle = start_service();
    let (status, headers, body) = parse_response(&get(&handle.addr(), "/.kapeta/health"));
    handle.stop();

    assert_eq!(status, 200);
    assert_eq!(headers.get("content-type").unwrap(), "application/json");
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["ok"], true);
}

#[test]
fn test_page_and_assets_over_http() {
    let handle = start_service();
    let addr = handle.addr();

    let (status, headers, body) = parse_response(&get(&addr, "/?_kap_basepath=/mounted/"));
    assert_eq!(status, 200);
    assert!(headers.get("content-type").unwrap().starts_with("text/html"));
    assert!(body.contains(r#"<base href="/mounted/" />"#));
    assert!(body.contains(r#"<script src="home.js"></script>"#));

    let (status, headers, body) = parse_response(&get(&addr, "/home.css"));
    assert_eq!(status, 200);
    assert_eq!(
        headers.get("cache-control").unwrap(),
        "public, max-age=31536000, immutable"
    );
    assert_eq!(body, "body { margin: 0; }\n");

    let (status, _, body) = parse_response(&get(&addr, "/admin/settings"));
    assert_eq!(status, 200);
    assert!(body.contains(r#"<script src="admin/admin.js"></script>"#));

    let (status, _, body) = parse_response(&get(&addr, "/nowhere"));
    assert_eq!(status, 418);
    assert!(body.contains("Not available"));

    handle.stop();
}

#[test]
fn test_traversal_is_not_served() {
    let handle = start_service();
    let resp = send_request(
        &handle.addr(),
        "GET /../Cargo.toml HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    );
    handle.stop();
    let (status, _, body) = parse_response(&resp);
    assert_eq!(status, 418);
    assert!(!body.contains("[package]"));
}
