use pagewright::assets::{AssetError, AssetProvider, LiveAssets, LiveOptions};
use pagewright::render::{PageRenderer, RenderValues};
use pagewright::server::RequestInfo;
use std::fs;
use std::path::Path;
use std::sync::Arc;

mod common;
use common::fixtures;

fn options(dir: &Path, inline_styles: bool) -> LiveOptions {
    LiveOptions {
        stats_file: dir.join("stats.json"),
        output_dir: dir.to_path_buf(),
        inline_styles,
    }
}

#[test]
fn test_no_snapshot_before_first_compilation() {
    let dir = tempfile::tempdir().unwrap();
    let live = LiveAssets::new(options(dir.path(), false), "/");
    assert!(!live.refresh());
    assert!(matches!(live.resolve("home"), Err(AssetError::Snapshot(_))));
}

#[test]
fn test_snapshot_from_compilation_stats() {
    let live = LiveAssets::new(options(&fixtures::live(), false), "/");
    assert!(live.refresh());

    let home = live.resolve("home").unwrap();
    assert_eq!(home.scripts, vec!["/main.js".to_string()]);
    assert_eq!(home.styles, vec!["/main.css".to_string()]);
}

#[test]
fn test_incomplete_stats_keep_previous_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let stats = dir.path().join("stats.json");
    fs::write(
        &stats,
        r#"{"entrypoints": {"home": {"assets": ["v1.js"]}}}"#,
    )
    .unwrap();

    let live = LiveAssets::new(options(dir.path(), false), "/static/");
    assert!(live.refresh());
    assert_eq!(live.resolve("home").unwrap().scripts, vec!["/static/v1.js"]);

    fs::write(
        &stats,
        r#"{"building": true, "entrypoints": {"home": {"assets": ["v2.js"]}}}"#,
    )
    .unwrap();
    assert!(!live.refresh());
    assert_eq!(live.resolve("home").unwrap().scripts, vec!["/static/v1.js"]);

    // Half-written file.
    fs::write(&stats, r#"{"entrypoints": {"ho"#).unwrap();
    assert!(!live.refresh());
    assert_eq!(live.resolve("home").unwrap().scripts, vec!["/static/v1.js"]);

    fs::write(
        &stats,
        r#"{"entrypoints": {"home": {"assets": ["v3.js"]}}}"#,
    )
    .unwrap();
    assert!(live.refresh());
    assert_eq!(live.resolve("home").unwrap().scripts, vec!["/static/v3.js"]);
}

#[test]
fn test_inline_styles() {
    let live = LiveAssets::new(options(&fixtures::live(), true), "/");
    assert!(live.refresh());
    let renderer = PageRenderer::with_default_templates(Arc::new(live));
    let request = RequestInfo::get("/");

    let page = renderer
        .context(&request)
        .render_page("home", RenderValues::new())
        .unwrap();
    assert!(page.body.contains("<style>.live { display: block; }\n</style>"));
    assert!(!page.body.contains("stylesheet"));
    assert!(page.body.contains(r#"<script src="main.js"></script>"#));
}

#[test]
fn test_watch_picks_up_new_compilation() {
    let dir = tempfile::tempdir().unwrap();
    let stats = dir.path().join("stats.json");
    fs::write(&stats, r#"{"entrypoints": {"home": {"assets": ["a.js"]}}}"#).unwrap();

    let live = LiveAssets::watch(options(dir.path(), false), "/").unwrap();
    assert_eq!(live.resolve("home").unwrap().scripts, vec!["/a.js"]);

    fs::write(&stats, r#"{"entrypoints": {"home": {"assets": ["b.js"]}}}"#).unwrap();
    let mut updated = false;
    for _ in 0..100 {
        if live.resolve("home").unwrap().scripts == vec!["/b.js"] {
            updated = true;
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(20));
    }
    assert!(updated, "watcher did not publish the new compilation");
}
