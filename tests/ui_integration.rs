//! Integration tests for UI rendering using ratatui's `TestBackend`.
//!
//! These tests verify that the TUI renders correctly across catalog and install states
//! without requiring a real terminal.

use ratatui::{Terminal, backend::TestBackend};
use std::time::Instant;

use tvstore::catalog::{CatalogDocument, CatalogEntry, LoadedCatalog, Provenance};
use tvstore::config::Settings;
use tvstore::install::{InstalledSet, Notice, NoticeLevel};
use tvstore::navigation::Focus;
use tvstore::state::{AppState, CatalogView};
use tvstore::ui;

fn entry(i: usize) -> CatalogEntry {
    CatalogEntry {
        id: i.to_string(),
        display_name: format!("Channel Pack {i}"),
        description: format!("Streams for region {i}"),
        version_label: format!("1.{i}"),
        icon_uri: String::new(),
        package_identifier: format!("org.example.pack{i}"),
        artifact_uri: format!("https://cdn/pack{i}.apk"),
    }
}

/// Create an `AppState` showing `count` entries from `provenance`.
fn create_test_app_state(count: usize, banner: bool, provenance: Provenance) -> AppState {
    let mut app = AppState::new(Settings::default(), InstalledSet::default());
    app.set_viewport_width(120);
    app.apply_catalog(
        Ok(LoadedCatalog {
            document: CatalogDocument {
                entries: (0..count).map(entry).collect(),
                banner_image: banner.then(|| "https://cdn/featured.png".to_string()),
            },
            provenance,
            fetched_at_millis: None,
        }),
        Instant::now(),
    );
    app
}

/// Create a `TestBackend` with the default test size.
fn create_test_backend() -> TestBackend {
    TestBackend::new(120, 40)
}

/// Create a `TestBackend` with custom size.
fn create_test_backend_size(width: u16, height: u16) -> TestBackend {
    TestBackend::new(width, height)
}

/// Render UI to a `TestBackend` and return the terminal for assertions.
fn render_ui_to_backend(backend: TestBackend, app: &AppState) -> Terminal<TestBackend> {
    let mut terminal = Terminal::new(backend).expect("failed to create test terminal");
    terminal
        .draw(|f| ui::ui(f, app))
        .expect("failed to draw test terminal");
    terminal
}

/// Flatten the rendered buffer into one string, rows separated by newlines.
fn screen_text(terminal: &Terminal<TestBackend>) -> String {
    let buffer = terminal.backend().buffer();
    let mut out = String::new();
    for y in 0..buffer.area.height {
        for x in 0..buffer.area.width {
            out.push_str(buffer[(x, y)].symbol());
        }
        out.push('\n');
    }
    out
}

// Catalog states

#[test]
fn test_ui_renders_loading_state() {
    let app = AppState::new(Settings::default(), InstalledSet::default());
    let terminal = render_ui_to_backend(create_test_backend(), &app);
    let text = screen_text(&terminal);
    assert!(text.contains("Loading catalog"));
    assert!(text.contains("tvstore"));
}

#[test]
fn test_ui_renders_catalog_unavailable() {
    let mut app = AppState::new(Settings::default(), InstalledSet::default());
    app.view = CatalogView::Failed("Catalog unavailable (Operation timed out)".into());
    let text = screen_text(&render_ui_to_backend(create_test_backend(), &app));
    assert!(text.contains("Operation timed out"));
    assert!(text.contains("Press r to retry"));
}

#[test]
fn test_ui_renders_empty_catalog() {
    let app = create_test_app_state(0, false, Provenance::Remote);
    let text = screen_text(&render_ui_to_backend(create_test_backend(), &app));
    assert!(text.contains("No apps available"));
    assert!(text.contains("0 apps"));
}

#[test]
fn test_ui_renders_grid_with_banner() {
    let app = create_test_app_state(6, true, Provenance::Remote);
    let text = screen_text(&render_ui_to_backend(create_test_backend(), &app));
    assert!(text.contains("Featured"));
    assert!(text.contains("6 apps"));
    assert!(text.contains("Channel Pack 0"));
    assert!(text.contains("Channel Pack 5"));
    assert!(!text.contains("served from cache"));
}

#[test]
fn test_ui_marks_cached_and_bundled_catalogs() {
    let cached = create_test_app_state(2, false, Provenance::StaleCache);
    let text = screen_text(&render_ui_to_backend(create_test_backend(), &cached));
    assert!(text.contains("served from cache"));

    let bundled = create_test_app_state(2, false, Provenance::Bundled);
    let text = screen_text(&render_ui_to_backend(create_test_backend(), &bundled));
    assert!(text.contains("offline catalog"));
}

// Install status

#[test]
fn test_ui_renders_installed_badge() {
    let mut installed = InstalledSet::default();
    installed.insert("org.example.pack1");
    let mut app = create_test_app_state(3, false, Provenance::Remote);
    app.orchestrator = tvstore::install::Orchestrator::with_installed(installed);
    let text = screen_text(&render_ui_to_backend(create_test_backend(), &app));
    assert!(text.contains("Enter: reinstall"));
    assert!(text.contains("Enter: install"));
}

#[test]
fn test_ui_renders_download_progress() {
    let mut app = create_test_app_state(2, false, Provenance::Remote);
    let first = entry(0);
    app.orchestrator.start(&first).expect("start");
    let text = screen_text(&render_ui_to_backend(create_test_backend(), &app));
    assert!(text.contains("1 in progress"));
    assert!(text.contains("0%"));
}

#[test]
fn test_ui_renders_notice_in_footer() {
    let mut app = create_test_app_state(2, false, Provenance::Remote);
    let text = screen_text(&render_ui_to_backend(create_test_backend(), &app));
    assert!(text.contains("q quit"));

    app.push_notice(
        Notice::new(
            NoticeLevel::Error,
            "org.example.pack0",
            "org.example.pack0: Download failed with HTTP 404",
        ),
        Instant::now(),
    );
    let text = screen_text(&render_ui_to_backend(create_test_backend(), &app));
    assert!(text.contains("HTTP 404"));
    assert!(!text.contains("q quit"));
}

// Layout

#[test]
fn test_ui_scrolls_to_focused_row() {
    let mut app = create_test_app_state(40, false, Provenance::Remote);
    app.focus = Focus::Entry(39);
    let text = screen_text(&render_ui_to_backend(create_test_backend_size(120, 20), &app));
    assert!(text.contains("Channel Pack 39"));
    assert!(!text.contains("Channel Pack 0 "));
}

#[test]
fn test_ui_small_terminal_does_not_panic() {
    let app = create_test_app_state(5, true, Provenance::Remote);
    for (w, h) in [(20, 5), (10, 3), (1, 1), (200, 60)] {
        let _ = render_ui_to_backend(create_test_backend_size(w, h), &app);
    }
}
