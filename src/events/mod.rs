//! Terminal input handling.
//!
//! Key presses are mapped to navigation inputs and applied to [`AppState`] directly; anything
//! that needs the install runner or the catalog loader is returned as an [`Effect`] for the
//! event loop to carry out.

use crossterm::event::{Event as CEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::catalog::CatalogEntry;
use crate::navigation::{NavInput, navigate};
use crate::state::{AppState, CatalogView};

/// Work the event loop must do after an input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Nothing beyond the state change already applied.
    None,
    /// Leave the application.
    Quit,
    /// Start or restart the install job for this entry.
    Install(CatalogEntry),
    /// Cancel the download of this package.
    Cancel(String),
    /// Reload the catalog, bypassing the fresh cache.
    Reload,
}

/// Map a key to a navigation input.
const fn nav_input(code: KeyCode) -> Option<NavInput> {
    match code {
        KeyCode::Up | KeyCode::Char('k') => Some(NavInput::Up),
        KeyCode::Down | KeyCode::Char('j') => Some(NavInput::Down),
        KeyCode::Left | KeyCode::Char('h') => Some(NavInput::Left),
        KeyCode::Right | KeyCode::Char('l') => Some(NavInput::Right),
        KeyCode::Enter | KeyCode::Char(' ') => Some(NavInput::Activate),
        _ => None,
    }
}

/// What: Dispatch one terminal event.
///
/// Inputs:
/// - `ev`: Event read from crossterm.
/// - `app`: State to mutate.
///
/// Output:
/// - The [`Effect`] the caller has to perform.
///
/// Details:
/// - Only key presses count; repeats and releases are ignored so inputs stay edge-triggered.
/// - Resize events update the viewport width, which re-clamps focus.
pub fn handle_event(ev: &CEvent, app: &mut AppState) -> Effect {
    match ev {
        CEvent::Key(ke) if ke.kind == KeyEventKind::Press => handle_key(*ke, app),
        CEvent::Resize(w, _) => {
            app.set_viewport_width(*w);
            Effect::None
        }
        _ => Effect::None,
    }
}

fn handle_key(ke: KeyEvent, app: &mut AppState) -> Effect {
    if ke.modifiers.contains(KeyModifiers::CONTROL) && ke.code == KeyCode::Char('c') {
        return Effect::Quit;
    }
    match ke.code {
        KeyCode::Char('q') | KeyCode::Esc => return Effect::Quit,
        KeyCode::Char('r') => {
            if app.reloading {
                return Effect::None;
            }
            app.reloading = true;
            return Effect::Reload;
        }
        KeyCode::Char('c') => {
            return app
                .focused_entry()
                .map_or(Effect::None, |e| Effect::Cancel(e.package_identifier.clone()));
        }
        _ => {}
    }
    if !matches!(app.view, CatalogView::Ready(_)) {
        return Effect::None;
    }
    let Some(input) = nav_input(ke.code) else {
        return Effect::None;
    };
    let outcome = navigate(app.focus, input, app.grid_shape());
    app.focus = outcome.focus;
    outcome
        .activate
        .and_then(|i| app.document().and_then(|d| d.entries.get(i)).cloned())
        .map_or(Effect::None, Effect::Install)
}
