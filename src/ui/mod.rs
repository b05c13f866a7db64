//! Terminal rendering of the catalog grid.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Wrap},
};

use crate::catalog::{LoadedCatalog, Provenance};
use crate::install::NoticeLevel;
use crate::navigation::Focus;
use crate::state::{AppState, CatalogView};

mod card;
pub mod theme;

pub use card::{CARD_HEIGHT, progress_bar, truncate_to_width};
use card::render_card;
use theme::{Theme, theme};

/// Keys shown in the footer when no notice is active.
const HELP_TEXT: &str = "←↑↓→/hjkl move · Enter install · c cancel · r reload · q quit";

/// What: Draw the whole screen.
///
/// Details:
/// - Loading and error states take the full body; the grid is only drawn for a loaded catalog.
/// - The grid scrolls so the focused row stays visible.
pub fn ui(f: &mut Frame, app: &AppState) {
    let th = theme();
    let area = f.area();
    f.render_widget(Block::default().style(Style::default().bg(th.base)), area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(area);

    render_header(f, chunks[0], app, &th);
    match &app.view {
        CatalogView::Loading => render_message(f, chunks[1], "Loading catalog…", th.subtext),
        CatalogView::Failed(reason) => render_message(
            f,
            chunks[1],
            &format!("Catalog unavailable\n\n{reason}\n\nPress r to retry"),
            th.red,
        ),
        CatalogView::Ready(loaded) => render_catalog(f, chunks[1], app, loaded, &th),
    }
    render_footer(f, chunks[2], app, &th);
}

fn render_header(f: &mut Frame, area: Rect, app: &AppState, th: &Theme) {
    let mut spans = vec![Span::styled(
        " tvstore ",
        Style::default().fg(th.accent).add_modifier(Modifier::BOLD),
    )];
    if let CatalogView::Ready(loaded) = &app.view {
        spans.push(Span::styled(
            format!("{} apps", loaded.document.entries.len()),
            Style::default().fg(th.subtext),
        ));
        let hint = match loaded.provenance {
            Provenance::FreshCache | Provenance::StaleCache => Some("  served from cache"),
            Provenance::Bundled => Some("  offline catalog"),
            Provenance::Remote => None,
        };
        if let Some(hint) = hint {
            spans.push(Span::styled(hint, Style::default().fg(th.yellow)));
        }
    }
    let active = app.orchestrator.active_count();
    if active > 0 {
        spans.push(Span::styled(
            format!("  {active} in progress"),
            Style::default().fg(th.yellow),
        ));
    }
    if app.reloading && matches!(app.view, CatalogView::Ready(_)) {
        spans.push(Span::styled("  reloading…", Style::default().fg(th.subtext)));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_message(f: &mut Frame, area: Rect, text: &str, color: ratatui::style::Color) {
    let top = area.height.saturating_sub(5) / 2;
    let rect = Rect {
        y: area.y + top,
        height: area.height.saturating_sub(top),
        ..area
    };
    f.render_widget(
        Paragraph::new(text.to_string())
            .style(Style::default().fg(color))
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        rect,
    );
}

fn render_catalog(f: &mut Frame, area: Rect, app: &AppState, loaded: &LoadedCatalog, th: &Theme) {
    let doc = &loaded.document;
    let body = if let Some(banner) = &doc.banner_image {
        let parts = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(1)])
            .split(area);
        render_banner(f, parts[0], banner, app.focus == Focus::Banner, th);
        parts[1]
    } else {
        area
    };
    if doc.entries.is_empty() {
        render_message(f, body, "No apps available", th.subtext);
        return;
    }

    let shape = app.grid_shape();
    let cols = shape.columns;
    let visible_rows = usize::from((body.height / CARD_HEIGHT).max(1));
    let focused_row = app.focus.entry().map_or(0, |i| i / cols);
    let first_row = focused_row.saturating_sub(visible_rows - 1);
    let card_w = body.width / u16::try_from(cols).unwrap_or(u16::MAX).max(1);

    for (slot, row) in (first_row..shape.rows()).take(visible_rows).enumerate() {
        let y = body.y + u16::try_from(slot).unwrap_or(0) * CARD_HEIGHT;
        let height = CARD_HEIGHT.min(body.bottom().saturating_sub(y));
        if height < 3 {
            break;
        }
        for col in 0..cols {
            let index = row * cols + col;
            let Some(entry) = doc.entries.get(index) else {
                break;
            };
            let rect = Rect {
                x: body.x + u16::try_from(col).unwrap_or(0) * card_w,
                y,
                width: card_w,
                height,
            };
            let package = entry.package_identifier.as_str();
            render_card(
                f,
                rect,
                entry,
                app.orchestrator.latest(package),
                app.orchestrator.installed().contains(package),
                app.focus == Focus::Entry(index),
                th,
            );
        }
    }
}

fn render_banner(f: &mut Frame, area: Rect, uri: &str, focused: bool, th: &Theme) {
    let border = if focused {
        Style::default().fg(th.accent).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(th.overlay)
    };
    let inner_w = usize::from(area.width.saturating_sub(4));
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(if focused {
            BorderType::Thick
        } else {
            BorderType::Rounded
        })
        .border_style(border)
        .title(" Featured ");
    f.render_widget(
        Paragraph::new(Span::styled(
            truncate_to_width(uri, inner_w),
            Style::default().fg(th.subtext),
        ))
        .alignment(Alignment::Center)
        .block(block),
        area,
    );
}

fn render_footer(f: &mut Frame, area: Rect, app: &AppState, th: &Theme) {
    let line = app.current_notice().map_or_else(
        || Line::from(Span::styled(HELP_TEXT, Style::default().fg(th.overlay))),
        |n| {
            let color = match n.level {
                NoticeLevel::Info => th.accent,
                NoticeLevel::Success => th.green,
                NoticeLevel::Error => th.red,
            };
            Line::from(Span::styled(n.text.clone(), Style::default().fg(color)))
        },
    );
    f.render_widget(Paragraph::new(line), area);
}
