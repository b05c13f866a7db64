//! One catalog card: name, version, description, install badge and job status.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use super::theme::Theme;
use crate::catalog::CatalogEntry;
use crate::install::{DownloadJob, InstallPhase};

/// Rows one card occupies, borders included.
pub const CARD_HEIGHT: u16 = 6;

/// What: Truncate `s` to at most `max` display columns, appending `…` when cut.
///
/// Details:
/// - Uses `unicode_width` so wide characters are never split across the limit.
#[must_use]
pub fn truncate_to_width(s: &str, max: usize) -> String {
    if s.width() <= max {
        return s.to_string();
    }
    if max == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in s.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > max - 1 {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

/// What: Text progress bar such as `[#####·····]  50%`.
#[must_use]
pub fn progress_bar(percent: u8, width: usize) -> String {
    let percent = percent.min(100);
    let slots = width.saturating_sub(7).max(1);
    let filled = slots * usize::from(percent) / 100;
    format!(
        "[{}{}] {percent:>3}%",
        "#".repeat(filled),
        "·".repeat(slots - filled)
    )
}

/// Status line for the latest job of an entry.
fn status_line(job: Option<&DownloadJob>, installed: bool, width: usize, th: &Theme) -> Line<'static> {
    let Some(job) = job else {
        return if installed {
            Line::from(Span::styled("Enter: reinstall", Style::default().fg(th.subtext)))
        } else {
            Line::from(Span::styled("Enter: install", Style::default().fg(th.subtext)))
        };
    };
    let (text, color) = match job.phase {
        InstallPhase::Downloading => (progress_bar(job.progress, width), th.yellow),
        InstallPhase::ConfirmPending if job.abandoned => {
            ("Install not confirmed".to_string(), th.subtext)
        }
        InstallPhase::Failed => (
            format!("Failed: {}", job.failure.as_deref().unwrap_or("unknown error")),
            th.red,
        ),
        InstallPhase::Confirmed => ("Installed".to_string(), th.green),
        phase => (capitalize(phase.label()), th.yellow),
    };
    Line::from(Span::styled(truncate_to_width(&text, width), Style::default().fg(color)))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |c| {
        c.to_uppercase().chain(chars).collect()
    })
}

/// What: Render one card into `area`.
///
/// Inputs:
/// - `entry`: Catalog entry to show.
/// - `job`: Latest job for the entry's package, active or settled.
/// - `installed`: Whether the package is in the installed set.
/// - `focused`: Draw the focus highlight.
pub fn render_card(
    f: &mut Frame,
    area: Rect,
    entry: &CatalogEntry,
    job: Option<&DownloadJob>,
    installed: bool,
    focused: bool,
    th: &Theme,
) {
    let inner_w = usize::from(area.width.saturating_sub(2));
    let name = if entry.display_name.is_empty() {
        entry.package_identifier.as_str()
    } else {
        entry.display_name.as_str()
    };
    let border = if focused {
        Style::default().fg(th.accent).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(th.overlay)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(if focused {
            BorderType::Thick
        } else {
            BorderType::Rounded
        })
        .border_style(border)
        .title(Span::styled(
            format!(" {} ", truncate_to_width(name, inner_w.saturating_sub(2))),
            Style::default().fg(th.text).add_modifier(Modifier::BOLD),
        ))
        .style(Style::default().bg(th.surface));

    let mut meta = vec![Span::styled(
        if entry.version_label.is_empty() {
            String::new()
        } else {
            format!("v{} ", entry.version_label)
        },
        Style::default().fg(th.subtext),
    )];
    if installed {
        meta.push(Span::styled("Installed", Style::default().fg(th.green)));
    }
    let lines = vec![
        Line::from(meta),
        Line::from(Span::styled(
            truncate_to_width(&entry.description, inner_w),
            Style::default().fg(th.text),
        )),
        Line::default(),
        status_line(job, installed, inner_w, th),
    ];
    f.render_widget(Paragraph::new(lines).block(block), area);
}
