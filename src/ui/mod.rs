//! UI rendering modules for poemarket

pub mod characters;
pub mod currency_table;
pub mod help_overlay;
pub mod item_table;
pub mod widgets;

pub use characters::render_characters;
pub use currency_table::render_currency;
pub use help_overlay::render as render_help_overlay;
pub use item_table::render_items;

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::app::App;
use poemarket::data::CurrencyKind;

/// Splits the screen into header, body and footer areas.
pub fn chrome_layout(area: Rect) -> (Rect, Rect, Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(area);
    (chunks[0], chunks[1], chunks[2])
}

/// Renders the one-line header: league, realm and view context.
pub fn render_header(frame: &mut Frame, app: &App, area: Rect, view_label: &str) {
    let kind_label = match app.currency_kind {
        CurrencyKind::Currency => "",
        CurrencyKind::Fragment => " (fragments)",
    };
    let header = Line::from(vec![
        Span::styled(" poemarket ", Style::default().fg(Color::Black).bg(Color::Cyan)),
        Span::raw(" "),
        Span::styled(app.league_id().to_string(), Style::default().fg(Color::Yellow)),
        Span::raw(format!(" [{}] ", app.realm.as_str())),
        Span::styled(
            format!("{view_label}{kind_label}"),
            Style::default().fg(Color::Cyan),
        ),
    ]);
    frame.render_widget(Paragraph::new(header), area);
}

/// Renders the one-line footer: status message or key hints, plus the last
/// refresh time.
pub fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let left = match &app.status {
        Some(status) => Span::styled(status.clone(), Style::default().fg(Color::Red)),
        None => Span::styled(
            " q quit  ? help  tab view  [ ] league  r refresh  t price check  c characters",
            Style::default().fg(Color::DarkGray),
        ),
    };

    let mut spans = vec![left];
    if let Some(refreshed) = app.last_refresh {
        spans.push(Span::styled(
            format!("  updated {}", refreshed.format("%H:%M:%S")),
            Style::default().fg(Color::DarkGray),
        ));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Formats a chaos/divine value compactly for table cells.
pub fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) if v >= 1000.0 => format!("{:.0}", v),
        Some(v) if v >= 10.0 => format!("{:.1}", v),
        Some(v) => format!("{:.2}", v),
        None => "-".to_string(),
    }
}

/// Computes the first visible row so the selection stays on screen.
pub fn scroll_offset(selected: usize, visible_rows: usize) -> usize {
    if visible_rows == 0 {
        return 0;
    }
    selected.saturating_sub(visible_rows - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_value_scales_precision() {
        assert_eq!(format_value(Some(12345.6)), "12346");
        assert_eq!(format_value(Some(182.5)), "182.5");
        assert_eq!(format_value(Some(42.25)), "42.2");
        assert_eq!(format_value(Some(0.25)), "0.25");
        assert_eq!(format_value(None), "-");
    }

    #[test]
    fn test_scroll_offset_keeps_selection_visible() {
        assert_eq!(scroll_offset(0, 10), 0);
        assert_eq!(scroll_offset(9, 10), 0);
        assert_eq!(scroll_offset(10, 10), 1);
        assert_eq!(scroll_offset(25, 10), 16);
        assert_eq!(scroll_offset(5, 0), 0);
    }
}
