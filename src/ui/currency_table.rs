//! Currency price table rendering
//!
//! Renders the main currency view: one row per currency line with chaos
//! and divine values and a price-history sparkline.

use ratatui::{
    layout::Constraint,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Row, Table},
    Frame,
};

use super::widgets::sparkline::spark_string;
use super::{chrome_layout, format_value, render_footer, render_header, scroll_offset};
use crate::app::App;
use poemarket::data::CurrencyLine;

/// Renders the currency table view.
pub fn render_currency(frame: &mut Frame, app: &App) {
    let (header_area, body_area, footer_area) = chrome_layout(frame.area());
    render_header(frame, app, header_area, "Currency");
    render_footer(frame, app, footer_area);

    let Some(overview) = &app.currency else {
        let placeholder = Block::default()
            .title(" Currency prices (loading) ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan));
        frame.render_widget(placeholder, body_area);
        return;
    };

    let block = Block::default()
        .title(" Currency prices ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    // Header + borders take three rows of the body area
    let visible_rows = body_area.height.saturating_sub(3) as usize;
    let offset = scroll_offset(app.selected_row, visible_rows);

    let rows: Vec<Row> = overview
        .lines
        .iter()
        .enumerate()
        .skip(offset)
        .take(visible_rows)
        .map(|(index, line)| currency_row(line, index == app.selected_row))
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Min(24),
            Constraint::Length(10),
            Constraint::Length(10),
            Constraint::Length(8),
            Constraint::Length(14),
        ],
    )
    .header(
        Row::new(["Currency", "Chaos", "Divine", "7d %", "Trend"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(block);

    frame.render_widget(table, body_area);
}

fn currency_row<'a>(line: &'a CurrencyLine, selected: bool) -> Row<'a> {
    let spark = line.receive_spark_line.as_ref();
    let change = spark.map(|s| s.total_change).unwrap_or(0.0);
    let change_style = if change < 0.0 {
        Style::default().fg(Color::Red)
    } else if change > 0.0 {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let trend = spark
        .map(|s| spark_string(&s.data))
        .unwrap_or_default();

    let row = Row::new(vec![
        Cell::from(line.currency_type_name.as_str()),
        Cell::from(format_value(line.chaos_equivalent)),
        Cell::from(format_value(line.divine_equivalent)),
        Cell::from(format!("{change:+.1}")).style(change_style),
        Cell::from(trend).style(change_style),
    ]);

    if selected {
        row.style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        row
    }
}
