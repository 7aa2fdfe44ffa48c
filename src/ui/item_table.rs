//! Item price table rendering
//!
//! Renders the item overview for the selected category: uniques, maps,
//! cards and friends, with values and listing counts.

use ratatui::{
    layout::Constraint,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Row, Table},
    Frame,
};

use super::widgets::sparkline::spark_string;
use super::{chrome_layout, format_value, render_footer, render_header, scroll_offset};
use crate::app::App;
use poemarket::data::ItemLine;

/// Renders the item table view.
pub fn render_items(frame: &mut Frame, app: &App) {
    let (header_area, body_area, footer_area) = chrome_layout(frame.area());
    render_header(frame, app, header_area, "Items");
    render_footer(frame, app, footer_area);

    let title = format!(" {} (</> to change category) ", app.item_type.as_str());
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let Some(lines) = app.current_items() else {
        frame.render_widget(block, body_area);
        return;
    };

    let visible_rows = body_area.height.saturating_sub(3) as usize;
    let offset = scroll_offset(app.selected_row, visible_rows);

    let rows: Vec<Row> = lines
        .iter()
        .enumerate()
        .skip(offset)
        .take(visible_rows)
        .map(|(index, line)| item_row(line, index == app.selected_row))
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Min(26),
            Constraint::Length(20),
            Constraint::Length(10),
            Constraint::Length(8),
            Constraint::Length(9),
            Constraint::Length(14),
        ],
    )
    .header(
        Row::new(["Item", "Base", "Chaos", "Divine", "Listings", "Trend"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(block);

    frame.render_widget(table, body_area);
}

fn item_row<'a>(line: &'a ItemLine, selected: bool) -> Row<'a> {
    let spark = line.spark_line.as_ref();
    let change = spark.map(|s| s.total_change).unwrap_or(0.0);
    let trend_style = if change < 0.0 {
        Style::default().fg(Color::Red)
    } else if change > 0.0 {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    // Maps show their tier alongside the name
    let name = match line.map_tier {
        Some(tier) => format!("{} (T{tier})", line.name),
        None => line.name.clone(),
    };

    let row = Row::new(vec![
        Cell::from(name),
        Cell::from(line.base_type.clone().unwrap_or_default()),
        Cell::from(format_value(line.chaos_value)),
        Cell::from(format_value(line.divine_value)),
        Cell::from(
            line.listing_count
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string()),
        ),
        Cell::from(spark.map(|s| spark_string(&s.data)).unwrap_or_default())
            .style(trend_style),
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
