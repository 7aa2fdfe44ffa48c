//! Character list rendering for the logged-in account

use ratatui::{
    layout::Constraint,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Row, Table},
    Frame,
};

use super::{chrome_layout, render_footer, render_header, scroll_offset};
use crate::app::App;
use poemarket::data::Character;

/// Renders the character list view.
pub fn render_characters(frame: &mut Frame, app: &App) {
    let (header_area, body_area, footer_area) = chrome_layout(frame.area());
    render_header(frame, app, header_area, "Characters");
    render_footer(frame, app, footer_area);

    let block = Block::default()
        .title(" Characters (Esc to go back) ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let visible_rows = body_area.height.saturating_sub(3) as usize;
    let offset = scroll_offset(app.selected_row, visible_rows);

    let rows: Vec<Row> = app
        .characters
        .iter()
        .enumerate()
        .skip(offset)
        .take(visible_rows)
        .map(|(index, character)| character_row(character, index == app.selected_row))
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Min(24),
            Constraint::Length(6),
            Constraint::Length(16),
            Constraint::Length(24),
        ],
    )
    .header(
        Row::new(["Name", "Level", "Class", "League"])
            .style(Style::default().add_modifier(Modifier::BOLD)),
    )
    .block(block);

    frame.render_widget(table, body_area);
}

fn character_row(character: &Character, selected: bool) -> Row<'_> {
    let row = Row::new(vec![
        Cell::from(character.name.as_str()),
        Cell::from(character.level.to_string()),
        Cell::from(character.class.as_str()),
        Cell::from(character.league.as_deref().unwrap_or("-")),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppState;
    use poemarket::cli::StartupConfig;
    use poemarket::config::Config;
    use ratatui::{backend::TestBackend, Terminal};

    #[test]
    fn test_character_table_renders() {
        let backend = TestBackend::new(80, 24);
        let mut terminal = Terminal::new(backend).unwrap();

        let mut app = App::new(Config::default(), StartupConfig::default());
        app.state = AppState::Characters;
        app.characters = vec![Character {
            name: "ExileOne".to_string(),
            level: 94,
            class: "Witch".to_string(),
            class_id: Some(3),
            league: Some("Mercenaries".to_string()),
            ascendancy_class: Some(2),
            last_active: Some(true),
        }];

        terminal
            .draw(|frame| render_characters(frame, &app))
            .unwrap();

        let buffer = terminal.backend().buffer();
        let content: String = buffer.content().iter().map(|cell| cell.symbol()).collect();

        assert!(content.contains("ExileOne"));
        assert!(content.contains("94"));
        assert!(content.contains("Witch"));
        assert!(content.contains("Mercenaries"));
    }
}
