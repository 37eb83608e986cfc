// Handles the rendering of widgets to the terminal frame.

use super::Message;
use super::model::{ServiceAction, ServiceRecord, Snapshot};
use super::systemd::Scope;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
};

/// Main render function called every frame.
pub fn render(
    f: &mut Frame,
    snapshot: &Snapshot,
    table_state: &mut TableState,
    scope: Scope,
    message: Option<&Message>,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(3),
        ])
        .split(f.area());

    render_service_table(f, chunks[0], snapshot, table_state, scope);
    render_status(f, chunks[1], message);
    render_footer(f, chunks[2]);

    if let Some(Message::Error(text)) = message {
        render_error(f, text);
    }
}

fn status_color(record: &ServiceRecord) -> Color {
    if record.is_running() {
        Color::Green
    } else if record.is_failed() {
        Color::Red
    } else {
        Color::DarkGray
    }
}

fn render_service_table(
    f: &mut Frame,
    area: Rect,
    snapshot: &Snapshot,
    state: &mut TableState,
    scope: Scope,
) {
    let header = Row::new(["Service", "Load", "Active", "Sub", "Toggle"])
        .style(Style::default().add_modifier(Modifier::BOLD));

    let rows: Vec<Row> = snapshot
        .iter()
        .map(|record| {
            let action = ServiceAction::toggle_for(record);
            let action_color = match action {
                ServiceAction::Stop => Color::Red,
                _ => Color::Green,
            };

            Row::new(vec![
                Cell::from(record.name.as_str()),
                Cell::from(record.load_state.as_str()),
                Cell::from(Span::styled(
                    record.active_state.as_str(),
                    Style::default().fg(status_color(record)),
                )),
                Cell::from(record.sub_state.as_str()),
                Cell::from(Span::styled(
                    action.label(),
                    Style::default().fg(action_color),
                )),
            ])
        })
        .collect();

    let title = match scope {
        Scope::User => format!(" User Services ({}) ", snapshot.len()),
        Scope::System => format!(" System Services ({}) ", snapshot.len()),
    };

    let widths = [
        Constraint::Min(20),
        Constraint::Length(10),
        Constraint::Length(10),
        Constraint::Length(14),
        Constraint::Length(8),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title))
        .row_highlight_style(
            Style::default()
                .add_modifier(Modifier::BOLD)
                .bg(Color::DarkGray),
        )
        .highlight_symbol(">> ");

    f.render_stateful_widget(table, area, state);
}

fn render_status(f: &mut Frame, area: Rect, message: Option<&Message>) {
    let line = match message {
        Some(Message::Info(text)) => Line::from(Span::styled(
            format!(" {text}"),
            Style::default().fg(Color::Green),
        )),
        Some(Message::Error(_)) => Line::from(Span::styled(
            " Error (Esc to dismiss)",
            Style::default().fg(Color::Red),
        )),
        None => Line::default(),
    };
    f.render_widget(Paragraph::new(line), area);
}

fn render_footer(f: &mut Frame, area: Rect) {
    let help_text = Line::from(vec![
        Span::raw("Nav: "),
        Span::styled("j/k ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("| Toggle: "),
        Span::styled("Enter ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("| Action: "),
        Span::styled(
            "s(start) x(stop) r(restart) ",
            Style::default().fg(Color::Cyan),
        ),
        Span::raw("| Reload: "),
        Span::styled("R ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("| Quit: "),
        Span::styled("q", Style::default().fg(Color::Red)),
    ]);

    let paragraph =
        Paragraph::new(help_text).block(Block::default().borders(Borders::ALL).title(" Controls "));

    f.render_widget(paragraph, area);
}

fn render_error(f: &mut Frame, text: &str) {
    let area = centered_rect(70, 40, f.area());

    f.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(" Error - Esc to dismiss ");

    let paragraph = Paragraph::new(text).block(block).wrap(Wrap { trim: false });

    f.render_widget(paragraph, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{Terminal, backend::TestBackend};

    fn screen(snapshot: &Snapshot, message: Option<&Message>) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 20)).unwrap();
        let mut state = TableState::default();
        state.select(Some(0));
        terminal
            .draw(|f| render(f, snapshot, &mut state, Scope::User, message))
            .unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_renders_rows_and_toggle_labels() {
        let snapshot = Snapshot::from_records([
            ServiceRecord::new("dbus.service", "loaded", "active", "running"),
            ServiceRecord::new("backup.service", "loaded", "inactive", "dead"),
        ]);
        let text = screen(&snapshot, None);

        assert!(text.contains("User Services (2)"));
        assert!(text.contains("dbus.service"));
        assert!(text.contains("backup.service"));
        assert!(text.contains("Stop"));
        assert!(text.contains("Start"));
    }

    #[test]
    fn test_renders_error_popup() {
        let message = Message::Error("failed to start foo.service: denied".to_string());
        let text = screen(&Snapshot::new(), Some(&message));
        assert!(text.contains("Esc to dismiss"));
        assert!(text.contains("denied"));
    }
}
