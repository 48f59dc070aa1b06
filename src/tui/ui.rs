use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
    Frame,
};

use super::app::{App, InputMode};
use crate::models::TaskSummary;
use crate::prompt::{clock_12h, relative_due, PROMPT_MESSAGE};
use crate::store::TaskStore;

fn due_text(t: &TaskSummary, today: chrono::NaiveDate) -> String {
    match t.due_date {
        Some(due) => {
            let mut s = relative_due(due, today);
            if let Some(time) = t.due_time {
                s.push_str(" at ");
                s.push_str(&clock_12h(time));
            }
            s
        }
        None => String::new(),
    }
}

fn task_rows<'a>(tasks: &'a [TaskSummary], today: chrono::NaiveDate) -> Vec<Row<'a>> {
    tasks
        .iter()
        .map(|t| {
            let style = match t.due_date {
                Some(due) if due < today => Style::default().fg(Color::Red),
                Some(due) if due == today => Style::default().fg(Color::Yellow),
                _ => Style::default().fg(Color::Green),
            };
            Row::new(vec![
                Cell::from(t.id.to_string()),
                Cell::from(t.title.as_str()),
                Cell::from(format!("{} min", t.time_cost)),
                Cell::from(due_text(t, today)),
            ])
            .style(style)
        })
        .collect()
}

const WIDTHS: [Constraint; 4] = [
    Constraint::Length(4),
    Constraint::Min(20),
    Constraint::Length(10),
    Constraint::Length(28),
];

pub fn ui<S: TaskStore>(f: &mut Frame, app: &mut App<S>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),     // Chosen
            Constraint::Length(8),  // Reminders
            Constraint::Length(3),  // Help
        ])
        .split(f.area());

    let header = Row::new(vec!["ID", "Title", "Cost", "Due"])
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .bottom_margin(1);

    let over = app.plan.total_minutes > app.budget;
    let title = format!(
        "Timebox - Today {} - {} of {} min{}",
        app.today,
        app.plan.total_minutes,
        app.budget,
        if over { " (over budget)" } else { "" }
    );
    let chosen = Table::new(task_rows(&app.plan.chosen, app.today), WIDTHS)
        .header(header.clone())
        .block(Block::default().borders(Borders::ALL).title(title))
        .row_highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
        .highlight_symbol(">> ");
    f.render_stateful_widget(chosen, chunks[0], &mut app.state);

    let reminders = Table::new(task_rows(&app.plan.notifications, app.today), WIDTHS)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title("Reminders"));
    f.render_widget(reminders, chunks[1]);

    let help = match &app.status {
        Some(status) => format!("{status}  |  q quit, +/- budget, b set budget, r roll, space done"),
        None => "q quit, j/k move, +/- budget, b set budget, r roll recurring, space done".to_string(),
    };
    let help = Paragraph::new(help).block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help, chunks[2]);

    if app.input_mode == InputMode::Budget {
        let area = centered_rect(60, 3, f.area());
        let input = Paragraph::new(app.input_buffer.as_str())
            .style(Style::default().fg(Color::Yellow))
            .block(Block::default().borders(Borders::ALL).title(PROMPT_MESSAGE));
        f.render_widget(Clear, area);
        f.render_widget(input, area);
    }
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let margin = r.height.saturating_sub(height) / 2;
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(margin),
            Constraint::Length(height),
            Constraint::Length(margin),
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
