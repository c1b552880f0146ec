//! Drawing

use mwatch_supervisor::{Orchestrator, Slot, SlotStatus};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use super::app::{App, KEY_HELP};

/// Draw the whole panel
pub fn render(frame: &mut Frame, app: &App, orchestrator: &Orchestrator) {
    let [body, footer] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(1)]).areas(frame.area());

    if app.zoomed() {
        for (index, slot) in orchestrator.slots().iter().enumerate() {
            if index == app.selected() {
                render_slot(frame, body, slot, true);
            } else {
                // hidden slots still fold their queued output into history
                slot.drain_log(0);
            }
        }
    } else {
        let count = orchestrator.len().max(1) as u32;
        let rows = Layout::vertical(
            orchestrator
                .slots()
                .iter()
                .map(|_| Constraint::Ratio(1, count)),
        )
        .split(body);
        for (index, (slot, area)) in orchestrator.slots().iter().zip(rows.iter()).enumerate() {
            render_slot(frame, *area, slot, index == app.selected());
        }
    }

    render_footer(frame, footer);

    if app.show_help() {
        render_help(frame, frame.area());
    }
}

fn render_slot(frame: &mut Frame, area: Rect, slot: &Slot, selected: bool) {
    let status = slot.status();
    let marker = if selected { "▶ " } else { "  " };
    let title = Line::from(vec![
        Span::raw(marker),
        Span::styled(format!("[{}]", status.as_str()), status_style(status)),
        Span::raw(" "),
        Span::styled(slot.name().to_string(), Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" "),
    ]);

    let border = if selected {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(title);

    let inner_height = block.inner(area).height as usize;
    let lines: Vec<Line> = match (status, slot.last_exception()) {
        (SlotStatus::Failed, Some(trace)) => trace
            .into_iter()
            .map(|line| Line::styled(line, Style::default().fg(Color::Red)))
            .collect(),
        _ => slot
            .drain_log(inner_height)
            .into_iter()
            .map(Line::raw)
            .collect(),
    };

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_footer(frame: &mut Frame, area: Rect) {
    let hint = Line::from(vec![
        Span::raw("["),
        Span::styled("h", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("]elp"),
    ]);
    frame.render_widget(Paragraph::new(hint).style(Style::default().fg(Color::DarkGray)), area);
}

fn render_help(frame: &mut Frame, area: Rect) {
    let lines: Vec<Line> = KEY_HELP
        .iter()
        .map(|(keys, what)| {
            Line::from(vec![
                Span::styled(format!("{:>9}  ", keys), Style::default().fg(Color::Yellow)),
                Span::raw(*what),
            ])
        })
        .collect();

    let popup = centered_rect(50, KEY_HELP.len() as u16 + 2, area);
    let block = Block::default().borders(Borders::ALL).title(" Keys ");
    frame.render_widget(Clear, popup);
    frame.render_widget(Paragraph::new(lines).block(block), popup);
}

/// Color of a status tag
pub fn status_style(status: SlotStatus) -> Style {
    let color = match status {
        SlotStatus::Running => Color::Green,
        SlotStatus::Terminating => Color::Yellow,
        SlotStatus::Killing => Color::Magenta,
        SlotStatus::Stopped => Color::Gray,
        SlotStatus::Failed => Color::Red,
    };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

/// Rectangle of `width` x `height` centered in `area`, clipped to it
pub fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
