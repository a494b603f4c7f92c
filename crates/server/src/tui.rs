use std::collections::VecDeque;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Tabs};

use baize::RoomState;

use crate::server::{ClientInfo, RoomInfo, ServerStats};

const MAX_LOG_LINES: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Rooms,
    Connections,
    Log,
}

impl Tab {
    const ALL: [Tab; 3] = [Tab::Rooms, Tab::Connections, Tab::Log];

    fn title(self) -> &'static str {
        match self {
            Tab::Rooms => "Rooms",
            Tab::Connections => "Connections",
            Tab::Log => "Log",
        }
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|&t| t == self).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Copy)]
enum LogLevel {
    Info,
    Warn,
    Error,
}

pub struct TuiState {
    tab: Tab,
    log: VecDeque<(LogLevel, String)>,
    scroll: usize,
    selected_connection: usize,
    pending_kick: Option<u32>,
}

impl TuiState {
    pub fn new() -> Self {
        Self {
            tab: Tab::Rooms,
            log: VecDeque::new(),
            scroll: 0,
            selected_connection: 0,
            pending_kick: None,
        }
    }

    fn push_log(&mut self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        match level {
            LogLevel::Info => log::info!("{message}"),
            LogLevel::Warn => log::warn!("{message}"),
            LogLevel::Error => log::error!("{message}"),
        }
        self.log.push_back((level, message));
        if self.log.len() > MAX_LOG_LINES {
            self.log.pop_front();
        }
    }

    pub fn log_info(&mut self, message: impl Into<String>) {
        self.push_log(LogLevel::Info, message);
    }

    pub fn log_warn(&mut self, message: impl Into<String>) {
        self.push_log(LogLevel::Warn, message);
    }

    pub fn log_error(&mut self, message: impl Into<String>) {
        self.push_log(LogLevel::Error, message);
    }

    pub fn active_tab(&self) -> Tab {
        self.tab
    }

    pub fn next_tab(&mut self) {
        self.tab = Tab::ALL[(self.tab.index() + 1) % Tab::ALL.len()];
    }

    pub fn prev_tab(&mut self) {
        self.tab = Tab::ALL[(self.tab.index() + Tab::ALL.len() - 1) % Tab::ALL.len()];
    }

    pub fn scroll_up(&mut self) {
        self.scroll = (self.scroll + 10).min(self.log.len());
    }

    pub fn scroll_down(&mut self) {
        self.scroll = self.scroll.saturating_sub(10);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll = 0;
    }

    pub fn select_prev_connection(&mut self, count: usize) {
        if count > 0 {
            self.selected_connection = (self.selected_connection + count - 1) % count;
        }
    }

    pub fn select_next_connection(&mut self, count: usize) {
        if count > 0 {
            self.selected_connection = (self.selected_connection + 1) % count;
        }
    }

    pub fn request_kick(&mut self, clients: &[ClientInfo]) {
        if let Some(client) = clients.get(self.selected_connection) {
            self.pending_kick = Some(client.client_id);
        }
    }

    pub fn take_pending_kick(&mut self) -> Option<u32> {
        self.pending_kick.take()
    }
}

pub fn render(
    frame: &mut Frame,
    state: &TuiState,
    stats: &ServerStats,
    rooms: &[RoomInfo],
    clients: &[ClientInfo],
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(6),
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(frame.area());

    render_header(frame, chunks[0], stats);
    render_status(frame, chunks[1], stats);
    render_network(frame, chunks[2], stats);
    render_tabs(frame, chunks[3], state);
    match state.tab {
        Tab::Rooms => render_rooms(frame, chunks[4], rooms),
        Tab::Connections => render_connections(frame, chunks[4], state, clients),
        Tab::Log => render_log(frame, chunks[4], state),
    }
    render_help(frame, chunks[5]);
}

fn render_header(frame: &mut Frame, area: Rect, stats: &ServerStats) {
    let uptime = format_duration(stats.uptime_secs);
    let title = format!(" Baize Server - Uptime: {} ", uptime);

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let text = format!(
        "Clients: {}  |  Rooms: {}  |  Simulating: {}",
        stats.client_count, stats.room_count, stats.simulating_rooms
    );

    let paragraph = Paragraph::new(text)
        .block(block)
        .style(Style::default().fg(Color::White));

    frame.render_widget(paragraph, area);
}

fn render_status(frame: &mut Frame, area: Rect, stats: &ServerStats) {
    let block = Block::default()
        .title(" Capacity ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    let client_ratio = stats.client_count as f64 / stats.max_clients.max(1) as f64;
    let gauge = Gauge::default()
        .block(block)
        .gauge_style(Style::default().fg(Color::Green))
        .ratio(client_ratio.min(1.0))
        .label(format!("{}/{} clients", stats.client_count, stats.max_clients));

    frame.render_widget(gauge, area);
}

fn render_network(frame: &mut Frame, area: Rect, stats: &ServerStats) {
    let block = Block::default()
        .title(" Network ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let net = &stats.network_stats;
    let lines = vec![
        Line::from(vec![
            Span::styled("Packets: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{} sent / {} recv", net.packets_sent, net.packets_received),
                Style::default().fg(Color::White),
            ),
        ]),
        Line::from(vec![
            Span::styled("Bytes: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!(
                    "{} sent / {} recv",
                    format_bytes(net.bytes_sent),
                    format_bytes(net.bytes_received)
                ),
                Style::default().fg(Color::White),
            ),
        ]),
        Line::from(vec![
            Span::styled("Simulated loss: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{} dropped", net.packets_dropped),
                Style::default().fg(if net.packets_dropped > 0 {
                    Color::Red
                } else {
                    Color::White
                }),
            ),
        ]),
        Line::from(vec![
            Span::styled("Rejected: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{} malformed", net.packets_rejected),
                Style::default().fg(Color::White),
            ),
        ]),
    ];

    let paragraph = Paragraph::new(lines).block(block);
    frame.render_widget(paragraph, area);
}

fn render_tabs(frame: &mut Frame, area: Rect, state: &TuiState) {
    let tabs = Tabs::new(Tab::ALL.iter().map(|t| t.title()))
        .block(Block::default().borders(Borders::ALL))
        .select(state.tab.index())
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );
    frame.render_widget(tabs, area);
}

fn render_rooms(frame: &mut Frame, area: Rect, rooms: &[RoomInfo]) {
    let block = Block::default().title(" Rooms ").borders(Borders::ALL);
    let lines: Vec<Line> = if rooms.is_empty() {
        vec![Line::from(Span::styled(
            "no rooms",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        rooms
            .iter()
            .map(|room| {
                let color = match room.state {
                    RoomState::Waiting => Color::Yellow,
                    RoomState::Playing => Color::Green,
                    RoomState::Paused => Color::Magenta,
                    RoomState::Finished => Color::DarkGray,
                };
                Line::from(vec![
                    Span::styled(format!("#{:<5}", room.room_id), Style::default().fg(Color::Cyan)),
                    Span::styled(format!("{:<10}", format!("{:?}", room.state)), Style::default().fg(color)),
                    Span::raw(format!(
                        "{:<24} turn {}  shots {:<4} tick {:<8}{}",
                        room.players.join(" vs "),
                        room.current_player,
                        room.shot_count,
                        room.tick,
                        if room.simulating { " moving" } else { "" }
                    )),
                ])
            })
            .collect()
    };
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_connections(frame: &mut Frame, area: Rect, state: &TuiState, clients: &[ClientInfo]) {
    let block = Block::default().title(" Connections ").borders(Borders::ALL);
    let lines: Vec<Line> = clients
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let style = if i == state.selected_connection {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            let seat = match c.seat {
                Some((room, slot)) => format!("room {room} seat {slot}"),
                None => String::from("lobby"),
            };
            Line::styled(
                format!(
                    "{:<4} {:<22} {:<12} {:<18} rtt {:>6.1}ms  idle {:>5}ms  unacked {}",
                    c.client_id,
                    c.addr,
                    c.name.as_deref().unwrap_or("-"),
                    seat,
                    c.rtt_ms,
                    c.idle_ms,
                    c.pending_reliable
                ),
                style,
            )
        })
        .collect();
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_log(frame: &mut Frame, area: Rect, state: &TuiState) {
    let block = Block::default().title(" Log ").borders(Borders::ALL);
    let visible = area.height.saturating_sub(2) as usize;
    let end = state.log.len().saturating_sub(state.scroll);
    let start = end.saturating_sub(visible);
    let lines: Vec<Line> = state
        .log
        .range(start..end)
        .map(|(level, message)| {
            let color = match level {
                LogLevel::Info => Color::White,
                LogLevel::Warn => Color::Yellow,
                LogLevel::Error => Color::Red,
            };
            Line::styled(message.as_str(), Style::default().fg(color))
        })
        .collect();
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_help(frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .title(" Controls ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let text = Paragraph::new("q/Esc quit  Tab switch view  Up/Down select  k kick  PgUp/PgDn scroll log")
        .block(block)
        .style(
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        );

    frame.render_widget(text, area);
}

fn format_duration(secs: u64) -> String {
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;
    format!("{:02}:{:02}:{:02}", hours, mins, secs)
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{}B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1}KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1}MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1}GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tabs_cycle_both_ways() {
        let mut state = TuiState::new();
        state.next_tab();
        assert_eq!(state.active_tab(), Tab::Connections);
        state.prev_tab();
        state.prev_tab();
        assert_eq!(state.active_tab(), Tab::Log);
    }

    #[test]
    fn log_is_bounded() {
        let mut state = TuiState::new();
        for i in 0..MAX_LOG_LINES + 20 {
            state.log_info(format!("line {i}"));
        }
        assert_eq!(state.log.len(), MAX_LOG_LINES);
    }

    #[test]
    fn byte_formatting() {
        assert_eq!(format_bytes(512), "512B");
        assert_eq!(format_bytes(2048), "2.0KB");
        assert_eq!(format_duration(3725), "01:02:05");
    }
}
