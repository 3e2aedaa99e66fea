use crate::client::AppSnapshot;
use color_eyre::eyre::Result;
use color_game_royale::{
    advisory::{
        DangerLevel,
        WAITING_LINE,
    },
    game::{
        GamePhase,
        RoundPhase,
        RoundReport,
    },
    palette::{
        Champion,
        ColorCategory,
    },
};
use crossterm::{
    event::{
        Event,
        EventStream,
        KeyCode,
        KeyEvent,
        KeyEventKind,
        KeyModifiers,
    },
    terminal::{
        disable_raw_mode,
        enable_raw_mode,
    },
};
use futures::StreamExt;
use itertools::Itertools;
use ratatui::{
    prelude::*,
    widgets::*,
};
use std::io::stdout;
use tokio::sync::mpsc;
use unicode_width::UnicodeWidthStr;

const BANNER: [&str; 3] = [
    "C O L O R   G A M E",
    "~ R O Y A L E ~",
    "Drain the Umbra, one roll at a time",
];
const HISTORY_SHOWN: usize = 18;

pub enum UserEvent {
    Quit,
    InsertCoin,
    SelectChampion(Champion),
    PlaceBet(ColorCategory),
    RaiseStake,
    LowerStake,
    Roll,
    Dismiss,
    Redraw,
    Ignored,
}

pub type InputEventReceiver = mpsc::UnboundedReceiver<std::io::Result<Event>>;

/// Forwards crossterm events from a background task so the app loop can
/// `select!` on them next to its timers.
pub fn input_event_stream() -> InputEventReceiver {
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        let mut events = EventStream::new();
        while let Some(event) = events.next().await {
            if tx.send(event).is_err() {
                break;
            }
        }
    });
    rx
}

#[derive(Debug)]
pub struct UiState {
    mode: Mode,
    phase: GamePhase,
    champion_idx: usize,
    terminal: Option<Terminal<CrosstermBackend<std::io::Stdout>>>,
}

impl Default for UiState {
    fn default() -> Self {
        UiState {
            mode: Mode::Normal,
            phase: GamePhase::Title,
            champion_idx: 0,
            terminal: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
enum Mode {
    #[default]
    Normal,
    QuitModal,
}

pub fn terminal_enter(state: &mut UiState) -> Result<()> {
    enable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout());
    let terminal = Terminal::new(backend)?;
    state.terminal = Some(terminal);
    Ok(())
}

pub fn terminal_exit() -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen)?;
    Ok(())
}

pub fn draw(state: &mut UiState, snap: &AppSnapshot) -> Result<()> {
    state.phase = snap.game.phase;
    if let Some(mut term) = state.terminal.take() {
        term.draw(|f| ui(f, state, snap))?;
        state.terminal = Some(term);
    }
    Ok(())
}

pub fn on_input(state: &mut UiState, event: Event) -> UserEvent {
    match event {
        Event::Key(k) if k.kind == KeyEventKind::Press => on_key(state, k),
        Event::Resize(..) => UserEvent::Redraw,
        _ => UserEvent::Ignored,
    }
}

fn on_key(state: &mut UiState, k: KeyEvent) -> UserEvent {
    // Raw mode swallows SIGINT.
    if k.modifiers.contains(KeyModifiers::CONTROL) && k.code == KeyCode::Char('c') {
        return UserEvent::Quit;
    }
    if state.mode == Mode::QuitModal {
        return match k.code {
            KeyCode::Char('y') | KeyCode::Enter => UserEvent::Quit,
            KeyCode::Char('n') | KeyCode::Esc => {
                state.mode = Mode::Normal;
                UserEvent::Redraw
            }
            _ => UserEvent::Ignored,
        };
    }
    if k.code == KeyCode::Char('q') {
        state.mode = Mode::QuitModal;
        return UserEvent::Redraw;
    }

    match state.phase {
        GamePhase::Title => match k.code {
            KeyCode::Enter | KeyCode::Char(' ') => UserEvent::InsertCoin,
            _ => UserEvent::Ignored,
        },
        GamePhase::ChampionSelect => match k.code {
            KeyCode::Char('1') => UserEvent::SelectChampion(Champion::Ren),
            KeyCode::Char('2') => UserEvent::SelectChampion(Champion::Rei),
            KeyCode::Left | KeyCode::Right => {
                state.champion_idx = (state.champion_idx + 1) % Champion::ALL.len();
                UserEvent::Redraw
            }
            KeyCode::Enter => UserEvent::SelectChampion(Champion::ALL[state.champion_idx]),
            _ => UserEvent::Ignored,
        },
        GamePhase::Playing(_) => match k.code {
            KeyCode::Char(' ') => UserEvent::Roll,
            KeyCode::Enter | KeyCode::Esc => UserEvent::Dismiss,
            KeyCode::Char('+') | KeyCode::Char('=') => UserEvent::RaiseStake,
            KeyCode::Char('-') => UserEvent::LowerStake,
            KeyCode::Char(c) => color_for_key(c)
                .map(UserEvent::PlaceBet)
                .unwrap_or(UserEvent::Ignored),
            _ => UserEvent::Ignored,
        },
    }
}

fn color_for_key(c: char) -> Option<ColorCategory> {
    match c {
        'r' => Some(ColorCategory::Red),
        'g' => Some(ColorCategory::Green),
        'b' => Some(ColorCategory::Blue),
        'y' => Some(ColorCategory::Yellow),
        '1'..='4' => ColorCategory::from_index(c as usize - '1' as usize),
        _ => None,
    }
}

fn ui(f: &mut Frame, state: &UiState, snap: &AppSnapshot) {
    f.render_widget(Clear, f.area());
    match snap.game.phase {
        GamePhase::Title => draw_title(f, f.area(), snap),
        GamePhase::ChampionSelect => draw_champion_select(f, f.area(), state),
        GamePhase::Playing(round) => {
            draw_playing(f, f.area(), snap);
            if round == RoundPhase::ResultShown
                && let Some(report) = &snap.game.last_round
            {
                draw_result_modal(f, report);
            }
        }
    }
    if state.mode == Mode::QuitModal {
        draw_quit_modal(f);
    }
}

fn centered_line(text: &str, width: u16) -> String {
    let pad = (width as usize).saturating_sub(text.width()) / 2;
    format!("{}{}", " ".repeat(pad), text)
}

fn draw_title(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let inner_width = area.width.saturating_sub(2);
    let mut lines: Vec<Line> = vec![Line::from(""); 3];
    for (i, row) in BANNER.iter().enumerate() {
        let style = if i < 2 {
            Style::default()
                .fg(color_of(ColorCategory::ALL[i * 2]))
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::ITALIC)
        };
        lines.push(Line::styled(centered_line(row, inner_width), style));
    }
    lines.push(Line::from(""));
    let prompt = if snap.coin_dropping {
        "* clink *  the coin drops..."
    } else {
        "Press ENTER to insert a coin"
    };
    lines.push(Line::styled(
        centered_line(prompt, inner_width),
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::SLOW_BLINK),
    ));
    lines.push(Line::from(""));
    lines.push(Line::from(centered_line(
        &format!("Purse: {} coins", snap.game.purse),
        inner_width,
    )));
    let widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Color Game Royale"));
    f.render_widget(widget, area);
}

fn draw_champion_select(f: &mut Frame, area: Rect, state: &UiState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(6),
            Constraint::Length(3),
        ])
        .split(area);
    let header = Paragraph::new("Choose your champion")
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(header, rows[0]);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(rows[1]);
    for (i, champion) in Champion::ALL.iter().enumerate() {
        let selected = i == state.champion_idx;
        let border = if selected {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        let lines = vec![
            Line::from(""),
            Line::styled(
                champion.to_string(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Line::from(champion.title().to_uppercase()),
        ];
        let card = Paragraph::new(lines).alignment(Alignment::Center).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border)
                .title(format!("[{}]", i + 1)),
        );
        f.render_widget(card, cols[i]);
    }

    let help = Paragraph::new("1/2 pick | ←/→ move | Enter confirm | q quit")
        .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help, rows[2]);
}

fn draw_playing(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4), // purse, score, streak
            Constraint::Length(3), // umbra gauge
            Constraint::Length(6), // bet board
            Constraint::Length(3), // dice
            Constraint::Min(7),    // history + oracle
            Constraint::Length(5), // status/errors
            Constraint::Length(3), // help
        ])
        .split(area);

    draw_hud(f, chunks[0], snap);
    draw_boss(f, chunks[1], snap);
    draw_board(f, chunks[2], snap);
    draw_dice(f, chunks[3], snap);
    draw_lower(f, chunks[4], snap);
    draw_bottom(f, chunks[5], chunks[6], snap);
}

fn draw_hud(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let game = &snap.game;
    let champion = game
        .champion
        .map(|c| format!("{c}, {}", c.title()))
        .unwrap_or_else(|| String::from("-"));
    let mut lines = vec![Line::from(format!(
        "Purse: {} | Score: {} | Stake: {} | Champion: {}",
        game.purse, game.score, snap.stake, champion
    ))];
    if game.streak_count > 1 {
        lines.push(Line::styled(
            format!("COMBO STREAK x{}!", game.streak_count),
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        ));
    }
    let widget = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Arena"));
    f.render_widget(widget, area);
}

fn draw_boss(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let game = &snap.game;
    let ratio = if game.boss_max_hp == 0 {
        0.0
    } else {
        game.boss_hp as f64 / game.boss_max_hp as f64
    };
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Umbra"))
        .gauge_style(Style::default().fg(Color::Magenta))
        .ratio(ratio.clamp(0.0, 1.0))
        .label(format!("{} / {} HP", game.boss_hp, game.boss_max_hp));
    f.render_widget(gauge, area);
}

fn draw_board(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(25); 4])
        .split(area);
    let last = snap
        .game
        .last_round
        .as_ref()
        .filter(|_| snap.game.phase == GamePhase::Playing(RoundPhase::ResultShown));
    for (i, color) in ColorCategory::ALL.iter().copied().enumerate() {
        let stake = match last {
            Some(report) => report.staked.stake(color),
            None => snap.game.active_bets.stake(color),
        };
        let mut lines = vec![
            Line::from(format!("Stake: {stake}")),
            Line::styled(
                format!("[{}] {}", i + 1, color.id().chars().next().unwrap_or(' ')),
                Style::default().fg(Color::DarkGray),
            ),
        ];
        if let Some(report) = last {
            let matches = report.outcome.matches(color);
            if matches > 0 {
                lines.push(Line::styled(
                    format!("x{matches}"),
                    Style::default().add_modifier(Modifier::BOLD),
                ));
            }
        }
        let cell = Paragraph::new(lines).alignment(Alignment::Center).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color_of(color)))
                .title(format!("{color} · {}", color.faction())),
        );
        f.render_widget(cell, cols[i]);
    }
}

fn draw_dice(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let line = if snap.game.is_rolling {
        Line::styled(
            "?   ?   ?",
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::SLOW_BLINK),
        )
    } else if let Some(outcome) = &snap.game.last_outcome {
        let spans = outcome
            .dice()
            .iter()
            .flat_map(|c| [color_span(*c), Span::raw("   ")])
            .collect::<Vec<_>>();
        Line::from(spans)
    } else {
        Line::styled("press SPACE to drop the dice", Style::default().fg(Color::DarkGray))
    };
    let widget = Paragraph::new(line)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Dice"));
    f.render_widget(widget, area);
}

fn draw_lower(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);
    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(3)])
        .split(cols[0]);

    let history = &snap.game.history;
    let recent = history.iter().rev().take(HISTORY_SHOWN).rev();
    let spans = recent
        .flat_map(|c| [color_span(*c), Span::raw(" ")])
        .collect::<Vec<_>>();
    let widget = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("History ({})", history.len())),
    );
    f.render_widget(widget, left[0]);

    let balance = snap
        .game
        .elemental_balance
        .iter()
        .map(|(faction, count)| format!("{faction}: {count}"))
        .join("\n");
    let widget = Paragraph::new(balance)
        .block(Block::default().borders(Borders::ALL).title("Elemental Balance"));
    f.render_widget(widget, left[1]);

    draw_oracle(f, cols[1], snap);
}

fn draw_oracle(f: &mut Frame, area: Rect, snap: &AppSnapshot) {
    let mut lines: Vec<Line> = Vec::new();
    match &snap.oracle {
        None => lines.push(Line::styled(
            WAITING_LINE,
            Style::default().add_modifier(Modifier::ITALIC),
        )),
        Some(consultation) => {
            let prophecy = &consultation.prophecy;
            if let Some(message) = &prophecy.message {
                lines.push(Line::styled(
                    format!("\"{message}\""),
                    Style::default().add_modifier(Modifier::ITALIC),
                ));
            }
            if let Some(rationale) = &prophecy.rationale {
                lines.push(Line::styled(
                    rationale.clone(),
                    Style::default().fg(Color::Gray),
                ));
            }
            match prophecy.recommended_category() {
                Some(color) => {
                    lines.push(Line::from(vec![Span::raw("Favored: "), color_span(color)]))
                }
                None => {
                    if let Some(raw) = &prophecy.recommended_color {
                        lines.push(Line::from(format!("Favored: {raw}")));
                    }
                }
            }
            if let Some(danger) = prophecy.danger_level {
                lines.push(Line::from(vec![
                    Span::raw("Danger: "),
                    Span::styled(danger.to_string(), Style::default().fg(danger_color(danger))),
                ]));
            }
            let mut footer = format!(
                "#{} answered in {}ms",
                consultation.seq,
                consultation.latency.as_millis()
            );
            if consultation.fell_back {
                footer.push_str(" (fallback)");
            }
            lines.push(Line::styled(footer, Style::default().fg(Color::DarkGray)));
        }
    }
    let title = if snap.oracle_thinking {
        "Oracle (thinking...)"
    } else {
        "Oracle"
    };
    let widget = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(widget, area);
}

fn draw_bottom(f: &mut Frame, status_area: Rect, help_area: Rect, snap: &AppSnapshot) {
    let mut lines: Vec<Line> = Vec::new();
    if snap.status.trim().is_empty() {
        lines.push(Line::from("Ready"));
    } else {
        lines.push(Line::styled(
            snap.status.clone(),
            Style::default().fg(Color::Green),
        ));
    }
    for e in snap.errors.iter().rev().take(2) {
        lines.push(Line::styled(e.clone(), Style::default().fg(Color::Red)));
    }
    let status_widget = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(status_widget, status_area);

    let help = Paragraph::new(
        "r/g/b/y or 1-4 bet | +/- stake | Space roll | Enter/Esc dismiss | q quit",
    )
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(help, help_area);
}

fn draw_result_modal(f: &mut Frame, report: &RoundReport) {
    let area = centered_rect(50, 50, f.area());
    f.render_widget(Clear, area);
    let resolution = &report.resolution;

    let dice = report
        .outcome
        .dice()
        .iter()
        .flat_map(|c| [color_span(*c), Span::raw(" ")])
        .collect::<Vec<_>>();
    let mut lines = vec![Line::from(dice), Line::from("")];
    if resolution.is_win() {
        lines.push(Line::styled(
            format!("+{} coins", resolution.payout),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ));
        lines.push(Line::from(format!(
            "The Umbra takes {} damage ({} HP left)",
            resolution.damage, report.boss_hp
        )));
        let hits = report
            .staked
            .entries()
            .filter(|(color, _)| resolution.matches_for(*color) > 0)
            .map(|(color, stake)| {
                format!("{color} {stake} x{}", resolution.matches_for(color))
            })
            .join(", ");
        lines.push(Line::from(hits));
    } else {
        lines.push(Line::styled(
            format!("No match. {} coins lost", report.staked.total()),
            Style::default().fg(Color::Red),
        ));
    }
    if report.streak > 1 {
        lines.push(Line::styled(
            format!("COMBO STREAK x{}!", report.streak),
            Style::default()
                .fg(Color::Magenta)
                .add_modifier(Modifier::BOLD),
        ));
    }
    lines.push(Line::from(""));
    lines.push(Line::styled(
        "Enter to continue",
        Style::default().fg(Color::DarkGray),
    ));

    let widget = Paragraph::new(lines)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Round {}", report.round)),
        );
    f.render_widget(widget, area);
}

fn draw_quit_modal(f: &mut Frame) {
    let area = centered_rect(40, 20, f.area());
    f.render_widget(Clear, area);
    let widget = Paragraph::new("Leave the arena? (y/n)")
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title("Quit"));
    f.render_widget(widget, area);
}

fn color_of(color: ColorCategory) -> Color {
    match color {
        ColorCategory::Red => Color::Red,
        ColorCategory::Green => Color::Green,
        ColorCategory::Blue => Color::Blue,
        ColorCategory::Yellow => Color::Yellow,
    }
}

fn color_span(color: ColorCategory) -> Span<'static> {
    Span::styled(
        color.to_string(),
        Style::default()
            .fg(color_of(color))
            .add_modifier(Modifier::BOLD),
    )
}

fn danger_color(danger: DangerLevel) -> Color {
    match danger {
        DangerLevel::Low => Color::Green,
        DangerLevel::Medium => Color::Yellow,
        DangerLevel::High => Color::Red,
    }
}

fn centered_rect(w_percent: u16, h_percent: u16, r: Rect) -> Rect {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - h_percent) / 2),
            Constraint::Percentage(h_percent),
            Constraint::Percentage((100 - h_percent) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w_percent) / 2),
            Constraint::Percentage(w_percent),
            Constraint::Percentage((100 - w_percent) / 2),
        ])
        .split(rows[1])[1]
}

#[allow(non_snake_case)]
#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn on_input__maps_color_keys_while_playing() {
        let mut state = UiState {
            phase: GamePhase::Playing(RoundPhase::Idle),
            ..UiState::default()
        };

        let by_letter = on_input(&mut state, key(KeyCode::Char('b')));
        let by_digit = on_input(&mut state, key(KeyCode::Char('4')));

        assert!(matches!(by_letter, UserEvent::PlaceBet(ColorCategory::Blue)));
        assert!(matches!(by_digit, UserEvent::PlaceBet(ColorCategory::Yellow)));
    }

    #[test]
    fn on_input__quit_asks_first() {
        let mut state = UiState::default();

        let first = on_input(&mut state, key(KeyCode::Char('q')));
        let second = on_input(&mut state, key(KeyCode::Char('y')));

        assert!(matches!(first, UserEvent::Redraw));
        assert!(matches!(second, UserEvent::Quit));
    }

    #[test]
    fn on_input__champion_select_cycles_and_confirms() {
        let mut state = UiState {
            phase: GamePhase::ChampionSelect,
            ..UiState::default()
        };

        on_input(&mut state, key(KeyCode::Right));
        let confirmed = on_input(&mut state, key(KeyCode::Enter));

        assert!(matches!(confirmed, UserEvent::SelectChampion(Champion::Rei)));
    }
}
