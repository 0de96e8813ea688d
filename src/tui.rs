use anyhow::Result;
use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;

use crate::api::MatchApi;
use crate::models::{AnalysisResult, Credential};
use crate::scoring::{Tier, ats_compliance_score, percentage, tier_of};

struct AppState {
    analyses: Vec<AnalysisResult>,
    selected: usize,
    scroll_offset: u16,
    /// Shown in the footer instead of the key help until the next keypress.
    status: Option<String>,
}

impl AppState {
    fn new(analyses: Vec<AnalysisResult>) -> Self {
        Self {
            analyses,
            selected: 0,
            scroll_offset: 0,
            status: None,
        }
    }

    fn current(&self) -> Option<&AnalysisResult> {
        self.analyses.get(self.selected)
    }

    fn next(&mut self) {
        if !self.analyses.is_empty() && self.selected < self.analyses.len() - 1 {
            self.selected += 1;
            self.scroll_offset = 0;
        }
    }

    fn prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll_offset = 0;
        }
    }

    fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(3);
    }

    fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(3);
    }

    fn remove_current(&mut self) {
        if self.selected < self.analyses.len() {
            self.analyses.remove(self.selected);
            if self.selected >= self.analyses.len() && self.selected > 0 {
                self.selected -= 1;
            }
            self.scroll_offset = 0;
        }
    }

    fn delete_current(&mut self, api: &dyn MatchApi, cred: &Credential) {
        let Some(analysis) = self.current() else {
            return;
        };
        match api.delete_analysis(cred, analysis.id) {
            Ok(()) => self.remove_current(),
            Err(err) => self.status = Some(format!("Delete failed: {}", err)),
        }
    }
}

pub fn run_browse(api: &dyn MatchApi, cred: &Credential, limit: usize) -> Result<()> {
    let analyses = api.list_analyses(cred, limit)?;
    if analyses.is_empty() {
        println!("No analyses found. Run 'resmatch analyze' first.");
        return Ok(());
    }

    let mut state = AppState::new(analyses);

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, api, cred);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
    api: &dyn MatchApi,
    cred: &Credential,
) -> Result<()> {
    let mut list_state = ListState::default();
    list_state.select(Some(0));

    loop {
        terminal.draw(|frame| draw(frame, state, &mut list_state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            let prev_selected = state.selected;
            state.status = None;
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Down | KeyCode::Char('j') => state.next(),
                KeyCode::Up | KeyCode::Char('k') => state.prev(),
                KeyCode::Char('J') | KeyCode::PageDown => state.scroll_down(),
                KeyCode::Char('K') | KeyCode::PageUp => state.scroll_up(),
                KeyCode::Char('d') => {
                    state.delete_current(api, cred);
                    if state.analyses.is_empty() {
                        break;
                    }
                    list_state.select(Some(state.selected));
                }
                _ => {}
            }
            if state.selected != prev_selected {
                list_state.select(Some(state.selected));
            }
        }
    }
    Ok(())
}

fn tier_color(tier: Tier) -> Color {
    match tier {
        Tier::High => Color::Green,
        Tier::Medium => Color::Yellow,
        Tier::Low => Color::Red,
    }
}

fn draw(frame: &mut Frame, state: &AppState, list_state: &mut ListState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(frame.area());

    // Left panel: analysis list
    let items: Vec<ListItem> = state
        .analyses
        .iter()
        .map(|analysis| {
            let pct = percentage(analysis.overall_match_score);
            let line = Line::from(vec![
                Span::styled(
                    format!("{:>3}% ", pct),
                    Style::default().fg(tier_color(tier_of(analysis.overall_match_score))),
                ),
                Span::raw(format!(
                    "#{:<5} {}",
                    analysis.id,
                    analysis.created_at.format("%Y-%m-%d %H:%M")
                )),
            ]);
            ListItem::new(line)
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(format!(
            " Analyses ({}) ",
            state.analyses.len()
        )))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, chunks[0], list_state);

    // Right panel: analysis detail
    let detail = build_detail(state);
    let detail_widget = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));

    frame.render_widget(detail_widget, chunks[1]);

    // Footer help
    let help_area = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());

    let footer = match &state.status {
        Some(msg) => {
            Paragraph::new(format!(" {}", msg)).style(Style::default().fg(Color::Red))
        }
        None => Paragraph::new(" j/k:navigate  J/K:scroll  d:delete  q:quit")
            .style(Style::default().fg(Color::DarkGray)),
    };
    frame.render_widget(footer, help_area[1]);
}

fn score_line(label: &str, score: f64) -> Line<'static> {
    Line::from(vec![
        Span::raw(format!("  {:<22}", label)),
        Span::styled(
            format!("{:>3}%", percentage(score)),
            Style::default().fg(tier_color(tier_of(score))),
        ),
    ])
}

fn build_detail(state: &AppState) -> Text<'static> {
    let Some(analysis) = state.current() else {
        return Text::raw("No analysis selected");
    };

    let mut lines: Vec<Line> = Vec::new();

    let overall_tier = tier_of(analysis.overall_match_score);
    lines.push(Line::from(Span::styled(
        format!(
            "Analysis #{} - {} ({}%)",
            analysis.id,
            overall_tier.label(),
            percentage(analysis.overall_match_score)
        ),
        Style::default()
            .fg(tier_color(overall_tier))
            .add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(format!(
        "Run: {}",
        analysis.created_at.format("%Y-%m-%d %H:%M:%S")
    )));
    lines.push(Line::from(""));

    lines.push(Line::from(Span::styled(
        "SCORES",
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(score_line("Overall match", analysis.overall_match_score));
    lines.push(score_line("Technical skills", analysis.technical_skills_score));
    lines.push(score_line("Experience", analysis.experience_score));
    lines.push(score_line("Education", analysis.education_score));
    lines.push(score_line("Semantic similarity", analysis.semantic_similarity_score));
    lines.push(score_line("ATS compliance", ats_compliance_score(analysis)));
    lines.push(Line::from(""));

    if !analysis.matching_skills.is_empty() {
        lines.push(Line::from(Span::styled(
            format!("MATCHING SKILLS ({})", analysis.matching_skills.len()),
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        )));
        for line in textwrap::fill(&analysis.matching_skills.join(", "), 70).lines() {
            lines.push(Line::from(format!("  {}", line)));
        }
        lines.push(Line::from(""));
    }

    if !analysis.missing_skills.is_empty() {
        lines.push(Line::from(Span::styled(
            format!("MISSING SKILLS ({})", analysis.missing_skills.len()),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )));
        for line in textwrap::fill(&analysis.missing_skills.join(", "), 70).lines() {
            lines.push(Line::from(format!("  {}", line)));
        }
        lines.push(Line::from(""));
    }

    lines.push(Line::from(Span::styled(
        "ATS FEEDBACK",
        Style::default().add_modifier(Modifier::BOLD),
    )));
    if analysis.ats_feedback.is_empty() {
        lines.push(Line::from(Span::styled(
            "  (no flagged issues)",
            Style::default().fg(Color::DarkGray),
        )));
    } else {
        for feedback in &analysis.ats_feedback {
            for (i, line) in textwrap::fill(feedback, 68).lines().enumerate() {
                let prefix = if i == 0 { "  - " } else { "    " };
                lines.push(Line::from(format!("{}{}", prefix, line)));
            }
        }
    }

    Text::from(lines)
}
