use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use snipsmith_config::Config;
use snipsmith_engine::{
    ExpandOptions, IndentUtil, Position, SnippetError, SnippetInstance, TabStopInfo,
};
use std::{
    env,
    io::{Stdout, stdout},
    path::PathBuf,
    process,
};

mod shell;

use shell::ShellEvaluator;

struct App {
    instance: SnippetInstance,
    evaluator: ShellEvaluator,
    focused: Option<TabStopInfo>,
    /// The next keystroke replaces the focused placeholder instead of
    /// appending to it.
    overwrite: bool,
    status: String,
    /// Template offered for nested expansion with Ctrl-N.
    template: String,
}

enum Outcome {
    Accept,
    Cancel,
}

impl App {
    fn new(template: &str, config: &Config) -> Result<Self> {
        let mut evaluator = ShellEvaluator::new(&config.shell);
        let options = ExpandOptions {
            indent_util: IndentUtil {
                shiftwidth: config.indent.shiftwidth,
                tabstop: config.indent.tabstop,
                expandtab: config.indent.expandtab,
            },
            ..ExpandOptions::default()
        };
        let (mut instance, failures) = SnippetInstance::new(template, options, &mut evaluator)
            .map_err(describe_snippet_error)?;
        let status = if failures.is_empty() {
            String::new()
        } else {
            log::warn!("{} fragment(s) failed while expanding", failures.len());
            describe_snippet_error(SnippetError::Evaluation(failures)).to_string()
        };

        let focused = if instance.has_tabs() {
            instance.select_next_tab()
        } else {
            None
        };

        Ok(Self {
            instance,
            evaluator,
            focused,
            overwrite: true,
            status,
            template: template.to_string(),
        })
    }

    /// Expands the template again inside the focused tabstop.
    fn expand_nested(&mut self) {
        if self.focused.is_none() {
            return;
        }
        match self.instance.expand_nested(&self.template, &mut self.evaluator) {
            Ok(focused) => {
                self.focused = focused;
                self.status.clear();
            }
            Err(e) => {
                log::warn!("nested expansion failed: {e}");
                self.status = describe_snippet_error(e).to_string();
                self.focused = self.instance.current_tabstop();
            }
        }
        self.overwrite = true;
    }

    fn next_tab(&mut self) -> Option<Outcome> {
        self.focused = self.instance.select_next_tab();
        self.overwrite = true;
        self.status.clear();
        // Jumping past the final tabstop accepts the snippet
        self.focused.is_none().then_some(Outcome::Accept)
    }

    fn previous_tab(&mut self) {
        self.focused = self.instance.select_previous_tab();
        self.overwrite = true;
        self.status.clear();
    }

    fn type_char(&mut self, c: char) {
        let Some(focused) = &self.focused else {
            return;
        };
        let mut text = if self.overwrite {
            String::new()
        } else {
            focused.text.clone()
        };
        text.push(c);
        self.set_focused_text(&text);
    }

    fn backspace(&mut self) {
        let Some(focused) = &self.focused else {
            return;
        };
        let mut text = if self.overwrite {
            String::new()
        } else {
            focused.text.clone()
        };
        text.pop();
        self.set_focused_text(&text);
    }

    fn set_focused_text(&mut self, text: &str) {
        let Some(number) = self.focused.as_ref().map(|ts| ts.number) else {
            return;
        };
        match self
            .instance
            .set_tabstop_text(number, text, &mut self.evaluator)
        {
            Ok(()) => self.status.clear(),
            Err(e) => {
                log::warn!("update after editing ${number} failed: {e}");
                self.status = describe_snippet_error(e).to_string();
            }
        }
        self.overwrite = false;
        self.focused = self.instance.current_tabstop();
    }
}

fn describe_snippet_error(error: SnippetError) -> anyhow::Error {
    match error {
        SnippetError::Evaluation(failures) => {
            let details: Vec<String> = failures.iter().map(|f| f.to_string()).collect();
            anyhow::anyhow!("Fragment evaluation failed: {}", details.join("; "))
        }
        other => anyhow::Error::new(other),
    }
}

fn init_logging(level: &str) {
    let level = level.parse().unwrap_or(log::LevelFilter::Info);
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let config_path = Config::config_path();

    let config = match Config::load_or_default() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            process::exit(1);
        }
    };

    init_logging(&config.log_level);
    log::info!("snipsmith starting up");
    log::debug!("Config path: {}", config_path.display());

    let template_path = match args.as_slice() {
        [_, flag] if flag == "--init-config" => {
            config.save()?;
            println!("Wrote config file to {}", config_path.display());
            return Ok(());
        }
        [_, path] => PathBuf::from(path),
        _ => {
            eprintln!("Usage: {} <template-file>", args[0]);
            eprintln!("       {} --init-config", args[0]);
            process::exit(1);
        }
    };

    let template = std::fs::read_to_string(&template_path)
        .with_context(|| format!("Failed to read template {}", template_path.display()))?;
    // Template files conventionally end with a newline that is not part of the snippet
    let template = template.strip_suffix('\n').unwrap_or(&template);

    let mut app = match App::new(template, &config) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Error: Failed to expand {}: {e}", template_path.display());
            process::exit(1);
        }
    };

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    match res {
        Ok(Outcome::Accept) => print!("{}", app.instance.finish()),
        Ok(Outcome::Cancel) => log::info!("expansion cancelled"),
        Err(err) => println!("{err:?}"),
    }

    Ok(())
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<Outcome> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            match key.code {
                KeyCode::Esc => return Ok(Outcome::Cancel),
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    return Ok(Outcome::Cancel);
                }
                KeyCode::Char('n') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    app.expand_nested();
                }
                KeyCode::Enter => return Ok(Outcome::Accept),
                KeyCode::Tab => {
                    if let Some(outcome) = app.next_tab() {
                        return Ok(outcome);
                    }
                }
                KeyCode::BackTab => app.previous_tab(),
                KeyCode::Backspace => app.backspace(),
                KeyCode::Char(c) => app.type_char(c),
                _ => {}
            }
        }
    }
}

/// Splits one line of the snippet into the parts before, inside and after
/// the focused span.
fn split_line(line: &str, line_idx: usize, focus: snipsmith_engine::Span) -> [String; 3] {
    let len = line.chars().count();
    let col_at = |pos: Position| {
        if pos.line < line_idx {
            0
        } else if pos.line > line_idx {
            len
        } else {
            pos.col.min(len)
        }
    };
    let from = col_at(focus.start);
    let to = col_at(focus.end).max(from);

    let mut chars = line.chars();
    let before: String = chars.by_ref().take(from).collect();
    let inside: String = chars.by_ref().take(to - from).collect();
    let after: String = chars.collect();
    [before, inside, after]
}

fn render_snippet(app: &App) -> Vec<Line<'static>> {
    let text = app.instance.text();
    let highlight = Style::default().bg(Color::Yellow).fg(Color::Black);
    let start = app.instance.abs_span().start;

    text.split('\n')
        .enumerate()
        .map(|(idx, line)| {
            let Some(focused) = &app.focused else {
                return Line::from(line.to_string());
            };
            let span = snipsmith_engine::Span::new(
                focused.span.start.relative_to(start),
                focused.span.end.relative_to(start),
            );
            let [before, inside, after] = split_line(line, idx, span);
            let mut spans = vec![Span::raw(before), Span::styled(inside, highlight)];
            // Keep an empty placeholder visible as a cursor cell
            if span.is_empty() && span.start.line == idx {
                spans.push(Span::styled(" ", highlight));
            }
            spans.push(Span::raw(after));
            Line::from(spans)
        })
        .collect()
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([Constraint::Min(0), Constraint::Length(3)].as_ref())
        .split(f.area());

    let title = match &app.focused {
        Some(ts) => format!("Snippet (${})", ts.number),
        None => "Snippet".to_string(),
    };
    let snippet = Paragraph::new(render_snippet(app))
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(snippet, chunks[0]);

    let footer = if app.status.is_empty() {
        Line::from(vec![
            Span::raw("Tab: Next | "),
            Span::raw("Shift-Tab: Previous | "),
            Span::raw("Ctrl-N: Nest | "),
            Span::raw("Enter: Accept | "),
            Span::raw("Esc: Cancel"),
        ])
    } else {
        Line::from(Span::styled(
            app.status.clone(),
            Style::default().fg(Color::Red),
        ))
    };
    let help = Paragraph::new(vec![footer]).block(Block::default());
    f.render_widget(help, chunks[1]);
}
