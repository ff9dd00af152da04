use anyhow::{Context, Result};
use clap::Parser;
use keydoor_core::{
    Position,
    config::TrainingConfig,
    episode::{Episode, MoveKind, StepOutcome, Termination},
    trainer::{EpisodeReport, Trainer},
    world::{Cell, GridWorld},
};
use ratatui::{
    crossterm::{
        self,
        event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
    widgets::*,
};
use std::{
    io::{self, Stdout},
    path::PathBuf,
    time::{Duration, Instant},
};

#[derive(Parser, Debug)]
#[command(version, about = "Tabular Q-learning agent that fetches a key and walks to a door")]
struct Args {
    /// JSON training configuration; missing fields use the reference defaults
    #[arg(short, long, value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Seed for world generation and exploration
    #[arg(short, long)]
    seed: Option<u64>,

    /// Number of episodes to run
    #[arg(short, long)]
    episodes: Option<usize>,

    /// Run without the interactive view and print each final world
    #[arg(long)]
    headless: bool,

    /// Milliseconds between ticks in the interactive view
    #[arg(long, default_value_t = 250)]
    tick_ms: u64,
}

fn load_config(args: &Args) -> Result<TrainingConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?
        }
        None => TrainingConfig::default(),
    };
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    if let Some(episodes) = args.episodes {
        config.episodes = episodes;
    }
    Ok(config)
}

struct App {
    trainer: Trainer,
    /// The episode being played, if any.
    episode: Option<Episode>,
    last_outcome: Option<StepOutcome>,
    reports: Vec<EpisodeReport>,
    should_quit: bool,
}

impl App {
    fn new(trainer: Trainer) -> Self {
        App {
            trainer,
            episode: None,
            last_outcome: None,
            reports: Vec::new(),
            should_quit: false,
        }
    }

    /// Handles one step of the simulation.
    ///
    /// A finished episode stays on screen for one extra tick before the next world is generated.
    fn tick(&mut self) -> Result<()> {
        if self.is_running() {
            if let Some(episode) = self.episode.as_mut() {
                self.last_outcome = self.trainer.step(episode);
                if let Some(report) = self.trainer.finish_episode(episode) {
                    self.reports.push(report);
                }
            }
        } else if !self.trainer.is_finished() {
            self.episode = Some(self.trainer.new_episode()?);
            self.last_outcome = None;
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.episode.as_ref().is_some_and(|episode| !episode.is_done())
    }

    fn quit(&mut self) {
        self.should_quit = true;
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;
    let trainer = Trainer::new(config).context("Invalid configuration")?;

    if args.headless {
        tracing_subscriber::fmt::init();
        return run_headless(trainer);
    }

    let mut terminal = setup_terminal()?;
    let mut app = App::new(trainer);
    let result = run_app(&mut terminal, &mut app, Duration::from_millis(args.tick_ms));
    restore_terminal(&mut terminal)?;
    result?;

    for report in &app.reports {
        println!("{}", summarize(report));
    }
    Ok(())
}

fn run_headless(mut trainer: Trainer) -> Result<()> {
    while !trainer.is_finished() {
        let mut episode = trainer.new_episode().context("World generation failed")?;
        while trainer.step(&mut episode).is_some() {}
        print!("{}", episode.world());
        if let Some(report) = trainer.finish_episode(&episode) {
            println!("{}\n", summarize(&report));
        }
    }
    println!(
        "Value table covers {} positions",
        trainer.learner().table().len()
    );
    Ok(())
}

fn summarize(report: &EpisodeReport) -> String {
    let outcome = match report.termination {
        Termination::Success => "reached the door with the key",
        Termination::StepLimit => "hit the step cap",
        Termination::TickLimit => "ran out of ticks",
    };
    let optimal = report
        .optimal_steps
        .map_or_else(|| "-".to_string(), |steps| steps.to_string());
    format!(
        "Episode {} ({}x{}): {} after {} steps, reward {:.1}, optimal {}",
        report.index + 1,
        report.rows,
        report.cols,
        outcome,
        report.stats.steps,
        report.stats.total_reward,
        optimal
    )
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into)
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Runs the main loop of the TUI application.
fn run_app(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    app: &mut App,
    tick_rate: Duration,
) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => app.quit(),
                    _ => {}
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.tick()?;
            last_tick = Instant::now();
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

/// Renders the user interface.
fn ui(frame: &mut Frame, app: &App) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(60), // Area for the map
            Constraint::Percentage(30), // Area for episode status
            Constraint::Percentage(10), // Area for help
        ])
        .split(frame.area());

    match &app.episode {
        Some(episode) => render_map(frame, main_layout[0], episode.world()),
        None => frame.render_widget(
            Paragraph::new("Generating world...")
                .alignment(Alignment::Center)
                .block(Block::default().title("Key & Door").borders(Borders::ALL)),
            main_layout[0],
        ),
    }

    render_status(frame, main_layout[1], app);

    let help_text = if app.trainer.is_finished() {
        "All episodes finished. Press 'q' or 'Esc' to quit."
    } else {
        "Press 'q' or 'Esc' to quit."
    };
    let help = Paragraph::new(help_text)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(help, main_layout[2]);
}

/// Renders the episode counters and the outcome of the latest tick.
fn render_status(frame: &mut Frame, area: Rect, app: &App) {
    let mut lines = vec![Line::from(format!(
        "Episode {}/{}  Value table: {} positions",
        app.reports.len() + usize::from(app.is_running()),
        app.trainer.config().episodes,
        app.trainer.learner().table().len()
    ))];

    if let Some(episode) = &app.episode {
        let stats = episode.stats();
        let Position { row, col } = episode.position();
        let key_span = if episode.has_key() {
            Span::styled("holding key", Style::default().fg(Color::Yellow).bold())
        } else {
            Span::raw("no key")
        };
        lines.push(Line::from(vec![
            Span::raw(format!(
                "Pos: ({row}, {col})  Steps: {}/{}  Ticks: {}  Reward: {:.1}  ",
                stats.steps,
                app.trainer.config().episode.step_cap,
                stats.ticks,
                stats.total_reward
            )),
            key_span,
        ]));
        lines.push(Line::from(format!(
            "Off-grid: {}  Collisions: {}  Recoveries: {}",
            stats.off_grid, stats.collisions, stats.recoveries
        )));
    }

    if let Some(outcome) = &app.last_outcome {
        let kind = match outcome.kind {
            MoveKind::Moved => "moved".to_string(),
            MoveKind::OffGrid => "bumped the edge".to_string(),
            MoveKind::Collision {
                recovered_to: Some(Position { row, col }),
            } => format!("hit an obstacle, pushed to ({row}, {col})"),
            MoveKind::Collision { recovered_to: None } => "hit an obstacle, stuck".to_string(),
        };
        lines.push(Line::from(format!(
            "Last: {:?} from ({}, {}) {} ({:+.1})",
            outcome.action, outcome.from.row, outcome.from.col, kind, outcome.reward
        )));
    }

    if let Some(report) = app.reports.last() {
        let style = match report.termination {
            Termination::Success => Style::default().fg(Color::Green),
            _ => Style::default().fg(Color::Red),
        };
        lines.push(Line::styled(summarize(report), style));
    }

    let status = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Episode"));
    frame.render_widget(status, area);
}

/// Renders the world grid onto the frame.
fn render_map(frame: &mut Frame, area: Rect, world: &GridWorld) {
    let mut lines: Vec<Line> = Vec::with_capacity(world.rows());

    for row in 0..world.rows() {
        let mut spans: Vec<Span> = Vec::with_capacity(world.cols());
        for col in 0..world.cols() {
            let cell = world.cell(Position { row, col }).unwrap_or(Cell::Empty);
            let (symbol, style) = match cell {
                Cell::Empty => (".", Style::default().fg(Color::DarkGray)),
                Cell::Obstacle => ("#", Style::default().fg(Color::Gray)),
                Cell::Key => ("k", Style::default().fg(Color::Yellow)),
                Cell::Door => ("D", Style::default().fg(Color::Green)),
                Cell::Agent => ("@", Style::default().fg(Color::Red).bold()),
            };
            spans.push(Span::styled(symbol, style));
        }
        lines.push(Line::from(spans));
    }

    let map_paragraph = Paragraph::new(lines)
        .block(Block::default().title("Key & Door").borders(Borders::ALL))
        .alignment(Alignment::Center);

    frame.render_widget(map_paragraph, area);
}
