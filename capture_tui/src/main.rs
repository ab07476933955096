use anyhow::Result;
use capture_core::{
    agent::{Agent, CaptureAgent},
    game::GameView,
    maze::Maze,
    policy::AgentRole,
    sim::SimGame,
    Position, Team,
};
use clap::Parser;
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
    time::{Duration, Instant},
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// RNG seed for the agents' tie-breaking
    #[arg(short, long, default_value_t = 7)]
    seed: u64,
    /// End the match after this many full rounds
    #[arg(short, long, default_value_t = 400)]
    rounds: u32,
    /// Milliseconds between simulation ticks
    #[arg(long, default_value_t = 120)]
    tick_ms: u64,
    /// Sight radius; enemies farther away are invisible to an agent
    #[arg(long, default_value_t = 6)]
    sight: usize,
}

/// Built-in symmetric arena (no map files; layouts are code literals).
const LAYOUT: &[&str] = &[
    "####################",
    "#........##........#",
    "#.######....######.#",
    "#........##........#",
    "#.#.####.##.####.#.#",
    "#........##........#",
    "#.######....######.#",
    "#........##........#",
    "####################",
];

/// Food cells on the red side; each gets a mirrored twin on the blue side.
const RED_FOOD: &[(usize, usize)] = &[(2, 7), (4, 5), (3, 3), (6, 1), (8, 2), (1, 4)];

struct App {
    /// The reference match engine.
    game: SimGame,
    agents: Vec<CaptureAgent>,
    rounds: u32,
    max_rounds: u32,
    sight: usize,
    paused: bool,
    game_over: bool,
    should_quit: bool,
}

impl App {
    fn new(args: &Args) -> Result<Self> {
        let maze = Maze::from_rows(LAYOUT)?;
        let mirror = maze.width() - 1;
        let mut game = SimGame::new(
            maze,
            &[
                (Team::Red, Position::new(1, 1)),
                (Team::Red, Position::new(1, 7)),
                (Team::Blue, Position::new(18, 1)),
                (Team::Blue, Position::new(18, 7)),
            ],
        )?;
        for &(x, y) in RED_FOOD {
            game.add_food(Position::new(x, y))?;
            game.add_food(Position::new(mirror - x, y))?;
        }

        let agents = vec![
            CaptureAgent::new(0, AgentRole::OffenseFsm, args.seed),
            CaptureAgent::new(1, AgentRole::DefenseFsm, args.seed.wrapping_add(1)),
            CaptureAgent::new(2, AgentRole::Reflex, args.seed.wrapping_add(2)),
            CaptureAgent::new(3, AgentRole::DefenseFsm, args.seed.wrapping_add(3)),
        ];

        Ok(App {
            game,
            agents,
            rounds: 0,
            max_rounds: args.rounds,
            sight: args.sight,
            paused: false,
            game_over: false,
            should_quit: false,
        })
    }

    /// Handles one full round: every agent observes and moves once.
    fn tick(&mut self) {
        if self.game_over || self.paused {
            return;
        }
        for agent in self.agents.iter_mut() {
            let id = Agent::<SimGame>::id(agent);
            let view = self.game.fogged_for(id, self.sight);
            let action = agent.select_action(&view);
            self.game.apply(id, action);
        }
        self.rounds += 1;
        if self.rounds >= self.max_rounds || self.game.food_cells().next().is_none() {
            self.game_over = true;
        }
    }

    fn quit(&mut self) {
        self.should_quit = true;
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let mut terminal = setup_terminal()?;
    let mut app = App::new(&args)?;
    let result = run_app(&mut terminal, &mut app, Duration::from_millis(args.tick_ms));
    restore_terminal(&mut terminal)?;
    result
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
                    KeyCode::Char(' ') => app.paused = !app.paused,
                    _ => {}
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.tick();
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
            Constraint::Percentage(70),
            Constraint::Percentage(20),
            Constraint::Percentage(10),
        ])
        .split(frame.area());

    render_arena(frame, main_layout[0], app);
    render_agents(frame, main_layout[1], app);

    let status = if app.game_over {
        "Match over. Press 'q' to quit."
    } else if app.paused {
        "Paused. Space resumes, 'q' quits."
    } else {
        "Space pauses, 'q' quits."
    };
    let help_text = Paragraph::new(status)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(help_text, main_layout[2]);
}

fn team_color(team: Team) -> Color {
    match team {
        Team::Red => Color::Red,
        Team::Blue => Color::Blue,
    }
}

/// Renders the maze, food, and agents onto the frame.
fn render_arena(frame: &mut Frame, area: Rect, app: &App) {
    let game = &app.game;
    let maze = game.maze_ref();

    let mut lines: Vec<Line> = Vec::with_capacity(maze.height());
    // render top row first: y grows northwards in the simulation
    for y in (0..maze.height()).rev() {
        let mut spans: Vec<Span> = Vec::with_capacity(maze.width());
        for x in 0..maze.width() {
            let pos = Position::new(x, y);

            let agent_span = (0..game.agent_count())
                .find(|&id| game.agent(id).pos == pos)
                .map(|id| {
                    let state = game.agent(id);
                    // pursuers are uppercase, invaders lowercase
                    let glyph = match (state.team, game.is_pursuer(id)) {
                        (Team::Red, true) => "R",
                        (Team::Red, false) => "r",
                        (Team::Blue, true) => "B",
                        (Team::Blue, false) => "b",
                    };
                    Span::styled(glyph, Style::default().fg(team_color(state.team)).bold())
                });

            if let Some(span) = agent_span {
                spans.push(span);
            } else if game.food_cells().any(|f| f == pos) {
                spans.push(Span::styled("*", Style::default().fg(Color::Yellow)));
            } else if maze.is_wall(pos) {
                spans.push(Span::styled("#", Style::default().fg(Color::DarkGray)));
            } else {
                spans.push(Span::raw(" "));
            }
        }
        lines.push(Line::from(spans));
    }

    let title = format!(
        "Capture  round {}  red {} : {} blue",
        app.rounds,
        game.score(Team::Red),
        game.score(Team::Blue)
    );
    let arena = Paragraph::new(lines)
        .block(Block::default().title(title).borders(Borders::ALL))
        .alignment(Alignment::Center);
    frame.render_widget(arena, area);
}

/// Renders one status line per agent.
fn render_agents(frame: &mut Frame, area: Rect, app: &App) {
    let items: Vec<ListItem> = app
        .agents
        .iter()
        .map(|agent| {
            let id = Agent::<SimGame>::id(agent);
            let state = app.game.agent(id);
            let line = Line::from(vec![
                Span::styled(
                    format!("Agent {id} "),
                    Style::default().fg(team_color(state.team)).bold(),
                ),
                Span::raw(format!(
                    "{:?} mode {:?} pos ({}, {}) carrying {}",
                    agent.role(),
                    agent.mode(),
                    state.pos.x,
                    state.pos.y,
                    state.carrying
                )),
            ]);
            ListItem::from(line)
        })
        .collect();

    let widget = List::new(items).block(Block::default().borders(Borders::ALL).title("Agents"));
    frame.render_widget(widget, area);
}
