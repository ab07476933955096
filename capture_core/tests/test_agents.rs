use capture_core::agent::{Agent, CaptureAgent};
use capture_core::game::GameView;
use capture_core::maze::Maze;
use capture_core::policy::{AgentRole, Mode, PolicyConfig};
use capture_core::sim::SimGame;
use capture_core::{Action, AgentId, PointF, Position, Team};

fn arena() -> SimGame {
    SimGame::new(
        Maze::open(8, 4).unwrap(),
        &[
            (Team::Red, Position::new(1, 1)),
            (Team::Red, Position::new(1, 2)),
            (Team::Blue, Position::new(6, 1)),
            (Team::Blue, Position::new(6, 2)),
        ],
    )
    .unwrap()
}

#[test]
fn offense_agent_marches_toward_enemy_food() {
    // wide arena: the hunters sit far from the crossing point
    let mut game = SimGame::new(
        Maze::open(12, 4).unwrap(),
        &[
            (Team::Red, Position::new(1, 1)),
            (Team::Red, Position::new(1, 2)),
            (Team::Blue, Position::new(10, 1)),
            (Team::Blue, Position::new(10, 2)),
        ],
    )
    .unwrap();
    game.add_food(Position::new(8, 1)).unwrap();
    let mut agent = CaptureAgent::new(0, AgentRole::OffenseFsm, 7);

    let action = agent.select_action(&game);
    assert!(game.legal_actions_of(0).contains(&action));
    assert_eq!(agent.mode(), Mode::Offense);
    game.apply(0, action);

    // walking the policy for a while actually reaches the food
    for _ in 0..30 {
        let action = agent.select_action(&game);
        game.apply(0, action);
        if game.agent(0).carrying > 0 {
            return;
        }
    }
    panic!("never collected the food");
}

#[test]
fn heavy_carrier_switches_to_retreat_and_heads_home() {
    let mut cfg = PolicyConfig::offense_fsm();
    cfg.warmup_turns = 0;
    let mut game = arena();
    game.teleport(0, Position::new(6, 1));
    game.set_carrying(0, 5);
    let mut agent = CaptureAgent::with_config(0, cfg, 7);

    let action = agent.select_action(&game);
    assert_eq!(agent.mode(), Mode::Retreat);
    assert!(game.legal_actions_of(0).contains(&action));

    // retreating across the board ends in a banked haul
    for _ in 0..16 {
        let action = agent.select_action(&game);
        game.apply(0, action);
        if game.score(Team::Red) > 0 {
            assert_eq!(game.agent(0).carrying, 0);
            return;
        }
    }
    panic!("never banked the haul");
}

#[test]
fn defender_homes_in_on_a_visible_invader() {
    let mut game = arena();
    // blue agent 2 deep in red territory, two steps off
    game.teleport(2, Position::new(3, 1));
    let mut agent = CaptureAgent::new(0, AgentRole::DefenseFsm, 7);

    let before = game.agent(0).pos.manhattan(game.agent(2).pos);
    let action = agent.select_action(&game);
    assert_eq!(agent.mode(), Mode::Defense);
    game.apply(0, action);
    let after = game.agent(0).pos.manhattan(game.agent(2).pos);
    assert!(after < before, "defender did not close in");
}

#[test]
fn idle_defender_patrols_the_boundary() {
    let mut game = arena();
    let mut agent = CaptureAgent::new(0, AgentRole::DefenseFsm, 7);
    let boundary_x = game.maze_ref().home_column(Team::Red);

    for _ in 0..20 {
        let action = agent.select_action(&game);
        game.apply(0, action);
        if game.agent(0).pos.x == boundary_x {
            return;
        }
    }
    panic!("defender never reached its patrol column");
}

#[test]
fn planner_variant_still_returns_legal_moves_under_risk() {
    let mut game = arena();
    game.teleport(0, Position::new(5, 1));
    game.set_carrying(0, 3);
    let mut agent = CaptureAgent::new(0, AgentRole::Reflex, 7);

    for _ in 0..6 {
        let action = agent.select_action(&game);
        assert!(game.legal_actions_of(0).contains(&action));
        game.apply(0, action);
    }
}

#[test]
fn offense_refuses_a_border_cross_into_a_waiting_hunter() {
    let mut game = arena();
    game.teleport(0, Position::new(3, 1));
    game.teleport(2, Position::new(4, 1)); // hunter right across the line
    game.add_food(Position::new(7, 1)).unwrap();
    let mut agent = CaptureAgent::new(0, AgentRole::OffenseFsm, 7);

    let action = agent.select_action(&game);
    let succ = game.successor(0, action);
    assert!(
        succ.is_pursuer(0),
        "crossed into a hunter within the safe radius"
    );
}

#[test]
fn boxed_in_agent_stops() {
    let maze = Maze::from_rows(&[
        "########", //
        "#.#....#", //
        "########",
    ])
    .unwrap();
    let game = SimGame::new(maze, &[(Team::Red, Position::new(1, 1))]).unwrap();
    let mut agent = CaptureAgent::new(0, AgentRole::OffenseFsm, 7);
    assert_eq!(agent.select_action(&game), Action::Stop);
}

/// A view whose legal set is empty: degenerate under the engine contract,
/// but the driver must still answer with `Stop` instead of failing.
#[derive(Clone)]
struct NoMoves(SimGame);

impl GameView for NoMoves {
    fn maze(&self) -> &Maze {
        self.0.maze()
    }
    fn legal_actions(&self, _agent: AgentId) -> Vec<Action> {
        Vec::new()
    }
    fn successor(&self, agent: AgentId, action: Action) -> Self {
        NoMoves(self.0.successor(agent, action))
    }
    fn position(&self, agent: AgentId) -> Option<PointF> {
        self.0.position(agent)
    }
    fn is_pursuer(&self, agent: AgentId) -> bool {
        self.0.is_pursuer(agent)
    }
    fn is_neutralized(&self, agent: AgentId) -> bool {
        self.0.is_neutralized(agent)
    }
    fn carrying(&self, agent: AgentId) -> u32 {
        self.0.carrying(agent)
    }
    fn heading(&self, agent: AgentId) -> Action {
        self.0.heading(agent)
    }
    fn food_on_side(&self, side: Team) -> Vec<Position> {
        self.0.food_on_side(side)
    }
    fn team_of(&self, agent: AgentId) -> Team {
        self.0.team_of(agent)
    }
    fn opponents(&self, team: Team) -> Vec<AgentId> {
        self.0.opponents(team)
    }
    fn teammates(&self, team: Team) -> Vec<AgentId> {
        self.0.teammates(team)
    }
    fn score(&self, team: Team) -> i32 {
        self.0.score(team)
    }
}

#[test]
fn no_legal_actions_degrades_to_stop() {
    let game = NoMoves(arena());
    let mut agent = CaptureAgent::new(0, AgentRole::Reflex, 7);
    assert_eq!(agent.select_action(&game), Action::Stop);
}

#[test]
fn a_full_match_stays_within_the_rules() {
    let maze = Maze::from_rows(&[
        "############", //
        "#..........#", //
        "#.##.##.##.#", //
        "#..........#", //
        "#.##.##.##.#", //
        "#..........#", //
        "############",
    ])
    .unwrap();
    let mut game = SimGame::new(
        maze,
        &[
            (Team::Red, Position::new(1, 1)),
            (Team::Red, Position::new(1, 5)),
            (Team::Blue, Position::new(10, 1)),
            (Team::Blue, Position::new(10, 5)),
        ],
    )
    .unwrap();
    for pos in [
        Position::new(3, 1),
        Position::new(4, 3),
        Position::new(7, 3),
        Position::new(8, 5),
    ] {
        game.add_food(pos).unwrap();
    }

    let mut agents = vec![
        CaptureAgent::new(0, AgentRole::OffenseFsm, 1),
        CaptureAgent::new(1, AgentRole::DefenseFsm, 2),
        CaptureAgent::new(2, AgentRole::Reflex, 3),
        CaptureAgent::new(3, AgentRole::DefenseFsm, 4),
    ];

    for _ in 0..60 {
        for agent in agents.iter_mut() {
            let id = Agent::<SimGame>::id(agent);
            let view = game.fogged_for(id, 6);
            let action = agent.select_action(&view);
            assert!(
                game.legal_actions_of(id).contains(&action),
                "agent {id} proposed an illegal action"
            );
            game.apply(id, action);
        }
    }
}
