use crate::maze::Maze;
use crate::{Action, AgentId, PointF, Position, Team};

/// The surface the policy core consumes from a host game engine.
///
/// Hosts hand each agent a per-viewer instance: positions of agents the
/// viewer cannot see come back as `None`, and everything an agent plans
/// with (including [`GameView::successor`] states) reflects only what it
/// observed. The reference implementation lives in [`crate::sim`].
pub trait GameView: Clone {
    fn maze(&self) -> &Maze;

    /// Actions `agent` may take from this state. `Stop` is always legal
    /// for an agent that is on the board.
    fn legal_actions(&self, agent: AgentId) -> Vec<Action>;

    /// The state after `agent` takes `action`. Deterministic; the
    /// resulting position may sit between cells (a half-step).
    fn successor(&self, agent: AgentId, action: Action) -> Self;

    /// Where `agent` is, or `None` when the viewer cannot see it.
    fn position(&self, agent: AgentId) -> Option<PointF>;

    /// Whether `agent` is currently in pursuer form (on its own side).
    fn is_pursuer(&self, agent: AgentId) -> bool;

    /// Whether a pursuer is temporarily neutralized (safe to ignore).
    fn is_neutralized(&self, agent: AgentId) -> bool;

    /// Resources `agent` has collected but not yet banked.
    fn carrying(&self, agent: AgentId) -> u32;

    /// Direction of the agent's last move; `Stop` before it has moved.
    fn heading(&self, agent: AgentId) -> Action;

    /// Remaining collectible resources sitting on `side`'s half, sorted
    /// ascending.
    fn food_on_side(&self, side: Team) -> Vec<Position>;

    fn team_of(&self, agent: AgentId) -> Team;

    /// Opponent agent indices, ascending.
    fn opponents(&self, team: Team) -> Vec<AgentId>;

    /// All indices on `team` (including the caller's), ascending.
    fn teammates(&self, team: Team) -> Vec<AgentId>;

    /// Resources `team` has banked so far.
    fn score(&self, team: Team) -> i32;
}

/// Successor that is guaranteed to sit on a grid cell: when the engine
/// reports a half-step, the same action is applied once more.
pub fn aligned_successor<G: GameView>(view: &G, agent: AgentId, action: Action) -> G {
    let succ = view.successor(agent, action);
    match succ.position(agent) {
        Some(p) if !p.is_aligned() => succ.successor(agent, action),
        _ => succ,
    }
}

/// Per-turn snapshot of everything the mode selector and target selector
/// read. Unknown enemy positions are simply absent: an unseen enemy is no
/// enemy as far as the policy is concerned.
#[derive(Debug, Clone)]
pub struct Observation {
    pub me: AgentId,
    pub team: Team,
    /// Own position, snapped to the grid. Always known.
    pub my_pos: Position,
    /// True when on enemy ground, i.e. vulnerable to capture.
    pub pursued: bool,
    pub carrying: u32,
    /// Visible enemies in pursued form on our side.
    pub invaders: Vec<(AgentId, Position)>,
    /// Visible enemy pursuers that are not neutralized.
    pub hunters: Vec<(AgentId, Position)>,
    /// The one teammate, if its position is known.
    pub teammate: Option<(AgentId, Position)>,
    /// Resources still on our side (what the enemy is after).
    pub defended_food: Vec<Position>,
    /// Resources on the enemy side (what we are after).
    pub enemy_food: Vec<Position>,
    /// Our banked total minus theirs.
    pub score_diff: i32,
}

impl Observation {
    /// Builds the snapshot for `me`. `fallback` stands in for the own
    /// position in the degenerate case where the engine reports none
    /// (the contract says it never does; we degrade instead of panicking).
    pub fn capture<G: GameView>(view: &G, me: AgentId, fallback: Position) -> Observation {
        let team = view.team_of(me);
        let my_pos = view
            .position(me)
            .map(|p| p.nearest_cell())
            .unwrap_or(fallback);

        let mut invaders = Vec::new();
        let mut hunters = Vec::new();
        for opp in view.opponents(team) {
            let Some(pos) = view.position(opp) else {
                continue;
            };
            let cell = pos.nearest_cell();
            if view.is_pursuer(opp) {
                if !view.is_neutralized(opp) {
                    hunters.push((opp, cell));
                }
            } else {
                invaders.push((opp, cell));
            }
        }

        let teammate = view
            .teammates(team)
            .into_iter()
            .find(|&id| id != me)
            .and_then(|id| view.position(id).map(|p| (id, p.nearest_cell())));

        Observation {
            me,
            team,
            my_pos,
            pursued: !view.is_pursuer(me),
            carrying: view.carrying(me),
            invaders,
            hunters,
            teammate,
            defended_food: view.food_on_side(team),
            enemy_food: view.food_on_side(team.rival()),
            score_diff: view.score(team) - view.score(team.rival()),
        }
    }
}
