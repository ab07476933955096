use std::collections::{HashSet, VecDeque};

use rand::{rngs::StdRng, seq::IndexedRandom, SeedableRng};
use tracing::{debug, trace};

use crate::distance::Distancer;
use crate::features::{evaluate, EvalCtx};
use crate::game::{aligned_successor, GameView, Observation};
use crate::planner::beam_search;
use crate::policy::{assigned_invaders, next_mode, AgentRole, Mode, PolicyConfig};
use crate::search::{astar, bfs};
use crate::targets::{select_targets, PatrolState};
use crate::{Action, AgentId, Position};

/// Observed positions kept for oscillation detection.
const HISTORY_LEN: usize = 6;

/// Trait for agents that pick one action per turn from a game view.
/// `&mut self` lets implementations maintain decision state across turns.
pub trait Agent<G: GameView> {
    fn id(&self) -> AgentId;

    /// Must return within the turn's compute budget; the action is
    /// validated against the engine's legal set by the host.
    fn select_action(&mut self, view: &G) -> Action;
}

/// Arena-dependent state built on the first turn, when the agent first
/// sees the maze.
#[derive(Debug, Clone)]
struct MatchSetup {
    spawn: Position,
    home_boundary: Vec<Position>,
    patrol: PatrolState,
    distancer: Distancer,
}

/// The policy agent: finite-state mode selection over a pathfinding core,
/// with a feature-weighted evaluator as fallback and an optional beam
/// planner for risky positions.
///
/// Every persistent field is owned by this instance alone; the two
/// teammates coordinate only through what they both observe.
pub struct CaptureAgent {
    id: AgentId,
    config: PolicyConfig,
    rng: StdRng,
    mode: Mode,
    /// Set by the evaluator's threat probe, read by the next weight table.
    threat: bool,
    /// 0-based index of the current turn.
    turn: u32,
    history: VecDeque<Position>,
    last_score_diff: i32,
    food_baseline: Option<usize>,
    setup: Option<MatchSetup>,
}

impl CaptureAgent {
    /// Builds an agent for `role`. This is the whole factory: variant
    /// selection is an enum match, resolved at startup.
    pub fn new(id: AgentId, role: AgentRole, seed: u64) -> Self {
        Self::with_config(id, PolicyConfig::for_role(role), seed)
    }

    pub fn with_config(id: AgentId, config: PolicyConfig, seed: u64) -> Self {
        let mode = config.initial_mode();
        CaptureAgent {
            id,
            config,
            rng: StdRng::seed_from_u64(seed),
            mode,
            threat: false,
            turn: 0,
            history: VecDeque::with_capacity(HISTORY_LEN),
            last_score_diff: 0,
            food_baseline: None,
            setup: None,
        }
    }

    pub fn role(&self) -> AgentRole {
        self.config.role
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    fn decide<G: GameView>(&mut self, view: &G) -> Action {
        if self.setup.is_none() {
            let maze = view.maze().clone();
            let team = view.team_of(self.id);
            let home_boundary = maze.home_boundary(team);
            self.setup = Some(MatchSetup {
                spawn: view
                    .position(self.id)
                    .map(|p| p.nearest_cell())
                    .unwrap_or(Position::new(0, 0)),
                patrol: PatrolState::new(&home_boundary),
                distancer: Distancer::new(maze),
                home_boundary,
            });
        }
        let Some(setup) = self.setup.as_mut() else {
            return Action::Stop;
        };

        let obs = Observation::capture(view, self.id, setup.spawn);

        self.history.push_back(obs.my_pos);
        while self.history.len() > HISTORY_LEN {
            self.history.pop_front();
        }

        // Defense-pressure bookkeeping: how much of our food has been
        // eaten since the enemy last banked.
        if self.food_baseline.is_none() || obs.score_diff < self.last_score_diff {
            self.food_baseline = Some(obs.defended_food.len());
        }
        self.last_score_diff = obs.score_diff;
        let lost = self
            .food_baseline
            .map(|b| b.saturating_sub(obs.defended_food.len()))
            .unwrap_or(0);
        let defense_pressure = lost > self.config.defense_pressure_threshold as usize;

        let mode = next_mode(&self.config, &obs, self.turn, &mut setup.distancer);
        if mode != self.mode {
            debug!(agent = self.id, from = ?self.mode, to = ?mode, "mode transition");
        }
        self.mode = mode;

        let assigned = assigned_invaders(&obs, &mut setup.distancer);

        // Sweep the boundary while there is nothing to chase.
        if mode == Mode::Defense && assigned.is_empty() {
            setup.patrol.advance_if_due(
                obs.my_pos,
                self.turn,
                self.config.patrol_timeout,
                &mut setup.distancer,
            );
        }

        let targets = select_targets(mode, &obs, &assigned, &setup.home_boundary, &setup.patrol);

        let mut legal = view.legal_actions(self.id);
        if legal.is_empty() {
            // degenerate under the engine's contract, but never panic
            return Action::Stop;
        }
        if legal.len() > 1 {
            legal.retain(|&a| a != Action::Stop);
        }

        // Pathfind toward the targets. Hunters are live obstacles when we
        // are (or are about to be) on their ground; a defender chasing on
        // home turf only cares about the walls.
        let path = match mode {
            Mode::Defense => bfs(view.maze(), obs.my_pos, &targets),
            Mode::Offense | Mode::Retreat => {
                let blocked: HashSet<Position> =
                    obs.hunters.iter().map(|&(_, p)| p).collect();
                astar(view.maze(), obs.my_pos, &targets, &blocked)
            }
        };
        // A stale or unreachable suggestion is discarded, never executed.
        let suggested = path.first().copied().filter(|a| legal.contains(a));

        // Lookahead override when the position is risky: a big haul at
        // stake, or the recent history shows us pacing back and forth.
        if let Some(pcfg) = self.config.planner {
            if obs.carrying > pcfg.carry_threshold || oscillating(&self.history) {
                let mut ctx = EvalCtx {
                    config: &self.config,
                    distancer: &mut setup.distancer,
                    home_boundary: &setup.home_boundary,
                    mode,
                    threat: self.threat,
                    defense_pressure,
                };
                if let Some(action) = beam_search(&mut ctx, view, self.id, pcfg.depth, pcfg.width)
                {
                    if legal.contains(&action) {
                        debug!(agent = self.id, ?action, "planner override");
                        return action;
                    }
                }
            }
        }

        if let Some(action) = suggested {
            // Offense only: don't step across the border into a waiting
            // hunter when a same-side move exists.
            if mode == Mode::Offense
                && crossing_is_risky(&self.config, view, self.id, action, &mut setup.distancer)
            {
                let safe: Vec<Action> = legal
                    .iter()
                    .copied()
                    .filter(|&a| {
                        let succ = aligned_successor(view, self.id, a);
                        succ.is_pursuer(self.id)
                    })
                    .collect();
                if !safe.is_empty() {
                    trace!(agent = self.id, "border cross vetoed");
                    return self.pick_best(view, &safe, mode, defense_pressure);
                }
                // no same-side option: take the risky step anyway
            }
            return action;
        }

        // No usable path: score every legal action and take the arg-max.
        self.pick_best(view, &legal, mode, defense_pressure)
    }

    /// Evaluator arg-max over `actions`, ties broken uniformly at random.
    /// Threat-probe results are committed in evaluation order, so the
    /// weight table sees the freshest flag, as the evaluation contract
    /// requires.
    fn pick_best<G: GameView>(
        &mut self,
        view: &G,
        actions: &[Action],
        mode: Mode,
        defense_pressure: bool,
    ) -> Action {
        let Some(setup) = self.setup.as_mut() else {
            return Action::Stop;
        };
        let mut threat = self.threat;
        let mut scored: Vec<(Action, f64)> = Vec::with_capacity(actions.len());
        for &action in actions {
            let mut ctx = EvalCtx {
                config: &self.config,
                distancer: &mut setup.distancer,
                home_boundary: &setup.home_boundary,
                mode,
                threat,
                defense_pressure,
            };
            let eval = evaluate(&mut ctx, view, self.id, action);
            if let Some(t) = eval.threat_update {
                threat = t;
            }
            scored.push((action, eval.score));
        }
        self.threat = threat;

        let Some(&(_, best)) = scored
            .iter()
            .max_by(|a, b| a.1.total_cmp(&b.1))
        else {
            return Action::Stop;
        };
        let ties: Vec<Action> = scored
            .iter()
            .filter(|&&(_, s)| s == best)
            .map(|&(a, _)| a)
            .collect();
        ties.choose(&mut self.rng).copied().unwrap_or(Action::Stop)
    }
}

impl<G: GameView> Agent<G> for CaptureAgent {
    fn id(&self) -> AgentId {
        self.id
    }

    fn select_action(&mut self, view: &G) -> Action {
        let action = self.decide(view);
        self.turn += 1;
        action
    }
}

/// True when `action` would flip `me` into pursued form with a hunter
/// close enough to the landing cell to punish it.
fn crossing_is_risky<G: GameView>(
    config: &PolicyConfig,
    view: &G,
    me: AgentId,
    action: Action,
    distancer: &mut Distancer,
) -> bool {
    if !view.is_pursuer(me) {
        return false;
    }
    let succ = aligned_successor(view, me, action);
    if succ.is_pursuer(me) {
        return false;
    }
    let Some(landing) = succ.position(me).map(|p| p.nearest_cell()) else {
        return false;
    };
    let team = succ.team_of(me);
    succ.opponents(team)
        .into_iter()
        .filter(|&o| succ.is_pursuer(o) && !succ.is_neutralized(o))
        .filter_map(|o| succ.position(o))
        .map(|p| distancer.distance(landing, p.nearest_cell()))
        .min()
        .is_some_and(|d| d <= config.safe_cross_radius)
}

/// A,B,A,B pacing in the recent position history. A stationary agent
/// matches too, which is fine: both mean the greedy policy is stuck.
fn oscillating(history: &VecDeque<Position>) -> bool {
    let n = history.len();
    if n < 4 {
        return false;
    }
    history[n - 1] == history[n - 3] && history[n - 2] == history[n - 4]
}
