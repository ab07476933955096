use serde::{Deserialize, Serialize};

use crate::distance::Distancer;
use crate::game::Observation;
use crate::Position;

/// Behavior mode of one agent. Re-evaluated every turn; rapid flapping
/// between modes is tolerated, not prevented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Offense,
    Defense,
    Retreat,
}

/// The agent variants a team can field. Construction is resolved from
/// this enumeration at startup, never by runtime name lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentRole {
    /// Food-seeker with a defensive reflex when invaders show up at home.
    OffenseFsm,
    /// Patroller that opportunistically raids when the map is quiet.
    DefenseFsm,
    /// Offense-oriented variant with the lookahead planner armed.
    Reflex,
}

/// Beam-search settings; present only on variants that plan ahead.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Carrying more than this triggers a planning pass.
    pub carry_threshold: u32,
    pub depth: usize,
    pub width: usize,
}

/// Weight coefficients for the feature vocabulary. Distances are stored
/// as negatives by the evaluator, so a positive coefficient pulls the
/// agent toward the thing and a negative one pushes it away.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightProfile {
    pub invader_distance: f64,
    /// Food pull while in Offense mode.
    pub food_distance_offense: f64,
    /// Food pull in every other mode.
    pub food_distance: f64,
    pub hunter_threat: f64,
    /// Home pull per carried resource: weight = scale * max(1, carried).
    pub return_home_scale: f64,
    /// Extra home pull while the threat flag is set.
    pub threat_return_bonus: f64,
    /// Scaled by maze width at evaluation time.
    pub food_collected_scale: f64,
    pub reverse: f64,
    pub dead_end: f64,
    pub on_defense: f64,
    pub num_invaders: f64,
    pub stop: f64,
    pub carrying: f64,
    pub teammate_separation: f64,
    pub defend_food: f64,
}

/// Everything that distinguishes one agent variant from another: FSM
/// thresholds, evaluation weights, and the optional planner. One
/// evaluator and one selector serve all variants, parameterized by this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub role: AgentRole,
    /// Turns at match start during which offense is forced.
    pub warmup_turns: u32,
    /// Carrying at least this much flips the FSM to Retreat.
    pub carry_threshold: u32,
    /// A hunter within this path distance counts as danger.
    pub danger_radius: u32,
    /// Hunters within this distance of a landing cell veto a border cross.
    pub safe_cross_radius: u32,
    /// Hunters within this distance raise the threat feature and flag.
    pub threat_radius: u32,
    /// Carrying above this activates the return-home feature outside
    /// Retreat mode.
    pub return_home_carry: u32,
    /// Turns before the patrol target is forcibly advanced.
    pub patrol_timeout: u32,
    /// Losing more defended resources than this raises defense pressure.
    pub defense_pressure_threshold: u32,
    pub planner: Option<PlannerConfig>,
    pub weights: WeightProfile,
}

impl PolicyConfig {
    pub fn for_role(role: AgentRole) -> Self {
        match role {
            AgentRole::OffenseFsm => Self::offense_fsm(),
            AgentRole::DefenseFsm => Self::defense_fsm(),
            AgentRole::Reflex => Self::reflex(),
        }
    }

    pub fn offense_fsm() -> Self {
        PolicyConfig {
            role: AgentRole::OffenseFsm,
            warmup_turns: 8,
            carry_threshold: 4,
            danger_radius: 4,
            safe_cross_radius: 3,
            threat_radius: 3,
            return_home_carry: 3,
            patrol_timeout: 20,
            defense_pressure_threshold: 5,
            planner: None,
            weights: WeightProfile {
                invader_distance: 20.0,
                food_distance_offense: 5.0,
                food_distance: 1.0,
                hunter_threat: -100.0,
                return_home_scale: 4.0,
                threat_return_bonus: 20.0,
                food_collected_scale: 1.0,
                reverse: -2.0,
                dead_end: -10.0,
                on_defense: 60.0,
                num_invaders: -80.0,
                stop: -10.0,
                carrying: 3.0,
                teammate_separation: -20.0,
                defend_food: 3.0,
            },
        }
    }

    pub fn defense_fsm() -> Self {
        PolicyConfig {
            role: AgentRole::DefenseFsm,
            warmup_turns: 0,
            carry_threshold: 2,
            danger_radius: 3,
            weights: WeightProfile {
                invader_distance: 30.0,
                ..Self::offense_fsm().weights
            },
            ..Self::offense_fsm()
        }
    }

    pub fn reflex() -> Self {
        PolicyConfig {
            role: AgentRole::Reflex,
            planner: Some(PlannerConfig {
                carry_threshold: 1,
                depth: 6,
                width: 6,
            }),
            weights: WeightProfile {
                invader_distance: 30.0,
                ..Self::offense_fsm().weights
            },
            ..Self::offense_fsm()
        }
    }

    /// Initial mode at spawn.
    pub fn initial_mode(&self) -> Mode {
        match self.role {
            AgentRole::DefenseFsm => Mode::Defense,
            AgentRole::OffenseFsm | AgentRole::Reflex => Mode::Offense,
        }
    }
}

/// The mode transition function: a pure function of the observation
/// snapshot (and the turn counter), evaluated fresh each turn. No
/// hysteresis beyond what carrying and visibility naturally provide.
pub fn next_mode(
    cfg: &PolicyConfig,
    obs: &Observation,
    turn: u32,
    dist: &mut Distancer,
) -> Mode {
    let hunter_dist = obs
        .hunters
        .iter()
        .map(|&(_, p)| dist.distance(obs.my_pos, p))
        .min();
    let in_danger = hunter_dist.is_some_and(|d| d <= cfg.danger_radius);

    match cfg.role {
        AgentRole::OffenseFsm | AgentRole::Reflex => {
            // Leave the spawn area before reacting to anything.
            if turn < cfg.warmup_turns {
                return Mode::Offense;
            }
            if !obs.invaders.is_empty() && !obs.pursued {
                return Mode::Defense;
            }
            if obs.carrying >= cfg.carry_threshold || in_danger {
                return Mode::Retreat;
            }
            Mode::Offense
        }
        AgentRole::DefenseFsm => {
            // Invaders override everything.
            if !obs.invaders.is_empty() {
                return Mode::Defense;
            }
            if obs.carrying >= cfg.carry_threshold {
                return Mode::Retreat;
            }
            if obs.carrying > 0 && !in_danger {
                return Mode::Offense;
            }
            Mode::Defense
        }
    }
}

/// Invaders this agent is responsible for chasing: the closer of the two
/// teammates claims each invader, ties going to the lower agent index.
/// An invisible teammate forfeits its claim entirely.
pub fn assigned_invaders(obs: &Observation, dist: &mut Distancer) -> Vec<Position> {
    let mut mine = Vec::new();
    for &(_, inv) in &obs.invaders {
        let claimed = match obs.teammate {
            None => true,
            Some((mate_id, mate_pos)) => {
                let my_d = dist.distance(obs.my_pos, inv);
                let mate_d = dist.distance(mate_pos, inv);
                my_d < mate_d || (my_d == mate_d && obs.me < mate_id)
            }
        };
        if claimed {
            mine.push(inv);
        }
    }
    mine
}
