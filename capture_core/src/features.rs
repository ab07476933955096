use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::distance::Distancer;
use crate::game::{aligned_successor, GameView};
use crate::policy::{Mode, PolicyConfig};
use crate::{Action, AgentId, Position};

/// The closed feature vocabulary shared by every agent variant.
///
/// Distance-valued features are stored as *negative* distances, so that a
/// positive weight pulls the agent toward the thing in question.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Feature {
    InvaderDistance,
    FoodDistance,
    HunterThreat,
    ReturnHome,
    FoodCollected,
    Reverse,
    DeadEnd,
    OnDefense,
    NumInvaders,
    Stop,
    Carrying,
    TeammateSeparation,
    DefendFood,
}

/// Sparse feature values; absent keys contribute zero. Recomputed fresh
/// for every evaluation, never cached across turns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureVector(BTreeMap<Feature, f64>);

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, feature: Feature, value: f64) {
        self.0.insert(feature, value);
    }

    pub fn value(&self, feature: Feature) -> f64 {
        self.0.get(&feature).copied().unwrap_or(0.0)
    }

    /// Weighted sum over the features present in `self`.
    pub fn dot(&self, weights: &WeightTable) -> f64 {
        self.0
            .iter()
            .map(|(&f, &v)| v * weights.weight(f))
            .sum()
    }
}

/// Coefficients over the same vocabulary. Derived per call from the
/// policy configuration plus transient context; never memoized, because
/// it reads the carried count and the threat flag.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightTable(BTreeMap<Feature, f64>);

impl WeightTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, feature: Feature, value: f64) {
        self.0.insert(feature, value);
    }

    pub fn weight(&self, feature: Feature) -> f64 {
        self.0.get(&feature).copied().unwrap_or(0.0)
    }
}

/// Borrowed evaluation context: the variant configuration plus the
/// transient per-turn state the weight table depends on.
pub struct EvalCtx<'a> {
    pub config: &'a PolicyConfig,
    pub distancer: &'a mut Distancer,
    pub home_boundary: &'a [Position],
    pub mode: Mode,
    /// Persistent threat flag as of the previous evaluation.
    pub threat: bool,
    pub defense_pressure: bool,
}

/// Result of scoring one candidate action.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub score: f64,
    pub features: FeatureVector,
    /// New value for the persistent threat flag, when the threat probe
    /// ran. The turn driver commits this; the lookahead planner does not.
    pub threat_update: Option<bool>,
}

/// Scores `action` from `view` for `me`: `dot(features, weights)`.
pub fn evaluate<G: GameView>(
    ctx: &mut EvalCtx<'_>,
    view: &G,
    me: AgentId,
    action: Action,
) -> Evaluation {
    let succ = aligned_successor(view, me, action);
    let (features, threat_update) = features_of(ctx, view, &succ, me, action);
    // The weight table reads the flag the threat probe just wrote.
    let threat_now = threat_update.unwrap_or(ctx.threat);
    let weights = weights_of(ctx, view, &succ, me, threat_now);
    Evaluation {
        score: features.dot(&weights),
        features,
        threat_update,
    }
}

/// The feature half of the public contract, successor computed internally.
pub fn features<G: GameView>(
    ctx: &mut EvalCtx<'_>,
    view: &G,
    me: AgentId,
    action: Action,
) -> FeatureVector {
    let succ = aligned_successor(view, me, action);
    features_of(ctx, view, &succ, me, action).0
}

/// The weight half of the public contract, successor computed internally.
pub fn weights<G: GameView>(
    ctx: &mut EvalCtx<'_>,
    view: &G,
    me: AgentId,
    action: Action,
) -> WeightTable {
    let succ = aligned_successor(view, me, action);
    weights_of(ctx, view, &succ, me, ctx.threat)
}

fn features_of<G: GameView>(
    ctx: &mut EvalCtx<'_>,
    view: &G,
    succ: &G,
    me: AgentId,
    action: Action,
) -> (FeatureVector, Option<bool>) {
    let mut fv = FeatureVector::new();
    let team = succ.team_of(me);

    let Some(my_pos) = succ
        .position(me)
        .or_else(|| view.position(me))
        .map(|p| p.nearest_cell())
    else {
        // own position should always be known; degrade to a zero vector
        return (fv, None);
    };

    let mut invaders = Vec::new();
    let mut hunters = Vec::new();
    for opp in succ.opponents(team) {
        let Some(pos) = succ.position(opp) else {
            continue;
        };
        let cell = pos.nearest_cell();
        if succ.is_pursuer(opp) {
            if !succ.is_neutralized(opp) {
                hunters.push(cell);
            }
        } else {
            invaders.push(cell);
        }
    }

    if let Some((_, d)) = ctx.distancer.nearest(my_pos, &invaders) {
        fv.set(Feature::InvaderDistance, -(d as f64));
    }
    fv.set(Feature::NumInvaders, invaders.len() as f64);

    let enemy_food = succ.food_on_side(team.rival());
    if let Some((_, d)) = ctx.distancer.nearest(my_pos, &enemy_food) {
        fv.set(Feature::FoodDistance, -(d as f64));
    }

    // Threat probe: only runs while vulnerable with a hunter in sight,
    // and only then touches the persistent flag.
    let mut threat_update = None;
    if !succ.is_pursuer(me) && !hunters.is_empty() {
        let d = hunters
            .iter()
            .map(|&h| ctx.distancer.distance(my_pos, h))
            .min()
            .unwrap_or(u32::MAX);
        if d <= ctx.config.threat_radius {
            // clamp: a hunter sharing our cell counts as distance 1
            fv.set(Feature::HunterThreat, 1.0 / f64::from(d.max(1)));
            threat_update = Some(true);
        } else {
            threat_update = Some(false);
        }
    }

    let carried = succ.carrying(me);
    if (carried > ctx.config.return_home_carry || ctx.mode == Mode::Retreat)
        && !ctx.home_boundary.is_empty()
    {
        if let Some((_, d)) = ctx.distancer.nearest(my_pos, ctx.home_boundary) {
            fv.set(Feature::ReturnHome, -(d as f64));
        }
    }

    let food_before = view.food_on_side(team.rival()).len();
    if enemy_food.len() < food_before {
        fv.set(Feature::FoodCollected, 1.0);
    }

    let heading = view.heading(me);
    if heading != Action::Stop && action == heading.reverse() {
        fv.set(Feature::Reverse, 1.0);
    }

    if view.maze().is_dead_end(my_pos) {
        fv.set(Feature::DeadEnd, 1.0);
    }

    fv.set(
        Feature::OnDefense,
        if succ.is_pursuer(me) { 1.0 } else { 0.0 },
    );

    if action == Action::Stop {
        fv.set(Feature::Stop, 1.0);
    }

    fv.set(Feature::Carrying, f64::from(carried));

    if ctx.defense_pressure {
        if let Some((_, mate)) = teammate_cell(succ, me) {
            let d = ctx.distancer.distance(my_pos, mate);
            fv.set(Feature::TeammateSeparation, -(f64::from(d)));
        }
        let defended = succ.food_on_side(team);
        if let Some((_, d)) = ctx.distancer.nearest(my_pos, &defended) {
            fv.set(Feature::DefendFood, -(d as f64));
        }
    }

    (fv, threat_update)
}

fn weights_of<G: GameView>(
    ctx: &EvalCtx<'_>,
    view: &G,
    succ: &G,
    me: AgentId,
    threat: bool,
) -> WeightTable {
    let w = &ctx.config.weights;
    let carried = succ.carrying(me);

    let mut t = WeightTable::new();
    t.set(Feature::InvaderDistance, w.invader_distance);
    t.set(
        Feature::FoodDistance,
        if ctx.mode == Mode::Offense {
            w.food_distance_offense
        } else {
            w.food_distance
        },
    );
    t.set(Feature::HunterThreat, w.hunter_threat);

    // Home pull steepens with the haul, plus extra while threatened.
    let mut home = w.return_home_scale * f64::from(carried.max(1));
    if threat {
        home += w.threat_return_bonus;
    }
    t.set(Feature::ReturnHome, home);

    t.set(
        Feature::FoodCollected,
        w.food_collected_scale * view.maze().width() as f64,
    );
    t.set(Feature::Reverse, w.reverse);
    t.set(Feature::DeadEnd, w.dead_end);
    t.set(Feature::Stop, w.stop);

    if ctx.mode == Mode::Defense {
        t.set(Feature::OnDefense, w.on_defense);
        t.set(Feature::NumInvaders, w.num_invaders);
    }
    if ctx.mode == Mode::Retreat {
        t.set(Feature::Carrying, w.carrying);
    }
    if ctx.defense_pressure {
        t.set(Feature::TeammateSeparation, w.teammate_separation);
        t.set(Feature::DefendFood, w.defend_food);
    }
    t
}

fn teammate_cell<G: GameView>(view: &G, me: AgentId) -> Option<(AgentId, Position)> {
    view.teammates(view.team_of(me))
        .into_iter()
        .find(|&id| id != me)
        .and_then(|id| view.position(id).map(|p| (id, p.nearest_cell())))
}
