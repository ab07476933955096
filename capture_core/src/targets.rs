use serde::{Deserialize, Serialize};

use crate::distance::Distancer;
use crate::game::Observation;
use crate::policy::Mode;
use crate::Position;

/// Cyclic patrol over a handful of boundary cells, persisted across turns
/// for the lifetime of one agent instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatrolState {
    points: Vec<Position>,
    index: usize,
    last_switch: u32,
}

impl PatrolState {
    /// Samples at most 4 evenly spaced cells (first, ~1/3, ~2/3, last)
    /// from the boundary, sorted by y; fewer boundary cells are all kept.
    pub fn new(boundary: &[Position]) -> Self {
        let mut sorted: Vec<Position> = boundary.to_vec();
        sorted.sort_by_key(|p| (p.y, p.x));
        let n = sorted.len();
        let mut points: Vec<Position> = if n <= 4 {
            sorted
        } else {
            [0, n / 3, 2 * n / 3, n - 1]
                .into_iter()
                .map(|i| sorted[i])
                .collect()
        };
        points.dedup();
        PatrolState {
            points,
            index: 0,
            last_switch: 0,
        }
    }

    /// The cell currently being swept toward, if any exist.
    pub fn current(&self) -> Option<Position> {
        self.points.get(self.index).copied()
    }

    /// Advances to the next patrol cell when the current one has been
    /// reached (within 1 step of path distance) or the timeout elapsed,
    /// whichever comes first.
    pub fn advance_if_due(
        &mut self,
        my_pos: Position,
        turn: u32,
        timeout: u32,
        dist: &mut Distancer,
    ) {
        let Some(target) = self.current() else {
            return;
        };
        let reached = dist.distance(my_pos, target) <= 1;
        if reached || turn.saturating_sub(self.last_switch) > timeout {
            self.index = (self.index + 1) % self.points.len();
            self.last_switch = turn;
        }
    }
}

/// Goal cells for the current mode. A pure function of the mode, the
/// observation, and the persistent patrol state; may legitimately return
/// an empty set (e.g. offense with no food left), which callers treat as
/// "no path" and fall through to evaluation.
pub fn select_targets(
    mode: Mode,
    obs: &Observation,
    assigned_invaders: &[Position],
    home_boundary: &[Position],
    patrol: &PatrolState,
) -> Vec<Position> {
    match mode {
        Mode::Offense => obs.enemy_food.clone(),
        Mode::Defense => {
            if !assigned_invaders.is_empty() {
                assigned_invaders.to_vec()
            } else if let Some(p) = patrol.current() {
                vec![p]
            } else {
                home_boundary.to_vec()
            }
        }
        Mode::Retreat => home_boundary.to_vec(),
    }
}
