use serde::{Deserialize, Serialize};

pub mod agent;
pub mod distance;
pub mod features;
pub mod game;
pub mod maze;
pub mod planner;
pub mod policy;
pub mod search;
pub mod sim;
pub mod targets;

/// Index of an agent in the engine's turn order.
pub type AgentId = usize;

/// Represents a 2D grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: usize,
    pub y: usize,
}

impl Position {
    pub fn new(x: usize, y: usize) -> Self {
        Position { x, y }
    }

    /// Manhattan distance between two cells.
    pub fn manhattan(self, other: Position) -> usize {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// The cell one step away in the given direction, if it does not leave
    /// the coordinate space. `Stop` yields the cell itself.
    pub fn step(self, action: Action) -> Option<Position> {
        let (dx, dy) = action.delta();
        let x = self.x.checked_add_signed(dx)?;
        let y = self.y.checked_add_signed(dy)?;
        Some(Position { x, y })
    }
}

/// A raw position as reported by an engine. Agents may sit between two
/// cells mid-transition; only snapped positions are valid search nodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointF {
    pub x: f32,
    pub y: f32,
}

impl PointF {
    /// Snaps to the closest integer cell.
    pub fn nearest_cell(self) -> Position {
        Position {
            x: self.x.round().max(0.0) as usize,
            y: self.y.round().max(0.0) as usize,
        }
    }

    /// Whether this position sits exactly on a grid cell.
    pub fn is_aligned(self) -> bool {
        self.x.fract() == 0.0 && self.y.fract() == 0.0
    }
}

impl From<Position> for PointF {
    fn from(pos: Position) -> Self {
        PointF {
            x: pos.x as f32,
            y: pos.y as f32,
        }
    }
}

/// Represents the moves an agent can decide on each turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    North,
    South,
    East,
    West,
    Stop,
}

impl Action {
    /// The four movement actions, in the order searches expand them.
    pub const MOVES: [Action; 4] = [Action::North, Action::South, Action::East, Action::West];

    /// Unit displacement of this action. North increases y.
    pub fn delta(self) -> (isize, isize) {
        match self {
            Action::North => (0, 1),
            Action::South => (0, -1),
            Action::East => (1, 0),
            Action::West => (-1, 0),
            Action::Stop => (0, 0),
        }
    }

    /// The opposite direction. `Stop` reverses to itself.
    pub fn reverse(self) -> Action {
        match self {
            Action::North => Action::South,
            Action::South => Action::North,
            Action::East => Action::West,
            Action::West => Action::East,
            Action::Stop => Action::Stop,
        }
    }
}

/// Which team an agent plays for. Red owns the left half of the maze.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    Red,
    Blue,
}

impl Team {
    pub fn rival(self) -> Team {
        match self {
            Team::Red => Team::Blue,
            Team::Blue => Team::Red,
        }
    }
}
