use serde::{Deserialize, Serialize};

use crate::{Action, Position, Team};

/// Represents errors that can occur while constructing a maze.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MazeError {
    #[error("Maze has no rows or zero width")]
    Empty,
    #[error("Row {row} has width {found}, expected {expected}")]
    RaggedRow {
        row: usize,
        found: usize,
        expected: usize,
    },
}

/// The static wall map of the arena.
///
/// Row 0 of the backing storage is the *bottom* of the maze (y = 0), so y
/// grows northwards, matching [`Action::North`]. The map is immutable for
/// the lifetime of a match; dynamic obstacles (enemy agents) are handled by
/// the searches, not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Maze {
    width: usize,
    height: usize,
    walls: Vec<bool>,
}

impl Maze {
    /// Creates an open maze with the given dimensions (no interior walls).
    pub fn open(width: usize, height: usize) -> Result<Self, MazeError> {
        if width == 0 || height == 0 {
            return Err(MazeError::Empty);
        }
        Ok(Maze {
            width,
            height,
            walls: vec![false; width * height],
        })
    }

    /// Builds a maze from string rows, `'#'` marking walls. The first row
    /// is the *top* of the maze. Intended for in-code layout literals in
    /// tests and demos; there is no file format.
    pub fn from_rows(rows: &[&str]) -> Result<Self, MazeError> {
        if rows.is_empty() {
            return Err(MazeError::Empty);
        }
        let height = rows.len();
        let width = rows[0].chars().count();
        if width == 0 {
            return Err(MazeError::Empty);
        }
        let mut walls = vec![false; width * height];
        for (i, row) in rows.iter().enumerate() {
            let found = row.chars().count();
            if found != width {
                return Err(MazeError::RaggedRow {
                    row: i,
                    found,
                    expected: width,
                });
            }
            let y = height - 1 - i;
            for (x, ch) in row.chars().enumerate() {
                walls[y * width + x] = ch == '#';
            }
        }
        Ok(Maze {
            width,
            height,
            walls,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Whether the cell is a wall. Cells outside the map count as walls.
    pub fn is_wall(&self, pos: Position) -> bool {
        if pos.x >= self.width || pos.y >= self.height {
            return true;
        }
        self.walls[pos.y * self.width + pos.x]
    }

    pub fn walkable(&self, pos: Position) -> bool {
        !self.is_wall(pos)
    }

    /// The walkable cell reached by taking `action` from `pos`, if any.
    pub fn neighbor(&self, pos: Position, action: Action) -> Option<Position> {
        let next = pos.step(action)?;
        self.walkable(next).then_some(next)
    }

    /// Walkable orthogonal neighbors with the action leading to each.
    pub fn neighbors(&self, pos: Position) -> Vec<(Action, Position)> {
        Action::MOVES
            .iter()
            .filter_map(|&a| self.neighbor(pos, a).map(|n| (a, n)))
            .collect()
    }

    /// A cell is a dead end when exactly 3 of its 4 orthogonal neighbors
    /// are walls (map edges count as walls).
    pub fn is_dead_end(&self, pos: Position) -> bool {
        let open = Action::MOVES
            .iter()
            .filter(|&&a| self.neighbor(pos, a).is_some())
            .count();
        open == 1
    }

    /// The x coordinate of the boundary column on `team`'s own side.
    /// Crossing past it flips an agent into pursued form.
    pub fn home_column(&self, team: Team) -> usize {
        match team {
            Team::Red => self.width / 2 - 1,
            Team::Blue => self.width / 2,
        }
    }

    /// Walkable cells of `team`'s boundary column, ascending by y.
    pub fn home_boundary(&self, team: Team) -> Vec<Position> {
        let x = self.home_column(team);
        (0..self.height)
            .map(|y| Position::new(x, y))
            .filter(|&p| self.walkable(p))
            .collect()
    }

    /// The side of the midline a cell sits on.
    pub fn side_of(&self, pos: Position) -> Team {
        if pos.x < self.width / 2 {
            Team::Red
        } else {
            Team::Blue
        }
    }

    pub fn on_home_side(&self, pos: Position, team: Team) -> bool {
        self.side_of(pos) == team
    }

    /// All walkable cells, in row-major order.
    pub fn walkable_cells(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.height).flat_map(move |y| {
            (0..self.width)
                .map(move |x| Position::new(x, y))
                .filter(|&p| self.walkable(p))
        })
    }
}
