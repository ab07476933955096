use std::collections::{HashMap, VecDeque};

use crate::maze::Maze;
use crate::Position;

/// Maze-distance service, one instance owned by each agent.
///
/// True shortest-path distances are computed by a breadth-first sweep from
/// the source cell the first time that source is queried, then served from
/// the cache. Queries the sweep could not reach (separated regions, cells
/// inside walls) fall back to Manhattan distance, so an answer is always
/// available even when it can only be approximate.
#[derive(Debug, Clone)]
pub struct Distancer {
    maze: Maze,
    cache: HashMap<Position, HashMap<Position, u32>>,
}

impl Distancer {
    pub fn new(maze: Maze) -> Self {
        Distancer {
            maze,
            cache: HashMap::new(),
        }
    }

    /// Shortest-path distance in steps, Manhattan when unresolvable.
    pub fn distance(&mut self, from: Position, to: Position) -> u32 {
        if from == to {
            return 0;
        }
        if !self.cache.contains_key(&from) {
            let map = self.sweep(from);
            self.cache.insert(from, map);
        }
        self.cache[&from]
            .get(&to)
            .copied()
            .unwrap_or(from.manhattan(to) as u32)
    }

    /// Distance from `from` to the closest of `targets`, with the winning
    /// cell. `None` when `targets` is empty.
    pub fn nearest(&mut self, from: Position, targets: &[Position]) -> Option<(Position, u32)> {
        targets
            .iter()
            .map(|&t| (t, self.distance(from, t)))
            .min_by_key(|&(t, d)| (d, t))
    }

    fn sweep(&self, from: Position) -> HashMap<Position, u32> {
        let mut dist = HashMap::new();
        if !self.maze.walkable(from) {
            return dist;
        }
        dist.insert(from, 0u32);
        let mut frontier = VecDeque::new();
        frontier.push_back(from);
        while let Some(pos) = frontier.pop_front() {
            let d = dist[&pos];
            for (_, next) in self.maze.neighbors(pos) {
                if !dist.contains_key(&next) {
                    dist.insert(next, d + 1);
                    frontier.push_back(next);
                }
            }
        }
        dist
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn straight_corridor_matches_manhattan() {
        let maze = Maze::open(6, 1).unwrap();
        let mut d = Distancer::new(maze);
        assert_eq!(d.distance(Position::new(0, 0), Position::new(5, 0)), 5);
        assert_eq!(d.distance(Position::new(3, 0), Position::new(3, 0)), 0);
    }

    #[test]
    fn detours_around_walls_exceed_manhattan() {
        // wall splits the middle column except the bottom row
        let maze = Maze::from_rows(&[
            ".#.", //
            ".#.", //
            "...",
        ])
        .unwrap();
        let mut d = Distancer::new(maze);
        // across the top: down, around, and back up
        assert_eq!(d.distance(Position::new(0, 2), Position::new(2, 2)), 6);
    }

    #[test]
    fn unreachable_cells_fall_back_to_manhattan() {
        let maze = Maze::from_rows(&[
            ".#.", //
            ".#.", //
            ".#.",
        ])
        .unwrap();
        let mut d = Distancer::new(maze);
        assert_eq!(d.distance(Position::new(0, 0), Position::new(2, 0)), 2);
    }

    #[test]
    fn nearest_prefers_the_closer_target() {
        let maze = Maze::open(8, 1).unwrap();
        let mut d = Distancer::new(maze);
        let targets = [Position::new(7, 0), Position::new(3, 0)];
        assert_eq!(
            d.nearest(Position::new(1, 0), &targets),
            Some((Position::new(3, 0), 2))
        );
        assert_eq!(d.nearest(Position::new(1, 0), &[]), None);
    }
}
