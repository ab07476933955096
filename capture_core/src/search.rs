use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashMap, HashSet, VecDeque},
};

use crate::maze::Maze;
use crate::{Action, Position};

/// Weighted shortest-path search to the nearest of `goals`, treating the
/// cells in `blocked` as impassable on top of the static walls.
///
/// Returns the action sequence to the nearest reachable goal, or an empty
/// sequence when `start` is already a goal or nothing is reachable —
/// callers must distinguish those cases themselves. Ties between
/// equal-cost goals go to whichever the expansion order reaches first;
/// deterministic for identical inputs, but no particular winner is
/// guaranteed.
///
/// Uniform step cost 1 with a Manhattan-to-nearest-goal heuristic, which
/// is admissible here (no diagonals, no weighted cells). A cheaper path to
/// an already-seen cell re-relaxes it; the explored set only prunes exact
/// re-expansions.
pub fn astar(
    maze: &Maze,
    start: Position,
    goals: &[Position],
    blocked: &HashSet<Position>,
) -> Vec<Action> {
    if goals.is_empty() {
        return Vec::new();
    }
    let goal_set: HashSet<Position> = goals.iter().copied().collect();
    if goal_set.contains(&start) {
        return Vec::new();
    }

    let heuristic =
        |pos: Position| -> usize { goals.iter().map(|&g| pos.manhattan(g)).min().unwrap_or(0) };

    // min-heap on f = g + h
    #[derive(PartialEq, Eq)]
    struct Node {
        priority: usize,
        position: Position,
    }
    impl Ord for Node {
        fn cmp(&self, other: &Self) -> Ordering {
            other.priority.cmp(&self.priority)
        }
    }
    impl PartialOrd for Node {
        fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
            Some(self.cmp(other))
        }
    }

    let mut frontier = BinaryHeap::new();
    let mut came_from: HashMap<Position, (Position, Action)> = HashMap::new();
    let mut cost_so_far: HashMap<Position, usize> = HashMap::new();
    let mut explored: HashSet<Position> = HashSet::new();

    cost_so_far.insert(start, 0);
    frontier.push(Node {
        priority: heuristic(start),
        position: start,
    });

    while let Some(Node {
        position: current, ..
    }) = frontier.pop()
    {
        if goal_set.contains(&current) {
            return reconstruct(&came_from, start, current);
        }
        if !explored.insert(current) {
            continue;
        }

        for (action, next) in maze.neighbors(current) {
            if blocked.contains(&next) {
                continue;
            }
            let new_cost = cost_so_far[&current] + 1;
            if cost_so_far.get(&next).is_none_or(|&c| new_cost < c) {
                cost_so_far.insert(next, new_cost);
                came_from.insert(next, (current, action));
                frontier.push(Node {
                    priority: new_cost + heuristic(next),
                    position: next,
                });
            }
        }
    }

    Vec::new()
}

/// Unweighted shortest-path search to the nearest of `goals`, walls only.
/// Same empty-sequence contract as [`astar`].
pub fn bfs(maze: &Maze, start: Position, goals: &[Position]) -> Vec<Action> {
    if goals.is_empty() {
        return Vec::new();
    }
    let goal_set: HashSet<Position> = goals.iter().copied().collect();
    if goal_set.contains(&start) {
        return Vec::new();
    }

    let mut frontier = VecDeque::new();
    let mut came_from: HashMap<Position, (Position, Action)> = HashMap::new();
    let mut seen: HashSet<Position> = HashSet::new();

    seen.insert(start);
    frontier.push_back(start);

    while let Some(current) = frontier.pop_front() {
        if goal_set.contains(&current) {
            return reconstruct(&came_from, start, current);
        }
        for (action, next) in maze.neighbors(current) {
            if seen.insert(next) {
                came_from.insert(next, (current, action));
                frontier.push_back(next);
            }
        }
    }

    Vec::new()
}

fn reconstruct(
    came_from: &HashMap<Position, (Position, Action)>,
    start: Position,
    goal: Position,
) -> Vec<Action> {
    let mut actions = Vec::new();
    let mut current = goal;
    while current != start {
        let Some(&(prev, action)) = came_from.get(&current) else {
            // broken back-chain; treat as unreachable
            return Vec::new();
        };
        actions.push(action);
        current = prev;
    }
    actions.reverse();
    actions
}
