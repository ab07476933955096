use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::game::GameView;
use crate::maze::Maze;
use crate::{Action, AgentId, PointF, Position, Team};

/// Represents errors that can occur while assembling a simulation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimError {
    #[error("Cell {0:?} is a wall or out of bounds")]
    BlockedCell(Position),
    #[error("Food at {0:?} is already placed")]
    DuplicateFood(Position),
}

/// Mutable per-agent state inside the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimAgent {
    pub team: Team,
    pub pos: Position,
    pub spawn: Position,
    pub heading: Action,
    pub carrying: u32,
    pub neutralized_for: u32,
    /// Masked out of this view (see [`SimGame::fogged_for`]).
    hidden: bool,
}

/// What a committed move did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Moved,
    Blocked,
    Collected,
    Banked(u32),
    CapturedInvader(AgentId),
    Died,
}

/// Reference match engine: the smallest set of rules the policy core can
/// observe. Sided movement, role-form flips at the midline, resource
/// pickup/carry/bank, capture-and-respawn, neutralization timers. No
/// capsules, no score-based termination; a host decides when to stop.
///
/// Doubles as the per-viewer observation: [`SimGame::fogged_for`] masks
/// enemies beyond a sight radius, and everything an agent then computes —
/// successors included — sees only that masked world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimGame {
    maze: Maze,
    agents: Vec<SimAgent>,
    food: BTreeSet<Position>,
    red_score: i32,
    blue_score: i32,
    turn: u32,
}

impl SimGame {
    pub fn new(maze: Maze, spawns: &[(Team, Position)]) -> Result<Self, SimError> {
        let mut agents = Vec::with_capacity(spawns.len());
        for &(team, pos) in spawns {
            if !maze.walkable(pos) {
                return Err(SimError::BlockedCell(pos));
            }
            agents.push(SimAgent {
                team,
                pos,
                spawn: pos,
                heading: Action::Stop,
                carrying: 0,
                neutralized_for: 0,
                hidden: false,
            });
        }
        Ok(SimGame {
            maze,
            agents,
            food: BTreeSet::new(),
            red_score: 0,
            blue_score: 0,
            turn: 0,
        })
    }

    pub fn add_food(&mut self, pos: Position) -> Result<(), SimError> {
        if !self.maze.walkable(pos) {
            return Err(SimError::BlockedCell(pos));
        }
        if !self.food.insert(pos) {
            return Err(SimError::DuplicateFood(pos));
        }
        Ok(())
    }

    pub fn maze_ref(&self) -> &Maze {
        &self.maze
    }

    pub fn agent(&self, id: AgentId) -> &SimAgent {
        &self.agents[id]
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn food_cells(&self) -> impl Iterator<Item = Position> + '_ {
        self.food.iter().copied()
    }

    /// Inherent mirror of [`GameView::legal_actions`].
    pub fn legal_actions_of(&self, id: AgentId) -> Vec<Action> {
        let mut actions = vec![Action::Stop];
        let pos = self.agents[id].pos;
        for &a in &Action::MOVES {
            if self.maze.neighbor(pos, a).is_some() {
                actions.push(a);
            }
        }
        actions
    }

    /// Test and host hook: move an agent without game-rule side effects.
    pub fn teleport(&mut self, id: AgentId, pos: Position) {
        self.agents[id].pos = pos;
    }

    pub fn set_carrying(&mut self, id: AgentId, carrying: u32) {
        self.agents[id].carrying = carrying;
    }

    pub fn set_neutralized(&mut self, id: AgentId, turns: u32) {
        self.agents[id].neutralized_for = turns;
    }

    /// The world as `me` sees it: enemies farther than `radius` (Manhattan
    /// from `me` or its teammate) have their positions masked.
    pub fn fogged_for(&self, me: AgentId, radius: usize) -> SimGame {
        let mut view = self.clone();
        let my_team = self.agents[me].team;
        let friendly: Vec<Position> = self
            .agents
            .iter()
            .filter(|a| a.team == my_team)
            .map(|a| a.pos)
            .collect();
        for agent in view.agents.iter_mut() {
            if agent.team != my_team {
                let seen = friendly.iter().any(|&f| f.manhattan(agent.pos) <= radius);
                agent.hidden = !seen;
            }
        }
        view
    }

    fn on_own_side(&self, id: AgentId) -> bool {
        let a = &self.agents[id];
        self.maze.on_home_side(a.pos, a.team)
    }

    /// Commits one move. The engine trusts the host to alternate turns;
    /// an illegal move leaves the state untouched and reports `Blocked`.
    pub fn apply(&mut self, me: AgentId, action: Action) -> StepOutcome {
        self.turn += 1;
        let agent = &mut self.agents[me];
        agent.neutralized_for = agent.neutralized_for.saturating_sub(1);

        if action == Action::Stop {
            return StepOutcome::Moved;
        }
        let Some(next) = self.maze.neighbor(self.agents[me].pos, action) else {
            return StepOutcome::Blocked;
        };
        self.agents[me].pos = next;
        self.agents[me].heading = action;

        // capture checks before anything else: stepping onto a live
        // hunter while vulnerable is death, not a pickup
        let my_team = self.agents[me].team;
        let i_am_pursuer = self.on_own_side(me);
        for other in 0..self.agents.len() {
            if other == me || self.agents[other].team == my_team {
                continue;
            }
            if self.agents[other].pos != next {
                continue;
            }
            let they_are_pursuers = self.on_own_side(other);
            if !i_am_pursuer && they_are_pursuers {
                if self.agents[other].neutralized_for == 0 {
                    let spawn = self.agents[me].spawn;
                    self.agents[me].pos = spawn;
                    self.agents[me].carrying = 0;
                    return StepOutcome::Died;
                }
                // walked over a neutralized hunter: it goes home
                let spawn = self.agents[other].spawn;
                self.agents[other].pos = spawn;
                self.agents[other].neutralized_for = 0;
            } else if i_am_pursuer && !they_are_pursuers && self.agents[me].neutralized_for == 0 {
                let spawn = self.agents[other].spawn;
                self.agents[other].pos = spawn;
                self.agents[other].carrying = 0;
                return StepOutcome::CapturedInvader(other);
            }
        }

        // pickup on enemy ground
        if !i_am_pursuer && self.food.remove(&next) {
            self.agents[me].carrying += 1;
            return StepOutcome::Collected;
        }

        // banking: touching home ground converts the haul to score
        if i_am_pursuer && self.agents[me].carrying > 0 {
            let haul = self.agents[me].carrying;
            self.agents[me].carrying = 0;
            match my_team {
                Team::Red => self.red_score += haul as i32,
                Team::Blue => self.blue_score += haul as i32,
            }
            return StepOutcome::Banked(haul);
        }

        StepOutcome::Moved
    }
}

impl GameView for SimGame {
    fn maze(&self) -> &Maze {
        &self.maze
    }

    fn legal_actions(&self, agent: AgentId) -> Vec<Action> {
        self.legal_actions_of(agent)
    }

    fn successor(&self, agent: AgentId, action: Action) -> Self {
        let mut next = self.clone();
        next.apply(agent, action);
        next
    }

    fn position(&self, agent: AgentId) -> Option<PointF> {
        let a = &self.agents[agent];
        (!a.hidden).then(|| a.pos.into())
    }

    fn is_pursuer(&self, agent: AgentId) -> bool {
        self.on_own_side(agent)
    }

    fn is_neutralized(&self, agent: AgentId) -> bool {
        self.agents[agent].neutralized_for > 0
    }

    fn carrying(&self, agent: AgentId) -> u32 {
        self.agents[agent].carrying
    }

    fn heading(&self, agent: AgentId) -> Action {
        self.agents[agent].heading
    }

    fn food_on_side(&self, side: Team) -> Vec<Position> {
        self.food
            .iter()
            .copied()
            .filter(|&p| self.maze.side_of(p) == side)
            .collect()
    }

    fn team_of(&self, agent: AgentId) -> Team {
        self.agents[agent].team
    }

    fn opponents(&self, team: Team) -> Vec<AgentId> {
        (0..self.agents.len())
            .filter(|&i| self.agents[i].team != team)
            .collect()
    }

    fn teammates(&self, team: Team) -> Vec<AgentId> {
        (0..self.agents.len())
            .filter(|&i| self.agents[i].team == team)
            .collect()
    }

    fn score(&self, team: Team) -> i32 {
        match team {
            Team::Red => self.red_score,
            Team::Blue => self.blue_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arena() -> SimGame {
        SimGame::new(
            Maze::open(8, 4).unwrap(),
            &[
                (Team::Red, Position::new(1, 1)),
                (Team::Blue, Position::new(6, 1)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn spawning_inside_a_wall_is_rejected() {
        let maze = Maze::from_rows(&["#.", "#."]).unwrap();
        let err = SimGame::new(maze, &[(Team::Red, Position::new(0, 0))]);
        assert_eq!(err, Err(SimError::BlockedCell(Position::new(0, 0))));
    }

    #[test]
    fn role_flips_exactly_at_the_midline() {
        let mut game = arena();
        game.teleport(0, Position::new(3, 1));
        assert!(game.is_pursuer(0));
        game.apply(0, Action::East);
        assert!(!game.is_pursuer(0));
    }

    #[test]
    fn moves_into_walls_are_blocked_and_change_nothing() {
        let maze = Maze::from_rows(&[
            "####", //
            "#..#", //
            "####",
        ])
        .unwrap();
        let mut game = SimGame::new(maze, &[(Team::Red, Position::new(1, 1))]).unwrap();
        assert_eq!(game.apply(0, Action::North), StepOutcome::Blocked);
        assert_eq!(game.agent(0).pos, Position::new(1, 1));
    }

    #[test]
    fn collecting_then_banking_scores_the_haul() {
        let mut game = arena();
        game.teleport(0, Position::new(4, 1));
        game.add_food(Position::new(5, 1)).unwrap();
        assert_eq!(game.apply(0, Action::East), StepOutcome::Collected);
        assert_eq!(game.agent(0).carrying, 1);

        game.teleport(0, Position::new(4, 1));
        assert_eq!(game.apply(0, Action::West), StepOutcome::Banked(1));
        assert_eq!(game.agent(0).carrying, 0);
        assert_eq!(game.score(Team::Red), 1);
        assert_eq!(game.score(Team::Blue), 0);
    }

    #[test]
    fn walking_into_a_live_hunter_is_death() {
        let mut game = arena();
        game.teleport(0, Position::new(4, 1));
        game.set_carrying(0, 3);
        game.teleport(1, Position::new(5, 1));
        assert_eq!(game.apply(0, Action::East), StepOutcome::Died);
        assert_eq!(game.agent(0).pos, game.agent(0).spawn);
        assert_eq!(game.agent(0).carrying, 0);
    }

    #[test]
    fn a_neutralized_hunter_is_harmless() {
        let mut game = arena();
        game.teleport(0, Position::new(4, 1));
        game.teleport(1, Position::new(5, 1));
        game.set_neutralized(1, 10);
        assert_ne!(game.apply(0, Action::East), StepOutcome::Died);
        // the overrun hunter went home with its timer cleared
        assert_eq!(game.agent(1).pos, game.agent(1).spawn);
        assert_eq!(game.agent(1).neutralized_for, 0);
    }

    #[test]
    fn pursuer_captures_an_invader_on_its_cell() {
        let mut game = arena();
        game.teleport(1, Position::new(2, 1)); // blue deep in red land
        game.set_carrying(1, 2);
        assert_eq!(game.apply(0, Action::East), StepOutcome::CapturedInvader(1));
        assert_eq!(game.agent(1).pos, game.agent(1).spawn);
        assert_eq!(game.agent(1).carrying, 0);
    }

    #[test]
    fn fog_masks_far_enemies_only() {
        let mut game = SimGame::new(
            Maze::open(12, 4).unwrap(),
            &[
                (Team::Red, Position::new(1, 1)),
                (Team::Red, Position::new(2, 1)),
                (Team::Blue, Position::new(4, 1)),
                (Team::Blue, Position::new(11, 3)),
            ],
        )
        .unwrap();
        game.teleport(2, Position::new(4, 1));
        let view = game.fogged_for(0, 5);
        assert!(view.position(2).is_some());
        assert!(view.position(3).is_none());
        // own team is never masked
        assert!(view.position(0).is_some());
        assert!(view.position(1).is_some());
    }

    #[test]
    fn successor_leaves_the_original_untouched() {
        let game = arena();
        let succ = game.successor(0, Action::East);
        assert_eq!(game.agent(0).pos, Position::new(1, 1));
        assert_eq!(succ.agent(0).pos, Position::new(2, 1));
    }
}
