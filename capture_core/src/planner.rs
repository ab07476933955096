use tracing::trace;

use crate::features::{evaluate, EvalCtx};
use crate::game::{aligned_successor, GameView};
use crate::{Action, AgentId};

/// Bounded-depth beam search used to escape entrapment and oscillation.
///
/// Explores action sequences up to `depth` moves, keeping only the
/// `width` best-scoring branches after each expansion. Each step is
/// scored with the feature evaluator against its own predecessor state
/// and added to the branch's running total. `Stop` is never expanded, so
/// the planner always proposes movement.
///
/// Greedy by construction: the beam can discard the prefix of the true
/// optimum. That trade is accepted for the per-turn time budget. Ties
/// between equal-scoring branches fall to expansion order.
///
/// Returns the first action of the best surviving sequence, or `None`
/// when nothing survives the first expansion. The threat flag is *not*
/// committed from in-search evaluations; hypothetical positions must not
/// leak into persistent state.
pub fn beam_search<G: GameView>(
    ctx: &mut EvalCtx<'_>,
    root: &G,
    me: AgentId,
    depth: usize,
    width: usize,
) -> Option<Action> {
    struct Branch<G> {
        score: f64,
        first: Option<Action>,
        state: G,
    }

    let mut frontier = vec![Branch {
        score: 0.0,
        first: None,
        state: root.clone(),
    }];

    for _ in 0..depth {
        let mut candidates: Vec<Branch<G>> = Vec::new();
        for branch in &frontier {
            for action in branch.state.legal_actions(me) {
                if action == Action::Stop {
                    continue;
                }
                let eval = evaluate(ctx, &branch.state, me, action);
                let succ = aligned_successor(&branch.state, me, action);
                candidates.push(Branch {
                    score: branch.score + eval.score,
                    first: branch.first.or(Some(action)),
                    state: succ,
                });
            }
        }
        if candidates.is_empty() {
            // keep whatever survived so far
            break;
        }
        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        candidates.truncate(width);
        frontier = candidates;
    }

    let best = frontier
        .into_iter()
        .max_by(|a, b| a.score.total_cmp(&b.score))?;
    trace!(score = best.score, action = ?best.first, "beam search result");
    best.first
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::Distancer;
    use crate::maze::Maze;
    use crate::policy::{Mode, PolicyConfig};
    use crate::sim::SimGame;
    use crate::{Position, Team};

    fn game_on(maze: Maze, spawns: &[(Team, Position)]) -> SimGame {
        SimGame::new(maze, spawns).unwrap()
    }

    fn parts(game: &SimGame) -> (PolicyConfig, Distancer, Vec<Position>) {
        (
            PolicyConfig::reflex(),
            Distancer::new(game.maze_ref().clone()),
            game.maze_ref().home_boundary(Team::Red),
        )
    }

    #[test]
    fn first_action_is_always_legal_at_the_root() {
        let game = game_on(
            Maze::open(8, 4).unwrap(),
            &[
                (Team::Red, Position::new(2, 2)),
                (Team::Red, Position::new(1, 1)),
                (Team::Blue, Position::new(6, 1)),
                (Team::Blue, Position::new(6, 2)),
            ],
        );
        let (cfg, mut dist, boundary) = parts(&game);
        let mut ctx = EvalCtx {
            config: &cfg,
            distancer: &mut dist,
            home_boundary: &boundary,
            mode: Mode::Offense,
            threat: false,
            defense_pressure: false,
        };
        let action = beam_search(&mut ctx, &game, 0, 4, 4).unwrap();
        assert!(game.legal_actions_of(0).contains(&action));
        assert_ne!(action, Action::Stop);
    }

    #[test]
    fn planner_walks_out_of_a_dead_end_toward_home() {
        // carrying food at the end of a pocket on the enemy side; the
        // only first move on the board is back west
        let maze = Maze::from_rows(&[
            "########", //
            "#......#", //
            "####.###", //
            "########",
        ])
        .unwrap();
        let mut game = game_on(
            maze,
            &[
                (Team::Red, Position::new(6, 2)),
                (Team::Red, Position::new(1, 2)),
                (Team::Blue, Position::new(4, 1)),
                (Team::Blue, Position::new(4, 2)),
            ],
        );
        game.set_carrying(0, 3);
        let (cfg, mut dist, boundary) = parts(&game);
        let mut ctx = EvalCtx {
            config: &cfg,
            distancer: &mut dist,
            home_boundary: &boundary,
            mode: Mode::Retreat,
            threat: false,
            defense_pressure: false,
        };
        let action = beam_search(&mut ctx, &game, 0, 6, 6).unwrap();
        assert_eq!(action, Action::West);
    }

    #[test]
    fn boxed_in_agent_yields_no_plan() {
        // sealed 1x1 pocket: no non-Stop expansion survives
        let maze = Maze::from_rows(&[
            "########", //
            "#.#....#", //
            "########",
        ])
        .unwrap();
        let game = game_on(
            maze,
            &[
                (Team::Red, Position::new(1, 1)),
                (Team::Red, Position::new(3, 1)),
                (Team::Blue, Position::new(5, 1)),
                (Team::Blue, Position::new(6, 1)),
            ],
        );
        let (cfg, mut dist, boundary) = parts(&game);
        let mut ctx = EvalCtx {
            config: &cfg,
            distancer: &mut dist,
            home_boundary: &boundary,
            mode: Mode::Offense,
            threat: false,
            defense_pressure: false,
        };
        assert_eq!(beam_search(&mut ctx, &game, 0, 4, 4), None);
    }

    #[test]
    fn beam_width_one_still_returns_a_plan() {
        let game = game_on(
            Maze::open(8, 4).unwrap(),
            &[
                (Team::Red, Position::new(2, 2)),
                (Team::Red, Position::new(1, 1)),
                (Team::Blue, Position::new(6, 1)),
                (Team::Blue, Position::new(6, 2)),
            ],
        );
        let (cfg, mut dist, boundary) = parts(&game);
        let mut ctx = EvalCtx {
            config: &cfg,
            distancer: &mut dist,
            home_boundary: &boundary,
            mode: Mode::Offense,
            threat: false,
            defense_pressure: false,
        };
        assert!(beam_search(&mut ctx, &game, 0, 3, 1).is_some());
    }
}
