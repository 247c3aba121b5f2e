/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use uci_parser::UciSearchOptions;

use crate::{Evaluator, Mobility, MoveGuard, Rules, Score, DEFAULT_DEPTH};

/// Maximum depth that can be searched.
///
/// The search recurses once per ply, so this also bounds its stack usage.
pub const MAX_DEPTH: usize = 64;

/// The result of a search, containing the best move found, its score, and total nodes searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SearchResult<M> {
    /// Number of nodes searched.
    pub nodes: u64,

    /// Best move found during the search.
    ///
    /// This is `None` at leaves, and at nodes where the side-to-move had no moves to play.
    pub bestmove: Option<M>,

    /// Evaluation of the position after `bestmove` is made.
    pub score: Score,

    /// The depth of the search that produced this result.
    pub depth: usize,
}

impl<M> SearchResult<M> {
    /// Returns `true` if a search with remaining depth found no move to play.
    ///
    /// This happens when the side-to-move has no legal moves, yet the rules did not consider the position terminal.
    /// The score of such a result is still the initial `-INF` / `+INF` and carries no information.
    ///
    /// Only the root is checked. A degenerate node deeper in the tree hands its sentinel up
    /// like any other score, so the root can return a real move with an infinite score.
    /// Such a result is not degenerate.
    #[inline(always)]
    pub fn is_degenerate(&self) -> bool {
        self.depth > 0 && self.bestmove.is_none() && self.score.is_infinite()
    }
}

/// Bounds within an alpha-beta search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchBounds {
    /// Lower bound.
    ///
    /// The maximizing player is guaranteed a score that is AT LEAST `alpha`.
    pub alpha: Score,

    /// Upper bound.
    ///
    /// The minimizing player is guaranteed a score that is AT MOST `beta`.
    pub beta: Score,
}

impl SearchBounds {
    /// Create a new [`SearchBounds`] from the provided `alpha` and `beta` values.
    #[inline(always)]
    pub const fn new(alpha: Score, beta: Score) -> Self {
        Self { alpha, beta }
    }

    /// Returns `true` if the remaining moves at this node cannot affect the result.
    #[inline(always)]
    pub fn is_cutoff(&self) -> bool {
        self.beta <= self.alpha
    }
}

impl Default for SearchBounds {
    /// Default [`SearchBounds`] are `(-infinity, infinity)`.
    #[inline(always)]
    fn default() -> Self {
        Self::new(Score::ALPHA, Score::BETA)
    }
}

/// Configuration variables for executing a [`Search`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchConfig {
    /// Depth, in plies, to search to.
    pub depth: usize,

    /// Whether the side-to-move at the root is the maximizing player.
    pub maximizing: bool,

    /// Whether to skip sibling moves once `beta <= alpha`.
    ///
    /// Disabling this yields a plain minimax search, which visits more nodes but must produce the same result.
    pub pruning: bool,
}

impl SearchConfig {
    /// Constructs a new [`SearchConfig`] from the provided UCI options.
    ///
    /// Only `depth` is respected; if not supplied, `default_depth` is used.
    pub fn new(options: UciSearchOptions, default_depth: usize) -> Self {
        let mut config = Self {
            depth: default_depth,
            ..Default::default()
        };

        if let Some(depth) = options.depth {
            config.depth = depth as usize;
        }

        config.depth = config.depth.min(MAX_DEPTH);
        config
    }
}

impl Default for SearchConfig {
    #[inline(always)]
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
            maximizing: true,
            pruning: true,
        }
    }
}

/// Executes a minimax search with alpha-beta pruning.
///
/// The search does not own a position. It is handed one in [`Search::start`], mutates it in place
/// while recursing, and leaves it exactly as it found it.
#[derive(Debug)]
pub struct Search<E> {
    /// Evaluates positions at the leaves of the search.
    evaluator: E,

    /// Configuration variables for this instance of the search.
    config: SearchConfig,

    /// Number of nodes visited so far.
    nodes: u64,
}

impl<E> Search<E> {
    /// Construct a new [`Search`] that scores leaves with `evaluator`.
    #[inline(always)]
    pub fn new(evaluator: E, config: SearchConfig) -> Self {
        Self {
            evaluator,
            config,
            nodes: 0,
        }
    }

    /// Start the search on `position`, returning the best move found and its score.
    ///
    /// # Panics
    ///
    /// If the configured depth exceeds [`MAX_DEPTH`].
    pub fn start<R>(mut self, position: &mut R) -> SearchResult<R::Move>
    where
        R: Rules,
        E: Evaluator<R>,
    {
        assert!(
            self.config.depth <= MAX_DEPTH,
            "Cannot search to depth {}; maximum is {MAX_DEPTH}",
            self.config.depth
        );

        let (bestmove, score) = self.minimax(
            position,
            self.config.depth,
            SearchBounds::default(),
            self.config.maximizing,
        );

        SearchResult {
            nodes: self.nodes,
            bestmove,
            score,
            depth: self.config.depth,
        }
    }

    /// Primary location of search logic.
    ///
    /// Uses the [minimax](https://www.chessprogramming.org/Minimax) algorithm with
    /// [alpha-beta](https://www.chessprogramming.org/Alpha-Beta) pruning.
    /// Children are explored in the order the rules generate them, and a child only replaces the current
    /// best move if it scores strictly better, so the earliest of several equal moves is kept.
    pub fn minimax<R>(
        &mut self,
        position: &mut R,
        depth: usize,
        mut bounds: SearchBounds,
        maximizing: bool,
    ) -> (Option<R::Move>, Score)
    where
        R: Rules,
        E: Evaluator<R>,
    {
        debug_assert!(
            !self.config.pruning || bounds.alpha < bounds.beta,
            "Search entered with an empty window {bounds:?}"
        );
        self.nodes += 1;

        // Leaves have no move of their own; only their score matters.
        if depth == 0 || position.is_terminal() {
            return (None, self.evaluator.eval(position));
        }

        let mut bestmove = None;
        let mut best = if maximizing { Score::ALPHA } else { Score::BETA };

        for mv in position.legal_moves() {
            let mut child = MoveGuard::new(&mut *position, mv);
            let (_, score) = self.minimax(&mut *child, depth - 1, bounds, !maximizing);
            drop(child);

            if maximizing {
                if score > best {
                    best = score;
                    bestmove = Some(mv);
                }

                let alpha = bounds.alpha.max(score);
                debug_assert!(alpha >= bounds.alpha);
                bounds.alpha = alpha;
            } else {
                if score < best {
                    best = score;
                    bestmove = Some(mv);
                }

                let beta = bounds.beta.min(score);
                debug_assert!(beta <= bounds.beta);
                bounds.beta = beta;
            }

            if self.config.pruning && bounds.is_cutoff() {
                break;
            }
        }

        (bestmove, best)
    }
}

/// Searches `position` to `depth` plies with the default bounds and [`Mobility`] evaluation.
///
/// This is a convenience wrapper around [`Search`], for when no configuration is needed.
pub fn search<R: Rules>(position: &mut R, depth: usize, maximizing: bool) -> SearchResult<R::Move> {
    let config = SearchConfig {
        depth,
        maximizing,
        pruning: true,
    };

    Search::new(Mobility, config).start(position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Board, FEN_STARTPOS};
    use uci_parser::UciCommand;

    fn run_search(fen: &str, depth: usize) -> (Board, SearchResult<chessie::Move>) {
        let mut board: Board = fen.parse().unwrap();
        let before = board.clone();

        let res = search(&mut board, depth, true);
        assert_eq!(
            board, before,
            "Search on {fen:?} at depth {depth} did not restore the board"
        );

        (board, res)
    }

    #[test]
    fn test_depth_zero_is_a_leaf() {
        let (_, res) = run_search(FEN_STARTPOS, 0);
        assert!(res.bestmove.is_none());
        assert_eq!(res.score, 20);
        assert_eq!(res.nodes, 1);
        assert!(!res.is_degenerate());
    }

    #[test]
    fn test_checkmate_is_a_leaf() {
        let fen = "k7/1Q6/1K6/8/8/8/8/8 b - - 0 1";
        let (_, res) = run_search(fen, 3);
        assert!(res.bestmove.is_none());
        assert_eq!(res.score, Score::ZERO);
        assert_eq!(res.nodes, 1);
    }

    #[test]
    fn test_stalemate_is_a_leaf() {
        let fen = "k7/8/KQ6/8/8/8/8/8 b - - 0 1";
        let (_, res) = run_search(fen, 4);
        assert!(res.bestmove.is_none());
        assert_eq!(res.score, Score::ZERO);
    }

    #[test]
    fn test_single_legal_move() {
        // Black's king on a8 is in check, and b8 is the only square it can flee to.
        let fen = "k7/8/1K6/8/8/8/8/R7 b - - 0 1";
        let (mut board, res) = run_search(fen, 1);

        assert_eq!(board.legal_moves().len(), 1);
        assert_eq!(res.bestmove.unwrap(), "a8b8");

        board.make_move_uci("a8b8").unwrap();
        assert_eq!(res.score, Mobility.eval(&board));
    }

    #[test]
    fn test_maximizer_prefers_most_mobility() {
        // Each of white's replies is scored by how many replies black has; the maximizer picks the most.
        let fen = FEN_STARTPOS;
        let (mut board, res) = run_search(fen, 1);
        let bestmove = res.bestmove.unwrap();

        let most = board
            .legal_moves()
            .into_iter()
            .map(|mv| {
                let child = MoveGuard::new(&mut board, mv);
                Mobility.eval(&*child)
            })
            .max()
            .unwrap();

        assert_eq!(res.score, most);
        board.apply(bestmove);
        assert_eq!(Mobility.eval(&board), most);
    }

    #[test]
    fn test_pruning_does_not_change_result() {
        let fens = [
            FEN_STARTPOS,
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
            "1k6/8/KQ6/2Q5/8/8/8/8 b - - 0 1",
        ];

        for fen in fens {
            for depth in 1..=3 {
                for maximizing in [true, false] {
                    let mut board: Board = fen.parse().unwrap();

                    let pruned = Search::new(
                        Mobility,
                        SearchConfig {
                            depth,
                            maximizing,
                            pruning: true,
                        },
                    )
                    .start(&mut board);

                    let full = Search::new(
                        Mobility,
                        SearchConfig {
                            depth,
                            maximizing,
                            pruning: false,
                        },
                    )
                    .start(&mut board);

                    assert_eq!(pruned.score, full.score, "{fen} depth {depth}");
                    assert_eq!(pruned.bestmove, full.bestmove, "{fen} depth {depth}");
                    assert!(pruned.nodes <= full.nodes);
                }
            }
        }
    }

    #[test]
    fn test_search_is_deterministic() {
        let fen = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";
        let (_, first) = run_search(fen, 2);
        let (_, second) = run_search(fen, 2);
        assert_eq!(first, second);
    }

    #[test]
    fn test_config_from_uci_options() {
        let config = SearchConfig::new(UciSearchOptions::default(), 4);
        assert_eq!(config.depth, 4);
        assert!(config.maximizing && config.pruning);

        let Ok(UciCommand::Go(options)) = UciCommand::new("go depth 2") else {
            panic!("failed to parse `go depth 2`");
        };
        assert_eq!(SearchConfig::new(options, 4).depth, 2);
    }

    #[test]
    #[should_panic(expected = "maximum is")]
    fn test_excessive_depth_panics() {
        let mut board = Board::default();
        search(&mut board, MAX_DEPTH + 1, true);
    }
}
