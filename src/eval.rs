/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::{Rules, Score};

/// Encapsulates the logic of scoring a leaf position during search.
///
/// Any `Fn(&R) -> Score` is also an [`Evaluator`], which makes it easy to swap out
/// the evaluation without touching the shape of the search.
pub trait Evaluator<R: Rules> {
    /// Evaluate `position`.
    fn eval(&self, position: &R) -> Score;
}

impl<R: Rules, F: Fn(&R) -> Score> Evaluator<R> for F {
    #[inline(always)]
    fn eval(&self, position: &R) -> Score {
        self(position)
    }
}

/// Scores a position by how many legal moves the side-to-move has.
///
/// This is a placeholder, not a measure of playing strength: it does not care
/// *whose* moves are being counted, only how many there are.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mobility;

impl<R: Rules> Evaluator<R> for Mobility {
    #[inline(always)]
    fn eval(&self, position: &R) -> Score {
        Score::from_count(position.side_to_move_move_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Board;

    #[test]
    fn test_mobility_of_startpos() {
        let board = Board::default();
        assert_eq!(Mobility.eval(&board), 20);
    }

    #[test]
    fn test_mobility_of_checkmate_is_zero() {
        // Fool's mate
        let board: Board = "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3"
            .parse()
            .unwrap();
        assert_eq!(Mobility.eval(&board), Score::ZERO);
    }

    #[test]
    fn test_closures_are_evaluators() {
        let board = Board::default();
        let constant = |_: &Board| Score::new(42);
        assert_eq!(constant.eval(&board), 42);
    }
}
