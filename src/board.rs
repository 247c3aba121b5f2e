/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{fmt, str::FromStr};

use anyhow::{bail, Context, Result};
use chessie::{Bitboard, Color, Game, Move, PieceKind, Position};

use crate::Rules;

/// Number of plies without a capture or pawn move after which the game is over.
const SEVENTY_FIVE_MOVE_PLIES: usize = 150;

/// Number of occurrences of the same position after which the game is over.
const FIVEFOLD: usize = 5;

/// The reason a game of chess has ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The side-to-move is in check and has no legal moves.
    Checkmate { winner: Color },

    /// The side-to-move is not in check, but has no legal moves.
    Stalemate,

    /// Neither side can possibly deliver checkmate.
    InsufficientMaterial,

    /// 75 moves by each side without a capture or a pawn move.
    SeventyFiveMoves,

    /// The same position has occurred five times.
    FivefoldRepetition,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Checkmate { winner } => write!(f, "checkmate, {} wins", color_name(*winner)),
            Self::Stalemate => write!(f, "stalemate"),
            Self::InsufficientMaterial => write!(f, "insufficient material"),
            Self::SeventyFiveMoves => write!(f, "seventy-five-move rule"),
            Self::FivefoldRepetition => write!(f, "fivefold repetition"),
        }
    }
}

/// A game of chess that can be searched in place.
///
/// [`Game`] is a copy-make type, so this keeps a stack of every previous state.
/// Applying a move pushes the current state, undoing a move pops it back.
/// The same stack doubles as the game history used to detect repetitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    /// The current state of the game.
    game: Game,

    /// Every state prior to `game`, oldest first.
    history: Vec<Game>,
}

impl Board {
    /// Creates a new [`Board`] from the provided [`Game`], with no history.
    #[inline(always)]
    pub fn new(game: Game) -> Self {
        Self {
            game,
            history: Vec::with_capacity(64),
        }
    }

    /// Creates a new [`Board`] from the provided FEN string.
    ///
    /// Positions that could never arise in a real game are rejected: missing or extra kings,
    /// pawns on the first or last rank, or the side not to move being in check.
    pub fn from_fen(fen: &str) -> Result<Self> {
        let position = Position::from_fen(fen).with_context(|| format!("Invalid FEN {fen:?}"))?;
        validate(&position).with_context(|| format!("Invalid FEN {fen:?}"))?;
        Ok(Self::new(Game::new(position)))
    }

    /// Generates a FEN string of the current position.
    #[inline(always)]
    pub fn to_fen(&self) -> String {
        self.game.to_fen()
    }

    /// The current state of the game.
    #[inline(always)]
    pub const fn game(&self) -> &Game {
        &self.game
    }

    /// Number of moves applied to this board that can still be undone.
    #[inline(always)]
    pub fn num_applied(&self) -> usize {
        self.history.len()
    }

    /// Parses `mv_str` as a UCI move and applies it, provided it is legal.
    pub fn make_move_uci(&mut self, mv_str: &str) -> Result<Move> {
        let mv = Move::from_uci(&self.game, mv_str)
            .with_context(|| format!("Failed to parse {mv_str:?} as a move"))?;

        if !self.game.get_legal_moves().contains(&mv) {
            bail!("{mv_str} is not a legal move in {}", self.to_fen());
        }

        self.apply(mv);
        Ok(mv)
    }

    /// Returns the number of times the current position has occurred, including now.
    fn occurrences(&self) -> usize {
        let key = self.game.key();
        1 + self
            .history
            .iter()
            .filter(|prev| prev.key() == key)
            .count()
    }

    /// Determines whether the game is over, and why.
    ///
    /// Returns `None` if the game is still going.
    pub fn outcome(&self) -> Option<Outcome> {
        if self.game.get_legal_moves().is_empty() {
            return if self.game.is_in_check() {
                Some(Outcome::Checkmate {
                    winner: self.game.side_to_move().opponent(),
                })
            } else {
                Some(Outcome::Stalemate)
            };
        }

        if self.game.can_draw_by_insufficient_material() {
            Some(Outcome::InsufficientMaterial)
        } else if self.game.halfmove() >= SEVENTY_FIVE_MOVE_PLIES {
            Some(Outcome::SeventyFiveMoves)
        } else if self.occurrences() >= FIVEFOLD {
            Some(Outcome::FivefoldRepetition)
        } else {
            None
        }
    }
}

/// Capitalized name of `color`, for messages.
fn color_name(color: Color) -> &'static str {
    if color == Color::White {
        "White"
    } else {
        "Black"
    }
}

/// Checks that `position` is one a game of chess could actually reach.
///
/// Each side needs exactly one king, no pawn may stand on the first or last rank,
/// and the side that just moved cannot have left its own king in check.
fn validate(position: &Position) -> Result<()> {
    for color in [Color::White, Color::Black] {
        let kings = position.king(color).population();
        if kings != 1 {
            bail!("{} must have exactly one king. Got {kings}", color_name(color));
        }
    }

    if position
        .kind(PieceKind::Pawn)
        .intersects(Bitboard::RANK_1 | Bitboard::RANK_8)
    {
        bail!("Pawns cannot be on the first or last rank");
    }

    // Hand the move to the other side and see if they are in check
    let mut flipped = *position;
    flipped.toggle_side_to_move();
    if Game::new(flipped).is_in_check() {
        bail!(
            "{} is in check, but it is not their turn",
            color_name(position.side_to_move().opponent())
        );
    }

    Ok(())
}

impl Rules for Board {
    type Move = Move;

    #[inline(always)]
    fn legal_moves(&self) -> Vec<Move> {
        self.game.get_legal_moves().into_iter().collect()
    }

    #[inline(always)]
    fn apply(&mut self, mv: Move) {
        self.history.push(self.game);
        self.game.make_move(mv);
    }

    #[inline(always)]
    fn undo(&mut self) {
        let Some(prev) = self.history.pop() else {
            panic!("Attempted to undo a move on {} with no moves applied", self.to_fen());
        };
        self.game = prev;
    }

    #[inline(always)]
    fn is_terminal(&self) -> bool {
        self.outcome().is_some()
    }

    #[inline(always)]
    fn side_to_move_move_count(&self) -> usize {
        self.game.get_legal_moves().len()
    }
}

impl FromStr for Board {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_fen(s)
    }
}

impl Default for Board {
    /// The standard starting position.
    fn default() -> Self {
        Self::new(Game::default())
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.game)
    }
}
