/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{
    fmt,
    ops::{Deref, DerefMut},
};

/// The rules of a two-player, perfect-information game, as consumed by the search.
///
/// Implementors own a single position and mutate it in place.
/// Every [`Rules::apply`] must be exactly reversible by a later [`Rules::undo`].
pub trait Rules {
    /// A single legal transition from one position to the next.
    type Move: Copy + PartialEq + fmt::Debug;

    /// Generates all legal moves for the side to move.
    ///
    /// The order is up to the implementor, but must be stable for a given position,
    /// otherwise pruning (and therefore the search) is not deterministic.
    fn legal_moves(&self) -> Vec<Self::Move>;

    /// Applies `mv` to the position.
    fn apply(&mut self, mv: Self::Move);

    /// Reverses the most recent [`Rules::apply`] that has not been undone yet.
    ///
    /// # Panics
    ///
    /// Calling this without a matching `apply` is a contract violation and must panic.
    fn undo(&mut self);

    /// Returns `true` if no further play is possible from this position.
    fn is_terminal(&self) -> bool;

    /// Number of legal moves available to the side to move.
    #[inline(always)]
    fn side_to_move_move_count(&self) -> usize {
        self.legal_moves().len()
    }
}

/// A move that has been applied to a position, and will be undone when this guard is dropped.
///
/// The guard dereferences to the position, so it can be handed down to a recursive search
/// while still guaranteeing the move is taken back on every exit path.
pub struct MoveGuard<'a, R: Rules> {
    position: &'a mut R,
}

impl<'a, R: Rules> MoveGuard<'a, R> {
    /// Applies `mv` to `position`, returning a guard that undoes it once dropped.
    #[inline(always)]
    pub fn new(position: &'a mut R, mv: R::Move) -> Self {
        position.apply(mv);
        Self { position }
    }
}

impl<R: Rules> Deref for MoveGuard<'_, R> {
    type Target = R;

    #[inline(always)]
    fn deref(&self) -> &Self::Target {
        self.position
    }
}

impl<R: Rules> DerefMut for MoveGuard<'_, R> {
    #[inline(always)]
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.position
    }
}

impl<R: Rules> Drop for MoveGuard<'_, R> {
    #[inline(always)]
    fn drop(&mut self) {
        self.position.undo();
    }
}
