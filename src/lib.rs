/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

/// A chess game that can be searched in place, and the ways it can end.
mod board;

/// Commands the engine accepts, beyond those of the UCI protocol.
mod cli;

/// Code related to the engine's functionality, such as user input handling.
mod engine;

/// Evaluation of positions at the leaves of a search.
mod eval;

/// The abstract game interface that searches operate on.
mod rules;

/// Scores assigned to positions.
mod score;

/// Main engine logic; all search related code.
mod search;

/// Misc utility functions, constants, and types.
mod utils;

pub use board::*;
pub use cli::*;
pub use engine::*;
pub use eval::*;
pub use rules::*;
pub use score::*;
pub use search::*;
pub use utils::*;
