/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::str::FromStr;

use clap::Parser;
use uci_parser::UciCommand;

/// A command to be sent to the engine.
#[derive(Debug, Clone, Parser)]
#[command(
    multicall = true,
    about,
    rename_all = "lower",
    override_usage("<ENGINE COMMAND> | <UCI COMMAND>")
)]
pub enum EngineCommand {
    /// Run a fixed-depth search on a series of positions and report the node count.
    Bench {
        /// If set, the benchmarking results will be printed in a well-formatted table.
        #[arg(short, long, default_value = "false")]
        pretty: bool,

        /// Override the default benchmark depth.
        #[arg(short, long, required = false)]
        depth: Option<usize>,
    },

    /// Print a visual representation of the current board state.
    #[command(alias = "d")]
    Display,

    /// Print the leaf evaluation of the current position.
    Eval,

    /// Quit the engine.
    Exit,

    /// Generate and print a FEN string for the current position.
    Fen,

    /// Apply the provided move to the game, if it is legal.
    #[command(alias = "move")]
    MakeMove { mv_string: String },

    /// Search the current position to the provided depth and play the best move found.
    #[command(alias = "mm")]
    Minimax {
        /// Number of plies to search.
        depth: usize,

        /// If set, the side-to-move is treated as the minimizing player.
        #[arg(short, long, default_value = "false")]
        minimize: bool,
    },

    /// Shows all legal moves in the current position.
    Moves {
        /// If set, moves will be sorted in alphabetical order.
        ///
        /// By default, moves are listed in the order they are generated, which is also the order they are searched.
        #[arg(short, long, default_value = "false")]
        sort: bool,
    },

    /// Display the current value of the specified option.
    Option {
        name: Vec<String>, // This is a vector in order to support multi-word options
    },

    /// Play a random legal move.
    Random,

    /// Set the position to the provided FEN string.
    ///
    /// Unlike the UCI `position` command, this rejects positions where the game is already over.
    Setup { fen: Vec<String> },

    /// Wrapper over UCI commands sent to the engine.
    #[command(skip)]
    Uci { cmd: UciCommand },
}

impl FromStr for EngineCommand {
    type Err = clap::Error;
    /// Attempt to parse an [`EngineCommand`] from a string.
    ///
    /// If this fails, it will attempt to parse the string as a [`UciCommand`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Self::try_parse_from(s.split_ascii_whitespace()) {
            Ok(cmd) => Ok(cmd),
            Err(e) => {
                // If parsing failed, attempt to parse as a UciCommand
                if let Ok(cmd) = UciCommand::new(s) {
                    Ok(Self::Uci { cmd })
                } else {
                    Err(e)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_engine_commands() {
        assert!(matches!(
            "minimax 3".parse::<EngineCommand>(),
            Ok(EngineCommand::Minimax {
                depth: 3,
                minimize: false
            })
        ));
        assert!(matches!(
            "mm 2 --minimize".parse::<EngineCommand>(),
            Ok(EngineCommand::Minimax {
                depth: 2,
                minimize: true
            })
        ));
        assert!(matches!("d".parse::<EngineCommand>(), Ok(EngineCommand::Display)));
        assert!(matches!("moves -s".parse::<EngineCommand>(), Ok(EngineCommand::Moves { sort: true })));

        let Ok(EngineCommand::Setup { fen }) = "setup 8/8/8/8/8/8/8/8 w - - 0 1".parse::<EngineCommand>() else {
            panic!("failed to parse `setup`");
        };
        assert_eq!(fen.join(" "), "8/8/8/8/8/8/8/8 w - - 0 1");
    }

    #[test]
    fn test_falls_back_to_uci() {
        let cmd = "isready".parse::<EngineCommand>().unwrap();
        assert!(matches!(
            cmd,
            EngineCommand::Uci {
                cmd: UciCommand::IsReady
            }
        ));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!("definitely not a command".parse::<EngineCommand>().is_err());
        assert!("minimax deep".parse::<EngineCommand>().is_err());
    }
}
