/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use std::{
    fmt,
    io::{self, Write},
    ops::ControlFlow,
    sync::mpsc::{channel, Receiver, Sender},
    thread,
    time::{Duration, Instant},
};

use anyhow::{bail, Context, Result};
use chessie::Move;
use rand::seq::SliceRandom;
use uci_parser::{UciCommand, UciInfo, UciOption, UciParseError, UciResponse};

use crate::{
    Board, EngineCommand, Evaluator, Mobility, Rules, Search, SearchConfig, SearchResult,
    BENCHMARK_FENS, DEFAULT_DEPTH, MAX_DEPTH,
};

/// Default depth at which to run the benchmark searches.
const BENCH_DEPTH: usize = 3;

/// The Newt chess engine.
#[derive(Debug)]
pub struct Engine {
    /// The current state of the chess board, as known to the engine.
    ///
    /// This is modified whenever moves are played or new positions are given,
    /// and is reset whenever the engine is told to start a new game.
    board: Board,

    /// One half of a channel, responsible for sending commands to the engine to execute.
    sender: Sender<EngineCommand>,

    /// One half of a channel, responsible for receiving commands for the engine to execute.
    receiver: Receiver<EngineCommand>,

    /// Depth to search to when `go` is received without a depth.
    depth: usize,
}

impl Engine {
    /// Constructs a new [`Engine`] instance to be executed with [`Engine::run`].
    pub fn new() -> Self {
        let (sender, receiver) = channel();

        Self {
            board: Board::default(),
            sender,
            receiver,
            depth: DEFAULT_DEPTH,
        }
    }

    /// Returns a string of the engine's name and current version.
    pub fn name(&self) -> String {
        format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
    }

    /// Returns a string of all authors of this engine.
    pub fn authors(&self) -> String {
        // Split multiple authors by comma-space
        env!("CARGO_PKG_AUTHORS").replace(':', ", ")
    }

    /// The engine's current board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Sends an [`EngineCommand`] to the engine to be executed.
    pub fn send_command(&self, command: EngineCommand) {
        // Safe unwrap: `send` can only fail if it's corresponding receiver doesn't exist,
        //  and the only way our engine's `Receiver` can no longer exist is when our engine
        //  doesn't exist either, so this is always safe.
        self.sender.send(command).unwrap();
    }

    /// Execute the main event loop for the engine.
    ///
    /// This function spawns a thread to handle input from `stdin` and waits on received commands.
    pub fn run(&mut self) -> Result<()> {
        // Spawn a separate thread for handling user input
        let sender = self.sender.clone();
        thread::spawn(|| {
            if let Err(err) = input_handler(sender) {
                eprintln!("Input handler thread stopping after fatal error: {err}");
            }
        });

        // Loop on user input
        while let Ok(cmd) = self.receiver.recv() {
            match self.execute(cmd) {
                Ok(ControlFlow::Continue(())) => {}

                Ok(ControlFlow::Break(())) => break,

                // Keep running, even on error
                Err(e) => eprintln!("Error: {e:#}"),
            }
        }

        Ok(())
    }

    /// Executes a single [`EngineCommand`], returning whether the engine should keep running.
    pub fn execute(&mut self, cmd: EngineCommand) -> Result<ControlFlow<()>> {
        match cmd {
            EngineCommand::Bench { depth, pretty } => self.bench(depth, pretty)?,

            EngineCommand::Display => println!("{}", self.board),

            EngineCommand::Eval => println!("{}", Mobility.eval(&self.board)),

            EngineCommand::Exit => return Ok(ControlFlow::Break(())),

            EngineCommand::Fen => println!("{}", self.board.to_fen()),

            EngineCommand::MakeMove { mv_string } => {
                let mv = self.board.make_move_uci(&mv_string)?;
                self.log_move(mv);
            }

            EngineCommand::Minimax { depth, minimize } => {
                self.play_minimax(depth, !minimize)?;
            }

            EngineCommand::Moves { sort } => {
                let mut moves = self
                    .board
                    .legal_moves()
                    .into_iter()
                    .map(|mv| mv.to_string())
                    .collect::<Vec<_>>();

                if sort {
                    moves.sort();
                }

                // If there are none, print "(none)"
                if moves.is_empty() {
                    println!("(none)");
                } else {
                    println!("{}", moves.join(", "));
                }
            }

            EngineCommand::Option { name } => {
                let name = name.join(" ");
                if let Some(value) = self.get_option(&name) {
                    println!("{name} := {value}");
                } else {
                    println!("{} has no option {name:?}", self.name());
                }
            }

            EngineCommand::Random => {
                self.play_random()?;
            }

            EngineCommand::Setup { fen } => self.setup(&fen.join(" "))?,

            EngineCommand::Uci { cmd } => return self.handle_uci_command(cmd),
        }

        Ok(ControlFlow::Continue(()))
    }

    /// Handle the execution of a single [`UciCommand`].
    fn handle_uci_command(&mut self, uci: UciCommand) -> Result<ControlFlow<()>> {
        use UciCommand::*;
        match uci {
            Uci => self.uci(),

            IsReady => println!("{}", UciResponse::<&str>::ReadyOk),

            SetOption { name, value } => self.set_option(&name, value)?,

            UciNewGame => self.board = Board::default(),

            Position { fen, moves } => self.position(fen, moves)?,

            Go(options) => self.go(SearchConfig::new(options, self.depth)),

            // Searches always run to completion before the next command is read.
            Stop => {}

            Quit => return Ok(ControlFlow::Break(())),

            _ => bail!("{} does not support UCI command {uci:?}", self.name()),
        }

        Ok(ControlFlow::Continue(()))
    }

    /// Execute the `bench` command, running a benchmark of a fixed search on a series of positions and displaying the results.
    fn bench(&mut self, depth: Option<usize>, pretty: bool) -> Result<()> {
        let config = SearchConfig {
            depth: depth.unwrap_or(BENCH_DEPTH),
            ..Default::default()
        };

        if config.depth > MAX_DEPTH {
            bail!("Cannot bench at depth {}; maximum is {MAX_DEPTH}", config.depth);
        }

        let benches = BENCHMARK_FENS;
        let num_tests = benches.len();
        let mut nodes = 0;
        let starttime = Instant::now();

        // Run a fixed search on each position
        for (i, fen) in benches.into_iter().enumerate() {
            print!("{:>2}/{:>2}: {fen} := ", i + 1, num_tests);
            // Flush so the node count will appear on the same line after the search concludes
            io::stdout().flush()?;

            let mut board = Board::from_fen(fen)?;
            let res = Search::new(Mobility, config).start(&mut board);
            println!("{} nodes", res.nodes);

            nodes += res.nodes;
        }

        // Compute results
        let elapsed = starttime.elapsed();
        let nps = (nodes as f32 / elapsed.as_secs_f32()) as u64;
        let m_nps = nodes as f32 / elapsed.as_secs_f32() / 1_000_000.0;
        let ms = elapsed.as_millis();

        if pretty {
            // Display the results in a nice table
            println!();
            println!("+--- Benchmark Complete ---+");
            println!("| time (ms)  : {ms:<12}|");
            println!("| nodes      : {nodes:<12}|");
            println!("| nps        : {nps:<12}|");
            println!("| Mnps       : {m_nps:<12.2}|");
            println!("+--------------------------+");
        } else {
            println!("{nodes} nodes {nps} nps");
        }

        Ok(())
    }

    /// Returns an error describing the end of the game, if the current game is over.
    fn ensure_game_in_progress(&self) -> Result<()> {
        if let Some(outcome) = self.board.outcome() {
            bail!("game over ({outcome}): {}", self.board.to_fen());
        }

        Ok(())
    }

    /// Runs a search on the current position with the provided `config`, without making any moves.
    fn search(&mut self, config: SearchConfig) -> SearchResult<Move> {
        let starttime = Instant::now();
        let res = Search::new(Mobility, config).start(&mut self.board);
        self.send_search_info(&res, starttime.elapsed());
        res
    }

    /// Executes the `minimax` command, searching the current position and playing the best move found.
    fn play_minimax(&mut self, depth: usize, maximizing: bool) -> Result<Move> {
        if depth == 0 || depth > MAX_DEPTH {
            bail!("Search depth must be within [1, {MAX_DEPTH}]. Got {depth}");
        }
        self.ensure_game_in_progress()?;

        let res = self.search(SearchConfig {
            depth,
            maximizing,
            pruning: true,
        });

        if res.is_degenerate() {
            bail!(
                "Search found no move to play in {} with score {:?}",
                self.board.to_fen(),
                res.score
            );
        }

        let Some(mv) = res.bestmove else {
            bail!("Search on {} produced no move", self.board.to_fen());
        };

        self.board.apply(mv);
        self.log_move(mv);
        Ok(mv)
    }

    /// Executes the `random` command, playing a uniformly random legal move.
    fn play_random(&mut self) -> Result<Move> {
        self.ensure_game_in_progress()?;

        let moves = self.board.legal_moves();
        let Some(&mv) = moves.choose(&mut rand::thread_rng()) else {
            bail!("No legal moves in {}", self.board.to_fen());
        };

        self.board.apply(mv);
        self.log_move(mv);
        Ok(mv)
    }

    /// Executes the UCI `go` command, replying with the best move found.
    ///
    /// Unlike [`Self::play_minimax`], the move is not played; the GUI decides what happens next.
    fn go(&mut self, config: SearchConfig) {
        let bestmove = if let Err(e) = self.ensure_game_in_progress() {
            Self::send_string(format!("{e:#}"));
            None
        } else {
            let res = self.search(config);
            if res.is_degenerate() {
                Self::send_string(format!("Search found no move to play in {}", self.board.to_fen()));
            }
            res.bestmove
        };

        Self::send_response(UciResponse::BestMove {
            bestmove,
            ponder: None,
        });
    }

    /// Set the position to the supplied FEN string, rejecting it if the game is already over.
    ///
    /// On error, the current position is kept.
    fn setup(&mut self, fen: &str) -> Result<()> {
        let board = Board::from_fen(fen)?;

        if let Some(outcome) = board.outcome() {
            bail!("game over ({outcome}): {fen}");
        }

        self.board = board;
        Ok(())
    }

    /// Set the position to the supplied FEN string (defaults to the standard startpos if not supplied),
    /// and then apply `moves` one-by-one to the position.
    fn position<T: AsRef<str>>(
        &mut self,
        fen: Option<T>,
        moves: impl IntoIterator<Item = T>,
    ) -> Result<()> {
        // Set the new position
        let mut board = if let Some(fen) = fen {
            Board::from_fen(fen.as_ref())?
        } else {
            Board::default()
        };

        // Apply the provided moves
        for mv_str in moves {
            board.make_move_uci(mv_str.as_ref())?;
        }

        self.board = board;
        Ok(())
    }

    /// Called when the engine receives the `uci` command.
    ///
    /// Prints engine's ID, version, and authors, and lists all UCI options.
    fn uci(&self) {
        println!("id name {}\nid author {}\n", self.name(), self.authors());

        // Print all UCI options
        let depth: UciOption<&str> =
            UciOption::spin("Depth", DEFAULT_DEPTH as i32, 1, MAX_DEPTH as i32);
        println!("{}", UciResponse::Option(depth));

        // We're ready to go!
        println!("{}", UciResponse::<&str>::UciOk)
    }

    /// Handles the `setoption` command, setting option `name` to `value`.
    ///
    /// Will return an error if `name` isn't a valid option or `value` is not a valid value for that option.
    fn set_option(&mut self, name: &str, value: Option<String>) -> Result<()> {
        match name {
            "Depth" => {
                let Some(value) = value.as_ref() else {
                    bail!("usage: setoption name {name} value <value>");
                };

                let depth = value
                    .parse()
                    .with_context(|| format!("expected integer. got {value:?}"))?;

                if !(1..=MAX_DEPTH).contains(&depth) {
                    bail!("{name} must be within [1, {MAX_DEPTH}]. Got {depth}");
                }

                self.depth = depth;
            }

            _ => bail!("{} has no option named {name:?}", self.name()),
        }

        Ok(())
    }

    /// Returns the current value of the option `name`, if it exists on this engine.
    fn get_option(&self, name: &str) -> Option<String> {
        match name {
            "Depth" => Some(self.depth.to_string()),
            _ => None,
        }
    }

    /// Logs the position reached after playing `mv`.
    fn log_move(&self, mv: Move) {
        Self::send_string(format!("fen: {}, move: {mv}", self.board.to_fen()));
    }

    /// Sends UCI info about the conclusion of a search.
    fn send_search_info(&self, result: &SearchResult<Move>, elapsed: Duration) {
        Self::send_info(
            UciInfo::new()
                .nodes(result.nodes)
                .score(result.score.into_uci())
                .nps((result.nodes as f32 / elapsed.as_secs_f32()).trunc())
                .time(elapsed.as_millis()),
        );
    }

    /// Sends a [`UciResponse`] to `stdout`.
    #[inline(always)]
    fn send_response<T: fmt::Display>(response: UciResponse<T>) {
        println!("{response}");
    }

    /// Sends a [`UciInfo`] to `stdout`.
    #[inline(always)]
    fn send_info(info: UciInfo) {
        Self::send_response(UciResponse::<String>::Info(Box::new(info)));
    }

    /// Helper to send a [`UciInfo`] containing only a `string` message to `stdout`.
    #[inline(always)]
    fn send_string(info: String) {
        Self::send_info(UciInfo::new().string(info));
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// Loops endlessly to await input via `stdin`, sending all successfully-parsed commands through the supplied `sender`.
fn input_handler(sender: Sender<EngineCommand>) -> Result<()> {
    let mut buffer = String::with_capacity(2048);

    loop {
        buffer.clear();
        let bytes = io::stdin()
            .read_line(&mut buffer)
            .context("Failed to read line when parsing commands")?;

        // For ctrl + d
        if 0 == bytes {
            sender
                .send(EngineCommand::Exit)
                .context("Failed to send 'exit' command after receiving empty input")?;

            bail!("Engine received input of 0 bytes and is quitting");
        }

        let buf = buffer.trim();
        if buf.is_empty() {
            continue;
        }

        // Attempt to parse the input as a UCI command first, since that's what GUIs will be sending
        match UciCommand::new(buf) {
            Ok(cmd) => sender
                .send(EngineCommand::Uci { cmd })
                .context("Failed to send UCI command to engine")?,

            // If it's not a UCI command, check if it's an engine-specific command
            Err(UciParseError::UnrecognizedCommand { cmd: _ }) => match buf.parse() {
                Ok(cmd) => sender
                    .send(cmd)
                    .context("Failed to send command to engine")?,

                // If it wasn't a custom command, either, print an error.
                Err(err) => eprintln!("{err}"),
            },

            // If it was a UCI command, print a usage message.
            Err(uci_err) => eprintln!("{uci_err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FEN_STARTPOS;

    fn command(s: &str) -> EngineCommand {
        s.parse().unwrap()
    }

    #[test]
    fn test_minimax_plays_a_legal_move() {
        let mut engine = Engine::new();
        let legal = engine.board().legal_moves();

        let mv = engine.play_minimax(2, true).unwrap();
        assert!(legal.contains(&mv));
        assert_eq!(engine.board().num_applied(), 1);
        assert_ne!(engine.board().to_fen(), FEN_STARTPOS);
    }

    #[test]
    fn test_minimax_command_matches_search() {
        let mut engine = Engine::new();
        let expected = crate::search(&mut Board::default(), 2, true);

        let flow = engine.execute(command("minimax 2")).unwrap();
        assert_eq!(flow, ControlFlow::Continue(()));

        let mut board = Board::default();
        board.apply(expected.bestmove.unwrap());
        assert_eq!(engine.board(), &board);
    }

    #[test]
    fn test_minimax_rejects_finished_games() {
        let mut engine = Engine::new();
        let fen = "k7/1Q6/1K6/8/8/8/8/8 b - - 0 1";
        engine.position(Some(fen), []).unwrap();
        let before = engine.board().clone();

        let err = engine.play_minimax(3, true).unwrap_err();
        assert!(err.to_string().contains("checkmate"));
        assert_eq!(engine.board(), &before);

        assert!(engine.play_random().is_err());
        assert_eq!(engine.board(), &before);
    }

    #[test]
    fn test_minimax_rejects_bad_depths() {
        let mut engine = Engine::new();
        assert!(engine.play_minimax(0, true).is_err());
        assert!(engine.play_minimax(MAX_DEPTH + 1, true).is_err());
        assert_eq!(engine.board(), &Board::default());
    }

    #[test]
    fn test_random_plays_a_legal_move() {
        let mut engine = Engine::new();
        let legal = engine.board().legal_moves();

        let mv = engine.play_random().unwrap();
        assert!(legal.contains(&mv));
        assert_eq!(engine.board().num_applied(), 1);
    }

    #[test]
    fn test_setup_keeps_previous_position_on_error() {
        let mut engine = Engine::new();
        engine.execute(command("makemove e2e4")).unwrap();
        let before = engine.board().clone();

        // Stalemate
        assert!(engine.setup("k7/8/KQ6/8/8/8/8/8 b - - 0 1").is_err());
        assert_eq!(engine.board(), &before);

        assert!(engine.setup("not a fen").is_err());
        assert_eq!(engine.board(), &before);

        engine.setup(FEN_STARTPOS).unwrap();
        assert_eq!(engine.board(), &Board::default());
    }

    #[test]
    fn test_illegal_positions_are_rejected() {
        let mut engine = Engine::new();
        engine.execute(command("makemove e2e4")).unwrap();
        let before = engine.board().clone();

        for fen in [
            "8/8/8/8/8/8/8/8 w - - 0 1",
            "4k3/8/8/8/8/8/8/4RK2 w - - 0 1",
            "P3k3/8/8/8/8/8/8/4K3 w - - 0 1",
        ] {
            assert!(engine.setup(fen).is_err(), "setup accepted {fen}");
            assert_eq!(engine.board(), &before);

            let rejected = match format!("position fen {fen}").parse() {
                Ok(cmd) => engine.execute(cmd).is_err(),
                Err(_) => true,
            };
            assert!(rejected, "position accepted {fen}");
            assert_eq!(engine.board(), &before);
        }
    }

    #[test]
    fn test_identifies_itself() {
        let engine = Engine::new();
        assert!(engine.name().starts_with("newt "));
        assert!(!engine.authors().is_empty());
    }

    #[test]
    fn test_go_does_not_play_a_move() {
        let mut engine = Engine::new();
        engine.execute(command("go depth 2")).unwrap();
        assert_eq!(engine.board(), &Board::default());
    }

    #[test]
    fn test_position_with_moves() {
        let mut engine = Engine::new();
        engine
            .execute(command("position startpos moves e2e4 e7e5"))
            .unwrap();
        assert_eq!(engine.board().num_applied(), 2);

        assert!(engine
            .execute(command("position startpos moves e2e5"))
            .is_err());
        assert_eq!(engine.board().num_applied(), 2);
    }

    #[test]
    fn test_depth_option() {
        let mut engine = Engine::new();
        assert_eq!(engine.get_option("Depth"), Some(DEFAULT_DEPTH.to_string()));

        engine.set_option("Depth", Some(String::from("5"))).unwrap();
        assert_eq!(engine.get_option("Depth"), Some(String::from("5")));

        assert!(engine.set_option("Depth", Some(String::from("0"))).is_err());
        assert!(engine.set_option("Depth", Some(String::from("five"))).is_err());
        assert!(engine.set_option("Depth", None).is_err());
        assert!(engine.set_option("Hash", Some(String::from("16"))).is_err());
        assert_eq!(engine.get_option("Depth"), Some(String::from("5")));
    }

    #[test]
    fn test_exit_breaks_the_loop() {
        let mut engine = Engine::new();
        assert_eq!(
            engine.execute(EngineCommand::Exit).unwrap(),
            ControlFlow::Break(())
        );
        assert_eq!(
            engine.execute(command("quit")).unwrap(),
            ControlFlow::Break(())
        );
    }
}
