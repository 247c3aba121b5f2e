/*
 * This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use clap::error::ErrorKind;
use newt::{Engine, EngineCommand};

fn main() {
    let mut engine = Engine::new();

    // Skip the executable name
    let args = std::env::args().skip(1).collect::<Vec<_>>();

    // Greedily parse the longest run of arguments that forms a command, then continue after it.
    let mut arg_idx = args.len();
    let mut parsed_idx = 0;
    while parsed_idx < arg_idx {
        let slice = &args[parsed_idx..arg_idx];

        match slice.join(" ").parse::<EngineCommand>() {
            Ok(cmd) => {
                engine.send_command(cmd);
                parsed_idx = arg_idx;
                arg_idx = args.len();
            }

            // Edge case: `--help` and `--version` are both "error" cases according to Clap
            Err(e)
                if matches!(e.kind(), ErrorKind::DisplayHelp)
                    || matches!(e.kind(), ErrorKind::DisplayVersion) =>
            {
                println!("{e}");
                parsed_idx = arg_idx;
                arg_idx = args.len();
            }

            // Nothing starting at this argument is a command, so skip it
            Err(e) if slice.len() == 1 => {
                eprintln!("Error on input {slice:?}:\n{e}");
                parsed_idx += 1;
                arg_idx = args.len();
            }

            Err(_) => arg_idx -= 1,
        }
    }

    if let Err(e) = engine.run() {
        eprintln!("{} encountered an error: {e}", env!("CARGO_PKG_NAME"));
    }
}
