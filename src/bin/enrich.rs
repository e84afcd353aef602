use std::process::ExitCode;

use vocab_deck::cli;
use vocab_deck::command::Stage;

fn main() -> ExitCode {
    cli::init_logging();
    cli::run(Stage::Enrich)
}
