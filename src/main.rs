use std::process::ExitCode;

use vocab_deck::cli;
use vocab_deck::command::Stage;

fn main() -> ExitCode {
    cli::init_logging();

    let arg = std::env::args().nth(1).unwrap_or_default();
    let stage = Stage::from(arg.as_str());
    if stage == Stage::Unknown {
        log::error!("unknown stage '{arg}' (expected enrich, tts, build, check or all)");
        return ExitCode::FAILURE;
    }

    cli::run(stage)
}
