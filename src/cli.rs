use std::process::ExitCode;

use crate::command::Stage;
use crate::config::Settings;
use crate::services::pipeline;

pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

/// Run one stage and map the outcome to an exit status. `check` prints its
/// findings as JSON on stdout.
pub fn run(stage: Stage) -> ExitCode {
    if stage == Stage::Unknown {
        log::error!("unknown stage (expected enrich, tts, build, check or all)");
        return ExitCode::FAILURE;
    }

    let result = Settings::from_env().and_then(|settings| pipeline::run(stage, &settings));

    match result {
        Ok(report) => {
            if let Some(issues) = &report.issues {
                match serde_json::to_string_pretty(issues) {
                    Ok(json) => println!("{json}"),
                    Err(e) => {
                        log::error!("{e}");
                        return ExitCode::FAILURE;
                    }
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{} failed: {e}", stage.name());
            ExitCode::FAILURE
        }
    }
}
