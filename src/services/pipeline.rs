use serde::Serialize;

use crate::command::Stage;
use crate::config::Settings;
use crate::error::{PipelineError, Result};
use crate::parsers::table;
use crate::services::{
    ai::{ChatClient, LanguageModel},
    ai_types::EnrichReport,
    deck::{self, PackageReport},
    enrich,
    ledger::Ledger,
    qa::{self, QaIssue},
    synthesize::{self, SynthReport},
    tts::{google::GoogleTranslateTts, SpeechSynthesizer},
};

#[derive(Debug, Default, Serialize)]
pub struct PipelineReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrich: Option<EnrichReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synthesize: Option<SynthReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<PackageReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issues: Option<Vec<QaIssue>>,
}

/// Run `stage` with the HTTP-backed engines.
pub fn run(stage: Stage, settings: &Settings) -> Result<PipelineReport> {
    run_with(
        stage,
        settings,
        || Ok(Box::new(ChatClient::new(settings)?) as Box<dyn LanguageModel>),
        || {
            Ok(Box::new(GoogleTranslateTts::new(&settings.tts_base_url)?)
                as Box<dyn SpeechSynthesizer>)
        },
    )
}

/// Run `stage`, building each engine only when a stage needs it, so a
/// missing API key only matters to the Enricher.
pub fn run_with<M, T>(
    stage: Stage,
    settings: &Settings,
    make_model: M,
    make_tts: T,
) -> Result<PipelineReport>
where
    M: FnOnce() -> Result<Box<dyn LanguageModel>>,
    T: FnOnce() -> Result<Box<dyn SpeechSynthesizer>>,
{
    let ledger = Ledger::new(&settings.paths().ledger);
    let mut report = PipelineReport::default();

    match stage {
        Stage::Enrich => {
            let model = make_model()?;
            report.enrich = Some(enrich::run(settings, model.as_ref(), &ledger)?);
        }
        Stage::Synthesize => {
            let tts = make_tts()?;
            report.synthesize = Some(synthesize::run(settings, tts.as_ref(), &ledger)?);
        }
        Stage::Package => {
            report.package = Some(deck::run(settings, &ledger)?);
        }
        Stage::Check => {
            report.issues = Some(check(settings)?);
        }
        Stage::All => {
            let model = make_model()?;
            report.enrich = Some(enrich::run(settings, model.as_ref(), &ledger)?);
            let tts = make_tts()?;
            report.synthesize = Some(synthesize::run(settings, tts.as_ref(), &ledger)?);
            report.package = Some(deck::run(settings, &ledger)?);
        }
        Stage::Unknown => {
            return Err(PipelineError::InvalidInput(
                "unknown stage (expected enrich, tts, build, check or all)".into(),
            ))
        }
    }

    Ok(report)
}

pub fn check(settings: &Settings) -> Result<Vec<QaIssue>> {
    let paths = settings.paths();
    let records = table::read(&paths.enriched)?;
    let issues = qa::check(&records, &paths.media_dir);
    log::info!("[check] {} rows, {} issues", records.len(), issues.len());
    Ok(issues)
}
