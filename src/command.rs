use serde::{Deserialize, Serialize};

/// A pipeline stage, as named on the command line and in the run ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Enrich,
    Synthesize,
    Package,
    Check,
    All,
    Unknown,
}

impl From<&str> for Stage {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "enrich" | "ai_enrich" => Stage::Enrich,
            "tts" | "synthesize" => Stage::Synthesize,
            "build" | "build_deck" | "package" => Stage::Package,
            "check" | "qa" => Stage::Check,
            "" | "all" => Stage::All,
            _ => Stage::Unknown,
        }
    }
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Enrich => "enrich",
            Stage::Synthesize => "tts",
            Stage::Package => "build",
            Stage::Check => "check",
            Stage::All => "all",
            Stage::Unknown => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Stage;

    #[test]
    fn parses_stage_names_and_aliases() {
        assert_eq!(Stage::from("enrich"), Stage::Enrich);
        assert_eq!(Stage::from("TTS"), Stage::Synthesize);
        assert_eq!(Stage::from("build_deck"), Stage::Package);
        assert_eq!(Stage::from("qa"), Stage::Check);
        assert_eq!(Stage::from(""), Stage::All);
        assert_eq!(Stage::from("deploy"), Stage::Unknown);
    }
}
