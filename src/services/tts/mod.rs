pub mod google;

use std::path::Path;

use crate::error::Result;
use crate::services::atomic;

/// Common interface for text-to-speech engines producing MP3 audio.
pub trait SpeechSynthesizer {
    /// Synthesize `text` in language `lang`, returning encoded MP3 bytes.
    fn synthesize(&self, text: &str, lang: &str) -> Result<Vec<u8>>;

    /// Human-readable engine name for logs.
    fn name(&self) -> &str;

    /// Synthesize and write the audio to `path` in one step.
    fn synthesize_to_file(&self, text: &str, lang: &str, path: &Path) -> Result<()> {
        let audio = self.synthesize(text, lang)?;
        atomic::write_atomic(path, &audio)
    }
}
