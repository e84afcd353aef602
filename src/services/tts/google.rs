use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;

use super::SpeechSynthesizer;
use crate::error::{PipelineError, Result};
use crate::services::ai::extract_error_message;

const SERVICE: &str = "speech synthesis";
const TIMEOUT_SECS: u64 = 30;

/// The endpoint rejects longer `q` values.
pub const MAX_CHUNK_CHARS: usize = 100;

const CLAUSE_ENDS: &[char] = &[',', '.', ';', ':', '!', '?'];

/// Google Translate's public TTS endpoint (`client=tw-ob`).
pub struct GoogleTranslateTts {
    client: Client,
    base_url: String,
}

impl GoogleTranslateTts {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn fetch_chunk(&self, chunk: &str, lang: &str, idx: usize, total: usize) -> Result<Vec<u8>> {
        let url = format!("{}/translate_tts", self.base_url);
        let textlen = chunk.chars().count().to_string();
        let idx = idx.to_string();
        let total = total.to_string();

        let resp = self
            .client
            .get(&url)
            .header(USER_AGENT, "Mozilla/5.0")
            .query(&[
                ("ie", "UTF-8"),
                ("q", chunk),
                ("tl", lang),
                ("total", total.as_str()),
                ("idx", idx.as_str()),
                ("textlen", textlen.as_str()),
                ("client", "tw-ob"),
            ])
            .send()
            .map_err(|e| PipelineError::remote(SERVICE, e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(PipelineError::remote(
                SERVICE,
                extract_error_message(status, &body),
            ));
        }

        let bytes = resp
            .bytes()
            .map_err(|e| PipelineError::remote(SERVICE, e.to_string()))?;
        if bytes.is_empty() {
            return Err(PipelineError::remote(SERVICE, "empty audio response"));
        }
        Ok(bytes.to_vec())
    }
}

impl SpeechSynthesizer for GoogleTranslateTts {
    fn synthesize(&self, text: &str, lang: &str) -> Result<Vec<u8>> {
        let chunks = split_text(text);
        if chunks.is_empty() {
            return Err(PipelineError::InvalidInput(
                "cannot synthesize empty text".into(),
            ));
        }

        // MP3 frames concatenate cleanly, so chunk audio is simply appended.
        let mut audio = Vec::new();
        for (i, chunk) in chunks.iter().enumerate() {
            audio.extend(self.fetch_chunk(chunk, lang, i, chunks.len())?);
        }
        Ok(audio)
    }

    fn name(&self) -> &str {
        "google-translate-tts"
    }
}

/// Whitespace split into chunks of at most [`MAX_CHUNK_CHARS`] characters,
/// broken after clause punctuation where possible. A single longer token is
/// cut hard.
pub fn split_text(text: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > MAX_CHUNK_CHARS {
            if !current.is_empty() {
                chunks.push(current.join(" "));
                current.clear();
            }
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(MAX_CHUNK_CHARS) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        if !current.is_empty() && joined_len(&current) + 1 + word_len > MAX_CHUNK_CHARS {
            // Break after the last clause punctuation when there is one.
            let cut = current
                .iter()
                .rposition(|w| w.ends_with(CLAUSE_ENDS))
                .map_or(current.len(), |i| i + 1);
            let rest = current.split_off(cut);
            chunks.push(current.join(" "));
            current = rest;

            if !current.is_empty() && joined_len(&current) + 1 + word_len > MAX_CHUNK_CHARS {
                chunks.push(current.join(" "));
                current.clear();
            }
        }

        current.push(word);
    }

    if !current.is_empty() {
        chunks.push(current.join(" "));
    }

    chunks
}

fn joined_len(words: &[&str]) -> usize {
    let chars: usize = words.iter().map(|w| w.chars().count()).sum();
    chars + words.len().saturating_sub(1)
}
