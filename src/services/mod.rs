pub mod ai;
pub mod ai_types;
pub mod atomic;
pub mod deck;
pub mod encoding;
pub mod enrich;
pub mod ledger;
pub mod media_cache;
pub mod pipeline;
pub mod qa;
pub mod synthesize;
pub mod tts;
