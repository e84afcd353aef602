use std::fs;
use std::path::Path;

use chardetng::EncodingDetector;
use encoding_rs::Encoding;

use crate::error::{PipelineError, Result};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

#[derive(Debug)]
pub struct DecodedText {
    pub text: String,
    pub encoding: String,
    pub had_errors: bool,
}

/// Read a text file, honouring a UTF-8 BOM and otherwise guessing the
/// encoding, so spreadsheet exports in legacy code pages still load.
pub fn read_text(path: &Path) -> Result<DecodedText> {
    if !path.exists() {
        return Err(PipelineError::FileNotFound(path.to_path_buf()));
    }
    let bytes = fs::read(path)?;
    Ok(decode(&bytes))
}

pub fn decode(bytes: &[u8]) -> DecodedText {
    if let Some(rest) = bytes.strip_prefix(UTF8_BOM) {
        let (text, had_errors) = decode_with(rest, encoding_rs::UTF_8);
        return DecodedText {
            text,
            encoding: "utf-8-sig".into(),
            had_errors,
        };
    }

    // Valid UTF-8 needs no guessing; short ASCII-only files confuse the detector.
    if let Ok(text) = std::str::from_utf8(bytes) {
        return DecodedText {
            text: text.to_string(),
            encoding: "utf-8".into(),
            had_errors: false,
        };
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);

    let (text, had_errors) = decode_with(bytes, encoding);
    DecodedText {
        text,
        encoding: encoding.name().to_lowercase(),
        had_errors,
    }
}

fn decode_with(bytes: &[u8], encoding: &'static Encoding) -> (String, bool) {
    let (text, _, had_errors) = encoding.decode(bytes);
    (text.into_owned(), had_errors)
}

/// Strip a leading BOM from text that was already decoded as UTF-8.
pub fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_utf8_bom() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice("word_en\nubiquitous\n".as_bytes());
        let d = decode(&bytes);
        assert_eq!(d.encoding, "utf-8-sig");
        assert_eq!(d.text, "word_en\nubiquitous\n");
    }

    #[test]
    fn plain_utf8_is_kept() {
        let d = decode("word_en,word_ar\nubiquitous,منتشر\n".as_bytes());
        assert_eq!(d.encoding, "utf-8");
        assert!(d.text.contains("منتشر"));
        assert!(!d.had_errors);
    }

    #[test]
    fn non_utf8_input_still_decodes() {
        let source = "word_en,word_ar\nubiquitous,منتشر في كل مكان\nrapid,سريع جدا\n";
        let (bytes, _, _) = encoding_rs::WINDOWS_1256.encode(source);
        assert!(std::str::from_utf8(&bytes).is_err());

        let d = decode(&bytes);
        assert_ne!(d.encoding, "utf-8");
        assert!(d.text.starts_with("word_en,word_ar\nubiquitous,"));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = read_text(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, PipelineError::FileNotFound(_)));
    }
}
