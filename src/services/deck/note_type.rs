use serde_json::{json, Value};

use super::template::CardRenderer;
use crate::error::Result;
use crate::model::entry::COLUMNS;

/// Stable note-type id. The schema version lives in [`NOTE_TYPE_NAME`];
/// bump both together when the field list changes.
pub const NOTE_TYPE_ID: i64 = 1_607_392_319;
pub const NOTE_TYPE_NAME: &str = "Vocab EN-AR Model v2";

pub const DECK_ID: i64 = 2_087_654_321;
pub const DECK_NAME: &str = "Vocab EN-AR";

const RTL_FIELDS: [&str; 2] = ["Meaning_AR", "Example_AR"];

const CARD_FRONT: &str = r#"<div class="word">{{Word}}</div>
{{#IPA}}<div class="ipa">{{IPA}}</div>{{/IPA}}
<div class="sound">{{Sound}}</div>"#;

const CARD_BACK: &str = r#"{{FrontSide}}
<hr id="answer">
<div class="meaning"><b>{{Meaning_EN}}</b></div>
<div class="meaning" dir="rtl">{{Meaning_AR}}</div>
{{#Part_of_Speech}}<div class="pos">{{Part_of_Speech}}</div>{{/Part_of_Speech}}
{{#Example_EN}}<div class="example"><b>Example:</b> {{Example_EN}} {{Example_Sound}}</div>{{/Example_EN}}
{{#Example_AR}}<div class="example" dir="rtl"><b>مثال:</b> {{Example_AR}}</div>{{/Example_AR}}
{{#Collocations}}<div class="section"><b>Collocations:</b> {{Collocations}}</div>{{/Collocations}}
{{#Synonyms}}<div class="section"><b>Synonyms:</b> {{Synonyms}}</div>{{/Synonyms}}
{{#Antonyms}}<div class="section"><b>Antonyms:</b> {{Antonyms}}</div>{{/Antonyms}}
{{#Notes}}<div class="section notes"><b>Notes:</b> {{Notes}}</div>{{/Notes}}
{{#Tags}}<div class="tags">{{Tags}}</div>{{/Tags}}"#;

const REVERSE_FRONT: &str = r#"<div class="meaning"><b>{{Meaning_EN}}</b></div>
<div class="meaning" dir="rtl">{{Meaning_AR}}</div>"#;

const REVERSE_BACK: &str = r#"{{FrontSide}}
<hr id="answer">
<div class="word">{{Word}}</div>
{{#IPA}}<div class="ipa">{{IPA}}</div>{{/IPA}}
<div class="sound">{{Sound}}</div>"#;

const CSS: &str = r#".card {
  font-family: ui-sans-serif, Arial, sans-serif;
  font-size: 18px;
  text-align: left;
  color: #222;
  background: #fff;
}
.word { font-size: 1.6em; font-weight: 600; }
.ipa { font-size: 0.9em; color: #777; }
[dir="rtl"] { text-align: right; }
.meaning { margin: 4px 0; }
.pos { font-style: italic; color: #555; }
.example { margin: 6px 0; }
.section { margin: 6px 0; }
.chip {
  display: inline-block;
  padding: 2px 8px;
  margin: 2px 4px 2px 0;
  border-radius: 12px;
  background: #eef2f7;
  border: 1px solid #d5dde8;
  font-size: 0.85em;
}
.tags { margin-top: 10px; font-size: 0.75em; color: #999; }
hr { margin: 10px 0; }
.nightMode .chip { background: #2b3340; border-color: #3c4656; }
"#;

#[derive(Debug, Clone)]
pub struct CardTemplate {
    pub name: &'static str,
    pub qfmt: &'static str,
    pub afmt: &'static str,
}

#[derive(Debug, Clone)]
pub struct NoteType {
    pub id: i64,
    pub name: &'static str,
    pub fields: Vec<&'static str>,
    pub templates: Vec<CardTemplate>,
    pub css: &'static str,
}

impl NoteType {
    pub fn vocab() -> Self {
        Self {
            id: NOTE_TYPE_ID,
            name: NOTE_TYPE_NAME,
            fields: COLUMNS.to_vec(),
            templates: vec![
                CardTemplate {
                    name: "Card 1",
                    qfmt: CARD_FRONT,
                    afmt: CARD_BACK,
                },
                CardTemplate {
                    name: "Reverse",
                    qfmt: REVERSE_FRONT,
                    afmt: REVERSE_BACK,
                },
            ],
            css: CSS,
        }
    }

    /// Per template: `[ord, "any" | "none", [field ords]]`.
    pub fn req(&self, renderer: &CardRenderer) -> Result<Vec<Value>> {
        let mut req = Vec::with_capacity(self.templates.len());
        for (ord, t) in self.templates.iter().enumerate() {
            let required = renderer.required_fields(t.qfmt, &self.fields)?;
            let kind = if required.is_empty() { "none" } else { "any" };
            req.push(json!([ord, kind, required]));
        }
        Ok(req)
    }

    /// Entry for the collection's `models` map.
    pub fn to_json(&self, renderer: &CardRenderer, deck_id: i64, modified: i64) -> Result<Value> {
        let flds: Vec<Value> = self
            .fields
            .iter()
            .enumerate()
            .map(|(ord, name)| {
                json!({
                    "name": name,
                    "ord": ord,
                    "font": "Arial",
                    "size": 20,
                    "media": [],
                    "rtl": RTL_FIELDS.contains(name),
                    "sticky": false,
                })
            })
            .collect();

        let tmpls: Vec<Value> = self
            .templates
            .iter()
            .enumerate()
            .map(|(ord, t)| {
                json!({
                    "name": t.name,
                    "ord": ord,
                    "qfmt": t.qfmt,
                    "afmt": t.afmt,
                    "bqfmt": "",
                    "bafmt": "",
                    "did": null,
                })
            })
            .collect();

        Ok(json!({
            "id": self.id,
            "name": self.name,
            "type": 0,
            "mod": modified,
            "usn": -1,
            "sortf": 0,
            "did": deck_id,
            "tmpls": tmpls,
            "flds": flds,
            "css": self.css,
            "latexPre": "\\documentclass[12pt]{article}\n\\special{papersize=3in,5in}\n\\usepackage[utf8]{inputenc}\n\\usepackage{amssymb,amsmath}\n\\pagestyle{empty}\n\\setlength{\\parindent}{0in}\n\\begin{document}\n",
            "latexPost": "\\end{document}",
            "tags": [],
            "vers": [],
            "req": self.req(renderer)?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::deck::template::FieldMap;

    fn fields(pairs: &[(&str, &str)]) -> FieldMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn has_every_column_and_rtl_arabic_fields() {
        let nt = NoteType::vocab();
        assert_eq!(nt.fields.len(), 14);
        let json = nt.to_json(&CardRenderer::new(), DECK_ID, 0).unwrap();
        let flds = json["flds"].as_array().unwrap();
        assert_eq!(flds[2]["name"], "Meaning_AR");
        assert_eq!(flds[2]["rtl"], true);
        assert_eq!(flds[1]["rtl"], false);
        assert!(nt.css.contains(".chip"));
    }

    #[test]
    fn req_is_derived_from_the_fronts() {
        let req = NoteType::vocab().req(&CardRenderer::new()).unwrap();
        // Card 1: Word, IPA, Sound. Reverse: both meanings.
        assert_eq!(req[0], json!([0, "any", [0, 3, 12]]));
        assert_eq!(req[1], json!([1, "any", [1, 2]]));
    }

    #[test]
    fn notes_section_appears_only_when_filled() {
        let nt = NoteType::vocab();
        let card = &nt.templates[0];

        let r = CardRenderer::new();

        let (_, back) = r
            .render_card(card.qfmt, card.afmt, &fields(&[("Word", "rapid")]))
            .unwrap();
        assert!(!back.contains("Notes:"));

        let (_, back) = r
            .render_card(
                card.qfmt,
                card.afmt,
                &fields(&[("Word", "rapid"), ("Notes", "informal")]),
            )
            .unwrap();
        assert_eq!(back.matches("Notes:").count(), 1);
    }

    #[test]
    fn back_repeats_the_front() {
        let nt = NoteType::vocab();
        let card = &nt.templates[0];
        let (front, back) = CardRenderer::new()
            .render_card(
                card.qfmt,
                card.afmt,
                &fields(&[("Word", "rapid"), ("Sound", "[sound:rapid.mp3]")]),
            )
            .unwrap();
        assert!(front.contains("[sound:rapid.mp3]"));
        assert!(back.starts_with(&front));
    }
}
