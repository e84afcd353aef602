//! Card rendering for the Anki template subset the note type uses:
//! `{{Field}}`, `{{#Field}}...{{/Field}}`, `{{^Field}}...{{/Field}}` and
//! `{{FrontSide}}`. Sections are rewritten to `#if` / `#unless` blocks and
//! rendered with handlebars; field values are inserted unescaped, as Anki does.

use std::collections::HashMap;
use std::sync::OnceLock;

use handlebars::Handlebars;
use regex::{Captures, Regex};
use serde_json::{Map, Value};

use crate::error::{PipelineError, Result};

pub type FieldMap = HashMap<String, String>;

pub const FRONT_SIDE: &str = "FrontSide";

fn section_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\{\{\s*([#^/])\s*([^}]+?)\s*\}\}").unwrap())
}

/// Rewrite Anki section tags into handlebars block helpers. A closing tag
/// that matches no open section is dropped.
pub fn to_handlebars(template: &str) -> String {
    let mut open: Vec<(String, &'static str)> = Vec::new();

    section_re()
        .replace_all(template, |caps: &Captures| {
            let name = caps[2].to_string();
            match &caps[1] {
                "#" => {
                    open.push((name.clone(), "if"));
                    format!("{{{{#if [{name}]}}}}")
                }
                "^" => {
                    open.push((name.clone(), "unless"));
                    format!("{{{{#unless [{name}]}}}}")
                }
                _ => match open.last() {
                    Some((top, helper)) if *top == name => {
                        let helper = *helper;
                        open.pop();
                        format!("{{{{/{helper}}}}}")
                    }
                    _ => String::new(),
                },
            }
        })
        .into_owned()
}

/// Blank fields are passed as empty strings so sections treat them as
/// absent.
fn context(fields: &FieldMap) -> Value {
    let map: Map<String, Value> = fields
        .iter()
        .map(|(k, v)| {
            let v = if v.trim().is_empty() { "" } else { v.as_str() };
            (k.clone(), Value::String(v.to_string()))
        })
        .collect();
    Value::Object(map)
}

pub struct CardRenderer {
    handlebars: Handlebars<'static>,
}

impl Default for CardRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl CardRenderer {
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.register_escape_fn(handlebars::no_escape);
        Self { handlebars }
    }

    pub fn render(&self, template: &str, fields: &FieldMap) -> Result<String> {
        self.handlebars
            .render_template(&to_handlebars(template), &context(fields))
            .map_err(|e| PipelineError::Template(e.to_string()))
    }

    /// Render the question, then the answer with `{{FrontSide}}` bound to it.
    pub fn render_card(&self, qfmt: &str, afmt: &str, fields: &FieldMap) -> Result<(String, String)> {
        let question = self.render(qfmt, fields)?;
        let mut with_front = fields.clone();
        with_front.insert(FRONT_SIDE.to_string(), question.clone());
        let answer = self.render(afmt, &with_front)?;
        Ok((question, answer))
    }

    /// A card exists for a note when its question differs from the question
    /// rendered with every field empty.
    pub fn generates_card(&self, qfmt: &str, fields: &FieldMap) -> Result<bool> {
        Ok(self.render(qfmt, fields)? != self.render(qfmt, &FieldMap::new())?)
    }

    /// Indices of fields that on their own make `qfmt` produce a card.
    pub fn required_fields(&self, qfmt: &str, field_names: &[&str]) -> Result<Vec<usize>> {
        let blank = self.render(qfmt, &FieldMap::new())?;
        let mut required = Vec::new();
        for (i, name) in field_names.iter().enumerate() {
            let mut only = FieldMap::new();
            only.insert(name.to_string(), "x".to_string());
            if self.render(qfmt, &only)? != blank {
                required.push(i);
            }
        }
        Ok(required)
    }
}
