/// Escape text for inclusion in card HTML.
pub fn escape_html(text: &str) -> String {
    handlebars::html_escape(text)
}

/// Comma-separated list to chip fragments, one per non-empty item.
pub fn render_chips(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(|item| format!("<span class=\"chip\">{}</span>", escape_html(item)))
        .collect()
}

/// Chip fragments joined into one field value.
pub fn chip_field(text: &str) -> String {
    render_chips(text).join(" ")
}
