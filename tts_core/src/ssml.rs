//! SSML prosody wrapping for provider requests.
//!
//! Rate and pitch are not plain request parameters on the provider side,
//! they have to be expressed as a `<prosody>` element around the text.

use crate::request::SynthesisRequest;

/// Escape the characters that are significant in SSML text nodes
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Render the request text as SSML when rate or pitch differ from the
/// defaults. Returns `None` when plain text is enough.
pub fn prosody(req: &SynthesisRequest) -> Option<String> {
    let rate = req.rate_value().unwrap_or(1.0);
    let pitch = req.pitch_value().unwrap_or(0);

    let mut attrs = Vec::new();
    if (rate - 1.0).abs() > f32::EPSILON {
        attrs.push(format!("rate=\"{}%\"", (rate * 100.0).round() as i64));
    }
    if pitch != 0 {
        attrs.push(format!("pitch=\"{:+}st\"", pitch));
    }
    if attrs.is_empty() {
        return None;
    }

    Some(format!(
        "<speak><prosody {}>{}</prosody></speak>",
        attrs.join(" "),
        escape_xml(req.text.trim())
    ))
}
