//! Request logging formatter

use crate::api::TtsRequest;

const MAX_PREVIEW_CHARS: usize = 40;

/// Format a one-line summary of a tts request
pub fn format_tts_log(request: &TtsRequest) -> String {
    let mut parts = vec![
        format!("chars={}", request.text.chars().count()),
        format!("format={}", request.format_name()),
    ];

    if let Some(ref reference_id) = request.reference_id {
        parts.push(format!("ref={}", reference_id));
    }

    if let Some(ref bitrate) = request.mp3_bitrate {
        parts.push(format!("mp3_bitrate={}", bitrate));
    }

    parts.push(format!("\"{}\"", preview_text(&request.text)));

    format!("→ tts {}", parts.join(" "))
}

/// Collapse whitespace and truncate for a log preview
fn preview_text(text: &str) -> String {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.chars().count() <= MAX_PREVIEW_CHARS {
        normalized
    } else {
        let kept: String = normalized.chars().take(MAX_PREVIEW_CHARS).collect();
        format!("{}...", kept)
    }
}
