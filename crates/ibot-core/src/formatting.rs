//! Formatting utilities (notice → Telegram HTML, small text helpers).

use crate::messaging::types::Notice;

/// Longest title we render; longer ones are cut with an ellipsis.
pub const MAX_TITLE_CHARS: usize = 256;

/// Room kept for the "… and N more" line while packing units.
const MORE_RESERVE: usize = 40;

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Render a notice as Telegram HTML no longer than `max_len` bytes.
///
/// Layout: colour marker + bold title, description lines, one block per field,
/// then an italic UTC timestamp. Whole lines/fields are dropped from the end
/// when the limit is hit so tags stay balanced.
pub fn notice_to_html(notice: &Notice, max_len: usize) -> String {
    let mut header = String::new();
    if let Some(url) = notice.thumbnail_url.as_deref() {
        // Zero-width link so Telegram shows the image as the preview.
        header.push_str(&format!("<a href=\"{}\">\u{200B}</a>", escape_html(url)));
    }
    header.push_str(&format!(
        "{} <b>{}</b>",
        color_marker(notice.color),
        escape_html(&truncate_chars(&notice.title, MAX_TITLE_CHARS))
    ));

    let mut units: Vec<String> = Vec::new();
    if let Some(desc) = notice.description.as_deref() {
        units.extend(desc.lines().map(escape_html));
    }
    for f in &notice.fields {
        let name = escape_html(&f.name);
        let value = escape_html(&f.value);
        if f.inline {
            units.push(format!("<b>{name}</b>: {value}"));
        } else {
            units.push(format!("\n<b>{name}</b>\n{value}"));
        }
    }

    let footer = notice
        .timestamp
        .map(|ts| format!("\n\n<i>{}</i>", ts.format("%Y-%m-%d %H:%M UTC")))
        .unwrap_or_default();

    let mut body = String::new();
    let mut dropped = 0usize;
    for (i, unit) in units.iter().enumerate() {
        let is_last = i + 1 == units.len();
        let reserve = if is_last { 0 } else { MORE_RESERVE };
        let needed = header.len() + 2 + body.len() + 1 + unit.len() + reserve + footer.len();
        if needed > max_len {
            dropped = units.len() - i;
            break;
        }
        if !body.is_empty() {
            body.push('\n');
        }
        body.push_str(unit);
    }
    if dropped > 0 {
        if !body.is_empty() {
            body.push('\n');
        }
        body.push_str(&format!("<i>… and {dropped} more</i>"));
    }

    let mut out = header;
    if !body.is_empty() {
        out.push_str("\n\n");
        out.push_str(body.trim_start_matches('\n'));
    }
    out.push_str(&footer);

    if out.len() > max_len {
        // Only reachable with tiny limits; tags may be cut.
        let (head, _) = split_utf8_prefix(&out, max_len);
        return head.to_string();
    }
    out
}

/// Telegram has no embed colours; approximate with a coloured square.
pub fn color_marker(color: u32) -> &'static str {
    const PALETTE: &[(u32, &str)] = &[
        (0xE74C3C, "🟥"),
        (0xE67E22, "🟧"),
        (0xF1C40F, "🟨"),
        (0x2ECC71, "🟩"),
        (0x3498DB, "🟦"),
        (0x9B59B6, "🟪"),
    ];

    let rgb = |c: u32| {
        (
            ((c >> 16) & 0xFF) as i64,
            ((c >> 8) & 0xFF) as i64,
            (c & 0xFF) as i64,
        )
    };
    let (r, g, b) = rgb(color);
    PALETTE
        .iter()
        .min_by_key(|(p, _)| {
            let (pr, pg, pb) = rgb(*p);
            (r - pr).pow(2) + (g - pg).pow(2) + (b - pb).pow(2)
        })
        .map(|(_, m)| *m)
        .unwrap_or("▪️")
}

/// Best-effort player headshot URL from the first two words of a title.
///
/// Purely cosmetic: breaks on suffixes and multi-word names, and returns
/// `None` when the template is empty (thumbnails disabled).
pub fn player_image_url(template: &str, title: &str) -> Option<String> {
    if template.trim().is_empty() {
        return None;
    }
    let mut words = title.split_whitespace();
    let first = words.next()?;
    let last = words.next().unwrap_or("");
    Some(template.replace("{first}", first).replace("{last}", last))
}

/// Capitalize the first letter of every word, lowercase the rest.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_alpha = false;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}

pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}

fn split_utf8_prefix(s: &str, max_bytes: usize) -> (&str, &str) {
    if s.len() <= max_bytes {
        return (s, "");
    }
    let mut idx = 0usize;
    for (i, _) in s.char_indices() {
        if i > max_bytes {
            break;
        }
        idx = i;
    }
    (&s[..idx], &s[idx..])
}
