//! Heuristic RTF to HTML text recovery.
//!
//! There is no RTF parser here. The input goes through a fixed sequence of
//! rewrites and the order matters: escapes are protected first, paragraph
//! words become break sentinels before the generic control-word strip, and
//! braces are only removed once nothing else needs them.

use std::sync::OnceLock;

use log::{debug, warn};
use regex::{Captures, Regex};

use super::{cached_regex, Extracted, ExtractorKind, FormatImporter, ImportOptions, Strategy};
use crate::error::{Error, Result};
use crate::model::escape_html;

const ESC_BACKSLASH: char = '\u{E000}';
const ESC_OPEN: char = '\u{E001}';
const ESC_CLOSE: char = '\u{E002}';
const BREAK: char = '\u{E003}';

/// Destinations whose content is never visible text.
const HIDDEN_DESTINATIONS: &[&str] = &[
    "fonttbl",
    "colortbl",
    "stylesheet",
    "info",
    "pict",
    "header",
    "footer",
    "listtable",
    "listoverridetable",
    "rsidtbl",
    "generator",
];

/// Characters 0x80-0x9F of Windows-1252; the rest of the upper half is Latin-1.
const CP1252_HIGH: [char; 32] = [
    '€', '\u{81}', '‚', 'ƒ', '„', '…', '†', '‡', 'ˆ', '‰', 'Š', '‹', 'Œ', '\u{8D}', 'Ž',
    '\u{8F}', '\u{90}', '‘', '’', '“', '”', '•', '–', '—', '˜', '™', 'š', '›', 'œ', '\u{9D}',
    'ž', 'Ÿ',
];

static HEADER: OnceLock<Regex> = OnceLock::new();
static PAR_WORD: OnceLock<Regex> = OnceLock::new();
static UNICODE_WORD: OnceLock<Regex> = OnceLock::new();
static CONTROL_WORD: OnceLock<Regex> = OnceLock::new();
static HEX_ESCAPE: OnceLock<Regex> = OnceLock::new();
static CONTROL_SYMBOL: OnceLock<Regex> = OnceLock::new();

/// Convert RTF bytes to HTML, degrading to printable text if the input is
/// not recognizably RTF.
///
/// # Example
///
/// ```
/// let html = docport::import::rtf::import_rtf(br"{\rtf1\ansi Hello\par World}");
/// assert_eq!(html, "Hello<br>World");
/// ```
pub fn import_rtf(data: &[u8]) -> String {
    match convert(data) {
        Ok(html) => html,
        Err(e) => {
            warn!("RTF conversion failed ({}); importing as plain text", e);
            plain_text_fallback(data)
        }
    }
}

/// Run the RTF rewrite pipeline, failing on input that does not look like RTF.
pub fn convert(data: &[u8]) -> Result<String> {
    let text = String::from_utf8_lossy(data);
    let text = text.trim_start_matches('\u{FEFF}').trim_start();
    if !text.starts_with("{\\rtf") {
        return Err(Error::Decode("missing {\\rtf signature".into()));
    }

    let text: String = text
        .chars()
        .filter(|c| !matches!(*c, ESC_BACKSLASH | ESC_OPEN | ESC_CLOSE | BREAK))
        .collect();

    let text = protect_escapes(&text);
    let text = strip_header(&text);
    let text = strip_destinations(&text)?;
    let text = cached_regex(&PAR_WORD, r"\\(?:par|line)\b ?|\\\r?\n")
        .replace_all(&text, BREAK.to_string());
    let text = cached_regex(&UNICODE_WORD, r"\\u(-?\d+) ?(?:\\'[0-9a-fA-F]{2}|\?)?")
        .replace_all(&text, |caps: &Captures| decode_unicode(&caps[1]));
    let text = cached_regex(&CONTROL_WORD, r"\\[a-zA-Z]+-?\d* ?").replace_all(&text, "");
    let text = cached_regex(&HEX_ESCAPE, r"\\'([0-9a-fA-F]{2})")
        .replace_all(&text, |caps: &Captures| decode_hex(&caps[1]));
    let text = cached_regex(&CONTROL_SYMBOL, r"\\[^a-zA-Z0-9]")
        .replace_all(&text, |caps: &Captures| {
            if &caps[0] == "\\~" {
                " ".to_string()
            } else {
                String::new()
            }
        });

    let text: String = text
        .chars()
        .filter(|c| !matches!(*c, '\r' | '\n' | '{' | '}' | '\\'))
        .map(|c| match c {
            ESC_BACKSLASH => '\\',
            ESC_OPEN => '{',
            ESC_CLOSE => '}',
            other => other,
        })
        .collect();

    let html = escape_html(&text).replace(BREAK, "<br>");
    let html = collapse_breaks(&html);
    debug!("RTF conversion produced {} bytes of markup", html.len());
    Ok(html)
}

/// RTF importer.
#[derive(Debug, Clone, Default)]
pub struct RtfImporter {
    _private: (),
}

impl RtfImporter {
    /// Create a new RTF importer.
    pub fn new() -> Self {
        Self::default()
    }
}

impl FormatImporter for RtfImporter {
    fn supported_extensions(&self) -> &[&str] {
        &["rtf"]
    }

    fn name(&self) -> &str {
        "rtf"
    }

    fn extractor_kind(&self) -> ExtractorKind {
        ExtractorKind::Rtf
    }

    fn import(&self, _extension: &str, data: &[u8], _options: &ImportOptions) -> Result<Extracted> {
        Ok(Extracted::new(import_rtf(data), Strategy::Rtf))
    }
}

fn protect_escapes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.peek() {
                Some('\\') => {
                    chars.next();
                    out.push(ESC_BACKSLASH);
                }
                Some('{') => {
                    chars.next();
                    out.push(ESC_OPEN);
                }
                Some('}') => {
                    chars.next();
                    out.push(ESC_CLOSE);
                }
                _ => out.push(c),
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn strip_header(text: &str) -> String {
    match (text.find("\\rtf1"), text.find("\\viewkind0")) {
        (Some(start), Some(end)) if end > start => {
            let end = end + "\\viewkind0".len();
            let mut out = String::with_capacity(text.len());
            out.push_str(&text[..start]);
            let body = cached_regex(&HEADER, r"^-?\d* ?").replace(&text[end..], "");
            out.push_str(&body);
            out
        }
        _ => text.to_string(),
    }
}

/// Remove `{\*...}` groups and hidden destinations such as the font table.
fn strip_destinations(text: &str) -> Result<String> {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    let mut copied_to = 0;

    while i < bytes.len() {
        if bytes[i] == b'{' && is_hidden_group(&text[i + 1..]) {
            out.push_str(&text[copied_to..i]);
            let mut depth = 0usize;
            let mut j = i;
            while j < bytes.len() {
                match bytes[j] {
                    b'{' => depth += 1,
                    b'}' => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    _ => {}
                }
                j += 1;
            }
            if j >= bytes.len() {
                return Err(Error::Decode("unterminated destination group".into()));
            }
            i = j + 1;
            copied_to = i;
        } else {
            i += 1;
        }
    }
    out.push_str(&text[copied_to..]);
    Ok(out)
}

fn is_hidden_group(rest: &str) -> bool {
    let rest = rest.trim_start();
    if rest.starts_with("\\*") {
        return true;
    }
    let Some(word) = rest.strip_prefix('\\') else {
        return false;
    };
    let name: String = word.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    HIDDEN_DESTINATIONS.contains(&name.as_str())
}

fn protect_char(c: char) -> char {
    match c {
        '\\' => ESC_BACKSLASH,
        '{' => ESC_OPEN,
        '}' => ESC_CLOSE,
        other => other,
    }
}

fn decode_unicode(digits: &str) -> String {
    let Ok(mut code) = digits.parse::<i32>() else {
        return String::new();
    };
    if code < 0 {
        code += 65536;
    }
    u32::try_from(code)
        .ok()
        .and_then(char::from_u32)
        .map(|c| protect_char(c).to_string())
        .unwrap_or_default()
}

fn decode_hex(hex: &str) -> String {
    let Ok(byte) = u8::from_str_radix(hex, 16) else {
        return String::new();
    };
    let c = match byte {
        0x80..=0x9F => CP1252_HIGH[usize::from(byte - 0x80)],
        _ => char::from(byte),
    };
    protect_char(c).to_string()
}

fn collapse_breaks(html: &str) -> String {
    let mut out = html.to_string();
    while out.contains("<br><br><br>") {
        out = out.replace("<br><br><br>", "<br><br>");
    }
    out
}

/// Keep printable characters and turn newlines into `<br>`.
pub fn plain_text_fallback(data: &[u8]) -> String {
    let text = String::from_utf8_lossy(data);
    let printable: String = text
        .chars()
        .filter(|c| matches!(*c, '\r' | '\n' | '\t' | ' '..='~'))
        .collect();
    escape_html(&printable).replace('\n', "<br>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breaks_survive_control_word_strip() {
        let rtf = br"{\rtf1\ansi\pard One\par\pard Two\line Three}";
        assert_eq!(convert(rtf).unwrap(), "One<br>Two<br>Three");
    }

    #[test]
    fn test_header_is_stripped() {
        let rtf = b"{\\rtf1\\ansi\\ansicpg1252\n{\\fonttbl\\f0\\fswiss Helvetica;}\n\\viewkind0\n\\pard Body text\\par\n}";
        assert_eq!(convert(rtf).unwrap(), "Body text<br>");
    }

    #[test]
    fn test_destinations_removed_without_header_marker() {
        let rtf = br"{\rtf1{\fonttbl{\f0 Arial;}}{\colortbl;\red0\green0\blue0;}{\*\generator x;}Visible}";
        assert_eq!(convert(rtf).unwrap(), "Visible");
    }

    #[test]
    fn test_escapes_and_hex() {
        let rtf = br"{\rtf1 a\{b\}c\\d caf\'e9 \'93q\'94}";
        assert_eq!(convert(rtf).unwrap(), "a{b}c\\d café “q”");
    }

    #[test]
    fn test_unicode_escape() {
        let rtf = br"{\rtf1 \u8364?5 \u-3913?x}";
        assert_eq!(convert(rtf).unwrap(), "€5 \u{F0B7}x");
    }

    #[test]
    fn test_text_is_html_escaped() {
        let rtf = br"{\rtf1 <b>&</b>}";
        assert_eq!(convert(rtf).unwrap(), "&lt;b&gt;&amp;&lt;/b&gt;");
    }

    #[test]
    fn test_collapse_breaks() {
        let rtf = br"{\rtf1 a\par\par\par\par b}";
        assert_eq!(convert(rtf).unwrap(), "a<br><br>b");
    }

    #[test]
    fn test_link_field_keeps_display_text() {
        let rtf = br#"{\rtf1 {\field{\*\fldinst{HYPERLINK "http://x"}}{\fldrslt{\ul\cf3 site}}}}"#;
        assert_eq!(convert(rtf).unwrap(), "site");
    }

    #[test]
    fn test_not_rtf_falls_back() {
        assert!(convert(b"plain words").is_err());
        assert_eq!(import_rtf(b"line1\nline2\x01"), "line1<br>line2");
    }

    #[test]
    fn test_unterminated_group_falls_back() {
        let data = br"{\rtf1 {\*\broken";
        assert!(matches!(convert(data), Err(Error::Decode(_))));
        assert_eq!(import_rtf(data), "{\\rtf1 {\\*\\broken");
    }
}
