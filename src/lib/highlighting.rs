//! Syntax highlighting for code blocks, backed by `syntect`.
//!
//! Code is coloured with the `InspiredGitHub` theme and returned one line at a
//! time so the renderer can set each line as its own paragraph.

use lazy_static::lazy_static;
use log::warn;
use std::collections::HashMap;
use syntect::easy::HighlightLines;
use syntect::highlighting::{Color, FontStyle, Theme, ThemeSet};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

/// An RGB colour for a highlighted token.
///
/// ```
/// use predictables_report::highlighting::HighlightColor;
///
/// let blue = HighlightColor::from_rgb(0, 100, 200);
/// assert_eq!(blue.as_rgb_u8(), (0, 100, 200));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl HighlightColor {
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn from_syntect_color(color: Color) -> Self {
        Self {
            r: color.r,
            g: color.g,
            b: color.b,
        }
    }

    pub fn as_rgb_u8(&self) -> (u8, u8, u8) {
        (self.r, self.g, self.b)
    }
}

/// A run of code text sharing one colour and font style.
#[derive(Debug, Clone)]
pub struct HighlightedToken {
    pub text: String,
    pub color: HighlightColor,
    pub bold: bool,
    pub italic: bool,
}

lazy_static! {
    static ref SYNTAX_SET: SyntaxSet = SyntaxSet::load_defaults_newlines();
    static ref THEME_SET: ThemeSet = ThemeSet::load_defaults();
    static ref LANGUAGE_ALIASES: HashMap<&'static str, &'static str> = language_aliases();
}

/// Maps common short names to syntect syntax names.
fn language_aliases() -> HashMap<&'static str, &'static str> {
    let mut map = HashMap::new();
    map.insert("c", "C");
    map.insert("cpp", "C++");
    map.insert("c++", "C++");
    map.insert("java", "Java");
    map.insert("python", "Python");
    map.insert("py", "Python");
    map.insert("javascript", "JavaScript");
    map.insert("js", "JavaScript");
    map.insert("rust", "Rust");
    map.insert("rs", "Rust");
    map.insert("go", "Go");
    map.insert("bash", "Bourne Again Shell (bash)");
    map.insert("sh", "Bourne Again Shell (bash)");
    map.insert("shell", "Bourne Again Shell (bash)");
    map.insert("html", "HTML");
    map.insert("xml", "XML");
    map.insert("json", "JSON");
    map.insert("yaml", "YAML");
    map.insert("yml", "YAML");
    map.insert("sql", "SQL");
    map.insert("r", "R");
    map.insert("markdown", "Markdown");
    map.insert("md", "Markdown");
    map
}

fn find_syntax(language: &str) -> &'static SyntaxReference {
    let lower = language.to_lowercase();
    let name = LANGUAGE_ALIASES.get(lower.as_str()).copied().unwrap_or(language);

    SYNTAX_SET
        .find_syntax_by_name(name)
        .or_else(|| SYNTAX_SET.find_syntax_by_token(&lower))
        .unwrap_or_else(|| {
            warn!("No syntax found for language '{}', using plain text", language);
            SYNTAX_SET.find_syntax_plain_text()
        })
}

fn theme() -> Option<&'static Theme> {
    THEME_SET
        .themes
        .get("InspiredGitHub")
        .or_else(|| THEME_SET.themes.values().next())
}

/// Splits `code` into lines of coloured tokens.
///
/// Lines are returned without their trailing newline. Highlighting failures
/// degrade to a single uncoloured token for the affected line.
///
/// ```
/// use predictables_report::highlighting::highlight_lines;
///
/// let lines = highlight_lines("fn main() {\n}\n", "rust");
/// assert_eq!(lines.len(), 2);
/// assert!(lines[0].iter().any(|t| t.text.contains("fn")));
/// ```
pub fn highlight_lines(code: &str, language: &str) -> Vec<Vec<HighlightedToken>> {
    let Some(theme) = theme() else {
        return plain_lines(code);
    };
    let mut highlighter = HighlightLines::new(find_syntax(language), theme);

    LinesWithEndings::from(code)
        .map(|line| match highlighter.highlight_line(line, &SYNTAX_SET) {
            Ok(ranges) => ranges
                .into_iter()
                .filter_map(|(style, text)| {
                    let text = text.trim_end_matches(['\n', '\r']);
                    if text.is_empty() {
                        return None;
                    }
                    let mut color = HighlightColor::from_syntect_color(style.foreground);
                    if color == HighlightColor::from_rgb(255, 255, 255) {
                        color = HighlightColor::from_rgb(220, 220, 220);
                    }
                    Some(HighlightedToken {
                        text: text.to_string(),
                        color,
                        bold: style.font_style.contains(FontStyle::BOLD),
                        italic: style.font_style.contains(FontStyle::ITALIC),
                    })
                })
                .collect(),
            Err(e) => {
                warn!("Highlighting failed: {}", e);
                plain_line(line)
            }
        })
        .collect()
}

/// Splits `code` into lines of uncoloured tokens.
pub fn plain_lines(code: &str) -> Vec<Vec<HighlightedToken>> {
    code.lines().map(plain_line).collect()
}

fn plain_line(line: &str) -> Vec<HighlightedToken> {
    let text = line.trim_end_matches(['\n', '\r']);
    if text.is_empty() {
        return Vec::new();
    }
    vec![HighlightedToken {
        text: text.to_string(),
        color: HighlightColor::from_rgb(0, 0, 0),
        bold: false,
        italic: false,
    }]
}
