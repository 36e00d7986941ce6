//! Font family resolution for report rendering.
//!
//! A report needs two families: one for body text and one monospace family for
//! code blocks. Each is resolved by name through, in order:
//!
//! 1. user-supplied font files or directories ([`FontConfig::custom_paths`]),
//! 2. the PDF base-14 families (`helvetica`, `times`, `courier` and their aliases),
//! 3. installed system fonts, discovered through `fontdb`.
//!
//! The system font database is scanned once per process and shared.

use std::fs;
use std::panic;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fontdb::Database;
use genpdfi_extended::error::{Error, ErrorKind};
use genpdfi_extended::fonts::{FontData, FontFamily};
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use printpdf::BuiltinFont;
use rusttype::Font;

static SYSTEM_FONTS: Lazy<Database> = Lazy::new(|| {
    let mut db = Database::new();
    db.load_system_fonts();
    debug!("Indexed {} system font faces", db.len());
    db
});

/// Returns common aliases for a font name.
///
/// This allows users to specify "Arial" and have the system try
/// "Helvetica", "Liberation Sans", etc.
fn get_font_aliases(name: &str) -> Vec<&'static str> {
    match name.to_lowercase().as_str() {
        "arial" => vec!["Helvetica", "Liberation Sans", "FreeSans"],
        "helvetica" => vec!["Arial", "Liberation Sans", "FreeSans"],
        "times new roman" | "times" => {
            vec!["Times", "Times New Roman", "Liberation Serif", "FreeSerif"]
        }
        "courier new" | "courier" => vec!["Courier", "Courier New", "Liberation Mono", "FreeMono"],
        "verdana" => vec!["DejaVu Sans", "Bitstream Vera Sans"],
        "georgia" => vec!["Liberation Serif", "FreeSerif"],
        _ => vec![],
    }
}

/// Font selection for a report.
#[derive(Debug, Clone)]
pub struct FontConfig {
    /// Font files or directories searched before anything else.
    pub custom_paths: Vec<PathBuf>,
    /// Body text family. Falls back to the `Normal` style's `fontfamily`, then Helvetica.
    pub default_font: Option<String>,
    /// Code block family.
    pub code_font: Option<String>,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            custom_paths: Vec::new(),
            default_font: None,
            code_font: Some("courier".to_string()),
        }
    }
}

/// The pair of families a document is set in.
pub struct ResolvedFonts {
    pub text: FontFamily<FontData>,
    pub code: FontFamily<FontData>,
}

#[derive(Clone, Copy)]
enum FontStyle {
    Regular,
    Bold,
    Italic,
    BoldItalic,
}

/// Maps a base-14 family and a style to the concrete `printpdf::BuiltinFont`.
enum BuiltinVariants {
    Helvetica,
    Times,
    Courier,
}

impl BuiltinVariants {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "helvetica" | "arial" | "sans" | "sans-serif" => Some(BuiltinVariants::Helvetica),
            "times" | "timesnewroman" | "times new roman" | "serif" => Some(BuiltinVariants::Times),
            "courier" | "couriernew" | "courier new" | "monospace" => Some(BuiltinVariants::Courier),
            _ => None,
        }
    }

    fn metric_candidates(&self) -> &'static [&'static str] {
        match self {
            BuiltinVariants::Times => &["Times New Roman", "Times", "Liberation Serif", "DejaVu Serif"],
            BuiltinVariants::Courier => &["Courier New", "Courier", "Liberation Mono", "DejaVu Sans Mono"],
            BuiltinVariants::Helvetica => &["Helvetica", "Arial", "Liberation Sans", "DejaVu Sans"],
        }
    }

    fn variant(&self, style: FontStyle) -> BuiltinFont {
        match self {
            BuiltinVariants::Helvetica => match style {
                FontStyle::Regular => BuiltinFont::Helvetica,
                FontStyle::Bold => BuiltinFont::HelveticaBold,
                FontStyle::Italic => BuiltinFont::HelveticaOblique,
                FontStyle::BoldItalic => BuiltinFont::HelveticaBoldOblique,
            },
            BuiltinVariants::Times => match style {
                FontStyle::Regular => BuiltinFont::TimesRoman,
                FontStyle::Bold => BuiltinFont::TimesBold,
                FontStyle::Italic => BuiltinFont::TimesItalic,
                FontStyle::BoldItalic => BuiltinFont::TimesBoldItalic,
            },
            BuiltinVariants::Courier => match style {
                FontStyle::Regular => BuiltinFont::Courier,
                FontStyle::Bold => BuiltinFont::CourierBold,
                FontStyle::Italic => BuiltinFont::CourierOblique,
                FontStyle::BoldItalic => BuiltinFont::CourierBoldOblique,
            },
        }
    }
}

/// Loads one of the PDF base-14 families.
///
/// Built-in fonts are not embedded, but the layout engine still needs glyph
/// metrics, so a close system font is read for measuring. Unknown names map to
/// Helvetica.
pub fn load_builtin_font_family(name: &str) -> Result<FontFamily<FontData>, Error> {
    let builtin_variants = BuiltinVariants::from_name(name).unwrap_or(BuiltinVariants::Helvetica);
    let font_bytes = Arc::new(load_system_font_bytes_fallback(
        builtin_variants.metric_candidates(),
    )?);

    let mk_data = |variant: FontStyle| -> Result<FontData, Error> {
        FontData::new_shared(font_bytes.clone(), Some(builtin_variants.variant(variant)))
    };

    Ok(FontFamily {
        regular: mk_data(FontStyle::Regular)?,
        bold: mk_data(FontStyle::Bold)?,
        italic: mk_data(FontStyle::Italic)?,
        bold_italic: mk_data(FontStyle::BoldItalic)?,
    })
}

fn is_collection(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("ttc"))
}

fn is_font_file(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("ttf") || ext.eq_ignore_ascii_case("otf"))
}

fn is_valid_font(bytes: &[u8]) -> bool {
    panic::catch_unwind(|| Font::try_from_bytes(bytes).is_some()).unwrap_or(false)
}

/// Finds metric bytes for a built-in family, or any usable TTF/OTF as a last resort.
fn load_system_font_bytes_fallback(candidates: &[&str]) -> Result<Vec<u8>, Error> {
    let files = || {
        SYSTEM_FONTS.faces().filter_map(|face| match &face.source {
            fontdb::Source::File(p) if !is_collection(p) => Some(p.clone()),
            _ => None,
        })
    };

    for path in files() {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("")
            .to_lowercase()
            .replace(' ', "");
        let matches = candidates
            .iter()
            .any(|cand| file_name.contains(&cand.to_lowercase().replace(' ', "")));
        if matches {
            if let Ok(bytes) = fs::read(&path) {
                if is_valid_font(&bytes) {
                    return Ok(bytes);
                }
            }
        }
    }

    for path in files().filter(|p| is_font_file(p)) {
        if let Ok(bytes) = fs::read(&path) {
            if is_valid_font(&bytes) {
                debug!("Using {:?} for built-in font metrics", path);
                return Ok(bytes);
            }
        }
    }

    Err(Error::new(
        "No usable system font found for built-in font metrics".to_string(),
        ErrorKind::InvalidFont,
    ))
}

fn family_from_bytes(bytes: Vec<u8>) -> Result<FontFamily<FontData>, Error> {
    let shared = Arc::new(bytes);
    let mk = || FontData::new_shared(shared.clone(), None);
    Ok(FontFamily {
        regular: mk()?,
        bold: mk()?,
        italic: mk()?,
        bold_italic: mk()?,
    })
}

/// Loads an installed system font and embeds it into the PDF.
///
/// The same face is used for all four variants; bold and italic are left to
/// the viewer. Aliases are tried when the exact family is missing.
pub fn load_system_font_family(name: &str) -> Result<FontFamily<FontData>, Error> {
    let mut candidates = vec![name];
    candidates.extend(get_font_aliases(name));

    for candidate_name in candidates {
        let wanted = candidate_name.to_lowercase();

        for face in SYSTEM_FONTS.faces() {
            let path = match &face.source {
                fontdb::Source::File(p) => p,
                _ => continue,
            };

            let matches_family = face
                .families
                .first()
                .is_some_and(|(family, _)| family.to_lowercase().contains(&wanted));
            let matches_filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.to_lowercase().contains(&wanted));
            if !matches_family && !matches_filename {
                continue;
            }
            if is_collection(path) {
                debug!("Skipping collection {:?}", path);
                continue;
            }

            match fs::read(path) {
                Ok(bytes) if is_valid_font(&bytes) => {
                    if candidate_name != name {
                        debug!("Using '{}' as alias for '{}'", candidate_name, name);
                    }
                    return family_from_bytes(bytes);
                }
                Ok(_) => continue,
                Err(e) => warn!("Failed to read font file {:?}: {}", path, e),
            }
        }
    }

    Err(Error::new(
        format!("No usable system font found for family '{}'.", name),
        ErrorKind::InvalidFont,
    ))
}

/// Searches user-supplied files and directories for a font whose file name
/// contains `name`.
pub fn load_custom_font_family(
    name: &str,
    custom_paths: &[PathBuf],
) -> Result<FontFamily<FontData>, Error> {
    let wanted = name.to_lowercase().replace(' ', "");
    let name_matches = |path: &Path| {
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.to_lowercase().replace(' ', "").contains(&wanted))
    };

    let mut files = Vec::new();
    for custom_path in custom_paths {
        if custom_path.is_file() {
            files.push(custom_path.clone());
        } else if let Ok(entries) = fs::read_dir(custom_path) {
            let mut found: Vec<PathBuf> = entries
                .flatten()
                .map(|e| e.path())
                .filter(|p| is_font_file(p))
                .collect();
            found.sort();
            files.extend(found);
        }
    }

    for path in files.iter().filter(|p| name_matches(p)) {
        if let Ok(bytes) = fs::read(path) {
            if is_valid_font(&bytes) {
                info!("Loaded font '{}' from {:?}", name, path);
                return family_from_bytes(bytes);
            }
        }
    }

    Err(Error::new(
        format!("Font '{}' not found in custom font paths", name),
        ErrorKind::InvalidFont,
    ))
}

/// Loads a family by name: custom paths, then base-14, then system fonts.
pub fn load_font_with_config(
    name: &str,
    config: Option<&FontConfig>,
) -> Result<FontFamily<FontData>, Error> {
    if let Some(cfg) = config.filter(|c| !c.custom_paths.is_empty()) {
        if let Ok(family) = load_custom_font_family(name, &cfg.custom_paths) {
            return Ok(family);
        }
    }

    if BuiltinVariants::from_name(name).is_some() {
        return load_builtin_font_family(name);
    }

    load_system_font_family(name)
}

/// Resolves the text and code families, falling back to Helvetica and Courier.
///
/// `style_font` is the `fontfamily` configured on the `Normal` style, used when
/// the font config names no default font.
pub fn resolve_fonts(
    config: Option<&FontConfig>,
    style_font: Option<&str>,
    code_style_font: Option<&str>,
) -> Result<ResolvedFonts, Error> {
    let text_name = config
        .and_then(|c| c.default_font.as_deref())
        .or(style_font)
        .unwrap_or("helvetica");
    let text = load_font_with_config(text_name, config).or_else(|e| {
        warn!("Could not load font '{}' ({}), falling back to Helvetica", text_name, e);
        load_builtin_font_family("helvetica")
    })?;

    let code_name = config
        .and_then(|c| c.code_font.as_deref())
        .or(code_style_font)
        .unwrap_or("courier");
    let code = load_font_with_config(code_name, config).or_else(|e| {
        warn!("Could not load code font '{}' ({}), falling back to Courier", code_name, e);
        load_builtin_font_family("courier")
    })?;

    Ok(ResolvedFonts { text, code })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases() {
        assert!(get_font_aliases("Arial").contains(&"Helvetica"));
        assert!(get_font_aliases("Courier New").contains(&"Liberation Mono"));
        assert!(get_font_aliases("Unknown Face").is_empty());
    }

    #[test]
    fn test_builtin_names() {
        assert!(matches!(BuiltinVariants::from_name("Courier New"), Some(BuiltinVariants::Courier)));
        assert!(matches!(BuiltinVariants::from_name("serif"), Some(BuiltinVariants::Times)));
        assert!(matches!(BuiltinVariants::from_name("Arial"), Some(BuiltinVariants::Helvetica)));
        assert!(BuiltinVariants::from_name("Fira Code").is_none());
    }

    #[test]
    fn test_builtin_variant_mapping() {
        assert!(matches!(
            BuiltinVariants::Courier.variant(FontStyle::BoldItalic),
            BuiltinFont::CourierBoldOblique
        ));
        assert!(matches!(
            BuiltinVariants::Times.variant(FontStyle::Regular),
            BuiltinFont::TimesRoman
        ));
    }

    #[test]
    fn test_default_config_uses_courier_for_code() {
        let cfg = FontConfig::default();
        assert_eq!(cfg.code_font.as_deref(), Some("courier"));
        assert!(cfg.default_font.is_none());
    }

    #[test]
    fn test_custom_font_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist");
        assert!(load_custom_font_family("Whatever", &[missing]).is_err());
    }

    #[test]
    fn test_custom_font_ignores_invalid_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Broken.ttf"), b"not a font").unwrap();
        assert!(load_custom_font_family("Broken", &[dir.path().to_path_buf()]).is_err());
    }
}
