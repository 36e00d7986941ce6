//! TOML configuration for report styling.
//!
//! A configuration file sets page geometry, report options and the style of
//! each element kind. Every section is optional; anything left out keeps its
//! default from [`StyleMatch::default`].
//!
//! # Configuration Structure
//!
//! - `[margin]` page margins in millimetres (`top`, `right`, `bottom`, `left`)
//! - `[page]` `size` (`letter`, `legal`, `a4`) or `width`/`height` in mm, and `orientation`
//! - `[report]` `include_toc`, `toc_title`, `bullet`
//! - `[text]` body paragraphs (`Normal`)
//! - `[heading.1]` .. `[heading.6]`
//! - `[code]`, `[math]`, `[link]`, `[caption]`, `[list_item]`
//! - `[table.header]`, `[table.cell]`
//!
//! # Style Properties
//!
//! - `size` font size in points (integer)
//! - `fontfamily` font family name (string)
//! - `textcolor`, `backgroundcolor` as `{ r = 0, g = 0, b = 0 }`
//! - `beforespacing`, `afterspacing` in lines (float)
//! - `alignment` one of `left`, `center`, `right`, `justify`
//! - `bold`, `italic`, `underline`, `strikethrough` (boolean)
//!
//! ```toml
//! [margin]
//! top = 12.7
//! left = 20.0
//!
//! [heading.1]
//! size = 22
//! textcolor = { r = 20, g = 40, b = 120 }
//!
//! [caption]
//! size = 9
//! ```

use crate::styling::{
    BasicTextStyle, Margins, Orientation, PageSetup, PageSize, ReportOptions, StyleMatch,
    StyleTag, TextAlignment,
};
use log::{debug, warn};
use std::fs;
use std::path::{Path, PathBuf};
use toml::value::Table;
use toml::Value;

/// Name of the configuration file looked up in the working directory and in
/// the per-user configuration directory.
pub const CONFIG_FILE_NAME: &str = "reportrc.toml";

/// Attribute keys accepted in a style section.
pub const STYLE_ATTRIBUTES: [&str; 11] = [
    "size",
    "beforespacing",
    "afterspacing",
    "textcolor",
    "backgroundcolor",
    "alignment",
    "fontfamily",
    "bold",
    "italic",
    "underline",
    "strikethrough",
];

/// Where styling configuration is loaded from.
#[derive(Debug, Clone)]
pub enum ConfigSource<'a> {
    /// Built-in defaults
    Default,
    /// A TOML file on disk
    File(&'a str),
    /// TOML text supplied by the caller
    Embedded(&'a str),
}

fn parse_color(value: Option<&Value>, field: &str) -> Option<(u8, u8, u8)> {
    value.and_then(|c| {
        let color = c.get(field)?;
        let channel = |key: &str| -> Option<u8> {
            u8::try_from(color.get(key)?.as_integer()?).ok()
        };
        Some((channel("r")?, channel("g")?, channel("b")?))
    })
}

fn parse_alignment(value: Option<&Value>) -> Option<TextAlignment> {
    value.and_then(|v| v.as_str()).map(|s| match s {
        "center" => TextAlignment::Center,
        "right" => TextAlignment::Right,
        "justify" => TextAlignment::Justify,
        _ => TextAlignment::Left,
    })
}

fn as_f32(value: Option<&Value>) -> Option<f32> {
    value.and_then(|v| v.as_float().or_else(|| v.as_integer().map(|i| i as f64))).map(|f| f as f32)
}

/// Reads `key` from a style section through `convert`. A present value that
/// fails to convert is recorded in `rejected`.
fn attribute<T>(
    section: &Value,
    key: &'static str,
    rejected: &mut Vec<&'static str>,
    convert: impl FnOnce(&Value) -> Option<T>,
) -> Option<T> {
    let value = section.get(key)?;
    let converted = convert(value);
    if converted.is_none() {
        rejected.push(key);
    }
    converted
}

/// Parses one style section on top of `default`.
///
/// Returns the updated style and the recognised attributes whose values could
/// not be used; those keep the default.
fn parse_style(
    value: Option<&Value>,
    default: BasicTextStyle,
) -> (BasicTextStyle, Vec<&'static str>) {
    let mut style = default;
    let mut rejected = Vec::new();
    let Some(section) = value else {
        return (style, rejected);
    };

    if let Some(size) = attribute(section, "size", &mut rejected, |v| {
        v.as_integer().and_then(|s| u8::try_from(s).ok())
    }) {
        style.size = size;
    }
    if let Some(spacing) = attribute(section, "beforespacing", &mut rejected, |v| as_f32(Some(v))) {
        style.before_spacing = spacing;
    }
    if let Some(spacing) = attribute(section, "afterspacing", &mut rejected, |v| as_f32(Some(v))) {
        style.after_spacing = spacing;
    }
    if let Some(color) = attribute(section, "textcolor", &mut rejected, |_| {
        parse_color(Some(section), "textcolor")
    }) {
        style.text_color = Some(color);
    }
    if let Some(bg_color) = attribute(section, "backgroundcolor", &mut rejected, |_| {
        parse_color(Some(section), "backgroundcolor")
    }) {
        style.background_color = Some(bg_color);
    }
    if let Some(alignment) = attribute(section, "alignment", &mut rejected, |v| {
        parse_alignment(Some(v))
    }) {
        style.alignment = Some(alignment);
    }
    if let Some(font) = attribute(section, "fontfamily", &mut rejected, |v| {
        v.as_str().map(str::to_string)
    }) {
        style.font_family = Some(font);
    }
    if let Some(bold) = attribute(section, "bold", &mut rejected, Value::as_bool) {
        style.bold = bold;
    }
    if let Some(italic) = attribute(section, "italic", &mut rejected, Value::as_bool) {
        style.italic = italic;
    }
    if let Some(underline) = attribute(section, "underline", &mut rejected, Value::as_bool) {
        style.underline = underline;
    }
    if let Some(strikethrough) =
        attribute(section, "strikethrough", &mut rejected, Value::as_bool)
    {
        style.strikethrough = strikethrough;
    }
    (style, rejected)
}

fn lookup<'v>(config: &'v Value, path: &[&str]) -> Option<&'v Value> {
    path.iter().try_fold(config, |value, key| value.get(*key))
}

fn parse_margins(value: Option<&Value>, default: Margins) -> Margins {
    let Some(margins) = value else {
        return default;
    };
    Margins {
        top: as_f32(margins.get("top")).unwrap_or(default.top),
        right: as_f32(margins.get("right")).unwrap_or(default.right),
        bottom: as_f32(margins.get("bottom")).unwrap_or(default.bottom),
        left: as_f32(margins.get("left")).unwrap_or(default.left),
    }
}

fn parse_page(value: Option<&Value>, default: PageSetup) -> PageSetup {
    let Some(page) = value else {
        return default;
    };
    let mut setup = default;

    match (as_f32(page.get("width")), as_f32(page.get("height"))) {
        (Some(w), Some(h)) if w > 0.0 && h > 0.0 => setup.size = PageSize::Custom(w, h),
        _ => {
            if let Some(name) = page.get("size").and_then(|v| v.as_str()) {
                match PageSize::from_name(name) {
                    Some(size) => setup.size = size,
                    None => warn!("Unknown page size '{}', keeping {:?}", name, setup.size),
                }
            }
        }
    }

    if let Some(orientation) = page.get("orientation").and_then(|v| v.as_str()) {
        setup.orientation = match orientation.to_lowercase().as_str() {
            "landscape" => Orientation::Landscape,
            _ => Orientation::Portrait,
        };
    }
    setup
}

fn parse_options(value: Option<&Value>, default: ReportOptions) -> ReportOptions {
    let Some(report) = value else {
        return default;
    };
    ReportOptions {
        include_toc: report
            .get("include_toc")
            .and_then(|v| v.as_bool())
            .unwrap_or(default.include_toc),
        toc_title: report
            .get("toc_title")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or(default.toc_title),
        bullet: report
            .get("bullet")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or(default.bullet),
    }
}

/// Parses TOML text into a complete [`StyleMatch`].
///
/// Invalid TOML is reported with `warn!` and yields the defaults.
///
/// ```rust
/// use predictables_report::config::parse_config_string;
///
/// let style = parse_config_string(r#"
/// [heading.1]
/// size = 18
///
/// [code]
/// fontfamily = "Courier New"
/// "#);
/// assert_eq!(style.heading_1.size, 18);
/// assert_eq!(style.code.font_family.as_deref(), Some("Courier New"));
/// ```
pub fn parse_config_string(config_str: &str) -> StyleMatch {
    let config: Value = match toml::from_str(config_str) {
        Ok(v) => v,
        Err(e) => {
            warn!("Invalid style configuration, using defaults: {}", e);
            return StyleMatch::default();
        }
    };

    let default_style = StyleMatch::default();
    let mut style = StyleMatch {
        margins: parse_margins(config.get("margin"), default_style.margins),
        page: parse_page(config.get("page"), default_style.page),
        options: parse_options(config.get("report"), default_style.options.clone()),
        ..default_style
    };

    for tag in StyleTag::ALL {
        let section = lookup(&config, tag.config_path());
        let (parsed, rejected) = parse_style(section, style.get(tag).clone());
        for key in rejected {
            warn!("Invalid value for {}.{}; keeping the default", tag, key);
        }
        *style.get_mut(tag) = parsed;
    }
    style
}

/// Loads styling from the given source. A missing or unreadable file falls
/// back to the defaults.
pub fn load_config_from_source(source: ConfigSource) -> StyleMatch {
    match source {
        ConfigSource::Default => StyleMatch::default(),
        ConfigSource::File(path) => match fs::read_to_string(Path::new(path)) {
            Ok(s) => {
                debug!("Loaded style configuration from {}", path);
                parse_config_string(&s)
            }
            Err(e) => {
                warn!("Could not read configuration {}: {}", path, e);
                StyleMatch::default()
            }
        },
        ConfigSource::Embedded(content) => parse_config_string(content),
    }
}

/// Locates a configuration file: `reportrc.toml` in `cwd`, then in the
/// per-user configuration directory.
pub fn find_config_file(cwd: &Path) -> Option<PathBuf> {
    let local = cwd.join(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }
    dirs::config_dir()
        .map(|dir| dir.join("predictables-report").join(CONFIG_FILE_NAME))
        .filter(|p| p.is_file())
}

/// Applies attribute overrides to the style of `tag`.
///
/// Returns the attribute names that were ignored, either because they are
/// not recognised or because their value has the wrong type or range. Each
/// one is logged with `warn!`.
pub fn apply_style_overrides(
    style: &mut StyleMatch,
    tag: StyleTag,
    overrides: &Table,
) -> Vec<String> {
    let mut ignored: Vec<String> = overrides
        .keys()
        .filter(|key| !STYLE_ATTRIBUTES.contains(&key.as_str()))
        .cloned()
        .collect();
    for key in &ignored {
        warn!("Style {} has no attribute '{}'; ignored", tag, key);
    }

    let section = Value::Table(overrides.clone());
    let (updated, rejected) = parse_style(Some(&section), style.get(tag).clone());
    for key in rejected {
        warn!(
            "Style {} attribute '{}' has an invalid value {}; ignored",
            tag,
            key,
            overrides.get(key).map(Value::to_string).unwrap_or_default()
        );
        ignored.push(key.to_string());
    }
    *style.get_mut(tag) = updated;
    ignored
}

fn color_value((r, g, b): (u8, u8, u8)) -> Value {
    let mut table = Table::new();
    table.insert("r".into(), Value::Integer(r.into()));
    table.insert("g".into(), Value::Integer(g.into()));
    table.insert("b".into(), Value::Integer(b.into()));
    Value::Table(table)
}

fn style_value(style: &BasicTextStyle) -> Value {
    let mut table = Table::new();
    table.insert("size".into(), Value::Integer(style.size.into()));
    table.insert("beforespacing".into(), Value::Float(style.before_spacing.into()));
    table.insert("afterspacing".into(), Value::Float(style.after_spacing.into()));
    if let Some(color) = style.text_color {
        table.insert("textcolor".into(), color_value(color));
    }
    if let Some(color) = style.background_color {
        table.insert("backgroundcolor".into(), color_value(color));
    }
    if let Some(alignment) = style.alignment {
        let name = match alignment {
            TextAlignment::Left => "left",
            TextAlignment::Center => "center",
            TextAlignment::Right => "right",
            TextAlignment::Justify => "justify",
        };
        table.insert("alignment".into(), Value::String(name.into()));
    }
    if let Some(family) = &style.font_family {
        table.insert("fontfamily".into(), Value::String(family.clone()));
    }
    table.insert("bold".into(), Value::Boolean(style.bold));
    table.insert("italic".into(), Value::Boolean(style.italic));
    table.insert("underline".into(), Value::Boolean(style.underline));
    table.insert("strikethrough".into(), Value::Boolean(style.strikethrough));
    Value::Table(table)
}

fn insert_path(root: &mut Table, path: &[&str], value: Value) {
    match path {
        [] => {}
        [last] => {
            root.insert((*last).to_string(), value);
        }
        [first, rest @ ..] => {
            let entry = root
                .entry((*first).to_string())
                .or_insert_with(|| Value::Table(Table::new()));
            if let Value::Table(child) = entry {
                insert_path(child, rest, value);
            }
        }
    }
}

/// Serialises a style set back into configuration TOML.
pub fn style_to_toml(style: &StyleMatch) -> String {
    let mut root = Table::new();

    let mut margin = Table::new();
    margin.insert("top".into(), Value::Float(style.margins.top.into()));
    margin.insert("right".into(), Value::Float(style.margins.right.into()));
    margin.insert("bottom".into(), Value::Float(style.margins.bottom.into()));
    margin.insert("left".into(), Value::Float(style.margins.left.into()));
    root.insert("margin".into(), Value::Table(margin));

    let mut page = Table::new();
    match style.page.size {
        PageSize::Custom(w, h) => {
            page.insert("width".into(), Value::Float(w.into()));
            page.insert("height".into(), Value::Float(h.into()));
        }
        size => {
            let name = match size {
                PageSize::Legal => "legal",
                PageSize::A4 => "a4",
                _ => "letter",
            };
            page.insert("size".into(), Value::String(name.into()));
        }
    }
    let orientation = match style.page.orientation {
        Orientation::Portrait => "portrait",
        Orientation::Landscape => "landscape",
    };
    page.insert("orientation".into(), Value::String(orientation.into()));
    root.insert("page".into(), Value::Table(page));

    let mut report = Table::new();
    report.insert("include_toc".into(), Value::Boolean(style.options.include_toc));
    report.insert("toc_title".into(), Value::String(style.options.toc_title.clone()));
    report.insert("bullet".into(), Value::String(style.options.bullet.clone()));
    root.insert("report".into(), Value::Table(report));

    for tag in StyleTag::ALL {
        insert_path(&mut root, tag.config_path(), style_value(style.get(tag)));
    }

    toml::to_string(&Value::Table(root)).unwrap_or_default()
}

/// The built-in defaults as configuration TOML, suitable as a starting
/// `reportrc.toml`.
pub fn default_config_toml() -> String {
    style_to_toml(&StyleMatch::default())
}
