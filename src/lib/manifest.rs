//! TOML report manifests.
//!
//! A manifest describes a whole report so it can be produced from the command
//! line. It has three parts:
//!
//! - `[document]` output path, metadata (`title`, `author`, `subject`,
//!   `keywords`, `date`, `creator`), `include_toc`, `header` columns and
//!   `margins` in inches
//! - `[[style]]` one table per style override, `tag` plus any style attribute
//! - `[[block]]` the content in order, each with a `kind`
//!
//! ```toml
//! [document]
//! output = "summary.pdf"
//! title = "Model summary"
//! keywords = ["pricing", "glm"]
//!
//! [[style]]
//! tag = "Heading1"
//! size = 22
//!
//! [[block]]
//! kind = "heading"
//! level = 1
//! text = "Results"
//! bookmark = "results"
//!
//! [[block]]
//! kind = "ol"
//! style = "lower-roman"
//! items = ["Fit", "Validate"]
//! ```
//!
//! Block kinds and their keys:
//!
//! | kind | keys |
//! |------|------|
//! | `heading` | `level` (1), `text`, `name`, `bookmark` |
//! | `paragraph` | `text` |
//! | `ul` | `items`, `bullet` |
//! | `ol` | `items`, `style` (`decimal`) |
//! | `code` | `text`, `language` |
//! | `math` | `latex` |
//! | `image` | `path`, `width` (6.0), `height` (4.0) |
//! | `caption` | `text`, `width` (6.0) |
//! | `spacer` | `height` (0.25) |
//! | `page_break` | |
//! | `link` | `text`, `url` |
//! | `inner_link` | `text`, `destination` |
//! | `table` | `rows`, `index_label`, `grid`, `emphasize_header`, `emphasize_index`, `column_weights` |

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use toml::value::Table;
use toml::Value;

use crate::report::{Heading, Report};
use crate::styling::StyleMatch;
use crate::table::{LabeledTable, TableStyle};
use crate::ReportError;

/// Block kinds a manifest may use.
pub const BLOCK_KINDS: [&str; 13] = [
    "heading",
    "paragraph",
    "ul",
    "ol",
    "code",
    "math",
    "image",
    "caption",
    "spacer",
    "page_break",
    "link",
    "inner_link",
    "table",
];

const DEFAULT_IMAGE_WIDTH: f32 = 6.0;
const DEFAULT_IMAGE_HEIGHT: f32 = 4.0;
const DEFAULT_SPACER_HEIGHT: f32 = 0.25;

/// A parsed manifest, ready to be turned into a [`Report`].
#[derive(Debug, Clone)]
pub struct Manifest {
    document: Table,
    styles: Vec<Table>,
    blocks: Vec<Table>,
    base_dir: Option<PathBuf>,
}

impl Manifest {
    /// Parses manifest text. Relative image paths resolve against `base_dir`.
    pub fn parse(text: &str, base_dir: Option<&Path>) -> Result<Self, ReportError> {
        let root: Table = text
            .parse()
            .map_err(|e: toml::de::Error| ReportError::manifest_error(e.to_string(), None))?;

        let document = match root.get("document") {
            Some(Value::Table(t)) => t.clone(),
            Some(_) => return Err(ReportError::manifest_error("[document] must be a table", None)),
            None => Table::new(),
        };
        let styles = table_array(&root, "style")?;
        let blocks = table_array(&root, "block")?;
        for key in root.keys() {
            if !matches!(key.as_str(), "document" | "style" | "block") {
                warn!("Unknown manifest section '{}'; ignored", key);
            }
        }

        Ok(Self {
            document,
            styles,
            blocks,
            base_dir: base_dir.map(Path::to_path_buf),
        })
    }

    /// Reads and parses a manifest file; its directory becomes the base
    /// directory for images.
    pub fn load(path: &Path) -> Result<Self, ReportError> {
        let text =
            fs::read_to_string(path).map_err(|e| ReportError::io_error(&e, path.display().to_string()))?;
        Self::parse(&text, path.parent())
    }

    /// The `[document].output` path, if given.
    pub fn output(&self) -> Option<&str> {
        self.document.get("output").and_then(Value::as_str)
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Builds the report described by this manifest, rendered to `output`.
    pub fn to_report(&self, output: &Path, style: StyleMatch) -> Result<Report, ReportError> {
        let mut report = Report::with_style(output, style);
        if let Some(dir) = &self.base_dir {
            report.base_dir(dir);
        }

        self.apply_document(&mut report)?;
        for (i, style) in self.styles.iter().enumerate() {
            let tag = style
                .get("tag")
                .and_then(Value::as_str)
                .ok_or_else(|| ReportError::manifest_error(format!("[[style]] {} has no tag", i + 1), None))?;
            let mut overrides = style.clone();
            overrides.remove("tag");
            report.style(tag, &overrides);
        }
        for (i, block) in self.blocks.iter().enumerate() {
            add_block(&mut report, block).map_err(|e| match e {
                ReportError::ManifestError { message, block: None } => ReportError::ManifestError {
                    message,
                    block: Some(i + 1),
                },
                other => other,
            })?;
        }
        debug!("Manifest produced {} blocks", report.len());
        Ok(report)
    }

    fn apply_document(&self, report: &mut Report) -> Result<(), ReportError> {
        for (key, value) in &self.document {
            match key.as_str() {
                "output" => {}
                "include_toc" => {
                    let include = value.as_bool().ok_or_else(|| {
                        ReportError::manifest_error("include_toc must be true or false", None)
                    })?;
                    report.include_toc(include);
                }
                "keywords" => match value {
                    Value::Array(_) => {
                        report.keywords(string_list(value, "keywords")?);
                    }
                    Value::String(s) => {
                        report.set("keywords", s);
                    }
                    _ => return Err(ReportError::manifest_error("keywords must be a list or a string", None)),
                },
                "header" => {
                    report.header(string_list(value, "header")?);
                }
                "margins" => {
                    let margins = value
                        .as_table()
                        .ok_or_else(|| ReportError::manifest_error("margins must be a table", None))?;
                    let side = |name: &str| number(margins, name, 0.5);
                    report.margins(side("left")?, side("right")?, side("top")?, side("bottom")?);
                }
                _ => match value.as_str() {
                    Some(text) => {
                        report.set(key, text);
                    }
                    None => warn!("Ignoring non-text document entry '{}'", key),
                },
            }
        }
        Ok(())
    }
}

fn table_array(root: &Table, key: &str) -> Result<Vec<Table>, ReportError> {
    match root.get(key) {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                item.as_table().cloned().ok_or_else(|| {
                    ReportError::manifest_error(format!("[[{}]] entry {} is not a table", key, i + 1), None)
                })
            })
            .collect(),
        Some(_) => Err(ReportError::manifest_error(
            format!("'{}' must be an array of tables ([[{}]])", key, key),
            None,
        )),
    }
}

fn text<'a>(block: &'a Table, key: &str) -> Result<&'a str, ReportError> {
    block
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ReportError::manifest_error(format!("missing text field '{}'", key), None))
}

fn optional_text<'a>(block: &'a Table, key: &str) -> Option<&'a str> {
    block.get(key).and_then(Value::as_str)
}

fn number(block: &Table, key: &str, default: f32) -> Result<f32, ReportError> {
    match block.get(key) {
        None => Ok(default),
        Some(Value::Float(f)) => Ok(*f as f32),
        Some(Value::Integer(i)) => Ok(*i as f32),
        Some(_) => Err(ReportError::manifest_error(format!("'{}' must be a number", key), None)),
    }
}

fn flag(block: &Table, key: &str, default: bool) -> Result<bool, ReportError> {
    match block.get(key) {
        None => Ok(default),
        Some(Value::Boolean(b)) => Ok(*b),
        Some(_) => Err(ReportError::manifest_error(format!("'{}' must be true or false", key), None)),
    }
}

fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Integer(i) => Some(i.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Boolean(b) => Some(b.to_string()),
        _ => None,
    }
}

fn string_list(value: &Value, key: &str) -> Result<Vec<String>, ReportError> {
    let error = || ReportError::manifest_error(format!("'{}' must be a list of strings", key), None);
    value
        .as_array()
        .ok_or_else(error)?
        .iter()
        .map(|v| cell_text(v).ok_or_else(error))
        .collect()
}

fn items(block: &Table) -> Result<Vec<String>, ReportError> {
    let value = block
        .get("items")
        .ok_or_else(|| ReportError::manifest_error("missing list field 'items'", None))?;
    string_list(value, "items")
}

fn table_block(block: &Table) -> Result<(LabeledTable, TableStyle), ReportError> {
    let rows = block
        .get("rows")
        .and_then(Value::as_array)
        .ok_or_else(|| ReportError::manifest_error("missing list field 'rows'", None))?;
    let grid = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            string_list(row, "rows").map_err(|_| {
                ReportError::manifest_error(format!("row {} must be a list of cells", i + 1), None)
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let table = LabeledTable::from_grid(&grid)?;

    let defaults = TableStyle::default();
    let column_weights = match block.get("column_weights") {
        None => None,
        Some(value) => Some(
            value
                .as_array()
                .into_iter()
                .flatten()
                .map(|w| w.as_integer().and_then(|w| usize::try_from(w).ok()))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| {
                    ReportError::manifest_error("column_weights must be positive integers", None)
                })?,
        ),
    };
    let style = TableStyle {
        emphasize_header: flag(block, "emphasize_header", defaults.emphasize_header)?,
        emphasize_index: flag(block, "emphasize_index", defaults.emphasize_index)?,
        grid: flag(block, "grid", defaults.grid)?,
        index_label: optional_text(block, "index_label").unwrap_or_default().to_string(),
        column_weights,
    };
    Ok((table, style))
}

fn add_block(report: &mut Report, block: &Table) -> Result<(), ReportError> {
    let kind = text(block, "kind")?;
    match kind {
        "heading" => {
            let raw = block.get("level").and_then(Value::as_integer).unwrap_or(1);
            let level = u8::try_from(raw).map_err(|_| ReportError::InvalidLevel { level: raw })?;
            let mut heading = Heading::new(level, text(block, "text")?);
            if let Some(name) = optional_text(block, "name") {
                heading = heading.named(name);
            }
            if let Some(key) = optional_text(block, "bookmark") {
                heading = heading.bookmark(key);
            }
            report.add_heading(heading)?;
        }
        "paragraph" => {
            report.p(text(block, "text")?);
        }
        "ul" => {
            report.ul(items(block)?, optional_text(block, "bullet"));
        }
        "ol" => {
            report.ol(items(block)?, optional_text(block, "style").unwrap_or("decimal"))?;
        }
        "code" => {
            report.code(text(block, "text")?, optional_text(block, "language"));
        }
        "math" => {
            report.math(text(block, "latex")?);
        }
        "image" => {
            report.image(
                text(block, "path")?,
                number(block, "width", DEFAULT_IMAGE_WIDTH)?,
                number(block, "height", DEFAULT_IMAGE_HEIGHT)?,
            );
        }
        "caption" => {
            report.caption(text(block, "text")?, number(block, "width", DEFAULT_IMAGE_WIDTH)?);
        }
        "spacer" => {
            report.spacer(number(block, "height", DEFAULT_SPACER_HEIGHT)?);
        }
        "page_break" => {
            report.page_break();
        }
        "link" => {
            report.link(text(block, "text")?, text(block, "url")?);
        }
        "inner_link" => {
            report.inner_link(text(block, "text")?, text(block, "destination")?)?;
        }
        "table" => {
            let (table, style) = table_block(block)?;
            report.table(table, Some(style));
        }
        other => {
            return Err(ReportError::manifest_error(
                format!("unknown block kind '{}' (expected one of {})", other, BLOCK_KINDS.join(", ")),
                None,
            ))
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Block;

    const SAMPLE: &str = r#"
        [document]
        output = "summary.pdf"
        title = "Model summary"
        author = "Pricing"
        keywords = ["glm", "lift"]
        date = "2024-05-01"
        include_toc = true
        header = ["Model summary", "Page {page}"]
        margins = { left = 1.0, right = 1.0 }

        [[style]]
        tag = "Heading1"
        size = 24

        [[block]]
        kind = "heading"
        level = 1
        text = "Results"
        bookmark = "results"
        name = "results"

        [[block]]
        kind = "paragraph"
        text = "Fit statistics follow."

        [[block]]
        kind = "ol"
        style = "upper-alpha"
        items = ["first", "second"]

        [[block]]
        kind = "table"
        index_label = "model"
        rows = [["", "gini", "auc"], ["glm", 0.41, 0.7], ["gbm", 0.45, 0.72]]

        [[block]]
        kind = "inner_link"
        text = "back to results"
        destination = "results"

        [[block]]
        kind = "page_break"
    "#;

    #[test]
    fn test_sample_manifest() {
        let manifest = Manifest::parse(SAMPLE, None).unwrap();
        assert_eq!(manifest.output(), Some("summary.pdf"));
        assert_eq!(manifest.block_count(), 6);

        let report = manifest.to_report(Path::new("x.pdf"), StyleMatch::default()).unwrap();
        assert_eq!(report.len(), 7);
        assert_eq!(report.metadata().title.as_deref(), Some("Model summary"));
        assert_eq!(report.metadata().keywords, ["glm", "lift"]);
        assert_eq!(report.stamp_date(), "2024-05-01");
        assert_eq!(report.style_match().heading_1.size, 24);
        assert!(report.style_match().options.include_toc);
        assert!((report.style_match().margins.left - 25.4).abs() < 1e-4);
        assert!(report.references().resolve("results").is_some());
        assert!(matches!(&report.blocks()[3], Block::ListItem { marker, .. } if marker == "B. "));
        let Block::Table { table, style } = &report.blocks()[4] else {
            panic!("expected a table");
        };
        assert_eq!(table.rows()[0], ["0.41", "0.7"]);
        assert_eq!(style.index_label, "model");
    }

    #[test]
    fn test_unknown_kind_names_block() {
        let manifest = Manifest::parse(
            "[[block]]\nkind = \"paragraph\"\ntext = \"a\"\n[[block]]\nkind = \"chart\"\n",
            None,
        )
        .unwrap();
        let err = manifest.to_report(Path::new("x.pdf"), StyleMatch::default()).unwrap_err();
        assert!(matches!(err, ReportError::ManifestError { block: Some(2), .. }));
        assert!(err.to_string().contains("chart"));
    }

    #[test]
    fn test_report_errors_pass_through() {
        let manifest =
            Manifest::parse("[[block]]\nkind = \"heading\"\nlevel = 9\ntext = \"x\"\n", None).unwrap();
        assert!(matches!(
            manifest.to_report(Path::new("x.pdf"), StyleMatch::default()),
            Err(ReportError::InvalidLevel { level: 9 })
        ));

        let manifest = Manifest::parse(
            "[[block]]\nkind = \"inner_link\"\ntext = \"x\"\ndestination = \"nowhere\"\n",
            None,
        )
        .unwrap();
        assert!(matches!(
            manifest.to_report(Path::new("x.pdf"), StyleMatch::default()),
            Err(ReportError::UndefinedDestination { .. })
        ));

        let manifest = Manifest::parse(
            "[[block]]\nkind = \"table\"\nrows = [[\"\", \"a\"], [\"r\", \"1\", \"2\"]]\n",
            None,
        )
        .unwrap();
        assert!(matches!(
            manifest.to_report(Path::new("x.pdf"), StyleMatch::default()),
            Err(ReportError::InvalidTableInput { .. })
        ));
    }

    #[test]
    fn test_missing_fields() {
        let manifest = Manifest::parse("[[block]]\nkind = \"paragraph\"\n", None).unwrap();
        let err = manifest.to_report(Path::new("x.pdf"), StyleMatch::default()).unwrap_err();
        assert!(err.to_string().contains("'text'"));

        let manifest = Manifest::parse("[[block]]\ntext = \"no kind\"\n", None).unwrap();
        assert!(manifest.to_report(Path::new("x.pdf"), StyleMatch::default()).is_err());
    }

    #[test]
    fn test_invalid_toml_and_shapes() {
        assert!(matches!(
            Manifest::parse("[[block]\nkind=", None),
            Err(ReportError::ManifestError { .. })
        ));
        assert!(Manifest::parse("block = 3", None).is_err());
        assert!(Manifest::parse("document = 3", None).is_err());
    }

    #[test]
    fn test_empty_manifest() {
        let manifest = Manifest::parse("", None).unwrap();
        assert_eq!(manifest.output(), None);
        let report = manifest.to_report(Path::new("x.pdf"), StyleMatch::default()).unwrap();
        assert!(report.is_empty());
    }
}
