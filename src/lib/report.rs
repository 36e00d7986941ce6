//! The report builder.
//!
//! [`Report`] collects content blocks in order and renders them when
//! [`Report::build`] or [`Report::to_bytes`] is called. Content operations
//! return `&mut Self` so calls can be chained; operations that validate their
//! input return a `Result` and append nothing when they fail.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use log::{debug, info, warn};
use tempfile::TempDir;
use uuid::Uuid;

use crate::config::{self, ConfigSource};
use crate::fonts::FontConfig;
use crate::metadata::{self, DocumentMetadata};
use crate::numbering::generate;
use crate::pdf::Renderer;
use crate::references::{ReferenceId, ReferenceTable};
use crate::styling::{BasicTextStyle, Margins, Orientation, PageSize, StyleMatch, StyleTag};
use crate::table::{LabeledTable, TableStyle};
use crate::util::sorted_unique;
use crate::ReportError;

/// One content element of a report, in the order it was appended.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading {
        level: u8,
        text: String,
        id: ReferenceId,
        /// Bookmark key that inner links can target.
        destination: Option<String>,
    },
    Paragraph {
        text: String,
    },
    /// A list entry; `marker` already carries its trailing space.
    ListItem {
        marker: String,
        text: String,
    },
    Code {
        text: String,
        language: Option<String>,
    },
    Math {
        latex: String,
    },
    /// An image file or URL, sized in inches.
    Image {
        source: String,
        width_in: f32,
        height_in: f32,
    },
    Caption {
        text: String,
        width_in: f32,
    },
    Spacer {
        height_in: f32,
    },
    PageBreak,
    InnerLink {
        text: String,
        destination: String,
    },
    Link {
        text: String,
        url: String,
    },
    Table {
        table: LabeledTable,
        style: TableStyle,
    },
}

impl Block {
    /// The style the block is set in. Tables mix two styles and report the
    /// cell style.
    pub fn style_tag(&self) -> StyleTag {
        match self {
            Block::Heading { level, .. } => StyleTag::heading(*level).unwrap_or(StyleTag::Heading6),
            Block::Paragraph { .. } | Block::Spacer { .. } | Block::PageBreak => StyleTag::Normal,
            Block::Image { .. } => StyleTag::Normal,
            Block::ListItem { .. } => StyleTag::ListItem,
            Block::Code { .. } => StyleTag::Code,
            Block::Math { .. } => StyleTag::Math,
            Block::Caption { .. } => StyleTag::Caption,
            Block::InnerLink { .. } | Block::Link { .. } => StyleTag::Hyperlink,
            Block::Table { .. } => StyleTag::TableCell,
        }
    }
}

/// Describes a heading before it is added with [`Report::add_heading`].
#[derive(Debug, Clone, PartialEq)]
pub struct Heading {
    level: u8,
    text: String,
    name: Option<String>,
    id: Option<ReferenceId>,
    bookmark: Option<String>,
}

impl Heading {
    pub fn new(level: u8, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
            name: None,
            id: None,
            bookmark: None,
        }
    }

    /// Binds a reference name to the heading.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Uses an explicit id instead of a fresh one.
    pub fn with_id(mut self, id: ReferenceId) -> Self {
        self.id = Some(id);
        self
    }

    /// Registers `key` as a destination for inner links.
    pub fn bookmark(mut self, key: impl Into<String>) -> Self {
        self.bookmark = Some(key.into());
        self
    }
}

/// A report under construction.
///
/// Cloning a report copies its buffer, reference tables, metadata and styles.
/// Plot files live in a scratch directory shared by clones and removed when
/// the last report holding it is built or dropped.
#[derive(Clone)]
pub struct Report {
    path: PathBuf,
    style: StyleMatch,
    blocks: Vec<Block>,
    references: ReferenceTable,
    metadata: DocumentMetadata,
    header: Option<Vec<String>>,
    font_config: Option<FontConfig>,
    base_dir: Option<PathBuf>,
    scratch: Option<Arc<TempDir>>,
}

impl fmt::Debug for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Report")
            .field("path", &self.path)
            .field("blocks", &self.blocks.len())
            .field("references", &self.references.len())
            .field("title", &self.metadata.title)
            .finish()
    }
}

impl Report {
    /// A report with the default style, rendered to `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_style(path, StyleMatch::default())
    }

    pub fn with_style(path: impl AsRef<Path>, style: StyleMatch) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            style,
            blocks: Vec::new(),
            references: ReferenceTable::new(),
            metadata: DocumentMetadata::default(),
            header: None,
            font_config: None,
            base_dir: None,
            scratch: None,
        }
    }

    /// A report styled from a configuration source. Invalid configuration
    /// falls back to the defaults.
    pub fn from_config(path: impl AsRef<Path>, source: ConfigSource) -> Self {
        Self::with_style(path, config::load_config_from_source(source))
    }

    fn push(&mut self, block: Block) -> usize {
        self.blocks.push(block);
        self.blocks.len() - 1
    }

    // Headings

    /// Appends a heading of `level` with a fresh reference id.
    pub fn heading(&mut self, level: u8, text: &str) -> Result<&mut Self, ReportError> {
        self.add_heading(Heading::new(level, text))
    }

    /// Appends a heading, registering its reference and bookmark.
    ///
    /// The level, id, name and bookmark are all checked before anything is
    /// appended, so a rejected heading leaves the report unchanged.
    pub fn add_heading(&mut self, heading: Heading) -> Result<&mut Self, ReportError> {
        if StyleTag::heading(heading.level).is_none() {
            return Err(ReportError::InvalidLevel {
                level: heading.level.into(),
            });
        }
        let id = heading.id.unwrap_or_default();
        self.references.check(id, heading.name.as_deref())?;
        if let Some(key) = &heading.bookmark {
            self.references.check_destination(key)?;
        }

        let index = self.push(Block::Heading {
            level: heading.level,
            text: heading.text,
            id,
            destination: heading.bookmark.clone(),
        });
        self.references.insert(id, heading.name.as_deref(), index);
        if let Some(key) = heading.bookmark {
            self.references.add_destination(&key)?;
        }
        debug!("Heading {} registered as {}", index, id);
        Ok(self)
    }

    fn fixed_heading(&mut self, level: u8, text: &str) -> &mut Self {
        let id = ReferenceId::new();
        let index = self.push(Block::Heading {
            level,
            text: text.to_string(),
            id,
            destination: None,
        });
        self.references.insert(id, None, index);
        self
    }

    pub fn h1(&mut self, text: &str) -> &mut Self {
        self.fixed_heading(1, text)
    }

    pub fn h2(&mut self, text: &str) -> &mut Self {
        self.fixed_heading(2, text)
    }

    pub fn h3(&mut self, text: &str) -> &mut Self {
        self.fixed_heading(3, text)
    }

    pub fn h4(&mut self, text: &str) -> &mut Self {
        self.fixed_heading(4, text)
    }

    pub fn h5(&mut self, text: &str) -> &mut Self {
        self.fixed_heading(5, text)
    }

    pub fn h6(&mut self, text: &str) -> &mut Self {
        self.fixed_heading(6, text)
    }

    // Body content

    /// Appends a paragraph of body text.
    pub fn p(&mut self, text: &str) -> &mut Self {
        self.push(Block::Paragraph {
            text: text.to_string(),
        });
        self
    }

    pub fn text(&mut self, text: &str) -> &mut Self {
        self.p(text)
    }

    pub fn paragraph(&mut self, text: &str) -> &mut Self {
        self.p(text)
    }

    /// Appends one bulleted item per entry. Without a bullet the configured
    /// report bullet is used.
    pub fn ul<I, S>(&mut self, items: I, bullet: Option<&str>) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let bullet = bullet
            .map(str::to_string)
            .unwrap_or_else(|| self.style.options.bullet.clone());
        for item in items {
            self.push(Block::ListItem {
                marker: format!("{} ", bullet),
                text: item.into(),
            });
        }
        self
    }

    pub fn bullets<I, S>(&mut self, items: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ul(items, None)
    }

    /// Appends one numbered item per entry, labelled in `number_style`.
    ///
    /// Numbering restarts at 1 on every call. An unknown style, or a list
    /// longer than the style can label, appends nothing.
    pub fn ol<I, S>(&mut self, items: I, number_style: &str) -> Result<&mut Self, ReportError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items: Vec<String> = items.into_iter().map(Into::into).collect();
        let labels = generate(items.len(), number_style)?;
        for (label, text) in labels.zip(items) {
            self.push(Block::ListItem {
                marker: format!("{}. ", label),
                text,
            });
        }
        Ok(self)
    }

    /// Appends a code listing, highlighted when a language is given.
    pub fn code(&mut self, text: &str, language: Option<&str>) -> &mut Self {
        self.push(Block::Code {
            text: text.to_string(),
            language: language.map(str::to_string),
        });
        self
    }

    /// Appends display math written in LaTeX.
    pub fn math(&mut self, latex: &str) -> &mut Self {
        self.push(Block::Math {
            latex: latex.to_string(),
        });
        self
    }

    /// Appends an image. Relative paths resolve against the base directory
    /// when one is set.
    pub fn image(&mut self, source: &str, width_in: f32, height_in: f32) -> &mut Self {
        self.push(Block::Image {
            source: source.to_string(),
            width_in,
            height_in,
        });
        self
    }

    /// Renders a plot to SVG and appends it as an image.
    ///
    /// The markup is stored as `temp_plot_<uuid>.svg` in the report's scratch
    /// directory. A failing closure surfaces as [`ReportError::PlotError`]
    /// and appends nothing.
    pub fn plot<F, E>(&mut self, render: F, width_in: f32, height_in: f32) -> Result<&mut Self, ReportError>
    where
        F: FnOnce() -> Result<String, E>,
        E: fmt::Display,
    {
        let svg = render().map_err(|e| ReportError::PlotError {
            message: e.to_string(),
        })?;
        if !svg.contains("<svg") {
            return Err(ReportError::PlotError {
                message: "the plot did not produce SVG markup".to_string(),
            });
        }

        let dir = self.scratch_dir()?;
        let file = dir.path().join(format!("temp_plot_{}.svg", Uuid::new_v4()));
        fs::write(&file, svg).map_err(|e| ReportError::PlotError {
            message: format!("could not write {}: {}", file.display(), e),
        })?;
        debug!("Plot written to {}", file.display());

        self.push(Block::Image {
            source: file.to_string_lossy().into_owned(),
            width_in,
            height_in,
        });
        Ok(self)
    }

    /// Appends a centred caption for an element `width_in` inches wide.
    pub fn caption(&mut self, text: &str, width_in: f32) -> &mut Self {
        self.push(Block::Caption {
            text: text.to_string(),
            width_in,
        });
        self
    }

    pub fn spacer(&mut self, height_in: f32) -> &mut Self {
        self.push(Block::Spacer { height_in });
        self
    }

    pub fn page_break(&mut self) -> &mut Self {
        self.push(Block::PageBreak);
        self
    }

    /// Appends a link to a heading bookmark registered earlier.
    pub fn inner_link(&mut self, text: &str, destination: &str) -> Result<&mut Self, ReportError> {
        if !self.references.has_destination(destination) {
            return Err(ReportError::UndefinedDestination {
                destination: destination.to_string(),
            });
        }
        self.push(Block::InnerLink {
            text: text.to_string(),
            destination: destination.to_string(),
        });
        Ok(self)
    }

    /// Appends an external hyperlink.
    pub fn link(&mut self, text: &str, url: &str) -> &mut Self {
        self.push(Block::Link {
            text: text.to_string(),
            url: url.to_string(),
        });
        self
    }

    pub fn table(&mut self, table: LabeledTable, style: Option<TableStyle>) -> &mut Self {
        self.push(Block::Table {
            table,
            style: style.unwrap_or_default(),
        });
        self
    }

    /// Appends a table parsed from a grid whose first row holds the column
    /// labels and whose first column holds the row labels.
    pub fn table_from_rows<S: AsRef<str>>(&mut self, rows: &[Vec<S>]) -> Result<&mut Self, ReportError> {
        let table = LabeledTable::from_grid(rows)?;
        Ok(self.table(table, None))
    }

    // Metadata

    pub fn title(&mut self, title: &str) -> &mut Self {
        self.metadata.title = Some(title.to_string());
        self
    }

    pub fn author(&mut self, author: &str) -> &mut Self {
        self.metadata.author = Some(author.to_string());
        self
    }

    pub fn subject(&mut self, subject: &str) -> &mut Self {
        self.metadata.subject = Some(subject.to_string());
        self
    }

    /// Sets the keywords; duplicates are dropped and the rest sorted.
    pub fn keywords<I, S>(&mut self, keywords: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metadata.keywords = sorted_unique(keywords.into_iter().map(Into::into));
        self
    }

    pub fn creator(&mut self, creator: &str) -> &mut Self {
        self.metadata.creator = creator.to_string();
        self
    }

    /// Sets the document date; `None` means today.
    pub fn date(&mut self, date: Option<NaiveDate>) -> &mut Self {
        self.metadata.date = date.unwrap_or_else(|| Local::now().date_naive());
        self
    }

    /// The stored document date as `YYYY-MM-DD`.
    pub fn stamp_date(&self) -> String {
        self.metadata.date_string()
    }

    /// Sets a metadata field by name. Unknown keys are logged and ignored.
    pub fn set(&mut self, key: &str, value: &str) -> &mut Self {
        self.metadata.set(key, value);
        self
    }

    // Styling

    /// Applies TOML attribute overrides to the style named `tag`.
    ///
    /// An unknown tag or attribute is logged and ignored.
    pub fn style(&mut self, tag: &str, overrides: &toml::value::Table) -> &mut Self {
        match tag.parse::<StyleTag>() {
            Ok(tag) => {
                config::apply_style_overrides(&mut self.style, tag, overrides);
            }
            Err(name) => warn!(
                "Unknown style tag '{}' (expected one of {}); ignored",
                name,
                StyleTag::ALL.map(|t| t.as_str()).join(", ")
            ),
        }
        self
    }

    /// Edits the style of `tag` in place.
    pub fn style_with(&mut self, tag: StyleTag, edit: impl FnOnce(&mut BasicTextStyle)) -> &mut Self {
        edit(self.style.get_mut(tag));
        self
    }

    /// Sets the page margins, in inches.
    pub fn margins(&mut self, left: f32, right: f32, top: f32, bottom: f32) -> &mut Self {
        self.style.margins = Margins::from_inches(left, right, top, bottom);
        self
    }

    pub fn page_size(&mut self, size: PageSize) -> &mut Self {
        self.style.page.size = size;
        self
    }

    pub fn orientation(&mut self, orientation: Orientation) -> &mut Self {
        self.style.page.orientation = orientation;
        self
    }

    /// Sets a running header shown on every page after the first. `{page}`
    /// in a column is replaced by the page number. No columns clears it.
    pub fn header<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        self.header = if columns.is_empty() { None } else { Some(columns) };
        self
    }

    /// Prepends a table of contents listing headings of level 1 to 3.
    pub fn include_toc(&mut self, include: bool) -> &mut Self {
        self.style.options.include_toc = include;
        self
    }

    pub fn fonts(&mut self, font_config: FontConfig) -> &mut Self {
        self.font_config = Some(font_config);
        self
    }

    /// Directory that relative image paths resolve against.
    pub fn base_dir(&mut self, dir: impl AsRef<Path>) -> &mut Self {
        self.base_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Changes the output path.
    pub fn output(&mut self, path: impl AsRef<Path>) -> &mut Self {
        self.path = path.as_ref().to_path_buf();
        self
    }

    // Copying and accessors

    /// A clone of this report that renders to `<stem>-COPY.pdf` beside the
    /// original.
    pub fn copy(&self) -> Report {
        let mut copy = self.clone();
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "report".to_string());
        copy.path = self.path.with_file_name(format!("{}-COPY.pdf", stem));
        copy
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn references(&self) -> &ReferenceTable {
        &self.references
    }

    pub fn metadata(&self) -> &DocumentMetadata {
        &self.metadata
    }

    pub fn style_match(&self) -> &StyleMatch {
        &self.style
    }

    pub fn header_columns(&self) -> Option<&[String]> {
        self.header.as_deref()
    }

    /// The plot scratch directory, once a plot has been added.
    pub fn scratch_path(&self) -> Option<&Path> {
        self.scratch.as_deref().map(TempDir::path)
    }

    fn scratch_dir(&mut self) -> Result<Arc<TempDir>, ReportError> {
        if let Some(dir) = &self.scratch {
            return Ok(Arc::clone(dir));
        }
        let dir = tempfile::Builder::new()
            .prefix("predictables-report-")
            .tempdir()
            .map_err(|e| ReportError::PlotError {
                message: format!("could not create a scratch directory: {}", e),
            })?;
        let dir = Arc::new(dir);
        self.scratch = Some(Arc::clone(&dir));
        Ok(dir)
    }

    fn release_scratch(&mut self) {
        let Some(scratch) = self.scratch.take() else {
            return;
        };
        match Arc::try_unwrap(scratch) {
            Ok(dir) => {
                let path = dir.path().to_path_buf();
                match dir.close() {
                    Ok(()) => debug!("Removed plot scratch directory {}", path.display()),
                    Err(e) => warn!(
                        "Could not remove plot scratch directory {}: {}",
                        path.display(),
                        e
                    ),
                }
            }
            Err(_) => debug!("Plot scratch directory is still used by a copy"),
        }
    }

    // Rendering

    fn render_pdf(&self) -> Result<Vec<u8>, ReportError> {
        let renderer = Renderer::new(
            &self.blocks,
            &self.style,
            self.font_config.as_ref(),
            self.base_dir.as_deref(),
        )?
        .with_title(self.metadata.title.as_deref())
        .with_header(self.header.as_deref());

        let document = renderer.render_into_document();
        let bytes = Renderer::render_to_bytes(document)?;
        metadata::stamp(&bytes, &self.metadata)
    }

    fn write_pdf(&self, bytes: &[u8]) -> Result<PathBuf, ReportError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                return Err(ReportError::IoError {
                    message: "Output directory does not exist".to_string(),
                    path: Some(parent.display().to_string()),
                    suggestion: Some(format!(
                        "Create the directory first: mkdir -p {}",
                        parent.display()
                    )),
                });
            }
        }
        fs::write(&self.path, bytes)
            .map_err(|e| ReportError::io_error(&e, self.path.display().to_string()))?;
        info!("Wrote {} ({} bytes)", self.path.display(), bytes.len());
        Ok(self.path.clone())
    }

    /// Renders the report to its output path and returns that path.
    ///
    /// The plot scratch directory is removed afterwards, also when rendering
    /// fails.
    pub fn build(mut self) -> Result<PathBuf, ReportError> {
        let result = self.render_pdf().and_then(|bytes| self.write_pdf(&bytes));
        self.release_scratch();
        result
    }

    /// Renders the report to memory.
    pub fn to_bytes(mut self) -> Result<Vec<u8>, ReportError> {
        let result = self.render_pdf();
        self.release_scratch();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> Report {
        Report::new("test_report.pdf")
    }

    #[test]
    fn test_report_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Report>();
    }

    #[test]
    fn test_heading_levels() {
        let mut r = report();
        r.heading(1, "One").unwrap().heading(6, "Six").unwrap();
        assert_eq!(r.len(), 2);

        for level in [0, 7] {
            let err = r.heading(level, "bad").unwrap_err();
            assert!(matches!(err, ReportError::InvalidLevel { level: l } if l == i64::from(level)));
        }
        assert_eq!(r.len(), 2);
        assert_eq!(r.references().len(), 2);
    }

    #[test]
    fn test_heading_registers_id_as_display_name() {
        let mut r = report();
        r.h2("Method");
        let Block::Heading { id, .. } = &r.blocks()[0] else {
            panic!("expected a heading");
        };
        let record = r.references().record(id).unwrap();
        assert_eq!(record.display_name, id.to_string());
        assert_eq!(record.element, 0);
    }

    #[test]
    fn test_named_heading_duplicate_leaves_report_unchanged() {
        let mut r = report();
        r.add_heading(Heading::new(1, "Intro").named("intro")).unwrap();
        let first = r.references().resolve("intro").unwrap();

        let err = r
            .add_heading(Heading::new(2, "Again").named("intro"))
            .unwrap_err();
        assert!(matches!(err, ReportError::DuplicateName { .. }));
        assert_eq!(r.len(), 1);
        assert_eq!(r.references().resolve("intro"), Some(first));
    }

    #[test]
    fn test_explicit_id_reuse_rejected() {
        let mut r = report();
        let id = ReferenceId::new();
        r.add_heading(Heading::new(1, "A").with_id(id)).unwrap();
        assert!(matches!(
            r.add_heading(Heading::new(1, "B").with_id(id)),
            Err(ReportError::DuplicateReference { .. })
        ));
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn test_inner_link_needs_registered_destination() {
        let mut r = report();
        assert!(matches!(
            r.inner_link("see results", "results"),
            Err(ReportError::UndefinedDestination { .. })
        ));
        assert!(r.is_empty());

        r.add_heading(Heading::new(2, "Results").bookmark("results"))
            .unwrap();
        r.inner_link("see results", "results").unwrap();
        assert_eq!(r.len(), 2);
        assert!(matches!(
            r.add_heading(Heading::new(2, "More").bookmark("results")),
            Err(ReportError::DuplicateDestination { .. })
        ));
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn test_ordered_list_markers() {
        let mut r = report();
        r.ol(["a", "b", "c", "d"], "upper-roman").unwrap();
        let markers: Vec<&str> = r
            .blocks()
            .iter()
            .filter_map(|b| match b {
                Block::ListItem { marker, .. } => Some(marker.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(markers, ["I. ", "II. ", "III. ", "IV. "]);

        r.ol(["x"], "lower-alpha").unwrap();
        assert!(matches!(&r.blocks()[4], Block::ListItem { marker, .. } if marker == "a. "));
    }

    #[test]
    fn test_ordered_list_invalid_style_appends_nothing() {
        let mut r = report();
        let err = r.ol(["a"], "greek").unwrap_err();
        assert!(matches!(err, ReportError::Numbering(_)));
        assert!(r.is_empty());
    }

    #[test]
    fn test_unordered_list_bullets() {
        let mut r = report();
        r.bullets(vec!["one", "two"]).ul(["three"], Some("-"));
        assert_eq!(r.len(), 3);
        assert!(matches!(&r.blocks()[0], Block::ListItem { marker, .. } if marker == "\u{2022} "));
        assert!(matches!(&r.blocks()[2], Block::ListItem { marker, .. } if marker == "- "));
    }

    #[test]
    fn test_metadata_does_not_touch_buffer() {
        let mut r = report();
        r.title("T")
            .author("A")
            .subject("S")
            .keywords(["k2", "k1", "k2"])
            .set("creator", "me")
            .set("nonsense", "x");
        assert!(r.is_empty());
        assert_eq!(r.metadata().title.as_deref(), Some("T"));
        assert_eq!(r.metadata().creator, "me");
        assert_eq!(r.metadata().keywords, ["k1", "k2"]);
        assert_eq!(r.stamp_date(), Local::now().format("%Y-%m-%d").to_string());

        r.date(NaiveDate::from_ymd_opt(2024, 1, 31));
        assert_eq!(r.stamp_date(), "2024-01-31");
        r.date(None);
        assert_eq!(r.stamp_date(), Local::now().format("%Y-%m-%d").to_string());
    }

    #[test]
    fn test_copy_targets_copy_path_and_is_independent() {
        let mut r = Report::new("out/summary.pdf");
        r.h1("Title");
        let mut copy = r.copy();
        assert_eq!(copy.path(), Path::new("out/summary-COPY.pdf"));
        copy.p("only in the copy");
        assert_eq!(r.len(), 1);
        assert_eq!(copy.len(), 2);
        assert_eq!(copy.references().len(), 1);
    }

    #[test]
    fn test_plot_writes_scratch_file() {
        let mut r = report();
        r.plot(
            || Ok::<_, String>("<svg xmlns=\"http://www.w3.org/2000/svg\"/>".to_string()),
            6.0,
            4.0,
        )
        .unwrap();
        let Block::Image { source, .. } = &r.blocks()[0] else {
            panic!("expected an image");
        };
        let file = Path::new(source);
        assert!(file.is_file());
        let name = file.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("temp_plot_") && name.ends_with(".svg"));
        assert_eq!(file.parent(), r.scratch_path());
    }

    #[test]
    fn test_plot_failure_appends_nothing() {
        let mut r = report();
        let err = r.plot(|| Err("no data"), 6.0, 4.0).unwrap_err();
        assert!(matches!(err, ReportError::PlotError { ref message } if message == "no data"));
        assert!(matches!(
            r.plot(|| Ok::<_, String>("plain text".into()), 6.0, 4.0),
            Err(ReportError::PlotError { .. })
        ));
        assert!(r.is_empty());
    }

    #[test]
    fn test_table_from_rows() {
        let mut r = report();
        r.table_from_rows(&[vec!["", "x"], vec!["a", "1"]]).unwrap();
        assert!(matches!(
            r.table_from_rows(&[vec!["", "x"], vec!["a", "1", "2"]]),
            Err(ReportError::InvalidTableInput { .. })
        ));
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn test_style_overrides() {
        let mut r = report();
        let overrides: toml::value::Table = "size = 30\nbold = true\nsparkle = 1".parse().unwrap();
        r.style("Heading1", &overrides);
        assert_eq!(r.style_match().heading_1.size, 30);

        let before = r.style_match().clone();
        r.style("NoSuchTag", &overrides);
        assert_eq!(r.style_match(), &before);

        r.style_with(StyleTag::Caption, |s| s.size = 8);
        assert_eq!(r.style_match().caption.size, 8);
    }

    #[test]
    fn test_margins_in_inches() {
        let mut r = report();
        r.margins(1.0, 1.0, 0.5, 0.5);
        assert!((r.style_match().margins.left - 25.4).abs() < 1e-4);
        assert!((r.style_match().margins.top - 12.7).abs() < 1e-4);
    }

    #[test]
    fn test_header_columns() {
        let mut r = report();
        r.header(["Report", "Page {page}"]);
        assert_eq!(r.header_columns().unwrap().len(), 2);
        r.header(Vec::<String>::new());
        assert!(r.header_columns().is_none());
    }

    #[test]
    fn test_block_style_tags() {
        let mut r = report();
        r.h3("h").code("x", None).caption("c", 3.0);
        let tags: Vec<StyleTag> = r.blocks().iter().map(Block::style_tag).collect();
        assert_eq!(tags, [StyleTag::Heading3, StyleTag::Code, StyleTag::Caption]);
    }
}
