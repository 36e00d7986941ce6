//! Layout of report blocks into a `genpdfi_extended` document.
//!
//! The renderer walks the block buffer once, in order. Every text block is
//! surrounded by breaks sized from its style's `before_spacing` and
//! `after_spacing`, code listings are set line by line in the code font, and
//! images are sized as a fraction of the printable width. Problems that only
//! affect one element, such as a missing image file, are logged and replaced
//! by a short placeholder so the rest of the report still renders.

use std::cell::RefCell;
use std::io::Cursor;
use std::path::Path;

use genpdfi_extended::elements::{
    Break, FrameCellDecorator, Image, LinearLayout, PageBreak, Paragraph, TableLayout,
};
use genpdfi_extended::fonts::{Font, FontFamily};
use genpdfi_extended::style::{Color, Style};
use genpdfi_extended::{Alignment, Document, Element, SimplePageDecorator, Size};
use log::{debug, warn};

use crate::fonts::{self, FontConfig, ResolvedFonts};
use crate::highlighting::{self, HighlightedToken};
use crate::images::{ImageData, ImageFormat, ImageLoader};
use crate::report::Block;
use crate::styling::{BasicTextStyle, StyleMatch, MM_PER_INCH};
use crate::table::{LabeledTable, TableStyle};
use crate::ReportError;

const CODE_INDENT: &str = "    ";
const POINTS_PER_INCH: f32 = 72.0;
const MIN_IMAGE_FRACTION: f32 = 0.05;

/// Renders a block buffer with one style set.
pub struct Renderer<'a> {
    blocks: &'a [Block],
    style: &'a StyleMatch,
    fonts: ResolvedFonts,
    title: Option<&'a str>,
    header: Option<&'a [String]>,
    image_loader: RefCell<ImageLoader>,
}

impl<'a> Renderer<'a> {
    /// Loads the text and code fonts and prepares an image loader that
    /// resolves relative paths against `base_dir`.
    pub fn new(
        blocks: &'a [Block],
        style: &'a StyleMatch,
        font_config: Option<&FontConfig>,
        base_dir: Option<&Path>,
    ) -> Result<Self, ReportError> {
        let fonts = fonts::resolve_fonts(
            font_config,
            style.text.font_family.as_deref(),
            style.code.font_family.as_deref(),
        )
        .map_err(|e| ReportError::FontError {
            font_name: style
                .text
                .font_family
                .clone()
                .unwrap_or_else(|| "helvetica".to_string()),
            message: e.to_string(),
            suggestion: Some(
                "Use a built-in family (helvetica, times, courier) or add a font directory"
                    .to_string(),
            ),
        })?;

        Ok(Self {
            blocks,
            style,
            fonts,
            title: None,
            header: None,
            image_loader: RefCell::new(ImageLoader::new(base_dir)),
        })
    }

    pub fn with_title(mut self, title: Option<&'a str>) -> Self {
        self.title = title;
        self
    }

    /// Columns of the running header, shown from the second page on.
    pub fn with_header(mut self, header: Option<&'a [String]>) -> Self {
        self.header = header;
        self
    }

    /// Serialises a laid-out document to PDF bytes.
    pub fn render_to_bytes(document: Document) -> Result<Vec<u8>, ReportError> {
        let mut buffer = Cursor::new(Vec::new());
        match document.render(&mut buffer) {
            Ok(_) => Ok(buffer.into_inner()),
            Err(err) => Err(ReportError::PdfError {
                message: err.to_string(),
                path: None,
                suggestion: Some(
                    "Check that images and fonts used by the report are valid".to_string(),
                ),
            }),
        }
    }

    /// Builds the document: page geometry, margins, running header, the
    /// optional table of contents and then every block in order.
    pub fn render_into_document(&self) -> Document {
        let mut doc = Document::new(self.fonts.text.clone());
        if let Some(title) = self.title {
            doc.set_title(title);
        }
        let (width, height) = self.style.page.dimensions_mm();
        doc.set_paper_size(Size::new(width, height));

        let mut decorator = SimplePageDecorator::new();
        decorator.set_margins(genpdfi_extended::Margins::trbl(
            self.style.margins.top,
            self.style.margins.right,
            self.style.margins.bottom,
            self.style.margins.left,
        ));
        self.install_header(&mut decorator);
        doc.set_page_decorator(decorator);
        doc.set_font_size(self.style.text.size);

        let code_font = doc.add_font_family(self.fonts.code.clone());

        if self.style.options.include_toc {
            self.render_toc(&mut doc);
        }
        for block in self.blocks {
            self.render_block(&mut doc, block, code_font);
        }
        debug!("Laid out {} blocks", self.blocks.len());
        doc
    }

    fn render_block(&self, doc: &mut Document, block: &Block, code_font: FontFamily<Font>) {
        match block {
            Block::Heading { level, text, .. } => {
                let tag = block.style_tag();
                debug!("Heading level {}: {}", level, text);
                self.render_text(doc, text, self.style.get(tag));
            }
            Block::Paragraph { text } => self.render_text(doc, text, &self.style.text),
            Block::ListItem { marker, text } => {
                self.render_text(doc, &format!("{}{}", marker, text), &self.style.list_item)
            }
            Block::Code { text, language } => {
                self.render_code(doc, text, language.as_deref(), code_font)
            }
            Block::Math { latex } => self.render_math(doc, latex),
            Block::Image {
                source,
                width_in,
                height_in,
            } => self.render_image(doc, source, *width_in, *height_in),
            Block::Caption { text, width_in } => self.render_caption(doc, text, *width_in),
            Block::Spacer { height_in } => {
                doc.push(Break::new(spacer_lines(*height_in, self.style.text.size)))
            }
            Block::PageBreak => doc.push(PageBreak::new()),
            Block::InnerLink { text, destination } => {
                self.render_link(doc, text, &format!("#{}", destination))
            }
            Block::Link { text, url } => self.render_link(doc, text, url),
            Block::Table { table, style } => self.render_table(doc, table, style),
        }
    }

    fn paragraph(text: &str, style: &BasicTextStyle) -> Paragraph {
        let mut para = Paragraph::default();
        if let Some(alignment) = style.alignment {
            para.set_alignment(alignment.to_genpdfi());
        }
        para.push_styled(text.to_string(), style.to_genpdfi());
        para
    }

    fn render_text(&self, doc: &mut Document, text: &str, style: &BasicTextStyle) {
        doc.push(Break::new(style.before_spacing));
        doc.push(Self::paragraph(text, style));
        doc.push(Break::new(style.after_spacing));
    }

    fn render_link(&self, doc: &mut Document, text: &str, target: &str) {
        let link = &self.style.link;
        let mut para = Paragraph::default();
        if let Some(alignment) = link.alignment {
            para.set_alignment(alignment.to_genpdfi());
        }
        para.push_link(text.to_string(), target.to_string(), link.to_genpdfi());

        doc.push(Break::new(link.before_spacing));
        doc.push(para);
        doc.push(Break::new(link.after_spacing));
    }

    fn render_toc(&self, doc: &mut Document) {
        let entries: Vec<(u8, &str, Option<&str>)> = self
            .blocks
            .iter()
            .filter_map(|block| match block {
                Block::Heading {
                    level,
                    text,
                    destination,
                    ..
                } if *level <= 3 => Some((*level, text.as_str(), destination.as_deref())),
                _ => None,
            })
            .collect();
        if entries.is_empty() {
            debug!("No headings for a table of contents");
            return;
        }

        self.render_text(doc, &self.style.options.toc_title, &self.style.heading_2);
        let text_style = self.style.text.to_genpdfi();
        for (level, text, destination) in entries {
            let indent = CODE_INDENT.repeat(usize::from(level.saturating_sub(1)));
            let mut para = Paragraph::default();
            match destination {
                Some(key) => {
                    para.push_styled(indent, text_style);
                    para.push_link(text.to_string(), format!("#{}", key), self.style.link.to_genpdfi());
                }
                None => para.push_styled(format!("{}{}", indent, text), text_style),
            }
            doc.push(para);
        }
        doc.push(PageBreak::new());
    }

    fn render_code(
        &self,
        doc: &mut Document,
        text: &str,
        language: Option<&str>,
        code_font: FontFamily<Font>,
    ) {
        let code = &self.style.code;
        doc.push(Break::new(code.before_spacing));

        let mut lines = match language {
            Some(lang) => highlighting::highlight_lines(text, lang),
            None => highlighting::plain_lines(text),
        };
        if language.is_none() {
            if let Some((r, g, b)) = code.text_color {
                for token in lines.iter_mut().flatten() {
                    token.color = highlighting::HighlightColor::from_rgb(r, g, b);
                }
            }
        }

        let base = Style::new()
            .with_font_size(code.size)
            .with_font_override(code_font);
        for tokens in &lines {
            doc.push(Self::code_line(base, tokens));
        }

        doc.push(Break::new(code.after_spacing));
    }

    fn code_line(base: Style, tokens: &[HighlightedToken]) -> Paragraph {
        let mut para = Paragraph::default();
        para.push_styled(CODE_INDENT.to_string(), base);
        for token in tokens {
            let (r, g, b) = token.color.as_rgb_u8();
            let mut style = base.with_color(Color::Rgb(r, g, b));
            if token.bold {
                style = style.bold();
            }
            if token.italic {
                style = style.italic();
            }
            para.push_styled(token.text.clone(), style);
        }
        para
    }

    #[cfg(feature = "latex")]
    fn render_math(&self, doc: &mut Document, latex: &str) {
        let math = &self.style.math;
        let size_pt = f32::from(math.size) * 1.2;
        let element = genpdfi_extended::elements::Latex::new(latex.to_string(), size_pt)
            .with_alignment(Alignment::Center);

        doc.push(Break::new(math.before_spacing));
        doc.push(element);
        doc.push(Break::new(math.after_spacing));
    }

    #[cfg(not(feature = "latex"))]
    fn render_math(&self, doc: &mut Document, latex: &str) {
        self.render_text(doc, latex, &self.style.math);
    }

    fn image_element(data: ImageData) -> Result<Image, String> {
        match data.format {
            ImageFormat::Svg => {
                let svg = String::from_utf8(data.bytes).map_err(|e| e.to_string())?;
                Image::from_svg_string(&svg).map_err(|e| e.to_string())
            }
            _ => Image::from_reader(Cursor::new(data.bytes)).map_err(|e| e.to_string()),
        }
    }

    /// Pushes an image scaled to `width_in`. The engine keeps the aspect
    /// ratio, so `height_in` is only reported.
    fn render_image(&self, doc: &mut Document, source: &str, width_in: f32, height_in: f32) {
        let fraction = width_fraction(width_in, self.style.content_width_mm());
        debug!(
            "Image {} at {}x{} in ({:.0}% of the printable width)",
            source,
            width_in,
            height_in,
            fraction * 100.0
        );

        doc.push(Break::new(0.5));
        let loaded = self.image_loader.borrow_mut().load(source);
        match loaded.map_err(|e| e.to_string()).and_then(Self::image_element) {
            Ok(image) => doc.push(
                image
                    .resizing_page_with(fraction)
                    .with_alignment(Alignment::Center),
            ),
            Err(e) => {
                warn!("Failed to load image {}: {}", source, e);
                let style = BasicTextStyle::new(self.style.text.size, 0.0, 0.0).italic();
                doc.push(Self::paragraph(&format!("[Image not found: {}]", source), &style));
            }
        }
        doc.push(Break::new(0.5));
    }

    fn render_caption(&self, doc: &mut Document, text: &str, width_in: f32) {
        let caption = &self.style.caption;
        let pad = caption_padding(width_in, self.style.content_width_mm());

        doc.push(Break::new(caption.before_spacing));
        doc.push(
            Self::paragraph(text, caption).padded(genpdfi_extended::Margins::trbl(0.0_f32, pad, 0.0_f32, pad)),
        );
        doc.push(Break::new(caption.after_spacing));
    }

    fn render_table(&self, doc: &mut Document, table: &LabeledTable, style: &TableStyle) {
        let cell_style = &self.style.table_cell;
        let header_style = if style.emphasize_header {
            &self.style.table_header
        } else {
            cell_style
        };
        let index_style = if style.emphasize_index {
            &self.style.table_header
        } else {
            cell_style
        };

        doc.push(Break::new(cell_style.before_spacing));

        let mut layout = TableLayout::new(style.weights_for(table.columns().len()));
        layout.set_cell_decorator(FrameCellDecorator::new(style.grid, style.grid, false));

        let mut header_row = layout.row();
        header_row.push_element(Self::paragraph(&style.index_label, header_style));
        for column in table.columns() {
            header_row.push_element(Self::paragraph(column, header_style));
        }
        if let Err(e) = header_row.push() {
            warn!("Failed rendering a table header: {}", e);
            return;
        }

        for (i, (label, cells)) in table.labelled_rows().enumerate() {
            let mut row = layout.row();
            row.push_element(Self::paragraph(label, index_style));
            for value in cells {
                row.push_element(Self::paragraph(value, cell_style));
            }
            if let Err(e) = row.push() {
                warn!("Failed to push row {} of a table: {}", i + 1, e);
            }
        }

        doc.push(layout);
        doc.push(Break::new(cell_style.after_spacing));
    }

    fn install_header(&self, decorator: &mut SimplePageDecorator) {
        let Some(columns) = self.header.filter(|c| !c.is_empty()) else {
            return;
        };
        let columns = columns.to_vec();
        let style = Style::new().with_font_size(self.style.text.size.saturating_sub(2).max(6));
        decorator.set_header(move |page| page_header(&columns, page, style));
    }
}

/// Header element for `page`; empty on the first page.
fn page_header(columns: &[String], page: usize, style: Style) -> LinearLayout {
    let mut layout = LinearLayout::vertical();
    if page <= 1 {
        return layout;
    }

    let last = columns.len().saturating_sub(1);
    let mut table = TableLayout::new(vec![1; columns.len()]);
    let mut row = table.row();
    for (i, column) in columns.iter().enumerate() {
        let mut para = Paragraph::default();
        para.set_alignment(match i {
            0 => Alignment::Left,
            i if i == last => Alignment::Right,
            _ => Alignment::Center,
        });
        para.push_styled(header_text(column, page), style);
        row.push_element(para);
    }
    match row.push() {
        Ok(()) => {
            layout.push(table);
            layout.push(Break::new(1.0));
        }
        Err(e) => warn!("Failed rendering the page header: {}", e),
    }
    layout
}

pub(crate) fn header_text(column: &str, page: usize) -> String {
    column.replace("{page}", &page.to_string())
}

/// Share of the printable width taken by an element `width_in` inches wide.
pub(crate) fn width_fraction(width_in: f32, content_width_mm: f32) -> f32 {
    let fraction = width_in * MM_PER_INCH / content_width_mm;
    if fraction.is_finite() {
        fraction.clamp(MIN_IMAGE_FRACTION, 1.0)
    } else {
        1.0
    }
}

/// Horizontal padding, in mm, that centres a caption under an element
/// `width_in` inches wide.
pub(crate) fn caption_padding(width_in: f32, content_width_mm: f32) -> f32 {
    let width_mm = width_in * MM_PER_INCH;
    if width_mm.is_finite() && width_mm > 0.0 {
        ((content_width_mm - width_mm) / 2.0).max(0.0)
    } else {
        0.0
    }
}

/// Lines of body text that fill `height_in` inches.
pub(crate) fn spacer_lines(height_in: f32, font_size: u8) -> f32 {
    (height_in.max(0.0) * POINTS_PER_INCH / f32::from(font_size.max(1))).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::references::ReferenceId;

    fn render(blocks: &[Block], style: &StyleMatch) -> Vec<u8> {
        let renderer = Renderer::new(blocks, style, None, None).unwrap();
        let doc = renderer.render_into_document();
        Renderer::render_to_bytes(doc).unwrap()
    }

    fn heading(level: u8, text: &str, destination: Option<&str>) -> Block {
        Block::Heading {
            level,
            text: text.to_string(),
            id: ReferenceId::new(),
            destination: destination.map(str::to_string),
        }
    }

    #[test]
    fn test_render_empty_document() {
        let bytes = render(&[], &StyleMatch::default());
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn test_render_text_blocks() {
        let blocks = vec![
            heading(1, "Summary", Some("summary")),
            Block::Paragraph {
                text: "Body text".into(),
            },
            Block::ListItem {
                marker: "1. ".into(),
                text: "first".into(),
            },
            Block::Spacer { height_in: 0.5 },
            Block::InnerLink {
                text: "back to summary".into(),
                destination: "summary".into(),
            },
            Block::Link {
                text: "docs".into(),
                url: "https://example.com".into(),
            },
            Block::Caption {
                text: "Figure 1".into(),
                width_in: 4.0,
            },
            Block::PageBreak,
            heading(2, "Next page", None),
        ];
        let bytes = render(&blocks, &StyleMatch::default());
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn test_render_code_and_math() {
        let blocks = vec![
            Block::Code {
                text: "fn main() {\n    println!(\"hi\");\n}\n".into(),
                language: Some("rust".into()),
            },
            Block::Code {
                text: "plain\n\nlisting".into(),
                language: None,
            },
            Block::Math {
                latex: "E = mc^2".into(),
            },
        ];
        assert!(render(&blocks, &StyleMatch::default()).starts_with(b"%PDF-"));
    }

    #[test]
    fn test_render_table() {
        let table =
            LabeledTable::from_grid(&[vec!["model", "gini"], vec!["glm", "0.40"], vec!["gbm", "0.45"]])
                .unwrap();
        let plain = TableStyle {
            emphasize_header: false,
            emphasize_index: false,
            grid: false,
            ..TableStyle::default()
        };
        let blocks = vec![
            Block::Table {
                table: table.clone(),
                style: TableStyle::default(),
            },
            Block::Table { table, style: plain },
        ];
        assert!(render(&blocks, &StyleMatch::default()).starts_with(b"%PDF-"));
    }

    #[test]
    fn test_missing_image_renders_placeholder() {
        let blocks = vec![Block::Image {
            source: "/definitely/not/here.png".into(),
            width_in: 3.0,
            height_in: 2.0,
        }];
        assert!(render(&blocks, &StyleMatch::default()).starts_with(b"%PDF-"));
    }

    #[test]
    fn test_toc_and_header() {
        let mut style = StyleMatch::default();
        style.options.include_toc = true;
        let blocks = vec![
            heading(1, "One", Some("one")),
            heading(2, "Two", None),
            heading(4, "Deep", None),
            Block::PageBreak,
            Block::Paragraph {
                text: "page two".into(),
            },
        ];
        let header = vec!["Report".to_string(), "Page {page}".to_string()];
        let renderer = Renderer::new(&blocks, &style, None, None)
            .unwrap()
            .with_title(Some("Title"))
            .with_header(Some(&header));
        let bytes = Renderer::render_to_bytes(renderer.render_into_document()).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn test_header_text_substitutes_page() {
        assert_eq!(header_text("Page {page}", 3), "Page 3");
        assert_eq!(header_text("Static", 9), "Static");
    }

    #[test]
    fn test_width_fraction() {
        assert!((width_fraction(3.75, 190.5) - 0.5).abs() < 1e-4);
        assert_eq!(width_fraction(100.0, 190.5), 1.0);
        assert_eq!(width_fraction(0.0, 190.5), MIN_IMAGE_FRACTION);
        assert_eq!(width_fraction(f32::NAN, 190.5), 1.0);
    }

    #[test]
    fn test_caption_padding() {
        assert!((caption_padding(5.0, 190.5) - 31.75).abs() < 1e-3);
        assert_eq!(caption_padding(20.0, 190.5), 0.0);
        assert_eq!(caption_padding(0.0, 190.5), 0.0);
    }

    #[test]
    fn test_spacer_lines() {
        assert!((spacer_lines(1.0, 12) - 6.0).abs() < 1e-4);
        assert_eq!(spacer_lines(-1.0, 12), 0.0);
    }
}
