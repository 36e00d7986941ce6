//! Style model for report elements.
//!
//! Every kind of element is drawn with one [`BasicTextStyle`], selected by a
//! [`StyleTag`]. [`StyleMatch`] holds the full set together with page
//! geometry and report-wide options; it is what `config` parses TOML into
//! and what the renderer reads from.

use std::fmt;
use std::str::FromStr;

/// Millimetres per inch, for the inch-based builder API.
pub const MM_PER_INCH: f32 = 25.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlignment {
    Left,
    Center,
    Right,
    Justify,
}

impl TextAlignment {
    pub fn to_genpdfi(self) -> genpdfi_extended::Alignment {
        match self {
            TextAlignment::Left | TextAlignment::Justify => genpdfi_extended::Alignment::Left,
            TextAlignment::Center => genpdfi_extended::Alignment::Center,
            TextAlignment::Right => genpdfi_extended::Alignment::Right,
        }
    }
}

/// Visual attributes of one element kind.
///
/// Spacing is measured in lines of the body font, sizes in points, colours
/// as RGB triples.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicTextStyle {
    pub size: u8,
    pub before_spacing: f32,
    pub after_spacing: f32,
    pub text_color: Option<(u8, u8, u8)>,
    pub background_color: Option<(u8, u8, u8)>,
    pub alignment: Option<TextAlignment>,
    pub font_family: Option<String>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
}

impl BasicTextStyle {
    pub fn new(size: u8, before_spacing: f32, after_spacing: f32) -> Self {
        Self {
            size,
            before_spacing,
            after_spacing,
            ..Self::default()
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn italic(mut self) -> Self {
        self.italic = true;
        self
    }

    pub fn color(mut self, rgb: (u8, u8, u8)) -> Self {
        self.text_color = Some(rgb);
        self
    }

    pub fn aligned(mut self, alignment: TextAlignment) -> Self {
        self.alignment = Some(alignment);
        self
    }

    pub fn family(mut self, family: &str) -> Self {
        self.font_family = Some(family.to_string());
        self
    }

    /// Engine style for text set in this style. Font family overrides are
    /// applied by the renderer, which owns the loaded fonts.
    pub fn to_genpdfi(&self) -> genpdfi_extended::style::Style {
        let mut style = genpdfi_extended::style::Style::new().with_font_size(self.size);
        if self.bold {
            style = style.bold();
        }
        if self.italic {
            style = style.italic();
        }
        if let Some((r, g, b)) = self.text_color {
            style = style.with_color(genpdfi_extended::style::Color::Rgb(r, g, b));
        }
        style
    }
}

impl Default for BasicTextStyle {
    fn default() -> Self {
        Self {
            size: 11,
            before_spacing: 0.0,
            after_spacing: 0.5,
            text_color: None,
            background_color: None,
            alignment: None,
            font_family: None,
            bold: false,
            italic: false,
            underline: false,
            strikethrough: false,
        }
    }
}

/// Page margins in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Margins {
    /// Builds margins from inches, in the builder's `(left, right, top, bottom)` order.
    pub fn from_inches(left: f32, right: f32, top: f32, bottom: f32) -> Self {
        Self {
            top: top * MM_PER_INCH,
            right: right * MM_PER_INCH,
            bottom: bottom * MM_PER_INCH,
            left: left * MM_PER_INCH,
        }
    }
}

impl Default for Margins {
    fn default() -> Self {
        Self::from_inches(0.5, 0.5, 0.5, 0.5)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PageSize {
    Letter,
    Legal,
    A4,
    /// Width and height in millimetres
    Custom(f32, f32),
}

impl PageSize {
    /// Portrait dimensions in millimetres.
    pub fn dimensions_mm(&self) -> (f32, f32) {
        match self {
            PageSize::Letter => (215.9, 279.4),
            PageSize::Legal => (215.9, 355.6),
            PageSize::A4 => (210.0, 297.0),
            PageSize::Custom(w, h) => (*w, *h),
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "letter" => Some(PageSize::Letter),
            "legal" => Some(PageSize::Legal),
            "a4" => Some(PageSize::A4),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Page geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSetup {
    pub size: PageSize,
    pub orientation: Orientation,
}

impl PageSetup {
    /// Oriented page width and height in millimetres.
    pub fn dimensions_mm(&self) -> (f32, f32) {
        let (w, h) = self.size.dimensions_mm();
        match self.orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        }
    }
}

impl Default for PageSetup {
    fn default() -> Self {
        Self {
            size: PageSize::Letter,
            orientation: Orientation::Portrait,
        }
    }
}

/// Report-wide switches.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportOptions {
    /// Prepend a contents listing of level 1-3 headings. Off by default so
    /// short reports are not given a contents page they did not ask for.
    pub include_toc: bool,
    pub toc_title: String,
    /// Marker used by `bullets` and `ul` when none is given.
    pub bullet: String,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            include_toc: false,
            toc_title: "Contents".to_string(),
            bullet: "\u{2022}".to_string(),
        }
    }
}

/// Names the style each element kind is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleTag {
    Normal,
    Heading1,
    Heading2,
    Heading3,
    Heading4,
    Heading5,
    Heading6,
    Code,
    Math,
    Hyperlink,
    Caption,
    ListItem,
    TableHeader,
    TableCell,
}

impl StyleTag {
    pub const ALL: [StyleTag; 14] = [
        StyleTag::Normal,
        StyleTag::Heading1,
        StyleTag::Heading2,
        StyleTag::Heading3,
        StyleTag::Heading4,
        StyleTag::Heading5,
        StyleTag::Heading6,
        StyleTag::Code,
        StyleTag::Math,
        StyleTag::Hyperlink,
        StyleTag::Caption,
        StyleTag::ListItem,
        StyleTag::TableHeader,
        StyleTag::TableCell,
    ];

    /// Heading tag for levels `1..=6`.
    pub fn heading(level: u8) -> Option<StyleTag> {
        match level {
            1 => Some(StyleTag::Heading1),
            2 => Some(StyleTag::Heading2),
            3 => Some(StyleTag::Heading3),
            4 => Some(StyleTag::Heading4),
            5 => Some(StyleTag::Heading5),
            6 => Some(StyleTag::Heading6),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StyleTag::Normal => "Normal",
            StyleTag::Heading1 => "Heading1",
            StyleTag::Heading2 => "Heading2",
            StyleTag::Heading3 => "Heading3",
            StyleTag::Heading4 => "Heading4",
            StyleTag::Heading5 => "Heading5",
            StyleTag::Heading6 => "Heading6",
            StyleTag::Code => "Code",
            StyleTag::Math => "Math",
            StyleTag::Hyperlink => "Hyperlink",
            StyleTag::Caption => "Caption",
            StyleTag::ListItem => "ListItem",
            StyleTag::TableHeader => "TableHeader",
            StyleTag::TableCell => "TableCell",
        }
    }

    /// Dotted path of this tag's section in a TOML configuration.
    pub fn config_path(&self) -> &'static [&'static str] {
        match self {
            StyleTag::Normal => &["text"],
            StyleTag::Heading1 => &["heading", "1"],
            StyleTag::Heading2 => &["heading", "2"],
            StyleTag::Heading3 => &["heading", "3"],
            StyleTag::Heading4 => &["heading", "4"],
            StyleTag::Heading5 => &["heading", "5"],
            StyleTag::Heading6 => &["heading", "6"],
            StyleTag::Code => &["code"],
            StyleTag::Math => &["math"],
            StyleTag::Hyperlink => &["link"],
            StyleTag::Caption => &["caption"],
            StyleTag::ListItem => &["list_item"],
            StyleTag::TableHeader => &["table", "header"],
            StyleTag::TableCell => &["table", "cell"],
        }
    }
}

impl fmt::Display for StyleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StyleTag {
    type Err = String;

    /// Accepts the tag name case-insensitively, with or without separators
    /// (`Heading1`, `heading-1`, `table_header`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' ' | '.'))
            .collect::<String>()
            .to_lowercase();
        StyleTag::ALL
            .into_iter()
            .find(|tag| tag.as_str().to_lowercase() == key)
            .ok_or_else(|| s.to_string())
    }
}

/// The complete style set of a report.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleMatch {
    pub margins: Margins,
    pub page: PageSetup,
    pub options: ReportOptions,
    pub heading_1: BasicTextStyle,
    pub heading_2: BasicTextStyle,
    pub heading_3: BasicTextStyle,
    pub heading_4: BasicTextStyle,
    pub heading_5: BasicTextStyle,
    pub heading_6: BasicTextStyle,
    pub text: BasicTextStyle,
    pub code: BasicTextStyle,
    pub math: BasicTextStyle,
    pub link: BasicTextStyle,
    pub caption: BasicTextStyle,
    pub list_item: BasicTextStyle,
    pub table_header: BasicTextStyle,
    pub table_cell: BasicTextStyle,
}

impl StyleMatch {
    pub fn get(&self, tag: StyleTag) -> &BasicTextStyle {
        match tag {
            StyleTag::Normal => &self.text,
            StyleTag::Heading1 => &self.heading_1,
            StyleTag::Heading2 => &self.heading_2,
            StyleTag::Heading3 => &self.heading_3,
            StyleTag::Heading4 => &self.heading_4,
            StyleTag::Heading5 => &self.heading_5,
            StyleTag::Heading6 => &self.heading_6,
            StyleTag::Code => &self.code,
            StyleTag::Math => &self.math,
            StyleTag::Hyperlink => &self.link,
            StyleTag::Caption => &self.caption,
            StyleTag::ListItem => &self.list_item,
            StyleTag::TableHeader => &self.table_header,
            StyleTag::TableCell => &self.table_cell,
        }
    }

    pub fn get_mut(&mut self, tag: StyleTag) -> &mut BasicTextStyle {
        match tag {
            StyleTag::Normal => &mut self.text,
            StyleTag::Heading1 => &mut self.heading_1,
            StyleTag::Heading2 => &mut self.heading_2,
            StyleTag::Heading3 => &mut self.heading_3,
            StyleTag::Heading4 => &mut self.heading_4,
            StyleTag::Heading5 => &mut self.heading_5,
            StyleTag::Heading6 => &mut self.heading_6,
            StyleTag::Code => &mut self.code,
            StyleTag::Math => &mut self.math,
            StyleTag::Hyperlink => &mut self.link,
            StyleTag::Caption => &mut self.caption,
            StyleTag::ListItem => &mut self.list_item,
            StyleTag::TableHeader => &mut self.table_header,
            StyleTag::TableCell => &mut self.table_cell,
        }
    }

    /// Printable width in millimetres.
    pub fn content_width_mm(&self) -> f32 {
        let (width, _) = self.page.dimensions_mm();
        (width - self.margins.left - self.margins.right).max(1.0)
    }
}

impl Default for StyleMatch {
    fn default() -> Self {
        let heading = |size: u8, before: f32| BasicTextStyle::new(size, before, 0.5).bold();
        Self {
            margins: Margins::default(),
            page: PageSetup::default(),
            options: ReportOptions::default(),
            heading_1: heading(20, 1.0),
            heading_2: heading(16, 0.8),
            heading_3: heading(14, 0.6),
            heading_4: heading(12, 0.5),
            heading_5: heading(11, 0.5).italic(),
            heading_6: heading(10, 0.5).italic(),
            text: BasicTextStyle::new(11, 0.0, 0.5),
            code: BasicTextStyle {
                background_color: Some((245, 245, 245)),
                ..BasicTextStyle::new(9, 0.5, 0.5).family("courier")
            },
            math: BasicTextStyle::new(11, 0.5, 0.5).aligned(TextAlignment::Center),
            link: BasicTextStyle::new(11, 0.0, 0.5).color((0, 0, 238)),
            caption: BasicTextStyle::new(10, 0.2, 0.8)
                .italic()
                .aligned(TextAlignment::Center),
            list_item: BasicTextStyle::new(11, 0.0, 0.2),
            table_header: BasicTextStyle {
                background_color: Some((128, 128, 128)),
                ..BasicTextStyle::new(10, 0.5, 0.0).bold()
            },
            table_cell: BasicTextStyle::new(10, 0.0, 0.5),
        }
    }
}
