//! A fluent builder for styled PDF reports.
//!
//! This crate assembles a report as an ordered list of content blocks (headings,
//! paragraphs, lists, code, math, images, plots, captions, tables and links) and
//! renders it to PDF through the `genpdfi_extended` layout engine. Ordered lists
//! are labelled by a small numbering generator that supports decimal, roman and
//! alphabetic styles.
//!
//! # Overview
//!
//! A [`Report`] owns its content buffer, a table of named references, the
//! document metadata and the per-element styles. Content operations append
//! exactly one block (lists append one block per item). Operations that can be
//! rejected validate their input first and leave the report untouched on error.
//!
//! Rendering happens in [`Report::build`] or [`Report::to_bytes`]. The document
//! metadata is written into the PDF `Info` dictionary after layout, and any
//! scratch files created for plots are removed whether rendering succeeds or
//! not.
//!
//! # Styling
//!
//! Styles come from a TOML configuration (see [`config`]) or are adjusted per
//! element tag with [`Report::style`]. The default configuration can be printed
//! with `predictables-report --get-default-configuration`.
//!
//! # Example
//! ```rust,no_run
//! use predictables_report::{Report, ReportError};
//!
//! fn example() -> Result<(), ReportError> {
//!     let mut report = Report::new("summary.pdf");
//!     report
//!         .title("Model summary")
//!         .author("Pricing team")
//!         .h1("Results")
//!         .p("The model converged after 14 iterations.");
//!     report.ol(["Fit the baseline", "Compare lift"], "upper-roman")?;
//!     report.table_from_rows(&[
//!         vec!["", "Gini", "AUC"],
//!         vec!["train", "0.41", "0.70"],
//!         vec!["test", "0.38", "0.69"],
//!     ])?;
//!     report.build()?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Handling
//!
//! Fallible operations return [`ReportError`]. Conditions that do not stop a
//! report from being produced, such as an unknown style attribute or an image
//! that cannot be found, are reported through the `log` facade instead.

use std::error::Error;
use std::fmt;

pub mod config;
pub mod fonts;
pub mod highlighting;
pub mod images;
pub mod manifest;
pub mod metadata;
pub mod numbering;
pub mod pdf;
pub mod references;
pub mod report;
pub mod styling;
pub mod table;
pub mod util;

pub use config::ConfigSource;
pub use metadata::DocumentMetadata;
pub use numbering::{generate, NumberStyle, NumberingError, Ordinals};
pub use references::ReferenceId;
pub use report::{Block, Heading, Report};
pub use styling::{StyleMatch, StyleTag};
pub use table::{LabeledTable, TableStyle};

/// Errors raised while building or rendering a report.
#[derive(Debug)]
pub enum ReportError {
    /// A heading level outside `1..=6`.
    InvalidLevel { level: i64 },
    /// An inner link names a destination no heading has registered.
    UndefinedDestination { destination: String },
    /// Table input with a ragged or missing shape.
    InvalidTableInput { message: String },
    /// An ordered list could not be labelled.
    Numbering(NumberingError),
    /// A reference name that is already bound.
    DuplicateName { name: String },
    /// A reference id that is already registered.
    DuplicateReference { id: String },
    /// A bookmark key that is already registered.
    DuplicateDestination { key: String },
    /// A plot closure failed or its output could not be stored.
    PlotError { message: String },
    /// The layout engine or the PDF post-processing failed.
    PdfError {
        message: String,
        path: Option<String>,
        suggestion: Option<String>,
    },
    /// A font family could not be loaded.
    FontError {
        font_name: String,
        message: String,
        suggestion: Option<String>,
    },
    /// The style configuration could not be read.
    ConfigError {
        message: String,
        suggestion: Option<String>,
    },
    /// A report manifest is malformed.
    ManifestError {
        message: String,
        block: Option<usize>,
    },
    /// Reading or writing a file failed.
    IoError {
        message: String,
        path: Option<String>,
        suggestion: Option<String>,
    },
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportError::InvalidLevel { level } => {
                write!(f, "❌ Heading Error: level {} is not between 1 and 6", level)?;
                write!(f, "\n💡 Suggestion: Use h1..h6 or a level from 1 to 6")
            }
            ReportError::UndefinedDestination { destination } => {
                write!(f, "❌ Link Error: no heading registered the destination '{}'", destination)?;
                write!(
                    f,
                    "\n💡 Suggestion: Add the heading with a bookmark before linking to it"
                )
            }
            ReportError::InvalidTableInput { message } => {
                write!(f, "❌ Table Error: {}", message)?;
                write!(
                    f,
                    "\n💡 Suggestion: Give every row one index label followed by one cell per column"
                )
            }
            ReportError::Numbering(err) => {
                write!(f, "❌ Numbering Error: {}", err)?;
                write!(
                    f,
                    "\n💡 Suggestion: Use one of decimal, lower-roman, upper-roman, lower-alpha, upper-alpha"
                )
            }
            ReportError::DuplicateName { name } => {
                write!(f, "❌ Reference Error: the name '{}' is already bound", name)?;
                write!(f, "\n💡 Suggestion: Choose a name that is unique within the report")
            }
            ReportError::DuplicateReference { id } => {
                write!(f, "❌ Reference Error: the id {} is already registered", id)?;
                write!(f, "\n💡 Suggestion: Let the report generate a fresh id")
            }
            ReportError::DuplicateDestination { key } => {
                write!(f, "❌ Reference Error: the destination '{}' is already registered", key)?;
                write!(f, "\n💡 Suggestion: Bookmark keys must be unique within the report")
            }
            ReportError::PlotError { message } => {
                write!(f, "❌ Plot Error: {}", message)?;
                write!(f, "\n💡 Suggestion: Check that the plot closure returns SVG markup")
            }
            ReportError::PdfError {
                message,
                path,
                suggestion,
            } => {
                write!(f, "❌ PDF Generation Error: {}", message)?;
                if let Some(p) = path {
                    write!(f, "\n📁 Path: {}", p)?;
                }
                if let Some(s) = suggestion {
                    write!(f, "\n💡 Suggestion: {}", s)?;
                }
                Ok(())
            }
            ReportError::FontError {
                font_name,
                message,
                suggestion,
            } => {
                write!(f, "❌ Font Error: Failed to load font '{}'", font_name)?;
                write!(f, "\n   Reason: {}", message)?;
                if let Some(s) = suggestion {
                    write!(f, "\n💡 Suggestion: {}", s)?;
                }
                Ok(())
            }
            ReportError::ConfigError {
                message,
                suggestion,
            } => {
                write!(f, "❌ Configuration Error: {}", message)?;
                if let Some(s) = suggestion {
                    write!(f, "\n💡 Suggestion: {}", s)?;
                }
                Ok(())
            }
            ReportError::ManifestError { message, block } => {
                write!(f, "❌ Manifest Error: {}", message)?;
                if let Some(b) = block {
                    write!(f, " (block {})", b)?;
                }
                write!(
                    f,
                    "\n💡 Suggestion: Check the [document], [[style]] and [[block]] tables of the manifest"
                )
            }
            ReportError::IoError {
                message,
                path,
                suggestion,
            } => {
                write!(f, "❌ File Error: {}", message)?;
                if let Some(p) = path {
                    write!(f, "\n📁 Path: {}", p)?;
                }
                if let Some(s) = suggestion {
                    write!(f, "\n💡 Suggestion: {}", s)?;
                }
                Ok(())
            }
        }
    }
}

impl Error for ReportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ReportError::Numbering(err) => Some(err),
            _ => None,
        }
    }
}

impl From<NumberingError> for ReportError {
    fn from(err: NumberingError) -> Self {
        ReportError::Numbering(err)
    }
}

impl ReportError {
    pub fn invalid_table(message: impl Into<String>) -> Self {
        ReportError::InvalidTableInput {
            message: message.into(),
        }
    }

    pub fn pdf_error(message: impl Into<String>) -> Self {
        ReportError::PdfError {
            message: message.into(),
            path: None,
            suggestion: None,
        }
    }

    pub fn manifest_error(message: impl Into<String>, block: Option<usize>) -> Self {
        ReportError::ManifestError {
            message: message.into(),
            block,
        }
    }

    /// Wraps an I/O failure on `path` with a suggestion based on its kind.
    pub fn io_error(err: &std::io::Error, path: impl Into<String>) -> Self {
        let suggestion = match err.kind() {
            std::io::ErrorKind::NotFound => "Check that the file or its parent directory exists",
            std::io::ErrorKind::PermissionDenied => "Check file permissions",
            _ => "Check that the path is accessible",
        };
        ReportError::IoError {
            message: err.to_string(),
            path: Some(path.into()),
            suggestion: Some(suggestion.to_string()),
        }
    }
}
