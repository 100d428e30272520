//! PDF Dossier Library
//!
//! Builds a single watermarked, navigable PDF from one folder per person.
//! This library provides functionality to:
//! - Discover and order person folders and their PDF files
//! - Stamp a diagonal, auto-scaled text watermark on every page
//! - Resolve the page number of every section before assembling (two passes)
//! - Render a title page, a clickable table of contents and separator pages
//! - Concatenate everything with a bookmark outline
//!
//! # Example
//!
//! ```no_run
//! use pdf_dossier::config::BuildOptions;
//! use std::path::PathBuf;
//!
//! let options = BuildOptions {
//!     source: PathBuf::from("Documents"),
//!     watermark_text: "RESERVE POUR LOCATION APPARTEMENT".to_string(),
//!     ..Default::default()
//! };
//!
//! let report = pdf_dossier::build(&options).expect("Failed to build dossier");
//! println!("{} pages", report.layout.total_pages());
//! ```

pub mod accounting;
pub mod assemble;
pub mod collection;
pub mod config;
pub mod error;
pub mod layout;
pub mod naming;
pub mod pdf;

// Re-export commonly used items
pub use assemble::{build, AssemblyReport, DocumentAssembler, WatermarkOutcome};
pub use error::{Error, Result};
