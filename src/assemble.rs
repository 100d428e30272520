//! Dossier assembly
//!
//! Watermarks every document, sizes and resolves the layout, renders the
//! generated pages, concatenates everything in section order and writes the
//! result atomically into the output folder.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use lopdf::Document;
use rayon::prelude::*;

use crate::accounting::{MeasuredDocument, MeasuredPerson, PageAccountant, ResolvedLayout, SectionKind};
use crate::collection::{discover, DocumentEntry, Person};
use crate::config::{BuildOptions, GenerationConfig};
use crate::error::{Error, Result};
use crate::layout::PageLayout;
use crate::naming::{format_timestamp, separator_heading};
use crate::pdf::{
    add_links, add_outline, concatenate, set_document_info, PageRenderer, PdfWatermarker, WatermarkRenderer,
    WatermarkedPdf,
};

/// Result of watermarking one document
#[derive(Debug)]
pub enum WatermarkOutcome {
    Watermarked(WatermarkedPdf),
    Failed(Error),
}

/// What a successful run produced
#[derive(Debug)]
pub struct AssemblyReport {
    /// Path of the written dossier
    pub output_path: PathBuf,
    /// Resolved sections of the dossier, with their start pages
    pub layout: ResolvedLayout,
    /// Number of documents included
    pub document_count: usize,
    /// Documents left out, with the reason
    pub skipped: Vec<Error>,
}

/// A person and the documents that survived watermarking
struct SurvivingPerson<'p> {
    person: &'p Person,
    documents: Vec<(&'p DocumentEntry, Option<WatermarkedPdf>)>,
}

/// Builds the dossier for an ordered list of persons
#[derive(Debug)]
pub struct DocumentAssembler {
    options: BuildOptions,
    layout: PageLayout,
    renderer: WatermarkRenderer,
}

impl DocumentAssembler {
    pub fn new(options: BuildOptions) -> Self {
        let renderer = WatermarkRenderer::new(options.style.clone());
        Self {
            options,
            layout: PageLayout::default(),
            renderer,
        }
    }

    /// Use a different geometry for the generated pages
    pub fn with_layout(mut self, layout: PageLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Assemble the dossier, stamped with the current local time
    pub fn assemble(&self, persons: &[Person]) -> Result<AssemblyReport> {
        let now = chrono::Local::now().naive_local();
        self.assemble_at(persons, &now)
    }

    /// Assemble the dossier with an explicit generation time
    pub fn assemble_at(&self, persons: &[Person], generated_at: &NaiveDateTime) -> Result<AssemblyReport> {
        let outcomes = self.watermark_all(persons)?;

        let mut skipped = Vec::new();
        let mut survivors: Vec<SurvivingPerson> = Vec::new();
        for (person, person_outcomes) in persons.iter().zip(outcomes) {
            let mut documents = Vec::new();
            for (entry, outcome) in person.documents.iter().zip(person_outcomes) {
                match outcome {
                    WatermarkOutcome::Watermarked(pdf) => documents.push((entry, Some(pdf))),
                    WatermarkOutcome::Failed(error) => {
                        log::warn!("Skipping {}: {}", entry.source_path.display(), error);
                        skipped.push(error);
                    }
                }
            }

            if documents.is_empty() {
                log::warn!("No usable document left for {}, leaving it out", person.alias);
                continue;
            }
            survivors.push(SurvivingPerson { person, documents });
        }

        let document_count: usize = survivors.iter().map(|p| p.documents.len()).sum();
        if document_count == 0 {
            return Err(Error::NoPdfFound {
                root: self.options.source.clone(),
            });
        }

        let measured: Vec<MeasuredPerson> = survivors
            .iter()
            .map(|p| MeasuredPerson {
                label: p.person.alias.clone(),
                documents: p
                    .documents
                    .iter()
                    .map(|(entry, pdf)| MeasuredDocument {
                        label: entry.display_name.clone(),
                        page_count: pdf.as_ref().map(|d| d.page_count).unwrap_or(0),
                    })
                    .collect(),
            })
            .collect();

        let resolved = PageAccountant::measure(&measured, &self.layout).resolve();
        log::info!(
            "Layout resolved: {} pages ({} TOC page{})",
            resolved.total_pages(),
            resolved.toc_page_count(),
            if resolved.toc_page_count() == 1 { "" } else { "s" }
        );

        let mut merged = self.render_and_merge(&resolved, &mut survivors, document_count, generated_at)?;
        set_document_info(&mut merged, &self.options.title, generated_at);
        merged.compress();

        let output_path = self.options.output_path();
        write_output(&mut merged, &output_path)?;
        log::info!("Dossier written: {}", output_path.display());

        Ok(AssemblyReport {
            output_path,
            layout: resolved,
            document_count,
            skipped,
        })
    }

    /// Watermark every document, keeping person and document order
    fn watermark_all(&self, persons: &[Person]) -> Result<Vec<Vec<WatermarkOutcome>>> {
        let watermarker = PdfWatermarker::new(&self.renderer, &self.options.watermark_text);
        let apply = |entry: &DocumentEntry| match watermarker.apply(&entry.source_path) {
            Ok(pdf) => Ok(WatermarkOutcome::Watermarked(pdf)),
            Err(e) if e.is_document_local() => Ok(WatermarkOutcome::Failed(e)),
            Err(e) => Err(e),
        };

        if self.options.jobs <= 1 {
            return persons
                .iter()
                .map(|person| person.documents.iter().map(apply).collect::<Result<Vec<_>>>())
                .collect();
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.options.jobs)
            .build()
            .map_err(|e| Error::General(format!("Cannot start worker pool: {}", e)))?;
        log::debug!("Watermarking on {} worker threads", self.options.jobs);

        pool.install(|| {
            persons
                .par_iter()
                .map(|person| person.documents.par_iter().map(apply).collect::<Result<Vec<_>>>())
                .collect()
        })
    }

    /// Render generated pages and concatenate every section in order
    fn render_and_merge(
        &self,
        resolved: &ResolvedLayout,
        survivors: &mut [SurvivingPerson],
        document_count: usize,
        generated_at: &NaiveDateTime,
    ) -> Result<Document> {
        let renderer = PageRenderer::new(self.layout);
        let toc_pages = renderer.toc_pages(&resolved.toc_rows(), resolved.toc_page_count());

        let mut parts: Vec<Document> = Vec::with_capacity(resolved.sections().len());
        for section in resolved.sections() {
            let part = match section.kind {
                SectionKind::TitlePage => renderer.build_document(&[renderer.title_page(
                    &self.options.title,
                    &format_timestamp(generated_at),
                    document_count,
                )]),
                SectionKind::TableOfContents => renderer.build_document(&toc_pages),
                SectionKind::PersonSeparator { .. } => {
                    renderer.build_document(&[renderer.separator_page(&separator_heading(&section.label))])
                }
                SectionKind::Document { person, document } => survivors
                    .get_mut(person)
                    .and_then(|p| p.documents.get_mut(document))
                    .and_then(|(_, pdf)| pdf.take())
                    .map(|pdf| pdf.document)
                    .ok_or_else(|| Error::General(format!("Document {}/{} is missing", person, document)))?,
            };
            parts.push(part);
        }

        let (mut merged, page_ids) = concatenate(parts)?;
        if page_ids.len() != resolved.total_pages() {
            return Err(Error::PageCountMismatch {
                expected: resolved.total_pages(),
                actual: page_ids.len(),
            });
        }

        if let Some(toc_start) = resolved.start_page(SectionKind::TableOfContents) {
            for (offset, page) in toc_pages.iter().enumerate() {
                let page_id = page_ids[toc_start - 1 + offset];
                add_links(&mut merged, page_id, &page.links, &page_ids)?;
            }
        }
        add_outline(&mut merged, &resolved.outline(), &page_ids)?;

        Ok(merged)
    }
}

/// Save through a temporary file in the output folder, then move it in place
///
/// The temporary file is removed if anything fails, so a failed run never
/// leaves a partial dossier behind.
fn write_output(doc: &mut Document, output_path: &Path) -> Result<()> {
    let output_error = |source: std::io::Error| Error::OutputWrite {
        path: output_path.to_path_buf(),
        source,
    };

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)
        .map_err(|e| output_error(std::io::Error::other(e.to_string())))?;

    let dir = output_path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(output_error)?;

    let mut temp = tempfile::Builder::new()
        .prefix(".dossier-")
        .suffix(".pdf.tmp")
        .tempfile_in(dir)
        .map_err(output_error)?;
    temp.write_all(&bytes).map_err(output_error)?;
    temp.as_file().sync_all().map_err(output_error)?;
    temp.persist(output_path).map_err(|e| output_error(e.error))?;

    Ok(())
}

/// Load the configuration, discover persons and assemble the dossier
pub fn build(options: &BuildOptions) -> Result<AssemblyReport> {
    let config = GenerationConfig::load_from_root(&options.source)?;
    let persons = discover(&options.source, config.as_ref())?;

    if persons.is_empty() {
        return Err(Error::NoPdfFound {
            root: options.source.clone(),
        });
    }

    let document_count: usize = persons.iter().map(|p| p.documents.len()).sum();
    log::info!(
        "Found {} person{} with {} PDF file{}",
        persons.len(),
        if persons.len() == 1 { "" } else { "s" },
        document_count,
        if document_count == 1 { "" } else { "s" }
    );

    DocumentAssembler::new(options.clone()).assemble(&persons)
}
