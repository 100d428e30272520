//! Two-pass page accounting
//!
//! The TOC and bookmarks point at absolute page numbers, but those numbers
//! are only known once every section has been sized. Pass 1 (`measure`)
//! lays the sections out in their fixed order with their page counts; pass 2
//! (`resolve`) walks that order with a running cursor and assigns start
//! pages. A [`ResolvedLayout`] cannot be modified: adding content means
//! measuring again.

use crate::layout::PageLayout;

/// Pages taken by the title page
pub const TITLE_PAGE_COUNT: usize = 1;

/// Pages taken by each person separator
pub const SEPARATOR_PAGE_COUNT: usize = 1;

/// What a section of the final document holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionKind {
    TitlePage,
    TableOfContents,
    /// Separator of the `person`-th person
    PersonSeparator { person: usize },
    /// `document`-th surviving document of the `person`-th person
    Document { person: usize, document: usize },
}

/// A sized section, before resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub kind: SectionKind,
    /// Label used by the TOC and bookmarks (empty for title and TOC)
    pub label: String,
    pub page_count: usize,
}

/// A section with its resolved 1-based start page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSection {
    pub kind: SectionKind,
    pub label: String,
    pub page_count: usize,
    pub start_page: usize,
}

/// A watermarked document, as seen by the accountant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasuredDocument {
    pub label: String,
    pub page_count: usize,
}

/// A person and the documents that survived watermarking
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasuredPerson {
    pub label: String,
    pub documents: Vec<MeasuredDocument>,
}

/// Indentation level of a TOC row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TocLevel {
    Person,
    Document,
}

/// One line of the table of contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocRow {
    pub level: TocLevel,
    pub label: String,
    pub target_page: usize,
}

/// Bookmark tree node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineNode {
    pub title: String,
    pub target_page: usize,
    pub children: Vec<OutlineNode>,
}

/// Assign start pages to consecutive sections
///
/// `start[i] = 1 + sum(page_counts[..i])`.
pub fn resolve_start_pages(page_counts: &[usize]) -> Vec<usize> {
    let mut cursor = 1;
    page_counts
        .iter()
        .map(|&count| {
            let start = cursor;
            cursor += count;
            start
        })
        .collect()
}

/// Pass 1 result: every section sized, in final order
#[derive(Debug, Clone)]
pub struct PageAccountant {
    sections: Vec<Section>,
}

impl PageAccountant {
    /// Lay out the sections for `persons` in their fixed order
    ///
    /// The TOC holds one row per person and one per document; its page
    /// count comes from that row count and the fixed rows-per-page of
    /// `layout`, so it never depends on where anything lands.
    pub fn measure(persons: &[MeasuredPerson], layout: &PageLayout) -> Self {
        let line_count: usize = persons.iter().map(|p| 1 + p.documents.len()).sum();
        let toc_pages = layout.toc_page_count(line_count);

        let mut sections = vec![
            Section {
                kind: SectionKind::TitlePage,
                label: String::new(),
                page_count: TITLE_PAGE_COUNT,
            },
            Section {
                kind: SectionKind::TableOfContents,
                label: String::new(),
                page_count: toc_pages,
            },
        ];

        for (person_idx, person) in persons.iter().enumerate() {
            sections.push(Section {
                kind: SectionKind::PersonSeparator { person: person_idx },
                label: person.label.clone(),
                page_count: SEPARATOR_PAGE_COUNT,
            });
            for (doc_idx, doc) in person.documents.iter().enumerate() {
                sections.push(Section {
                    kind: SectionKind::Document {
                        person: person_idx,
                        document: doc_idx,
                    },
                    label: doc.label.clone(),
                    page_count: doc.page_count,
                });
            }
        }

        log::debug!(
            "Measured {} sections ({} TOC row{}, {} TOC page{})",
            sections.len(),
            line_count,
            if line_count == 1 { "" } else { "s" },
            toc_pages,
            if toc_pages == 1 { "" } else { "s" }
        );

        Self { sections }
    }

    /// Sections in final order
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Pass 2: assign start pages
    pub fn resolve(self) -> ResolvedLayout {
        let counts: Vec<usize> = self.sections.iter().map(|s| s.page_count).collect();
        let starts = resolve_start_pages(&counts);
        let total_pages = counts.iter().sum();

        let sections = self
            .sections
            .into_iter()
            .zip(starts)
            .map(|(section, start_page)| ResolvedSection {
                kind: section.kind,
                label: section.label,
                page_count: section.page_count,
                start_page,
            })
            .collect();

        ResolvedLayout { sections, total_pages }
    }
}

/// Pass 2 result: immutable start pages for every section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLayout {
    sections: Vec<ResolvedSection>,
    total_pages: usize,
}

impl ResolvedLayout {
    /// Sections in final order with their start pages
    pub fn sections(&self) -> &[ResolvedSection] {
        &self.sections
    }

    /// Total number of pages in the final document
    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    /// Find one section by kind
    pub fn section(&self, kind: SectionKind) -> Option<&ResolvedSection> {
        self.sections.iter().find(|s| s.kind == kind)
    }

    /// Start page of one section
    pub fn start_page(&self, kind: SectionKind) -> Option<usize> {
        self.section(kind).map(|s| s.start_page)
    }

    /// Number of TOC pages
    pub fn toc_page_count(&self) -> usize {
        self.section(SectionKind::TableOfContents)
            .map(|s| s.page_count)
            .unwrap_or(0)
    }

    /// TOC rows, in document order
    pub fn toc_rows(&self) -> Vec<TocRow> {
        self.sections
            .iter()
            .filter_map(|s| match s.kind {
                SectionKind::PersonSeparator { .. } => Some(TocRow {
                    level: TocLevel::Person,
                    label: s.label.clone(),
                    target_page: s.start_page,
                }),
                SectionKind::Document { .. } => Some(TocRow {
                    level: TocLevel::Document,
                    label: s.label.clone(),
                    target_page: s.start_page,
                }),
                _ => None,
            })
            .collect()
    }

    /// Bookmark tree: one node per person, one child per document
    pub fn outline(&self) -> Vec<OutlineNode> {
        let mut nodes: Vec<OutlineNode> = Vec::new();

        for section in &self.sections {
            match section.kind {
                SectionKind::PersonSeparator { .. } => nodes.push(OutlineNode {
                    title: section.label.clone(),
                    target_page: section.start_page,
                    children: Vec::new(),
                }),
                SectionKind::Document { .. } => {
                    if let Some(parent) = nodes.last_mut() {
                        parent.children.push(OutlineNode {
                            title: section.label.clone(),
                            target_page: section.start_page,
                            children: Vec::new(),
                        });
                    }
                }
                _ => {}
            }
        }

        nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn measured(label: &str, pages: &[usize]) -> MeasuredPerson {
        MeasuredPerson {
            label: label.to_string(),
            documents: pages
                .iter()
                .enumerate()
                .map(|(i, &page_count)| MeasuredDocument {
                    label: format!("{} doc {}", label, i + 1),
                    page_count,
                })
                .collect(),
        }
    }

    #[test]
    fn test_resolve_start_pages() {
        assert_eq!(resolve_start_pages(&[]), Vec::<usize>::new());
        assert_eq!(resolve_start_pages(&[1]), vec![1]);
        assert_eq!(resolve_start_pages(&[1, 1, 1, 3, 2]), vec![1, 2, 3, 4, 7]);
    }

    #[test]
    fn test_start_page_equals_pages_before_plus_one() {
        let counts = [1, 2, 1, 5, 1, 1, 7, 3];
        let starts = resolve_start_pages(&counts);
        for (i, start) in starts.iter().enumerate() {
            let before: usize = counts[..i].iter().sum();
            assert_eq!(*start, before + 1);
        }
    }

    #[test]
    fn test_section_order() {
        let persons = vec![measured("Alice", &[2, 1]), measured("Bob", &[4])];
        let accountant = PageAccountant::measure(&persons, &PageLayout::default());
        let kinds: Vec<_> = accountant.sections().iter().map(|s| s.kind).collect();

        assert_eq!(
            kinds,
            vec![
                SectionKind::TitlePage,
                SectionKind::TableOfContents,
                SectionKind::PersonSeparator { person: 0 },
                SectionKind::Document { person: 0, document: 0 },
                SectionKind::Document { person: 0, document: 1 },
                SectionKind::PersonSeparator { person: 1 },
                SectionKind::Document { person: 1, document: 0 },
            ]
        );
    }

    #[test]
    fn test_resolved_layout() {
        let persons = vec![measured("Alice", &[2, 1]), measured("Bob", &[4])];
        let layout = PageAccountant::measure(&persons, &PageLayout::default()).resolve();

        // title 1, toc 2, Alice sep 3, docs 4-5 and 6, Bob sep 7, doc 8-11
        assert_eq!(layout.total_pages(), 11);
        assert_eq!(layout.toc_page_count(), 1);
        assert_eq!(layout.start_page(SectionKind::PersonSeparator { person: 0 }), Some(3));
        assert_eq!(layout.start_page(SectionKind::Document { person: 0, document: 1 }), Some(6));
        assert_eq!(layout.start_page(SectionKind::PersonSeparator { person: 1 }), Some(7));
        assert_eq!(layout.start_page(SectionKind::Document { person: 1, document: 0 }), Some(8));
    }

    #[test]
    fn test_toc_rows_follow_sections() {
        let persons = vec![measured("Alice", &[2]), measured("Bob", &[1, 1])];
        let layout = PageAccountant::measure(&persons, &PageLayout::default()).resolve();
        let rows = layout.toc_rows();

        let summary: Vec<_> = rows.iter().map(|r| (r.level, r.target_page)).collect();
        assert_eq!(
            summary,
            vec![
                (TocLevel::Person, 3),
                (TocLevel::Document, 4),
                (TocLevel::Person, 6),
                (TocLevel::Document, 7),
                (TocLevel::Document, 8),
            ]
        );
    }

    #[test]
    fn test_outline_matches_start_pages() {
        let persons = vec![measured("Alice", &[3, 2]), measured("Bob", &[1])];
        let layout = PageAccountant::measure(&persons, &PageLayout::default()).resolve();
        let outline = layout.outline();

        assert_eq!(outline.len(), 2);
        assert_eq!(outline[0].title, "Alice");
        assert_eq!(outline[0].children.len(), 2);

        for (p, node) in outline.iter().enumerate() {
            assert_eq!(
                Some(node.target_page),
                layout.start_page(SectionKind::PersonSeparator { person: p })
            );
            for (d, child) in node.children.iter().enumerate() {
                assert_eq!(
                    Some(child.target_page),
                    layout.start_page(SectionKind::Document { person: p, document: d })
                );
            }
        }
    }

    #[test]
    fn test_large_toc_shifts_content() {
        // 40 documents + 1 person = 41 rows → 2 TOC pages at 35 rows per page
        let persons = vec![measured("Many", &[1; 40])];
        let layout = PageAccountant::measure(&persons, &PageLayout::default()).resolve();

        assert_eq!(layout.toc_page_count(), 2);
        assert_eq!(layout.start_page(SectionKind::PersonSeparator { person: 0 }), Some(4));
        assert_eq!(layout.total_pages(), 1 + 2 + 1 + 40);
    }

    #[test]
    fn test_measure_is_deterministic() {
        let persons = vec![measured("Alice", &[2, 5]), measured("Bob", &[1])];
        let first = PageAccountant::measure(&persons, &PageLayout::default()).resolve();
        let second = PageAccountant::measure(&persons, &PageLayout::default()).resolve();
        assert_eq!(first, second);
        assert_eq!(first.toc_rows(), second.toc_rows());
    }
}
