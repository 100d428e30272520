//! Generated pages: title page, table of contents and person separators
//!
//! Pages are drawn with the standard Helvetica faces, so nothing needs
//! embedding. TOC rows remember the rectangle they occupy and the page they
//! point to; the link annotations themselves are added once the final
//! document exists (see [`crate::pdf::merge::add_links`]).

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

use crate::accounting::{TocLevel, TocRow};
use crate::layout::PageLayout;
use crate::pdf::metrics::{pdf_literal, truncate_to_width, Font};

/// Resource name of Helvetica on generated pages
const REGULAR: &str = "F1";
/// Resource name of Helvetica-Bold on generated pages
const BOLD: &str = "F2";

const TITLE_FONT_SIZE: f32 = 28.0;
const SUBTITLE_FONT_SIZE: f32 = 12.0;
const TOC_HEADING_FONT_SIZE: f32 = 20.0;
const SEPARATOR_FONT_SIZE: f32 = 24.0;

/// Heading printed at the top of every TOC page
pub const TOC_HEADING: &str = "Table des matières";

/// Gap around dot leaders, in points
const LEADER_GAP: f32 = 6.0;

/// A clickable area on a generated page, pointing at a 1-based page number
#[derive(Debug, Clone, PartialEq)]
pub struct PendingLink {
    /// [llx, lly, urx, ury] in page space
    pub rect: [f32; 4],
    pub target_page: usize,
}

/// Content of one generated page
#[derive(Debug, Clone, Default)]
pub struct GeneratedPage {
    pub content: Vec<u8>,
    pub links: Vec<PendingLink>,
}

/// Draws the dossier's own pages on a [`PageLayout`]
#[derive(Debug, Clone)]
pub struct PageRenderer {
    layout: PageLayout,
}

impl PageRenderer {
    pub fn new(layout: PageLayout) -> Self {
        Self { layout }
    }

    pub fn layout(&self) -> &PageLayout {
        &self.layout
    }

    fn text_area_width(&self) -> f32 {
        self.layout.right_pt() - self.layout.left_pt()
    }

    /// Draw `text` horizontally centered with its baseline at `y`
    fn centered_line(&self, out: &mut String, font: Font, size: f32, y: f32, text: &str) {
        let (text, _) = truncate_to_width(text, font, size, self.text_area_width());
        let width = font.text_width(&text, size);
        let x = (self.layout.width_pt() - width) / 2.0;
        push_text(out, font, size, x, y, &text);
    }

    /// Title page: dossier title, generation time and document count
    pub fn title_page(&self, title: &str, generated_at: &str, document_count: usize) -> GeneratedPage {
        let height = self.layout.height_pt();
        let mut content = String::new();

        self.centered_line(&mut content, Font::HelveticaBold, TITLE_FONT_SIZE, height * 0.6, title);
        self.centered_line(
            &mut content,
            Font::Helvetica,
            SUBTITLE_FONT_SIZE,
            height * 0.6 - 40.0,
            &format!("Généré le {}", generated_at),
        );
        self.centered_line(
            &mut content,
            Font::Helvetica,
            SUBTITLE_FONT_SIZE,
            height * 0.6 - 60.0,
            &format!(
                "{} document{}",
                document_count,
                if document_count == 1 { "" } else { "s" }
            ),
        );

        GeneratedPage {
            content: content.into_bytes(),
            links: Vec::new(),
        }
    }

    /// Separator page introducing one person
    pub fn separator_page(&self, heading: &str) -> GeneratedPage {
        let mut content = String::new();
        self.centered_line(
            &mut content,
            Font::HelveticaBold,
            SEPARATOR_FONT_SIZE,
            self.layout.height_pt() / 2.0,
            heading,
        );

        GeneratedPage {
            content: content.into_bytes(),
            links: Vec::new(),
        }
    }

    /// Exactly `page_count` TOC pages holding `rows` in order
    ///
    /// Rows are split at [`PageLayout::toc_lines_per_page`]; `page_count`
    /// comes from the same layout, so every row has a slot.
    pub fn toc_pages(&self, rows: &[TocRow], page_count: usize) -> Vec<GeneratedPage> {
        let per_page = self.layout.toc_lines_per_page();
        (0..page_count)
            .map(|page_idx| {
                let start = (page_idx * per_page).min(rows.len());
                let end = (start + per_page).min(rows.len());
                self.toc_page(&rows[start..end])
            })
            .collect()
    }

    fn toc_page(&self, rows: &[TocRow]) -> GeneratedPage {
        let layout = &self.layout;
        let mut content = String::new();
        let mut links = Vec::with_capacity(rows.len());

        let heading_y = layout.height_pt() - layout.margins.top.pt() as f32 - TOC_HEADING_FONT_SIZE;
        push_text(
            &mut content,
            Font::HelveticaBold,
            TOC_HEADING_FONT_SIZE,
            layout.left_pt(),
            heading_y,
            TOC_HEADING,
        );

        let line_height = layout.toc_line_height.pt() as f32;
        let number_left = layout.right_pt() - layout.toc_page_number_width.pt() as f32;

        for (index, row) in rows.iter().enumerate() {
            let baseline = layout.toc_row_baseline(index);
            let (font, size, x) = match row.level {
                TocLevel::Person => (Font::HelveticaBold, layout.toc_person_font_size, layout.left_pt()),
                TocLevel::Document => (
                    Font::Helvetica,
                    layout.toc_document_font_size,
                    layout.left_pt() + layout.toc_indent.pt() as f32,
                ),
            };

            let label_room = number_left - LEADER_GAP - x;
            let (label, _) = truncate_to_width(&row.label, font, size, label_room);
            push_text(&mut content, font, size, x, baseline, &label);

            let number = row.target_page.to_string();
            let number_width = font.text_width(&number, size);
            let number_x = layout.right_pt() - number_width;
            push_text(&mut content, font, size, number_x, baseline, &number);

            let leader_start = x + font.text_width(&label, size) + LEADER_GAP;
            let leader_end = number_x - LEADER_GAP;
            let dot_width = Font::Helvetica.text_width(".", size);
            if leader_end > leader_start && dot_width > 0.0 {
                let dots = ((leader_end - leader_start) / dot_width).floor() as usize;
                if dots > 0 {
                    push_text(&mut content, Font::Helvetica, size, leader_start, baseline, &".".repeat(dots));
                }
            }

            links.push(PendingLink {
                rect: [x, baseline - 4.0, layout.right_pt(), baseline - 4.0 + line_height],
                target_page: row.target_page,
            });
        }

        GeneratedPage {
            content: content.into_bytes(),
            links,
        }
    }

    /// Build a standalone document from generated pages
    pub fn build_document(&self, pages: &[GeneratedPage]) -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let regular_id = Font::Helvetica.add_to(&mut doc);
        let bold_id = Font::HelveticaBold.add_to(&mut doc);
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                REGULAR => regular_id,
                BOLD => bold_id,
            },
        });

        let media_box: Vec<Object> = vec![
            0.into(),
            0.into(),
            Object::Real(self.layout.width_pt()),
            Object::Real(self.layout.height_pt()),
        ];

        let kids: Vec<Object> = pages
            .iter()
            .map(|page| {
                let content_id = doc.add_object(Stream::new(Dictionary::new(), page.content.clone()));
                let page_id: ObjectId = doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                    "MediaBox" => media_box.clone(),
                    "Resources" => resources_id,
                    "Contents" => content_id,
                });
                page_id.into()
            })
            .collect();

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        doc
    }
}

/// Append a `BT … ET` block drawing `text` at (x, y)
fn push_text(out: &mut String, font: Font, size: f32, x: f32, y: f32, text: &str) {
    let resource = match font {
        Font::Helvetica => REGULAR,
        Font::HelveticaBold => BOLD,
    };
    out.push_str(&format!(
        "BT\n/{} {:.2} Tf\n{:.2} {:.2} Td\n{} Tj\nET\n",
        resource,
        size,
        x,
        y,
        pdf_literal(text)
    ));
}
