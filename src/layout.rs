//! Page layout calculations for the generated pages

/// Simple length type in millimeters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Length(pub f64);

impl Length {
    /// Create a length from millimeters
    pub fn from_mm(mm: f64) -> Self {
        Length(mm)
    }

    /// Create a length from inches
    pub fn from_inches(inches: f64) -> Self {
        Length(inches * 25.4)
    }

    /// Create a length from points (1/72 inch)
    pub fn from_pt(pt: f64) -> Self {
        Length(pt * 25.4 / 72.0)
    }

    /// Get the value in millimeters
    pub fn mm(&self) -> f64 {
        self.0
    }

    /// Get the value in points (1/72 inch)
    pub fn pt(&self) -> f64 {
        self.0 * 72.0 / 25.4
    }
}

/// Page dimensions
#[derive(Debug, Clone, Copy)]
pub struct PageDimensions {
    pub width: Length,
    pub height: Length,
}

impl PageDimensions {
    /// A4 size (210mm × 297mm)
    pub fn a4() -> Self {
        Self {
            width: Length::from_mm(210.0),
            height: Length::from_mm(297.0),
        }
    }
}

/// Margins for page content
#[derive(Debug, Clone, Copy)]
pub struct Margins {
    pub top: Length,
    pub bottom: Length,
    pub left: Length,
    pub right: Length,
}

impl Margins {
    /// Create margins with same value on all sides
    pub fn uniform(margin: Length) -> Self {
        Self {
            top: margin,
            bottom: margin,
            left: margin,
            right: margin,
        }
    }

    /// Standard 1-inch margins on all sides
    pub fn standard() -> Self {
        Self::uniform(Length::from_inches(1.0))
    }
}

/// Geometry of the title, TOC and separator pages
///
/// Every TOC page has the same heading band and the same fixed line height,
/// so the number of rows per page depends only on this struct. That keeps
/// the TOC size a function of the entry count alone.
#[derive(Debug, Clone, Copy)]
pub struct PageLayout {
    pub page: PageDimensions,
    pub margins: Margins,
    /// Height reserved for the "Table of Contents" heading on each TOC page
    pub toc_heading_height: Length,
    /// Height of one TOC row
    pub toc_line_height: Length,
    /// Horizontal indent of document rows under their person
    pub toc_indent: Length,
    /// Width reserved for the right-aligned page numbers
    pub toc_page_number_width: Length,
    /// Font size of person rows
    pub toc_person_font_size: f32,
    /// Font size of document rows
    pub toc_document_font_size: f32,
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            page: PageDimensions::a4(),
            margins: Margins::standard(),
            toc_heading_height: Length::from_pt(60.0),
            toc_line_height: Length::from_pt(18.0),
            toc_indent: Length::from_pt(20.0),
            toc_page_number_width: Length::from_pt(40.0),
            toc_person_font_size: 13.0,
            toc_document_font_size: 11.0,
        }
    }
}

impl PageLayout {
    /// Page width in points
    pub fn width_pt(&self) -> f32 {
        self.page.width.pt() as f32
    }

    /// Page height in points
    pub fn height_pt(&self) -> f32 {
        self.page.height.pt() as f32
    }

    /// Number of TOC rows that fit on one TOC page (at least 1)
    pub fn toc_lines_per_page(&self) -> usize {
        let usable = self.page.height.pt()
            - self.margins.top.pt()
            - self.margins.bottom.pt()
            - self.toc_heading_height.pt();
        let lines = (usable / self.toc_line_height.pt()).floor();
        if lines < 1.0 {
            1
        } else {
            lines as usize
        }
    }

    /// Number of TOC pages needed for `line_count` rows (at least 1)
    pub fn toc_page_count(&self, line_count: usize) -> usize {
        let per_page = self.toc_lines_per_page();
        line_count.div_ceil(per_page).max(1)
    }

    /// Baseline of the `index`-th row on a TOC page, from the page bottom
    pub fn toc_row_baseline(&self, index: usize) -> f32 {
        let top = self.page.height.pt() - self.margins.top.pt() - self.toc_heading_height.pt();
        (top - (index as f64 + 1.0) * self.toc_line_height.pt()) as f32 + 4.0
    }

    /// Left edge of the text area
    pub fn left_pt(&self) -> f32 {
        self.margins.left.pt() as f32
    }

    /// Right edge of the text area
    pub fn right_pt(&self) -> f32 {
        (self.page.width.pt() - self.margins.right.pt()) as f32
    }
}
