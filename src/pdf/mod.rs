//! PDF manipulation module

pub mod create;
pub mod merge;
pub mod metadata;
pub mod metrics;
pub mod watermark;

// Re-export commonly used items
pub use create::{GeneratedPage, PageRenderer, PendingLink};
pub use merge::{add_links, add_outline, concatenate};
pub use metadata::{count_pages, set_document_info, PageGeometry};
pub use watermark::{
    Overlay, PdfWatermarker, WatermarkRenderer, WatermarkSpec, WatermarkStyle, WatermarkedPdf,
};
