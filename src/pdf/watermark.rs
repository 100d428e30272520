//! Diagonal text watermark
//!
//! [`WatermarkRenderer`] fits the watermark text to a page size and produces
//! a reusable overlay content stream. [`PdfWatermarker`] stamps that overlay
//! on every page of a PDF as a Form XObject drawn on top of the original
//! content.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::error::{Error, Result};
use crate::pdf::metadata::{flatten_inherited_attributes, resolve, PageGeometry};
use crate::pdf::metrics::{pdf_literal, truncate_to_width, Font};

/// Font used for the watermark text
const WATERMARK_FONT: Font = Font::HelveticaBold;

/// Helvetica-Bold cap height in em, used to center the text vertically
const CAP_HEIGHT: f32 = 0.718;

/// Resource names used inside the overlay Form XObject
const FONT_RESOURCE: &str = "WmF";
const GSTATE_RESOURCE: &str = "WmGS";

/// Base name of the overlay XObject in page resources
const XOBJECT_BASE_NAME: &str = "DossierWm";

/// Watermark appearance
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkStyle {
    /// Starting font size in points
    pub max_font_size: f32,
    /// Smallest font size before the text gets truncated
    pub min_font_size: f32,
    /// Font size decrement per fitting step
    pub font_size_step: f32,
    /// Counter-clockwise rotation of the text in degrees
    pub angle_degrees: f32,
    /// Fill opacity (0 = invisible, 1 = opaque)
    pub opacity: f32,
    /// Share of the page width the rotated line may span
    pub width_fraction: f32,
    /// RGB fill color, components in 0..=1
    pub color: [f32; 3],
    /// Vertical positions of the copies, as fractions of the page height
    pub rows: Vec<f32>,
}

impl Default for WatermarkStyle {
    fn default() -> Self {
        Self {
            max_font_size: 24.0,
            min_font_size: 8.0,
            font_size_step: 1.0,
            angle_degrees: 30.0,
            opacity: 0.3,
            width_fraction: 0.8,
            color: [1.0, 0.0, 0.0],
            rows: vec![0.2, 0.4, 0.6, 0.8],
        }
    }
}

/// Outcome of fitting the watermark text to a page width
#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkSpec {
    /// Text actually drawn (possibly shortened)
    pub text: String,
    /// Chosen font size in points
    pub font_size: f32,
    /// Whether the text was shortened with an ellipsis
    pub truncated: bool,
    /// Unrotated width of `text` at `font_size`
    pub text_width: f32,
}

/// A watermark overlay for one page size
#[derive(Debug, Clone)]
pub struct Overlay {
    /// Fitting result; `None` for an empty watermark
    pub spec: Option<WatermarkSpec>,
    /// Displayed page width the overlay was drawn for
    pub width: f32,
    /// Displayed page height the overlay was drawn for
    pub height: f32,
    /// Content stream drawing every copy of the text
    pub content: Vec<u8>,
}

impl Overlay {
    /// Whether drawing this overlay would paint nothing
    pub fn is_empty(&self) -> bool {
        self.spec.is_none()
    }
}

/// Fits watermark text to pages and draws overlays
#[derive(Debug)]
pub struct WatermarkRenderer {
    style: WatermarkStyle,
    shrink_logged: AtomicBool,
    truncation_logged: AtomicBool,
}

impl WatermarkRenderer {
    pub fn new(style: WatermarkStyle) -> Self {
        Self {
            style,
            shrink_logged: AtomicBool::new(false),
            truncation_logged: AtomicBool::new(false),
        }
    }

    pub fn style(&self) -> &WatermarkStyle {
        &self.style
    }

    fn angle_sin_cos(&self) -> (f32, f32) {
        let radians = self.style.angle_degrees.to_radians();
        (radians.sin().abs(), radians.cos().abs())
    }

    /// Horizontal space taken by the rotated line
    pub fn horizontal_extent(&self, text_width: f32, font_size: f32) -> f32 {
        let (sin, cos) = self.angle_sin_cos();
        text_width * cos + font_size * sin
    }

    /// Choose font size (and truncation) so the rotated line fits
    ///
    /// Shrinks from `max_font_size` in `font_size_step` steps; below
    /// `min_font_size` the text is cut and suffixed with `...` instead.
    pub fn fit(&self, page_width: f32, text: &str) -> WatermarkSpec {
        let style = &self.style;
        let max_extent = page_width * style.width_fraction;
        let step = style.font_size_step.max(0.1);

        let mut font_size = style.max_font_size;
        let mut text_width = WATERMARK_FONT.text_width(text, font_size);
        while self.horizontal_extent(text_width, font_size) > max_extent && font_size > style.min_font_size {
            font_size = (font_size - step).max(style.min_font_size);
            text_width = WATERMARK_FONT.text_width(text, font_size);
        }

        if font_size < style.max_font_size && !self.shrink_logged.swap(true, Ordering::Relaxed) {
            log::info!("Watermark text scaled down to font size {} to fit page width", font_size);
        }

        if self.horizontal_extent(text_width, font_size) <= max_extent {
            return WatermarkSpec {
                text: text.to_string(),
                font_size,
                truncated: false,
                text_width,
            };
        }

        let (sin, cos) = self.angle_sin_cos();
        let available = if cos < 1e-6 {
            f32::INFINITY
        } else {
            ((max_extent - font_size * sin) / cos).max(0.0)
        };
        let (shortened, truncated) = truncate_to_width(text, WATERMARK_FONT, font_size, available);
        if truncated && !self.truncation_logged.swap(true, Ordering::Relaxed) {
            log::warn!("Watermark text truncated to '{}' to fit page width", shortened);
        }

        WatermarkSpec {
            text_width: WATERMARK_FONT.text_width(&shortened, font_size),
            text: shortened,
            font_size,
            truncated,
        }
    }

    /// Draw the watermark for a page of the given displayed size
    ///
    /// Coordinates are in the displayed page space, origin bottom-left.
    /// Blank text gives an empty overlay.
    pub fn render(&self, page_width: f32, page_height: f32, text: &str) -> Overlay {
        if text.trim().is_empty() {
            return Overlay {
                spec: None,
                width: page_width,
                height: page_height,
                content: Vec::new(),
            };
        }

        let spec = self.fit(page_width, text);
        let radians = self.style.angle_degrees.to_radians();
        let (sin, cos) = (radians.sin(), radians.cos());

        // Offset from the text origin to its visual center, rotated
        let half_width = spec.text_width / 2.0;
        let half_height = spec.font_size * CAP_HEIGHT / 2.0;
        let offset_x = half_width * cos - half_height * sin;
        let offset_y = half_width * sin + half_height * cos;
        let center_x = page_width / 2.0;

        let [r, g, b] = self.style.color;
        let mut content = String::new();
        content.push_str("q\n");
        content.push_str(&format!("/{} gs\n", GSTATE_RESOURCE));
        content.push_str(&format!("{:.3} {:.3} {:.3} rg\n", r, g, b));
        content.push_str("BT\n");
        content.push_str(&format!("/{} {:.2} Tf\n", FONT_RESOURCE, spec.font_size));
        for row in &self.style.rows {
            let center_y = page_height * row;
            content.push_str(&format!(
                "{:.5} {:.5} {:.5} {:.5} {:.3} {:.3} Tm\n",
                cos,
                sin,
                -sin,
                cos,
                center_x - offset_x,
                center_y - offset_y
            ));
            content.push_str(&format!("{} Tj\n", pdf_literal(&spec.text)));
        }
        content.push_str("ET\n");
        content.push_str("Q\n");

        Overlay {
            spec: Some(spec),
            width: page_width,
            height: page_height,
            content: content.into_bytes(),
        }
    }
}

impl Default for WatermarkRenderer {
    fn default() -> Self {
        Self::new(WatermarkStyle::default())
    }
}

/// A watermarked copy of one source PDF, held in memory
#[derive(Debug)]
pub struct WatermarkedPdf {
    pub source_path: PathBuf,
    pub document: Document,
    pub page_count: usize,
}

/// Applies a renderer's overlay to every page of a PDF
#[derive(Debug)]
pub struct PdfWatermarker<'a> {
    renderer: &'a WatermarkRenderer,
    text: String,
}

impl<'a> PdfWatermarker<'a> {
    pub fn new(renderer: &'a WatermarkRenderer, text: &str) -> Self {
        Self {
            renderer,
            text: text.to_string(),
        }
    }

    /// Load and watermark a PDF file
    ///
    /// Password-protected files fail with [`Error::PdfEncrypted`], anything
    /// unreadable or page-less with [`Error::PdfRead`].
    pub fn apply(&self, path: &Path) -> Result<WatermarkedPdf> {
        let bytes = std::fs::read(path).map_err(|e| Error::PdfRead {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let mut document = load_document(path, &bytes)?;

        self.apply_to_document(&mut document).map_err(|e| Error::PdfRead {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let page_count = document.get_pages().len();
        log::info!(
            "Watermarked: {} ({} page{})",
            path.display(),
            page_count,
            if page_count == 1 { "" } else { "s" }
        );

        Ok(WatermarkedPdf {
            source_path: path.to_path_buf(),
            document,
            page_count,
        })
    }

    /// Stamp the overlay on every page of an already loaded document
    pub fn apply_to_document(&self, doc: &mut Document) -> Result<()> {
        if self.text.trim().is_empty() {
            return Ok(());
        }

        flatten_inherited_attributes(doc)?;

        let font_id = WATERMARK_FONT.add_to(doc);
        let gstate_id = add_transparency_state(doc, self.renderer.style().opacity);

        // One Form XObject per distinct page geometry
        let mut overlays: HashMap<[i64; 5], ObjectId> = HashMap::new();
        let page_ids: Vec<ObjectId> = doc.get_pages().values().copied().collect();

        for page_id in page_ids {
            let geometry = PageGeometry::of(doc, page_id);
            let key = geometry_key(&geometry);

            let xobject_id = match overlays.get(&key) {
                Some(id) => *id,
                None => {
                    let (width, height) = geometry.visible_size();
                    let overlay = self.renderer.render(width, height, &self.text);
                    let id = create_overlay_xobject(doc, &overlay, &geometry, font_id, gstate_id);
                    overlays.insert(key, id);
                    id
                }
            };

            let name = add_xobject_to_page_resources(doc, page_id, xobject_id)?;

            let save = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
            let restore_and_draw = doc.add_object(Stream::new(
                Dictionary::new(),
                format!("Q\nq\n/{} Do\nQ\n", name).into_bytes(),
            ));
            prepend_content_to_page(doc, page_id, save)?;
            append_content_to_page(doc, page_id, restore_and_draw)?;
        }

        Ok(())
    }
}

/// Parse PDF bytes, classifying failures the way the assembler reports them
fn load_document(path: &Path, bytes: &[u8]) -> Result<Document> {
    let has_encrypt_entry = contains(bytes, b"/Encrypt");

    let mut document = match Document::load_mem(bytes) {
        Ok(doc) => doc,
        Err(_) if has_encrypt_entry => {
            return Err(Error::PdfEncrypted {
                path: path.to_path_buf(),
            })
        }
        Err(e) => {
            return Err(Error::PdfRead {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
        }
    };

    // An empty user password is decrypted on load; the trailer keeps /Encrypt
    if document.is_encrypted() && document.encryption_state.is_none() {
        return Err(Error::PdfEncrypted {
            path: path.to_path_buf(),
        });
    }
    if document.trailer.remove(b"Encrypt").is_some() {
        log::debug!("Opened {} without a password", path.display());
    }

    if document.get_pages().is_empty() {
        return Err(Error::PdfRead {
            path: path.to_path_buf(),
            reason: "document has no pages".to_string(),
        });
    }

    Ok(document)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Cache key for a page geometry (hundredths of a point)
fn geometry_key(geometry: &PageGeometry) -> [i64; 5] {
    let [a, b, c, d] = geometry.bounds.map(|v| (v * 100.0).round() as i64);
    [a, b, c, d, geometry.rotation]
}

/// Add an ExtGState setting fill and stroke opacity
fn add_transparency_state(doc: &mut Document, opacity: f32) -> ObjectId {
    let opacity = opacity.clamp(0.0, 1.0);
    let mut gstate = Dictionary::new();
    gstate.set("Type", Object::Name(b"ExtGState".to_vec()));
    gstate.set("ca", Object::Real(opacity));
    gstate.set("CA", Object::Real(opacity));
    doc.add_object(Object::Dictionary(gstate))
}

/// Wrap an overlay in a Form XObject placed in the page's displayed orientation
fn create_overlay_xobject(
    doc: &mut Document,
    overlay: &Overlay,
    geometry: &PageGeometry,
    font_id: ObjectId,
    gstate_id: ObjectId,
) -> ObjectId {
    let mut fonts = Dictionary::new();
    fonts.set(FONT_RESOURCE, Object::Reference(font_id));
    let mut gstates = Dictionary::new();
    gstates.set(GSTATE_RESOURCE, Object::Reference(gstate_id));

    let mut resources = Dictionary::new();
    resources.set("Font", Object::Dictionary(fonts));
    resources.set("ExtGState", Object::Dictionary(gstates));

    let mut xobject_dict = Dictionary::new();
    xobject_dict.set("Type", Object::Name(b"XObject".to_vec()));
    xobject_dict.set("Subtype", Object::Name(b"Form".to_vec()));
    xobject_dict.set("FormType", Object::Integer(1));
    xobject_dict.set(
        "BBox",
        Object::Array(vec![
            Object::Real(0.0),
            Object::Real(0.0),
            Object::Real(overlay.width),
            Object::Real(overlay.height),
        ]),
    );
    xobject_dict.set(
        "Matrix",
        Object::Array(geometry.display_to_user_matrix().iter().map(|v| Object::Real(*v)).collect()),
    );
    xobject_dict.set("Resources", Object::Dictionary(resources));

    doc.add_object(Object::Stream(Stream::new(xobject_dict, overlay.content.clone())))
}

/// Register the overlay in the page's XObject resources
///
/// Returns the resource name under which it was registered; an existing
/// name is never overwritten.
fn add_xobject_to_page_resources(doc: &mut Document, page_id: ObjectId, xobject_id: ObjectId) -> Result<String> {
    let mut resources = {
        let page = doc.get_dictionary(page_id)?;
        match page.get(b"Resources").ok().and_then(|r| resolve(doc, r)) {
            Some(Object::Dictionary(dict)) => dict.clone(),
            _ => Dictionary::new(),
        }
    };

    let mut xobjects = match resources.get(b"XObject").ok().and_then(|x| resolve(doc, x)) {
        Some(Object::Dictionary(dict)) => dict.clone(),
        _ => Dictionary::new(),
    };

    let mut name = XOBJECT_BASE_NAME.to_string();
    let mut suffix = 1;
    while xobjects.has(name.as_bytes()) {
        name = format!("{}{}", XOBJECT_BASE_NAME, suffix);
        suffix += 1;
    }

    xobjects.set(name.as_bytes().to_vec(), Object::Reference(xobject_id));
    resources.set("XObject", Object::Dictionary(xobjects));

    // The page gets its own copy so shared resource dictionaries stay untouched
    doc.get_dictionary_mut(page_id)?
        .set("Resources", Object::Dictionary(resources));

    Ok(name)
}

/// Page Contents as a list of stream references
fn content_list(page: &Dictionary) -> Vec<Object> {
    match page.get(b"Contents") {
        Ok(Object::Reference(id)) => vec![Object::Reference(*id)],
        Ok(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    }
}

/// Put a content stream before the page's own content
fn prepend_content_to_page(doc: &mut Document, page_id: ObjectId, new_content_id: ObjectId) -> Result<()> {
    let page = doc.get_dictionary_mut(page_id)?;
    let mut contents = content_list(page);
    contents.insert(0, Object::Reference(new_content_id));
    page.set("Contents", Object::Array(contents));
    Ok(())
}

/// Put a content stream after the page's own content, so it draws on top
fn append_content_to_page(doc: &mut Document, page_id: ObjectId, new_content_id: ObjectId) -> Result<()> {
    let page = doc.get_dictionary_mut(page_id)?;
    let mut contents = content_list(page);
    contents.push(Object::Reference(new_content_id));
    page.set("Contents", Object::Array(contents));
    Ok(())
}
