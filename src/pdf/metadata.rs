//! Page tree geometry and document metadata

use std::path::Path;

use chrono::NaiveDateTime;
use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::error::{Error, Result};
use crate::pdf::metrics::text_string;

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE_KEYS: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Guard against cyclic Parent chains in broken files
const MAX_TREE_DEPTH: usize = 64;

/// Follow a reference, or return the object itself
pub fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Read a numeric object as f32
fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(n) => Some(*n as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

/// Look up a page attribute, climbing Parent links when the page lacks it
pub fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = page_id;

    for _ in 0..MAX_TREE_DEPTH {
        let dict = doc.get_dictionary(current).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value.clone());
        }
        match dict.get(b"Parent") {
            Ok(Object::Reference(parent)) => current = *parent,
            _ => return None,
        }
    }

    None
}

/// Copy inherited attributes onto every page
///
/// Merging re-parents pages under a new Pages node, and the watermarker
/// gives pages their own Resources dictionary. Both would silently drop
/// anything a page only had through its ancestors.
pub fn flatten_inherited_attributes(doc: &mut Document) -> Result<()> {
    let page_ids: Vec<ObjectId> = doc.get_pages().values().copied().collect();

    for page_id in page_ids {
        let mut missing: Vec<(&[u8], Object)> = Vec::new();
        {
            let page = doc.get_dictionary(page_id)?;
            for key in INHERITABLE_KEYS {
                if page.has(key) {
                    continue;
                }
                if let Some(value) = inherited_attribute(doc, page_id, key) {
                    missing.push((key, value));
                }
            }
        }

        if missing.is_empty() {
            continue;
        }
        let page = doc.get_dictionary_mut(page_id)?;
        for (key, value) in missing {
            page.set(key.to_vec(), value);
        }
    }

    Ok(())
}

/// Visible geometry of one page
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    /// Visible box in user space: [llx, lly, urx, ury]
    pub bounds: [f32; 4],
    /// Clockwise display rotation, one of 0, 90, 180, 270
    pub rotation: i64,
}

impl PageGeometry {
    /// Default geometry when a page has no usable MediaBox (US Letter)
    pub fn letter() -> Self {
        Self {
            bounds: [0.0, 0.0, 612.0, 792.0],
            rotation: 0,
        }
    }

    /// Read the geometry of a page (CropBox if present, else MediaBox)
    pub fn of(doc: &Document, page_id: ObjectId) -> Self {
        let read_box = |key: &[u8]| -> Option<[f32; 4]> {
            let object = inherited_attribute(doc, page_id, key)?;
            let array = resolve(doc, &object)?.as_array().ok()?;
            if array.len() != 4 {
                return None;
            }
            let mut values = [0.0f32; 4];
            for (slot, item) in values.iter_mut().zip(array) {
                *slot = number(resolve(doc, item)?)?;
            }
            Some([
                values[0].min(values[2]),
                values[1].min(values[3]),
                values[0].max(values[2]),
                values[1].max(values[3]),
            ])
        };

        let media = read_box(b"MediaBox");
        let crop = read_box(b"CropBox");
        let bounds = match (media, crop) {
            (Some(m), Some(c)) => {
                let clipped = [m[0].max(c[0]), m[1].max(c[1]), m[2].min(c[2]), m[3].min(c[3])];
                if clipped[2] > clipped[0] && clipped[3] > clipped[1] {
                    clipped
                } else {
                    m
                }
            }
            (Some(m), None) => m,
            _ => Self::letter().bounds,
        };

        let rotation = inherited_attribute(doc, page_id, b"Rotate")
            .and_then(|r| r.as_i64().ok())
            .map(normalize_rotation)
            .unwrap_or(0);

        Self { bounds, rotation }
    }

    /// Width and height as the page is displayed
    pub fn visible_size(&self) -> (f32, f32) {
        let width = self.bounds[2] - self.bounds[0];
        let height = self.bounds[3] - self.bounds[1];
        if self.rotation == 90 || self.rotation == 270 {
            (height, width)
        } else {
            (width, height)
        }
    }

    /// Matrix mapping displayed coordinates onto the page's user space
    ///
    /// Content drawn through this matrix appears upright in a viewer that
    /// honours `/Rotate`.
    pub fn display_to_user_matrix(&self) -> [f32; 6] {
        let [llx, lly, urx, ury] = self.bounds;
        let width = urx - llx;
        let height = ury - lly;

        match self.rotation {
            90 => [0.0, 1.0, -1.0, 0.0, llx + width, lly],
            180 => [-1.0, 0.0, 0.0, -1.0, llx + width, lly + height],
            270 => [0.0, -1.0, 1.0, 0.0, llx, lly + height],
            _ => [1.0, 0.0, 0.0, 1.0, llx, lly],
        }
    }
}

/// Clamp a /Rotate value to 0, 90, 180 or 270
fn normalize_rotation(rotate: i64) -> i64 {
    let r = rotate.rem_euclid(360);
    if r % 90 == 0 {
        r
    } else {
        0
    }
}

/// Set Title, Producer and CreationDate in the document Info dictionary
pub fn set_document_info(doc: &mut Document, title: &str, created: &NaiveDateTime) {
    let mut info = Dictionary::new();
    info.set("Title", text_string(title));
    info.set(
        "Producer",
        Object::string_literal(format!("pdf-dossier {}", env!("CARGO_PKG_VERSION"))),
    );
    info.set(
        "CreationDate",
        Object::string_literal(created.format("D:%Y%m%d%H%M%S").to_string()),
    );

    let info_id = doc.add_object(Object::Dictionary(info));
    doc.trailer.set("Info", Object::Reference(info_id));
}

/// Count the number of pages in a PDF file
pub fn count_pages(path: &Path) -> Result<usize> {
    if !path.exists() {
        return Err(Error::PdfRead {
            path: path.to_path_buf(),
            reason: "file not found".to_string(),
        });
    }

    let doc = Document::load(path)?;
    Ok(doc.get_pages().len())
}
