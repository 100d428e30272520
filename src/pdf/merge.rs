//! Concatenation, bookmarks and TOC links using lopdf

use std::collections::BTreeMap;

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::accounting::OutlineNode;
use crate::error::{Error, Result};
use crate::pdf::create::PendingLink;
use crate::pdf::metadata::flatten_inherited_attributes;
use crate::pdf::metrics::text_string;

/// Concatenate documents, in order, into one new document
///
/// Based on the lopdf merge example: every document is renumbered past the
/// previous one, its objects are collected, and a fresh Pages node and
/// Catalog adopt all pages. Old catalogs, page trees and anything only they
/// referenced are pruned.
///
/// Returns the merged document and its page ids in order, so that 1-based
/// page `n` is `page_ids[n - 1]`.
pub fn concatenate(documents: Vec<Document>) -> Result<(Document, Vec<ObjectId>)> {
    if documents.is_empty() {
        return Err(Error::General("Nothing to concatenate".to_string()));
    }

    let mut max_id = 1;
    let mut page_ids: Vec<ObjectId> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for mut doc in documents {
        // Pages are about to lose their parents
        flatten_inherited_attributes(&mut doc)?;

        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        page_ids.extend(doc.get_pages().into_values());

        for (id, object) in doc.objects {
            let type_name = object
                .as_dict()
                .ok()
                .and_then(|dict| dict.get(b"Type").ok())
                .and_then(|t| t.as_name().ok());
            match type_name {
                Some(b"Catalog") | Some(b"Pages") | Some(b"Outlines") => {}
                _ => {
                    objects.insert(id, object);
                }
            }
        }
    }

    let mut merged = Document::with_version("1.5");
    merged.objects.extend(objects);
    // new_object_id() must hand out ids above everything collected
    merged.max_id = max_id - 1;

    let pages_id = merged.new_object_id();
    let kids: Vec<Object> = page_ids.iter().map(|&id| Object::Reference(id)).collect();

    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Count", Object::Integer(page_ids.len() as i64));
    pages.set("Kids", Object::Array(kids));
    merged.objects.insert(pages_id, Object::Dictionary(pages));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = merged.add_object(Object::Dictionary(catalog));
    merged.trailer.set("Root", Object::Reference(catalog_id));

    for &page_id in &page_ids {
        merged
            .get_dictionary_mut(page_id)?
            .set("Parent", Object::Reference(pages_id));
    }

    let pruned = merged.prune_objects();
    log::debug!(
        "Concatenated {} pages, pruned {} unreachable objects",
        page_ids.len(),
        pruned.len()
    );

    Ok((merged, page_ids))
}

/// Look up the page id for a 1-based page number
fn page_for(page_ids: &[ObjectId], page_number: usize) -> Result<ObjectId> {
    page_number
        .checked_sub(1)
        .and_then(|idx| page_ids.get(idx))
        .copied()
        .ok_or_else(|| {
            Error::General(format!(
                "Page {} is outside the {}-page document",
                page_number,
                page_ids.len()
            ))
        })
}

/// Destination showing a whole page
fn fit_destination(page_id: ObjectId) -> Object {
    Object::Array(vec![Object::Reference(page_id), Object::Name(b"Fit".to_vec())])
}

/// Write one level of outline items under `parent_id`
///
/// Returns (first, last) item ids and the number of items visible when
/// every level is open.
fn write_outline_level(
    doc: &mut Document,
    nodes: &[OutlineNode],
    parent_id: ObjectId,
    page_ids: &[ObjectId],
) -> Result<(Option<(ObjectId, ObjectId)>, i64)> {
    if nodes.is_empty() {
        return Ok((None, 0));
    }

    let item_ids: Vec<ObjectId> = nodes.iter().map(|_| doc.new_object_id()).collect();
    let mut visible = nodes.len() as i64;

    for (i, node) in nodes.iter().enumerate() {
        let page_id = page_for(page_ids, node.target_page)?;

        let mut item = Dictionary::new();
        item.set("Title", text_string(&node.title));
        item.set("Parent", Object::Reference(parent_id));
        item.set("Dest", fit_destination(page_id));
        if i > 0 {
            item.set("Prev", Object::Reference(item_ids[i - 1]));
        }
        if i + 1 < item_ids.len() {
            item.set("Next", Object::Reference(item_ids[i + 1]));
        }

        let (children, child_count) = write_outline_level(doc, &node.children, item_ids[i], page_ids)?;
        if let Some((first, last)) = children {
            item.set("First", Object::Reference(first));
            item.set("Last", Object::Reference(last));
            item.set("Count", Object::Integer(child_count));
            visible += child_count;
        }

        doc.objects.insert(item_ids[i], Object::Dictionary(item));
    }

    Ok((Some((item_ids[0], item_ids[item_ids.len() - 1])), visible))
}

/// Attach a bookmark tree and open the document with it visible
pub fn add_outline(doc: &mut Document, nodes: &[OutlineNode], page_ids: &[ObjectId]) -> Result<()> {
    if nodes.is_empty() {
        return Ok(());
    }

    let outlines_id = doc.new_object_id();
    let (range, visible) = write_outline_level(doc, nodes, outlines_id, page_ids)?;

    let mut outlines = Dictionary::new();
    outlines.set("Type", Object::Name(b"Outlines".to_vec()));
    outlines.set("Count", Object::Integer(visible));
    if let Some((first, last)) = range {
        outlines.set("First", Object::Reference(first));
        outlines.set("Last", Object::Reference(last));
    }
    doc.objects.insert(outlines_id, Object::Dictionary(outlines));

    let catalog = doc.catalog_mut()?;
    catalog.set("Outlines", Object::Reference(outlines_id));
    catalog.set("PageMode", Object::Name(b"UseOutlines".to_vec()));

    Ok(())
}

/// Add link annotations to `page_id`, each jumping to its target page
pub fn add_links(doc: &mut Document, page_id: ObjectId, links: &[PendingLink], page_ids: &[ObjectId]) -> Result<()> {
    if links.is_empty() {
        return Ok(());
    }

    let mut annotations: Vec<Object> = match doc.get_dictionary(page_id)?.get(b"Annots") {
        Ok(Object::Array(existing)) => existing.clone(),
        _ => Vec::new(),
    };

    for link in links {
        let target = page_for(page_ids, link.target_page)?;

        let mut annotation = Dictionary::new();
        annotation.set("Type", Object::Name(b"Annot".to_vec()));
        annotation.set("Subtype", Object::Name(b"Link".to_vec()));
        annotation.set("Rect", Object::Array(link.rect.iter().map(|v| Object::Real(*v)).collect()));
        annotation.set(
            "Border",
            Object::Array(vec![Object::Integer(0), Object::Integer(0), Object::Integer(0)]),
        );
        annotation.set("Dest", fit_destination(target));
        annotations.push(Object::Reference(doc.add_object(Object::Dictionary(annotation))));
    }

    doc.get_dictionary_mut(page_id)?
        .set("Annots", Object::Array(annotations));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Stream};

    fn create_test_document(page_count: usize) -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut kids: Vec<Object> = Vec::new();
        for i in 0..page_count {
            let content = doc.add_object(Stream::new(dictionary! {}, format!("% page {}", i).into_bytes()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content,
            });
            kids.push(page_id.into());
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => page_count as i64,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc
    }

    fn node(title: &str, target_page: usize, children: Vec<OutlineNode>) -> OutlineNode {
        OutlineNode {
            title: title.to_string(),
            target_page,
            children,
        }
    }

    #[test]
    fn test_concatenate_keeps_order_and_count() {
        let docs = vec![create_test_document(1), create_test_document(3), create_test_document(2)];
        let (merged, page_ids) = concatenate(docs).unwrap();

        assert_eq!(page_ids.len(), 6);
        let pages: Vec<ObjectId> = merged.get_pages().into_values().collect();
        assert_eq!(pages, page_ids);

        // Inherited MediaBox survives the new parent
        for id in &page_ids {
            assert!(merged.get_dictionary(*id).unwrap().has(b"MediaBox"));
        }
    }

    #[test]
    fn test_concatenate_empty_input() {
        assert!(concatenate(Vec::new()).is_err());
    }

    #[test]
    fn test_outline_structure() {
        let (mut doc, page_ids) = concatenate(vec![create_test_document(5)]).unwrap();
        let nodes = vec![
            node("Alice", 1, vec![node("CNI", 2, vec![]), node("Bail", 3, vec![])]),
            node("Bob", 4, vec![node("Contrat", 5, vec![])]),
        ];

        add_outline(&mut doc, &nodes, &page_ids).unwrap();

        let catalog = doc.catalog().unwrap();
        assert_eq!(catalog.get(b"PageMode").unwrap().as_name().unwrap(), b"UseOutlines");
        let outlines_id = catalog.get(b"Outlines").unwrap().as_reference().unwrap();
        let outlines = doc.get_dictionary(outlines_id).unwrap();
        assert_eq!(outlines.get(b"Count").unwrap().as_i64().unwrap(), 5);

        let first_id = outlines.get(b"First").unwrap().as_reference().unwrap();
        let first = doc.get_dictionary(first_id).unwrap();
        assert_eq!(first.get(b"Count").unwrap().as_i64().unwrap(), 2);
        let dest = first.get(b"Dest").unwrap().as_array().unwrap();
        assert_eq!(dest[0].as_reference().unwrap(), page_ids[0]);

        let child_id = first.get(b"Last").unwrap().as_reference().unwrap();
        let child = doc.get_dictionary(child_id).unwrap();
        let dest = child.get(b"Dest").unwrap().as_array().unwrap();
        assert_eq!(dest[0].as_reference().unwrap(), page_ids[2]);
        assert_eq!(child.get(b"Parent").unwrap().as_reference().unwrap(), first_id);
    }

    #[test]
    fn test_outline_rejects_missing_page() {
        let (mut doc, page_ids) = concatenate(vec![create_test_document(2)]).unwrap();
        let nodes = vec![node("Ghost", 9, vec![])];
        assert!(add_outline(&mut doc, &nodes, &page_ids).is_err());
    }

    #[test]
    fn test_add_links() {
        let (mut doc, page_ids) = concatenate(vec![create_test_document(3)]).unwrap();
        let links = vec![
            PendingLink { rect: [72.0, 700.0, 520.0, 718.0], target_page: 2 },
            PendingLink { rect: [72.0, 682.0, 520.0, 700.0], target_page: 3 },
        ];

        add_links(&mut doc, page_ids[0], &links, &page_ids).unwrap();

        let page = doc.get_dictionary(page_ids[0]).unwrap();
        let annots = page.get(b"Annots").unwrap().as_array().unwrap();
        assert_eq!(annots.len(), 2);

        let second = doc.get_dictionary(annots[1].as_reference().unwrap()).unwrap();
        assert_eq!(second.get(b"Subtype").unwrap().as_name().unwrap(), b"Link");
        let dest = second.get(b"Dest").unwrap().as_array().unwrap();
        assert_eq!(dest[0].as_reference().unwrap(), page_ids[2]);
    }
}
