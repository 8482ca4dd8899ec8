//! Page merge: splice the replacement pages into the source document.
//!
//! The output is the source document with every selected page swapped for
//! the next unused replacement page; unselected pages (and everything they
//! reference) are carried over untouched, in order.
//!
//! Objects from the replacement document are imported with their ids
//! shifted past the source's highest id, so the two id spaces never collide.
//! The page tree is then rebuilt flat under the source's root `Pages` node.
//! Attributes a kept page inherited from an intermediate node (`Resources`,
//! `MediaBox`, `CropBox`, `Rotate`) are pushed down onto the page first so
//! flattening never changes how it renders.
//!
//! All validation happens before the source document is mutated, and the
//! output file is written atomically: on any failure nothing appears at the
//! output path.

use crate::error::PdfInvertError;
use crate::pages::PageSet;
use lopdf::{Document, Object, ObjectId};
use std::path::Path;
use tracing::{debug, info};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guards the parent walk against malformed, cyclic page trees.
const MAX_TREE_DEPTH: usize = 64;

/// Outcome of a successful merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeReport {
    /// Pages in the source (and output) document.
    pub total_pages: usize,
    /// Pages taken from the replacement document.
    pub replaced_pages: usize,
    /// Size of the written output file.
    pub output_bytes: usize,
}

/// Load a PDF with lopdf, rejecting encrypted documents.
pub fn load_pdf(path: &Path) -> Result<Document, PdfInvertError> {
    let doc = Document::load(path).map_err(|e| PdfInvertError::CorruptPdf {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    ensure_unencrypted(&doc, path)?;
    Ok(doc)
}

fn ensure_unencrypted(doc: &Document, path: &Path) -> Result<(), PdfInvertError> {
    if doc.trailer.has(b"Encrypt") {
        return Err(PdfInvertError::EncryptedPdf {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

/// Fail with [`PdfInvertError::PageOutOfRange`] if any selected page is
/// past the end of a `total`-page document.
pub fn check_selection(pages: &PageSet, total: usize) -> Result<(), PdfInvertError> {
    let max = pages.max();
    if max as usize > total {
        return Err(PdfInvertError::PageOutOfRange { page: max, total });
    }
    Ok(())
}

/// Merge the replacement PDF into the source PDF and write `output`.
pub fn merge(
    source_path: &Path,
    replacement_path: &Path,
    pages: &PageSet,
    output: &Path,
) -> Result<MergeReport, PdfInvertError> {
    let source = load_pdf(source_path)?;
    let replacement = load_pdf(replacement_path)?;

    let total_pages = source.get_pages().len();
    let mut merged = merge_documents(source, replacement, pages)?;
    merged.compress();

    let mut buffer = Vec::new();
    merged
        .save_to(&mut buffer)
        .map_err(|e| PdfInvertError::io("Failed to serialise merged PDF", e))?;
    write_atomic(output, &buffer)?;

    info!(
        "Merged {} replacement pages into {}-page document → {} ({} bytes)",
        pages.len(),
        total_pages,
        output.display(),
        buffer.len()
    );

    Ok(MergeReport {
        total_pages,
        replaced_pages: pages.len(),
        output_bytes: buffer.len(),
    })
}

/// Splice `replacement`'s pages into `source` in place of the pages in
/// `pages`, returning the modified source.
///
/// Validates that every selected page exists and that the replacement has
/// exactly one page per selected page before touching anything.
pub fn merge_documents(
    mut source: Document,
    replacement: Document,
    pages: &PageSet,
) -> Result<Document, PdfInvertError> {
    if pages.is_empty() {
        return Err(PdfInvertError::EmptySelection);
    }

    let source_pages: Vec<ObjectId> = source.get_pages().into_values().collect();
    check_selection(pages, source_pages.len())?;

    let replacement_pages: Vec<ObjectId> = replacement.get_pages().into_values().collect();
    if replacement_pages.len() != pages.len() {
        return Err(PdfInvertError::ReplacementCountMismatch {
            expected: pages.len(),
            actual: replacement_pages.len(),
        });
    }

    let root_pages = root_pages_id(&source)?;

    // Push inherited attributes down before the tree is flattened.
    for (idx, &page_id) in source_pages.iter().enumerate() {
        if pages.contains(idx as u32 + 1) {
            continue;
        }
        let inherited = inherited_attributes(&source, page_id)?;
        if inherited.is_empty() {
            continue;
        }
        let page = source.get_dictionary_mut(page_id)?;
        for (key, value) in inherited {
            page.set(key, value);
        }
    }
    {
        let root = source.get_dictionary_mut(root_pages)?;
        for key in INHERITABLE {
            root.remove(key);
        }
    }

    // Import every replacement object with shifted ids.
    let offset = source.max_id;
    for (id, mut object) in replacement.objects {
        shift_references(&mut object, offset);
        source.objects.insert((id.0 + offset, id.1), object);
    }
    source.max_id = source.max_id.max(replacement.max_id + offset);
    let replacement_pages: Vec<ObjectId> = replacement_pages
        .into_iter()
        .map(|(num, gen)| (num + offset, gen))
        .collect();

    // Walk the source page sequence, consuming replacements in order.
    let mut kids = Vec::with_capacity(source_pages.len());
    let mut cursor = 0;
    for (idx, &page_id) in source_pages.iter().enumerate() {
        let page_num = idx as u32 + 1;
        if pages.contains(page_num) {
            let Some(&new_id) = replacement_pages.get(cursor) else {
                return Err(PdfInvertError::CursorMismatch {
                    consumed: cursor,
                    expected: replacement_pages.len(),
                });
            };
            debug!("Page {} ← replacement page {}", page_num, cursor + 1);
            kids.push(new_id);
            cursor += 1;
        } else {
            kids.push(page_id);
        }
    }
    if cursor != replacement_pages.len() {
        return Err(PdfInvertError::CursorMismatch {
            consumed: cursor,
            expected: replacement_pages.len(),
        });
    }

    for &kid in &kids {
        source.get_dictionary_mut(kid)?.set("Parent", root_pages);
    }
    for &new_id in &replacement_pages {
        source.get_dictionary_mut(new_id)?.set("Rotate", 0i64);
    }

    let count = kids.len() as i64;
    let root = source.get_dictionary_mut(root_pages)?;
    root.set(
        "Kids",
        kids.into_iter().map(Object::Reference).collect::<Vec<_>>(),
    );
    root.set("Count", count);

    let pruned = source.prune_objects();
    debug!("Pruned {} unreachable objects", pruned.len());

    Ok(source)
}

/// Id of the `Pages` node the catalog points at.
fn root_pages_id(doc: &Document) -> Result<ObjectId, PdfInvertError> {
    let catalog = doc.catalog()?;
    Ok(catalog.get(b"Pages")?.as_reference()?)
}

/// Attributes `page_id` lacks but inherits from an ancestor, nearest first.
fn inherited_attributes(
    doc: &Document,
    page_id: ObjectId,
) -> Result<Vec<(Vec<u8>, Object)>, PdfInvertError> {
    let page = doc.get_dictionary(page_id)?;
    let mut missing: Vec<&[u8]> = INHERITABLE.into_iter().filter(|k| !page.has(k)).collect();
    let mut found = Vec::new();

    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;
    while let Some(node_id) = parent {
        if missing.is_empty() || depth >= MAX_TREE_DEPTH {
            break;
        }
        let node = doc.get_dictionary(node_id)?;
        missing.retain(|key| match node.get(key) {
            Ok(value) => {
                found.push((key.to_vec(), value.clone()));
                false
            }
            Err(_) => true,
        });
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
        depth += 1;
    }

    Ok(found)
}

/// Add `offset` to every object number referenced from `obj`.
fn shift_references(obj: &mut Object, offset: u32) {
    match obj {
        Object::Reference(id) => id.0 += offset,
        Object::Array(arr) => arr.iter_mut().for_each(|o| shift_references(o, offset)),
        Object::Dictionary(dict) => dict
            .iter_mut()
            .for_each(|(_, v)| shift_references(v, offset)),
        Object::Stream(stream) => stream
            .dict
            .iter_mut()
            .for_each(|(_, v)| shift_references(v, offset)),
        _ => {}
    }
}

/// Write `bytes` to `path` via a temporary file in the same directory, so a
/// failure never leaves a partial file at `path`.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PdfInvertError> {
    use std::io::Write;

    let write_err = |source| PdfInvertError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(write_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(write_err)?;
    tmp.write_all(bytes).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}
