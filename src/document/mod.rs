// src/document/mod.rs
use std::path::Path;
use crate::utils::error::DocumentError;

/// Loads a PDF and returns its plain text, cleaned up for prompting.
///
/// Image-only PDFs come back as (nearly) empty text; that is not treated as
/// an error here.
pub async fn load_pdf_text(path: &Path) -> Result<String, DocumentError> {
    let path_str = path.display().to_string();
    tracing::info!("Loading document: {}", path_str);

    let bytes = tokio::fs::read(path).await.map_err(|source| DocumentError::Io {
        path: path_str.clone(),
        source,
    })?;
    tracing::debug!("Read {} bytes from {}", bytes.len(), path_str);

    // pdf_extract is synchronous and may panic on malformed input; the join
    // error from the blocking pool covers the panic case.
    let extracted = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
        .await
        .map_err(|e| DocumentError::Pdf {
            path: path_str.clone(),
            reason: format!("PDF parser aborted: {}", e),
        })?
        .map_err(|e| DocumentError::Pdf {
            path: path_str.clone(),
            reason: e.to_string(),
        })?;

    let text = clean_text(&extracted);
    if text.is_empty() {
        tracing::warn!("Document {} has no extractable text (scanned PDF?)", path_str);
    }
    tracing::info!("Document loaded: {} characters", text.chars().count());

    Ok(text)
}

/// Strips PDF artifacts, trims trailing whitespace and collapses blank runs.
fn clean_text(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut blank_run = 0;

    for line in raw.lines() {
        let line = line.replace(['\u{0}', '\u{FEFF}'], "");
        let line = line.trim_end();
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 || out.is_empty() {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }

    out.trim_end().to_string()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    /// Writes a one-page Helvetica PDF with one text line per entry.
    pub(crate) fn write_sample_pdf(path: &Path, lines: &[&str]) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut operations = vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), 760.into()]),
        ];
        for line in lines {
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
            operations.push(Operation::new("Td", vec![0.into(), (-18).into()]));
        }
        operations.push(Operation::new("ET", vec![]));
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    #[test]
    fn test_loads_text_from_pdf() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nomina.pdf");
        write_sample_pdf(&path, &["NOMINA DE OPERADORES", "Empresa Uno 76000000"]);

        let text = tokio_test::block_on(load_pdf_text(&path)).unwrap();

        assert!(text.contains("OPERADORES"), "text: {:?}", text);
        assert!(text.contains("76000000"), "text: {:?}", text);
    }

    #[test]
    fn test_clean_text() {
        let raw = "\n\n\u{FEFF}I. Instituciones  \n\n\n\n1 Empresa A\u{0} 76.000.000-1   \n   \n";
        assert_eq!(clean_text(raw), "I. Instituciones\n\n1 Empresa A 76.000.000-1");
    }

    #[test]
    fn test_clean_text_keeps_indentation() {
        assert_eq!(clean_text("  Nº  RUT\n  1   2"), "  Nº  RUT\n  1   2");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("missing.pdf");

        let result = tokio_test::block_on(load_pdf_text(&path));

        assert!(matches!(result, Err(DocumentError::Io { .. })), "got {:?}", result);
    }

    #[test]
    fn test_non_pdf_is_pdf_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("not_a.pdf");
        std::fs::write(&path, b"plain text, definitely not a PDF").unwrap();

        let result = tokio_test::block_on(load_pdf_text(&path));

        assert!(matches!(result, Err(DocumentError::Pdf { .. })), "got {:?}", result);
    }
}
