use crate::error::{Error, Result};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    WordProcessing,
}

impl DocumentKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "docx" => Some(DocumentKind::WordProcessing),
            _ => None,
        }
    }
}

/// Plain text of a supported document, `Ok(None)` for any other file type.
pub fn extract_text(path: &Path) -> Result<Option<String>> {
    let Some(kind) = DocumentKind::from_path(path) else {
        return Ok(None);
    };
    check_content(path, kind)?;
    let text = match kind {
        DocumentKind::Pdf => pdf_text(path)?,
        DocumentKind::WordProcessing => docx_text(path)?,
    };
    Ok(Some(text))
}

/// Rejects files whose leading bytes say they are something else entirely.
fn check_content(path: &Path, kind: DocumentKind) -> Result<()> {
    let sniffed = infer::get_from_path(path).map_err(|e| Error::io(path, e))?;
    let Some(found) = sniffed else {
        return Ok(());
    };
    let mime = found.mime_type();
    let plausible = match kind {
        DocumentKind::Pdf => mime == "application/pdf",
        DocumentKind::WordProcessing => {
            mime == "application/zip" || mime.contains("officedocument") || mime == "application/msword"
        }
    };
    if plausible {
        Ok(())
    } else {
        Err(Error::parse(path, format!("content looks like {mime}")))
    }
}

#[cfg(feature = "pdf")]
fn pdf_text(path: &Path) -> Result<String> {
    let doc = lopdf::Document::load(path).map_err(|e| Error::parse(path, e))?;
    if doc.is_encrypted() {
        return Err(Error::parse(path, "document is encrypted"));
    }
    let mut pages = Vec::new();
    for page_number in doc.get_pages().keys() {
        let text = doc
            .extract_text(&[*page_number])
            .map_err(|e| Error::parse(path, format!("page {page_number}: {e}")))?;
        pages.push(text);
    }
    Ok(pages.join("\n"))
}

#[cfg(not(feature = "pdf"))]
fn pdf_text(path: &Path) -> Result<String> {
    Err(Error::parse(path, "built without PDF support"))
}

#[cfg(feature = "office")]
fn docx_text(path: &Path) -> Result<String> {
    use std::io::Read;

    let file = std::fs::File::open(path).map_err(|e| Error::io(path, e))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| Error::parse(path, e))?;
    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| Error::parse(path, e))?
        .read_to_string(&mut xml)
        .map_err(|e| Error::parse(path, e))?;
    paragraphs_from_xml(&xml)
        .map(|paragraphs| paragraphs.join("\n"))
        .map_err(|e| Error::parse(path, e))
}

#[cfg(not(feature = "office"))]
fn docx_text(path: &Path) -> Result<String> {
    Err(Error::parse(path, "built without office document support"))
}

/// Paragraph texts of a WordprocessingML body, in document order.
fn paragraphs_from_xml(xml: &str) -> std::result::Result<Vec<String>, quick_xml::Error> {
    use quick_xml::events::Event;

    let mut reader = quick_xml::Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    loop {
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == b"t" => in_text = true,
            Event::End(e) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => paragraphs.push(std::mem::take(&mut current)),
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"tab" => current.push('\t'),
                b"br" | b"cr" => current.push('\n'),
                b"p" => paragraphs.push(String::new()),
                _ => {}
            },
            Event::Text(t) if in_text => current.push_str(&t.unescape()?),
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(paragraphs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_is_chosen_by_extension() {
        assert_eq!(DocumentKind::from_path(Path::new("a/B.PDF")), Some(DocumentKind::Pdf));
        assert_eq!(
            DocumentKind::from_path(Path::new("letter.docx")),
            Some(DocumentKind::WordProcessing)
        );
        assert_eq!(DocumentKind::from_path(Path::new("sheet.xlsx")), None);
        assert_eq!(DocumentKind::from_path(Path::new("README")), None);
    }

    #[test]
    fn unsupported_types_have_no_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "plain words").unwrap();
        assert_eq!(extract_text(&path).unwrap(), None);
    }

    #[test]
    fn paragraphs_keep_order_tabs_and_escapes() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>Dear</w:t></w:r><w:r><w:t xml:space="preserve"> Claimant,</w:t></w:r></w:p>
    <w:p/>
    <w:p><w:r><w:t>Amount</w:t><w:tab/><w:t>$1 &amp; change</w:t></w:r></w:p>
  </w:body>
</w:document>"#;
        let paragraphs = paragraphs_from_xml(xml).unwrap();
        assert_eq!(paragraphs, vec!["Dear Claimant,", "", "Amount\t$1 & change"]);
    }

    #[test]
    fn mislabelled_pdf_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.pdf");
        // PNG magic bytes
        std::fs::write(&path, [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0]).unwrap();
        let err = extract_text(&path).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }), "{err}");
    }
}
