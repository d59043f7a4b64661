use async_trait::async_trait;

use crate::error::{ChatError, Result};

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Opens raw PDF bytes into a document handle
#[async_trait]
pub trait PdfLoader: Send + Sync {
    async fn load(&self, bytes: Vec<u8>) -> Result<Box<dyn PdfDocument>>;
}

/// A loaded document. Page numbers are 1-based.
#[async_trait]
pub trait PdfDocument: Send + Sync {
    fn page_count(&self) -> usize;
    async fn page_text(&self, page: usize) -> Result<String>;
}

/// Returns true if the declared content type is PDF (case-insensitive)
pub fn is_pdf(declared_type: &str) -> bool {
    declared_type.trim().eq_ignore_ascii_case(PDF_CONTENT_TYPE)
}

/// Concatenate every page in reading order, each followed by a newline.
/// Pages are awaited one at a time so output order always matches page order.
pub async fn extract_text(doc: &dyn PdfDocument) -> Result<String> {
    let mut all_text = String::new();
    for page in 1..=doc.page_count() {
        let text = doc.page_text(page).await?;
        all_text.push_str(&text);
        all_text.push('\n');
    }
    Ok(all_text)
}

/// `pdf-extract` backed loader. Decoding runs on the blocking pool.
#[derive(Debug, Clone, Default)]
pub struct PdfExtractLoader;

struct ExtractedDocument {
    pages: Vec<String>,
}

#[async_trait]
impl PdfLoader for PdfExtractLoader {
    async fn load(&self, bytes: Vec<u8>) -> Result<Box<dyn PdfDocument>> {
        let pages = tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem_by_pages(&bytes)
        })
        .await
        .map_err(|e| ChatError::Pdf(format!("PDF decode task failed: {e}")))?
        .map_err(|e| ChatError::Pdf(e.to_string()))?;

        tracing::debug!(pages = pages.len(), "Loaded PDF document");
        Ok(Box::new(ExtractedDocument { pages }))
    }
}

#[async_trait]
impl PdfDocument for ExtractedDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    async fn page_text(&self, page: usize) -> Result<String> {
        page.checked_sub(1)
            .and_then(|idx| self.pages.get(idx))
            .cloned()
            .ok_or_else(|| ChatError::Pdf(format!("page {page} out of range")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    struct MockDocument {
        pages: Vec<&'static str>,
        fail_on: Option<usize>,
        visited: Mutex<Vec<usize>>,
    }

    impl MockDocument {
        fn new(pages: Vec<&'static str>) -> Self {
            Self {
                pages,
                fail_on: None,
                visited: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PdfDocument for MockDocument {
        fn page_count(&self) -> usize {
            self.pages.len()
        }

        async fn page_text(&self, page: usize) -> Result<String> {
            // Earlier pages take longer, so any concurrent merge would reorder output.
            let delay = (self.pages.len() - page + 1) as u64;
            tokio::time::sleep(Duration::from_millis(delay * 5)).await;
            self.visited.lock().unwrap().push(page);
            if self.fail_on == Some(page) {
                return Err(ChatError::Pdf("corrupt page".to_string()));
            }
            Ok(self.pages[page - 1].to_string())
        }
    }

    #[tokio::test]
    async fn test_extract_preserves_page_order() {
        let doc = MockDocument::new(vec!["A", "B", "C"]);
        let text = extract_text(&doc).await.unwrap();
        assert_eq!(text, "A\nB\nC\n");
        assert_eq!(*doc.visited.lock().unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_extract_whitespace_pages() {
        let doc = MockDocument::new(vec!["  ", "\t", ""]);
        let text = extract_text(&doc).await.unwrap();
        assert!(text.trim().is_empty());
    }

    #[tokio::test]
    async fn test_extract_empty_document() {
        let doc = MockDocument::new(vec![]);
        assert_eq!(extract_text(&doc).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_extract_stops_on_page_error() {
        let mut doc = MockDocument::new(vec!["A", "B", "C"]);
        doc.fail_on = Some(2);
        assert!(extract_text(&doc).await.is_err());
        assert_eq!(*doc.visited.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_pdf_extract_loader_rejects_garbage() {
        let loader = PdfExtractLoader;
        let res = loader.load(b"definitely not a pdf".to_vec()).await;
        assert!(matches!(res, Err(ChatError::Pdf(_))));
    }

    #[tokio::test]
    async fn test_extracted_document_page_bounds() {
        let doc = ExtractedDocument {
            pages: vec!["one".to_string(), "two".to_string()],
        };
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.page_text(2).await.unwrap(), "two");
        assert!(doc.page_text(0).await.is_err());
        assert!(doc.page_text(3).await.is_err());
    }

    #[test]
    fn test_is_pdf() {
        assert!(is_pdf("application/pdf"));
        assert!(is_pdf("Application/PDF"));
        assert!(!is_pdf("text/plain"));
        assert!(!is_pdf(""));
    }
}
