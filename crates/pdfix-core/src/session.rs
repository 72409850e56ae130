//! The loaded document
//!
//! A session holds the bytes the user opened, exactly as read, plus a
//! rasterizer for showing its pages. The bytes are never mutated; export
//! reloads them into a fresh document.

use std::sync::Arc;

use lopdf::Document;
use tracing::{info, warn};

use crate::error::{PdfixError, Result};
use crate::render::{HayroRasterizer, ImagePages, PageRasterizer};

pub struct DocumentSession {
    name: String,
    original: Option<Arc<Vec<u8>>>,
    page_count: u32,
    current_page: u32,
    rasterizer: Box<dyn PageRasterizer>,
}

impl std::fmt::Debug for DocumentSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentSession")
            .field("name", &self.name)
            .field("original_len", &self.original.as_ref().map(|b| b.len()))
            .field("page_count", &self.page_count)
            .field("current_page", &self.current_page)
            .finish()
    }
}

impl DocumentSession {
    /// Open PDF bytes. Nothing is created when either the structure or the
    /// page rasterizer rejects them.
    pub fn open_pdf(name: &str, bytes: Vec<u8>) -> Result<Self> {
        // Validate with lopdf first; its errors are the more useful ones.
        let doc = Document::load_mem(&bytes).map_err(|e| PdfixError::ParseError(e.to_string()))?;
        let structural_pages = doc.get_pages().len() as u32;
        drop(doc);

        let bytes = Arc::new(bytes);
        let rasterizer = HayroRasterizer::new(Arc::clone(&bytes))?;
        let page_count = rasterizer.page_count();
        if page_count == 0 {
            return Err(PdfixError::ParseError("document has no pages".to_string()));
        }
        if page_count != structural_pages {
            warn!(
                structural_pages,
                page_count,
                "page tree and rasterizer disagree on page count"
            );
        }
        info!(name, page_count, "opened PDF");
        Ok(Self {
            name: name.to_string(),
            original: Some(bytes),
            page_count,
            current_page: 1,
            rasterizer: Box::new(rasterizer),
        })
    }

    /// Use already-decoded page images; there is no original PDF.
    pub fn from_images(name: &str, pages: ImagePages) -> Self {
        let page_count = pages.page_count();
        info!(name, page_count, "opened page images");
        Self {
            name: name.to_string(),
            original: None,
            page_count,
            current_page: 1,
            rasterizer: Box::new(pages),
        }
    }

    /// Session over any rasterizer, for front ends with their own page source.
    pub fn with_rasterizer(
        name: &str,
        original: Option<Vec<u8>>,
        rasterizer: Box<dyn PageRasterizer>,
    ) -> Result<Self> {
        let page_count = rasterizer.page_count();
        if page_count == 0 {
            return Err(PdfixError::ParseError("document has no pages".to_string()));
        }
        Ok(Self {
            name: name.to_string(),
            original: original.map(Arc::new),
            page_count,
            current_page: 1,
            rasterizer,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn original(&self) -> Option<&[u8]> {
        self.original.as_deref().map(Vec::as_slice)
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn set_current_page(&mut self, page: u32) -> Result<()> {
        if page == 0 || page > self.page_count {
            return Err(PdfixError::PageOutOfRange {
                page,
                page_count: self.page_count,
            });
        }
        self.current_page = page;
        Ok(())
    }

    pub fn rasterizer(&self) -> &dyn PageRasterizer {
        self.rasterizer.as_ref()
    }

    /// Suggested file name for the export: `<stem>-edited.pdf`.
    pub fn export_name(&self) -> String {
        let stem = self
            .name
            .rsplit_once('.')
            .map_or(self.name.as_str(), |(stem, _)| stem);
        let stem = if stem.is_empty() { "document" } else { stem };
        format!("{}-edited.pdf", stem)
    }
}
