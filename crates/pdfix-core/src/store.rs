//! Page-indexed annotation storage

use std::collections::BTreeMap;

use crate::error::{PdfixError, Result};
use crate::scene::PageScene;

/// Stored scenes for pages that are not currently displayed.
///
/// Pages are 1-based and bounded by the document page count. A page without
/// an entry has no annotations.
#[derive(Debug, Clone, Default)]
pub struct AnnotationStore {
    page_count: u32,
    scenes: BTreeMap<u32, PageScene>,
}

impl AnnotationStore {
    pub fn new(page_count: u32) -> Self {
        Self {
            page_count,
            scenes: BTreeMap::new(),
        }
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Drop every scene and rebind to a new document.
    pub fn reset(&mut self, page_count: u32) {
        self.page_count = page_count;
        self.clear_all();
    }

    pub fn clear_all(&mut self) {
        self.scenes.clear();
    }

    pub fn check_page(&self, page: u32) -> Result<()> {
        if page == 0 || page > self.page_count {
            return Err(PdfixError::PageOutOfRange {
                page,
                page_count: self.page_count,
            });
        }
        Ok(())
    }

    /// Overwrite the stored scene for `page`.
    pub fn save_scene(&mut self, page: u32, scene: PageScene) -> Result<()> {
        self.check_page(page)?;
        self.scenes.insert(page, scene);
        Ok(())
    }

    pub fn load_scene(&self, page: u32) -> Option<&PageScene> {
        self.scenes.get(&page)
    }

    /// Remove the stored scene for `page`, returning it.
    pub fn clear(&mut self, page: u32) -> Option<PageScene> {
        self.scenes.remove(&page)
    }

    /// Pages with a stored scene, ascending.
    pub fn pages(&self) -> impl Iterator<Item = u32> + '_ {
        self.scenes.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}
