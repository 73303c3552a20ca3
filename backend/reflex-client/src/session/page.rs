use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Narrow page-access capability the session applies updates through.
pub trait Page: Send + Sync + 'static {
    /// Handle to an element on the page.
    type Element;

    fn element_by_id(&self, id: &str) -> Option<Self::Element>;

    /// Replace the element's inner content with `markup`, verbatim.
    fn set_content(&self, element: &Self::Element, markup: &str);
}

/// In-memory page: a map from element id to inner content.
#[derive(Debug, Default)]
pub struct MemoryPage {
    elements: RwLock<HashMap<String, String>>,
}

impl MemoryPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_element(self, id: impl Into<String>, content: impl Into<String>) -> Self {
        self.insert_element(id, content);
        self
    }

    pub fn insert_element(&self, id: impl Into<String>, content: impl Into<String>) {
        self.elements
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.into(), content.into());
    }

    pub fn remove_element(&self, id: &str) -> Option<String> {
        self.elements
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }

    pub fn content(&self, id: &str) -> Option<String> {
        self.elements
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn snapshot(&self) -> HashMap<String, String> {
        self.elements
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Page for MemoryPage {
    type Element = String;

    fn element_by_id(&self, id: &str) -> Option<String> {
        self.elements
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(id)
            .then(|| id.to_string())
    }

    fn set_content(&self, element: &String, markup: &str) {
        let mut elements = self.elements.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(content) = elements.get_mut(element) {
            *content = markup.to_string();
        }
    }
}
