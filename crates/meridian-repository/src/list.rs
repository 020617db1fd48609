use meridian_core::{Entity, JsonApiResult, Links};
use serde_json::{Map, Value};

/// A page of resources returned by a repository.
///
/// Besides the items, a repository can attach top-level `meta` and `links`
/// and the total number of matches (used for pagination links).
///
/// ```
/// use meridian_repository::ResourceList;
///
/// let list = ResourceList::new(vec![1, 2, 3]).with_total(10);
/// assert_eq!(list.len(), 3);
/// assert_eq!(list.total, Some(10));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceList<T> {
    /// Resources of this page.
    pub items: Vec<T>,
    /// Top-level meta information.
    pub meta: Option<Map<String, Value>>,
    /// Top-level links.
    pub links: Option<Links>,
    /// Matches before paging, if known.
    pub total: Option<u64>,
}

/// A type-erased [`ResourceList`].
pub type EntityList = ResourceList<Entity>;

impl<T> Default for ResourceList<T> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T> ResourceList<T> {
    /// Creates a list without meta information.
    #[must_use]
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            meta: None,
            links: None,
            total: None,
        }
    }

    /// Attaches meta information.
    #[must_use]
    pub fn with_meta(mut self, meta: Map<String, Value>) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Attaches links.
    #[must_use]
    pub fn with_links(mut self, links: Links) -> Self {
        self.links = Some(links);
        self
    }

    /// Sets the total number of matches.
    #[must_use]
    pub fn with_total(mut self, total: u64) -> Self {
        self.total = Some(total);
        self
    }

    /// Number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if the page is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Converts every item, keeping meta, links and total.
    pub fn try_map<U>(self, f: impl FnMut(T) -> JsonApiResult<U>) -> JsonApiResult<ResourceList<U>> {
        Ok(ResourceList {
            items: self.items.into_iter().map(f).collect::<JsonApiResult<_>>()?,
            meta: self.meta,
            links: self.links,
            total: self.total,
        })
    }
}

impl<T> From<Vec<T>> for ResourceList<T> {
    fn from(items: Vec<T>) -> Self {
        Self::new(items)
    }
}

impl<T> IntoIterator for ResourceList<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
