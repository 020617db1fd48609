//! HTTP method tables.
//!
//! [`MethodTable`] maps the JSON:API methods (GET, POST, PATCH, DELETE) to
//! handlers for a single path shape.

use http::Method;

/// Maps HTTP methods to handlers for one path shape.
///
/// # Example
///
/// ```rust
/// use meridian_router::MethodTable;
/// use http::Method;
///
/// let mut table = MethodTable::new();
/// assert!(table.insert(&Method::GET, "listTasks").is_ok());
/// assert!(table.insert(&Method::POST, "createTask").is_ok());
///
/// assert_eq!(table.get(&Method::GET), Some(&"listTasks"));
/// assert_eq!(table.get(&Method::DELETE), None);
/// assert!(table.insert(&Method::GET, "again").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct MethodTable<T> {
    get: Option<T>,
    post: Option<T>,
    patch: Option<T>,
    delete: Option<T>,
}

impl<T> Default for MethodTable<T> {
    fn default() -> Self {
        Self {
            get: None,
            post: None,
            patch: None,
            delete: None,
        }
    }
}

impl<T> MethodTable<T> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot_mut(&mut self, method: &Method) -> Option<&mut Option<T>> {
        match *method {
            Method::GET => Some(&mut self.get),
            Method::POST => Some(&mut self.post),
            Method::PATCH => Some(&mut self.patch),
            Method::DELETE => Some(&mut self.delete),
            _ => None,
        }
    }

    /// Registers `handler` for `method`.
    ///
    /// Fails, handing the handler back, when the slot is taken or the method
    /// is not a JSON:API method.
    pub fn insert(&mut self, method: &Method, handler: T) -> Result<(), T> {
        match self.slot_mut(method) {
            Some(slot) if slot.is_none() => {
                *slot = Some(handler);
                Ok(())
            }
            _ => Err(handler),
        }
    }

    /// Returns the handler for `method`.
    #[must_use]
    pub fn get(&self, method: &Method) -> Option<&T> {
        match *method {
            Method::GET => self.get.as_ref(),
            Method::POST => self.post.as_ref(),
            Method::PATCH => self.patch.as_ref(),
            Method::DELETE => self.delete.as_ref(),
            _ => None,
        }
    }

    /// Returns true if at least one method has a handler.
    #[must_use]
    pub fn has_any_method(&self) -> bool {
        self.get.is_some() || self.post.is_some() || self.patch.is_some() || self.delete.is_some()
    }

    /// Methods with a handler, for `Allow` headers.
    #[must_use]
    pub fn allowed_methods(&self) -> Vec<Method> {
        let mut methods = Vec::new();
        if self.get.is_some() {
            methods.push(Method::GET);
        }
        if self.post.is_some() {
            methods.push(Method::POST);
        }
        if self.patch.is_some() {
            methods.push(Method::PATCH);
        }
        if self.delete.is_some() {
            methods.push(Method::DELETE);
        }
        methods
    }

    /// Iterates the registered handlers with their methods.
    pub fn iter(&self) -> impl Iterator<Item = (Method, &T)> {
        [
            (Method::GET, self.get.as_ref()),
            (Method::POST, self.post.as_ref()),
            (Method::PATCH, self.patch.as_ref()),
            (Method::DELETE, self.delete.as_ref()),
        ]
        .into_iter()
        .filter_map(|(method, handler)| handler.map(|h| (method, h)))
    }
}
