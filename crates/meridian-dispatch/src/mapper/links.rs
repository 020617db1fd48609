//! Link generation.

use meridian_core::{Links, PagingSpec, QueryAdapter, RequestContext};
use meridian_router::RELATIONSHIPS_SEGMENT;

/// Builds `self` and `related` links below one base URL.
#[derive(Debug, Clone)]
pub(crate) struct LinkBuilder {
    base: String,
}

impl LinkBuilder {
    /// `base_url` without a trailing slash, followed by the path prefix.
    pub(crate) fn new(base_url: Option<&str>, prefix: Option<&str>) -> Self {
        let mut base = base_url.unwrap_or_default().trim_end_matches('/').to_string();
        if let Some(prefix) = prefix.map(|p| p.trim_matches('/')).filter(|p| !p.is_empty()) {
            base.push('/');
            base.push_str(prefix);
        }
        Self { base }
    }

    pub(crate) fn resource(&self, resource_type: &str, id: &str) -> String {
        format!(
            "{}/{resource_type}/{}",
            self.base,
            urlencoding::encode(id)
        )
    }

    pub(crate) fn resource_links(&self, resource_type: &str, id: &str) -> Links {
        Links {
            self_link: Some(self.resource(resource_type, id)),
            ..Links::default()
        }
    }

    pub(crate) fn relationship_links(&self, resource_type: &str, id: &str, field: &str) -> Links {
        let resource = self.resource(resource_type, id);
        Links {
            self_link: Some(format!("{resource}/{RELATIONSHIPS_SEGMENT}/{field}")),
            related: Some(format!("{resource}/{field}")),
            ..Links::default()
        }
    }
}

/// `first`, `prev` and `next` links for offset paging with a known total.
///
/// No `next` link is built when `offset + limit` does not fit in a `u64`.
pub(crate) fn paging_links(
    base_url: Option<&str>,
    context: &RequestContext,
    query: &QueryAdapter,
    total: Option<u64>,
) -> Option<Links> {
    let PagingSpec::Offset {
        offset,
        limit: Some(limit),
    } = *query.spec().paging()
    else {
        return None;
    };
    let total = total?;
    let path = context.path()?;
    if limit == 0 {
        return None;
    }

    let page = |page_offset: u64| -> Option<String> {
        let mut pairs: Vec<(String, String)> = query
            .params()
            .iter()
            .filter(|(name, _)| *name != "page[offset]" && *name != "page[limit]")
            .flat_map(|(name, values)| values.iter().map(move |v| (name.to_string(), v.clone())))
            .collect();
        pairs.push(("page[offset]".into(), page_offset.to_string()));
        pairs.push(("page[limit]".into(), limit.to_string()));
        let query_string = serde_urlencoded::to_string(&pairs).ok()?;
        let base = base_url.unwrap_or_default().trim_end_matches('/');
        Some(format!("{base}{path}?{query_string}"))
    };

    Some(Links {
        first: page(0),
        prev: (offset > 0).then(|| page(offset.saturating_sub(limit))).flatten(),
        next: offset
            .checked_add(limit)
            .filter(|next| *next < total)
            .and_then(&page),
        ..Links::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_core::{QueryParams, QuerySpec};

    #[test]
    fn test_base_and_prefix() {
        let links = LinkBuilder::new(Some("http://localhost:8080/"), Some("/api/"));
        assert_eq!(links.resource("tasks", "1"), "http://localhost:8080/api/tasks/1");

        let bare = LinkBuilder::new(None, None);
        assert_eq!(bare.resource("tasks", "a b"), "/tasks/a%20b");
    }

    #[test]
    fn test_relationship_links() {
        let links = LinkBuilder::new(Some("http://h"), None).relationship_links("tasks", "1", "project");
        assert_eq!(
            links.self_link.as_deref(),
            Some("http://h/tasks/1/relationships/project")
        );
        assert_eq!(links.related.as_deref(), Some("http://h/tasks/1/project"));
    }

    fn paged(offset: u64, limit: u64) -> QueryAdapter {
        let spec = QuerySpec::new("tasks").with_paging(PagingSpec::Offset {
            offset,
            limit: Some(limit),
        });
        let params: QueryParams = [
            ("sort", "name".to_string()),
            ("page[offset]", offset.to_string()),
            ("page[limit]", limit.to_string()),
        ]
        .into_iter()
        .collect();
        QueryAdapter::new(spec, params)
    }

    #[test]
    fn test_paging_links() {
        let context = RequestContext::new().with_path("/tasks");
        let links = paging_links(Some("http://h"), &context, &paged(10, 10), Some(25)).unwrap();
        assert_eq!(
            links.first.as_deref(),
            Some("http://h/tasks?sort=name&page%5Boffset%5D=0&page%5Blimit%5D=10")
        );
        assert!(links.prev.unwrap().contains("page%5Boffset%5D=0"));
        assert!(links.next.unwrap().contains("page%5Boffset%5D=20"));

        let last = paging_links(None, &context, &paged(20, 10), Some(25)).unwrap();
        assert!(last.next.is_none());
    }

    #[test]
    fn test_paging_links_at_offset_limit() {
        let context = RequestContext::new().with_path("/tasks");
        let links = paging_links(None, &context, &paged(u64::MAX, 1), Some(2)).unwrap();
        assert!(links.next.is_none());
        assert!(links.first.is_some());
        assert!(links
            .prev
            .unwrap()
            .contains(&format!("page%5Boffset%5D={}", u64::MAX - 1)));

        let links = paging_links(None, &context, &paged(u64::MAX - 1, 10), Some(u64::MAX)).unwrap();
        assert!(links.next.is_none());
    }

    #[test]
    fn test_no_paging_links_without_limit_or_total() {
        let context = RequestContext::new().with_path("/tasks");
        let unpaged = QueryAdapter::empty("tasks");
        assert!(paging_links(None, &context, &unpaged, Some(3)).is_none());
        assert!(paging_links(None, &context, &paged(0, 10), None).is_none());
    }
}
