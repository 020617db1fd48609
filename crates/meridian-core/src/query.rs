//! Query specifications.
//!
//! A [`QuerySpec`] is the parsed, validated form of a request's query string
//! for one resource type: filters, sorts, paging, include paths and the
//! sparse fieldset. Specs for other resource types (included resources,
//! `filter[type][field]` parameters) hang off the root spec as related specs.
//! All paths are expressed in underlying member names.
//!
//! Repositories following the legacy convention receive the raw
//! [`QueryParams`] instead; [`QueryAdapter`] carries both.

use crate::entity::Entity;
use crate::error::{JsonApiError, JsonApiResult};
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Comparison operator of a filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FilterOperator {
    /// Equal; with several values, equal to any of them.
    #[default]
    Eq,
    /// Not equal; with several values, equal to none of them.
    Neq,
    /// Less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Ge,
    /// Pattern match with `%` as wildcard.
    Like,
}

impl FilterOperator {
    /// Evaluates `actual <op> expected`. Arrays as `expected` hold alternatives.
    #[must_use]
    pub fn matches(&self, actual: &Value, expected: &Value) -> bool {
        if let Value::Array(alternatives) = expected {
            return match self {
                Self::Neq => alternatives.iter().all(|e| Self::Neq.matches(actual, e)),
                _ => alternatives.iter().any(|e| self.matches(actual, e)),
            };
        }
        match self {
            Self::Eq => compare_values(actual, expected) == Some(Ordering::Equal),
            Self::Neq => compare_values(actual, expected) != Some(Ordering::Equal),
            Self::Lt => compare_values(actual, expected) == Some(Ordering::Less),
            Self::Le => matches!(
                compare_values(actual, expected),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Self::Gt => compare_values(actual, expected) == Some(Ordering::Greater),
            Self::Ge => matches!(
                compare_values(actual, expected),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Self::Like => match (actual, expected) {
                (Value::String(actual), Value::String(pattern)) => like(actual, pattern),
                _ => false,
            },
        }
    }
}

impl FromStr for FilterOperator {
    type Err = JsonApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "EQ" => Ok(Self::Eq),
            "NEQ" => Ok(Self::Neq),
            "LT" => Ok(Self::Lt),
            "LE" => Ok(Self::Le),
            "GT" => Ok(Self::Gt),
            "GE" => Ok(Self::Ge),
            "LIKE" => Ok(Self::Like),
            _ => Err(JsonApiError::bad_request(format!(
                "unknown filter operator '{s}'"
            ))),
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Eq => "EQ",
            Self::Neq => "NEQ",
            Self::Lt => "LT",
            Self::Le => "LE",
            Self::Gt => "GT",
            Self::Ge => "GE",
            Self::Like => "LIKE",
        };
        f.write_str(name)
    }
}

/// A filter on a member path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Underlying member names from the resource to the filtered value.
    pub path: Vec<String>,
    /// Operator.
    pub operator: FilterOperator,
    /// Expected value; an array holds alternatives.
    pub value: Value,
}

impl FilterSpec {
    /// Creates a filter.
    #[must_use]
    pub fn new(path: Vec<String>, operator: FilterOperator, value: Value) -> Self {
        Self {
            path,
            operator,
            value,
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Smallest first.
    #[default]
    Ascending,
    /// Largest first.
    Descending,
}

/// A sort criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    /// Underlying member names from the resource to the sorted value.
    pub path: Vec<String>,
    /// Direction.
    pub direction: Direction,
}

impl SortSpec {
    /// Creates a sort criterion.
    #[must_use]
    pub fn new(path: Vec<String>, direction: Direction) -> Self {
        Self { path, direction }
    }
}

/// Paging of a collection request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum PagingSpec {
    /// Offset-based paging.
    Offset {
        /// Number of items to skip.
        offset: u64,
        /// Maximum number of items, unlimited when `None`.
        limit: Option<u64>,
    },
    /// Cursor-based paging; the cursor is opaque to the framework.
    Cursor {
        /// Cursor returned by a previous page.
        cursor: Option<String>,
        /// Maximum number of items.
        limit: Option<u64>,
    },
}

impl Default for PagingSpec {
    fn default() -> Self {
        Self::Offset {
            offset: 0,
            limit: None,
        }
    }
}

impl PagingSpec {
    /// The page size limit.
    #[must_use]
    pub fn limit(&self) -> Option<u64> {
        match self {
            Self::Offset { limit, .. } | Self::Cursor { limit, .. } => *limit,
        }
    }
}

/// A chain of relationship members to include, e.g. `project.tasks`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IncludePath(Vec<String>);

impl IncludePath {
    /// Creates a path from underlying member names.
    #[must_use]
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    /// Segments, first relationship first.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for IncludePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

/// The parsed query of one resource type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuerySpec {
    resource_type: String,
    filters: Vec<FilterSpec>,
    sorts: Vec<SortSpec>,
    paging: PagingSpec,
    includes: Vec<IncludePath>,
    included_fields: Option<Vec<String>>,
    related: IndexMap<String, QuerySpec>,
}

impl QuerySpec {
    /// Creates an empty spec for `resource_type`.
    #[must_use]
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            ..Self::default()
        }
    }

    /// Resource type the spec applies to.
    #[must_use]
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Adds a filter.
    #[must_use]
    pub fn with_filter(mut self, filter: FilterSpec) -> Self {
        self.add_filter(filter);
        self
    }

    /// Adds a sort criterion.
    #[must_use]
    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.add_sort(sort);
        self
    }

    /// Sets the paging.
    #[must_use]
    pub fn with_paging(mut self, paging: PagingSpec) -> Self {
        self.paging = paging;
        self
    }

    /// Adds a filter.
    pub fn add_filter(&mut self, filter: FilterSpec) {
        self.filters.push(filter);
    }

    /// Adds a sort criterion.
    pub fn add_sort(&mut self, sort: SortSpec) {
        self.sorts.push(sort);
    }

    /// Sets the paging.
    pub fn set_paging(&mut self, paging: PagingSpec) {
        self.paging = paging;
    }

    /// Adds an include path unless already present.
    pub fn add_include(&mut self, path: IncludePath) {
        if !self.includes.contains(&path) {
            self.includes.push(path);
        }
    }

    /// Restricts the rendered fields to the given underlying names.
    pub fn include_field(&mut self, name: impl Into<String>) {
        let name = name.into();
        let fields = self.included_fields.get_or_insert_with(Vec::new);
        if !fields.contains(&name) {
            fields.push(name);
        }
    }

    /// Filters.
    #[must_use]
    pub fn filters(&self) -> &[FilterSpec] {
        &self.filters
    }

    /// Sort criteria in priority order.
    #[must_use]
    pub fn sorts(&self) -> &[SortSpec] {
        &self.sorts
    }

    /// Paging.
    #[must_use]
    pub fn paging(&self) -> &PagingSpec {
        &self.paging
    }

    /// Include paths.
    #[must_use]
    pub fn includes(&self) -> &[IncludePath] {
        &self.includes
    }

    /// Sparse fieldset, `None` when all fields are rendered.
    #[must_use]
    pub fn included_fields(&self) -> Option<&[String]> {
        self.included_fields.as_deref()
    }

    /// Whether a member is rendered under the sparse fieldset.
    #[must_use]
    pub fn is_field_included(&self, underlying_name: &str) -> bool {
        self.included_fields
            .as_ref()
            .map_or(true, |fields| fields.iter().any(|f| f == underlying_name))
    }

    /// Spec of another resource type, if one was parsed.
    #[must_use]
    pub fn related(&self, resource_type: &str) -> Option<&QuerySpec> {
        self.related.get(resource_type)
    }

    /// Spec of another resource type, created on first use.
    pub fn related_mut(&mut self, resource_type: &str) -> &mut QuerySpec {
        self.related
            .entry(resource_type.to_string())
            .or_insert_with(|| QuerySpec::new(resource_type))
    }

    /// All related specs.
    pub fn related_specs(&self) -> impl Iterator<Item = &QuerySpec> {
        self.related.values()
    }

    /// The spec that applies to `resource_type`: this one, a related one, or
    /// a fresh empty spec.
    #[must_use]
    pub fn spec_for(&self, resource_type: &str) -> Cow<'_, QuerySpec> {
        if self.resource_type == resource_type {
            Cow::Borrowed(self)
        } else {
            self.related
                .get(resource_type)
                .map_or_else(|| Cow::Owned(QuerySpec::new(resource_type)), Cow::Borrowed)
        }
    }

    /// Evaluates filters, sorting and offset paging in memory.
    ///
    /// Returns the page and the number of matches before paging. Cursor
    /// paging only applies the limit.
    #[must_use]
    pub fn apply(&self, entities: impl IntoIterator<Item = Entity>) -> (Vec<Entity>, u64) {
        let mut matched: Vec<Entity> = entities
            .into_iter()
            .filter(|entity| {
                self.filters.iter().all(|filter| {
                    resolve_path(entity, &filter.path)
                        .is_some_and(|actual| filter.operator.matches(actual, &filter.value))
                })
            })
            .collect();

        if !self.sorts.is_empty() {
            matched.sort_by(|a, b| {
                self.sorts
                    .iter()
                    .map(|sort| {
                        let ordering = match (resolve_path(a, &sort.path), resolve_path(b, &sort.path)) {
                            (Some(x), Some(y)) => compare_values(x, y).unwrap_or(Ordering::Equal),
                            (Some(_), None) => Ordering::Greater,
                            (None, Some(_)) => Ordering::Less,
                            (None, None) => Ordering::Equal,
                        };
                        match sort.direction {
                            Direction::Ascending => ordering,
                            Direction::Descending => ordering.reverse(),
                        }
                    })
                    .find(|o| *o != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            });
        }

        let total = matched.len() as u64;
        let (offset, limit) = match &self.paging {
            PagingSpec::Offset { offset, limit } => (*offset, *limit),
            PagingSpec::Cursor { limit, .. } => (0, *limit),
        };
        let page = matched
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(limit.and_then(|l| usize::try_from(l).ok()).unwrap_or(usize::MAX))
            .collect();
        (page, total)
    }
}

fn resolve_path<'a>(entity: &'a Entity, path: &[String]) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    rest.iter().try_fold(entity.get(first)?, |value, segment| match value {
        Value::Object(map) => map.get(segment),
        _ => None,
    })
}

fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        // Filter values parsed as strings still compare against numeric members.
        (Value::Number(x), Value::String(y)) => x.as_f64()?.partial_cmp(&y.parse::<f64>().ok()?),
        (Value::String(x), Value::Number(y)) => x.parse::<f64>().ok()?.partial_cmp(&y.as_f64()?),
        _ => (a == b).then_some(Ordering::Equal),
    }
}

fn like(actual: &str, pattern: &str) -> bool {
    let expression = pattern
        .split('%')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("(?is)^{expression}$")).is_ok_and(|re| re.is_match(actual))
}

/// Raw query parameters in request order, grouped by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    params: IndexMap<String, Vec<String>>,
}

impl QueryParams {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value for `name`.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.params
            .entry(name.into())
            .or_default()
            .push(value.into());
    }

    /// First value of `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// All values of `name`.
    #[must_use]
    pub fn get_all(&self, name: &str) -> &[String] {
        self.params.get(name).map_or(&[], Vec::as_slice)
    }

    /// Iterates parameters in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.params
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Number of distinct parameter names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Returns `true` if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Self::new();
        for (name, value) in iter {
            params.push(name, value);
        }
        params
    }
}

/// The parsed spec together with the raw parameters it came from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryAdapter {
    spec: QuerySpec,
    params: QueryParams,
}

impl QueryAdapter {
    /// Wraps a spec and its raw parameters.
    #[must_use]
    pub fn new(spec: QuerySpec, params: QueryParams) -> Self {
        Self { spec, params }
    }

    /// An adapter with an empty spec for `resource_type`.
    #[must_use]
    pub fn empty(resource_type: impl Into<String>) -> Self {
        Self::new(QuerySpec::new(resource_type), QueryParams::new())
    }

    /// Root spec.
    #[must_use]
    pub fn spec(&self) -> &QuerySpec {
        &self.spec
    }

    /// Raw parameters.
    #[must_use]
    pub fn params(&self) -> &QueryParams {
        &self.params
    }

    /// Spec for `resource_type`.
    #[must_use]
    pub fn spec_for(&self, resource_type: &str) -> Cow<'_, QuerySpec> {
        self.spec.spec_for(resource_type)
    }

    /// Returns a new adapter rooted at `resource_type`, keeping the raw parameters.
    #[must_use]
    pub fn for_resource(&self, resource_type: &str) -> QueryAdapter {
        Self::new(
            self.spec_for(resource_type).into_owned(),
            self.params.clone(),
        )
    }
}

/// Builds a filter matching any of `ids` on the id member `id_member`.
///
/// Used to emulate `find_all_by_ids` through `find_all`.
pub fn ids_filter(id_member: &str, ids: &[Value]) -> JsonApiResult<FilterSpec> {
    if ids.is_empty() {
        return Err(JsonApiError::bad_request("no ids given"));
    }
    Ok(FilterSpec::new(
        vec![id_member.to_string()],
        FilterOperator::Eq,
        Value::Array(ids.to_vec()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entity(value: Value) -> Entity {
        match value {
            Value::Object(map) => Entity::from(map),
            _ => unreachable!(),
        }
    }

    fn tasks() -> Vec<Entity> {
        vec![
            entity(json!({"id": 1, "name": "write docs", "priority": 2, "project": {"id": 7}})),
            entity(json!({"id": 2, "name": "fix bug", "priority": 1, "project": {"id": 8}})),
            entity(json!({"id": 3, "name": "write tests", "priority": 3, "project": {"id": 7}})),
        ]
    }

    fn ids(page: &[Entity]) -> Vec<Value> {
        page.iter().filter_map(|e| e.get("id").cloned()).collect()
    }

    #[test]
    fn test_operator_parsing() {
        assert_eq!("ge".parse::<FilterOperator>().unwrap(), FilterOperator::Ge);
        assert_eq!(FilterOperator::Like.to_string(), "LIKE");
        assert!("BETWEEN".parse::<FilterOperator>().is_err());
    }

    #[test]
    fn test_filter_and_sort() {
        let spec = QuerySpec::new("tasks")
            .with_filter(FilterSpec::new(
                vec!["name".into()],
                FilterOperator::Like,
                json!("write%"),
            ))
            .with_sort(SortSpec::new(vec!["priority".into()], Direction::Descending));
        let (page, total) = spec.apply(tasks());
        assert_eq!(total, 2);
        assert_eq!(ids(&page), vec![json!(3), json!(1)]);
    }

    #[test]
    fn test_nested_path_and_alternatives() {
        let spec = QuerySpec::new("tasks").with_filter(FilterSpec::new(
            vec!["project".into(), "id".into()],
            FilterOperator::Eq,
            json!([8, 9]),
        ));
        assert_eq!(ids(&spec.apply(tasks()).0), vec![json!(2)]);

        let spec = QuerySpec::new("tasks").with_filter(FilterSpec::new(
            vec!["id".into()],
            FilterOperator::Neq,
            json!([1, 2]),
        ));
        assert_eq!(ids(&spec.apply(tasks()).0), vec![json!(3)]);
    }

    #[test]
    fn test_offset_paging_reports_total() {
        let spec = QuerySpec::new("tasks").with_paging(PagingSpec::Offset {
            offset: 1,
            limit: Some(1),
        });
        let (page, total) = spec.apply(tasks());
        assert_eq!(total, 3);
        assert_eq!(ids(&page), vec![json!(2)]);
    }

    #[test]
    fn test_string_filter_value_against_number() {
        assert!(FilterOperator::Gt.matches(&json!(5), &json!("4")));
        assert!(!FilterOperator::Eq.matches(&json!(5), &json!("five")));
    }

    #[test]
    fn test_spec_for_related_types() {
        let mut spec = QuerySpec::new("tasks");
        spec.related_mut("projects").include_field("name");

        assert_eq!(spec.spec_for("tasks").resource_type(), "tasks");
        assert!(!spec.spec_for("projects").is_field_included("description"));
        assert!(spec.spec_for("tags").is_field_included("anything"));
    }

    #[test]
    fn test_query_params_preserve_order_and_duplicates() {
        let params: QueryParams = [("include", "project"), ("sort", "name"), ("include", "tags")]
            .into_iter()
            .collect();
        assert_eq!(params.get("include"), Some("project"));
        assert_eq!(params.get_all("include").len(), 2);
        let names: Vec<_> = params.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["include", "sort"]);
    }

    #[test]
    fn test_ids_filter() {
        let filter = ids_filter("id", &[json!(1), json!(3)]).unwrap();
        let (page, _) = QuerySpec::new("tasks").with_filter(filter).apply(tasks());
        assert_eq!(ids(&page), vec![json!(1), json!(3)]);
        assert!(ids_filter("id", &[]).is_err());
    }
}
