//! Query string parsing.
//!
//! [`parse_query_params`] splits the raw query string into [`QueryParams`].
//! [`QuerySpecDeserializer`] then interprets the JSON:API vocabulary against
//! the resource information of the requested type:
//!
//! | Parameter | Meaning |
//! |---|---|
//! | `filter[field]=v` | equality filter, comma-separated values match any |
//! | `filter[field][OP]=v` | filter with `EQ`, `NEQ`, `LT`, `LE`, `GT`, `GE` or `LIKE` |
//! | `filter[type][field]=v` | filter on a related resource type |
//! | `sort=a,-b` | ascending `a`, then descending `b` |
//! | `page[offset]`, `page[limit]`, `page[cursor]` | paging |
//! | `include=a.b,c` | include paths over relationships |
//! | `fields[type]=a,b` | sparse fieldset for `type` |
//!
//! Field names on the wire are translated into underlying member names.

use crate::ExtractionError;
use meridian_core::{
    Direction, FilterOperator, FilterSpec, IncludePath, InformationLookup, PagingSpec,
    QueryParams, QuerySpec, RelationStorage, ResourceField, ResourceInformation, SortSpec,
    TypeParser, ValueType,
};
use serde_json::Value;

/// Parses a raw query string.
///
/// # Example
///
/// ```rust
/// use meridian_extract::parse_query_params;
///
/// let params = parse_query_params(Some("include=project&filter%5Bname%5D=docs")).unwrap();
/// assert_eq!(params.get("include"), Some("project"));
/// assert_eq!(params.get("filter[name]"), Some("docs"));
/// ```
pub fn parse_query_params(query: Option<&str>) -> Result<QueryParams, ExtractionError> {
    let Some(query) = query.filter(|q| !q.is_empty()) else {
        return Ok(QueryParams::new());
    };
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query)
        .map_err(|e| ExtractionError::malformed_query(e.to_string()))?;
    Ok(pairs.into_iter().collect())
}

/// Limits and leniency of query parsing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryParserSettings {
    /// Page limit applied when the request has none.
    pub default_page_limit: Option<u64>,
    /// Largest accepted `page[limit]`.
    pub max_page_limit: Option<u64>,
    /// Ignore parameters outside the JSON:API vocabulary instead of failing.
    pub allow_unknown_parameters: bool,
}

/// Turns [`QueryParams`] into a validated [`QuerySpec`].
#[derive(Debug, Clone, Default)]
pub struct QuerySpecDeserializer {
    settings: QueryParserSettings,
    parser: TypeParser,
}

/// A parameter name split into its base and bracketed arguments:
/// `filter[tasks][name][EQ]` has base `filter` and three arguments.
struct ParameterKey<'a> {
    name: &'a str,
    base: &'a str,
    args: Vec<&'a str>,
}

impl<'a> ParameterKey<'a> {
    fn parse(name: &'a str) -> Result<Self, ExtractionError> {
        let (base, mut rest) = match name.find('[') {
            Some(index) => name.split_at(index),
            None => (name, ""),
        };
        let mut args = Vec::new();
        while !rest.is_empty() {
            let inner = rest
                .strip_prefix('[')
                .and_then(|r| r.find(']').map(|end| (&r[..end], &r[end + 1..])));
            match inner {
                Some((arg, remaining)) => {
                    args.push(arg);
                    rest = remaining;
                }
                None => {
                    return Err(ExtractionError::invalid_parameter(
                        name,
                        "unbalanced brackets",
                    ))
                }
            }
        }
        Ok(Self { name, base, args })
    }
}

impl QuerySpecDeserializer {
    /// Creates a deserializer.
    #[must_use]
    pub fn new(settings: QueryParserSettings) -> Self {
        Self {
            settings,
            parser: TypeParser::new(),
        }
    }

    /// Uses `parser` for filter values.
    #[must_use]
    pub fn with_type_parser(mut self, parser: TypeParser) -> Self {
        self.parser = parser;
        self
    }

    /// The settings in use.
    #[must_use]
    pub fn settings(&self) -> &QueryParserSettings {
        &self.settings
    }

    /// Parses `params` for the root resource `root`.
    ///
    /// `lookup` resolves the information of related resource types.
    pub fn deserialize(
        &self,
        root: &ResourceInformation,
        lookup: &dyn InformationLookup,
        params: &QueryParams,
    ) -> Result<QuerySpec, ExtractionError> {
        let mut spec = QuerySpec::new(root.resource_type());
        let mut offset = None;
        let mut limit = None;
        let mut cursor = None;

        for (name, values) in params.iter() {
            let key = ParameterKey::parse(name)?;
            match key.base {
                "filter" => self.parse_filter(&key, values, root, lookup, &mut spec)?,
                "sort" => parse_sort(&key, values, root, lookup, &mut spec)?,
                "include" => parse_include(&key, values, root, lookup, &mut spec)?,
                "fields" => parse_fields(&key, values, root, lookup, &mut spec)?,
                "page" => match key.args.as_slice() {
                    ["offset"] => offset = Some(parse_number(&key, values)?),
                    ["limit"] => limit = Some(parse_number(&key, values)?),
                    ["cursor"] => cursor = last_value(values).map(str::to_string),
                    _ => self.unknown(&key)?,
                },
                _ => self.unknown(&key)?,
            }
        }

        if let (Some(requested), Some(max)) = (limit, self.settings.max_page_limit) {
            if requested > max {
                return Err(ExtractionError::invalid_parameter(
                    "page[limit]",
                    format!("limit {requested} exceeds the maximum of {max}"),
                ));
            }
        }
        let limit = limit.or(self.settings.default_page_limit);
        spec.set_paging(match cursor {
            Some(cursor) => PagingSpec::Cursor {
                cursor: Some(cursor),
                limit,
            },
            None => PagingSpec::Offset {
                offset: offset.unwrap_or(0),
                limit,
            },
        });
        Ok(spec)
    }

    fn unknown(&self, key: &ParameterKey<'_>) -> Result<(), ExtractionError> {
        if self.settings.allow_unknown_parameters {
            tracing::debug!(parameter = key.name, "ignoring unknown query parameter");
            Ok(())
        } else {
            Err(ExtractionError::unknown_parameter(key.name))
        }
    }

    fn parse_filter(
        &self,
        key: &ParameterKey<'_>,
        values: &[String],
        root: &ResourceInformation,
        lookup: &dyn InformationLookup,
        spec: &mut QuerySpec,
    ) -> Result<(), ExtractionError> {
        let (info, mut args) = resolve_target(key, root, lookup);
        if args.is_empty() {
            return Err(ExtractionError::invalid_parameter(key.name, "no field given"));
        }

        let mut operator = FilterOperator::Eq;
        if args.len() > 1 {
            if let Some(last) = args.last() {
                if let Ok(parsed) = last.parse::<FilterOperator>() {
                    operator = parsed;
                    args.pop();
                }
            }
        }
        if args.len() > 1 {
            return Err(ExtractionError::invalid_parameter(
                key.name,
                "expected filter[field] or filter[field][operator]",
            ));
        }

        let names: Vec<&str> = args.iter().flat_map(|a| a.split('.')).collect();
        let (path, field, target) = walk(key, info, lookup, &names)?;
        if !field.access().filterable {
            return Err(ExtractionError::invalid_parameter(
                key.name,
                format!("field '{}' is not filterable", field.json_name()),
            ));
        }

        let mut path = path;
        let value_type = if field.is_relationship() {
            let target = target.ok_or_else(|| {
                ExtractionError::invalid_parameter(key.name, "relationship target is not registered")
            })?;
            if field.storage() == RelationStorage::Object {
                path.push(target.id_field().underlying_name().to_string());
            }
            target.id_field().value_type().clone()
        } else {
            field.value_type().clone()
        };

        let parsed = values
            .iter()
            .flat_map(|v| v.split(','))
            .map(|raw| self.parse_value(key, raw, &value_type))
            .collect::<Result<Vec<_>, _>>()?;
        let value = match <[Value; 1]>::try_from(parsed) {
            Ok([single]) => single,
            Err(many) => Value::Array(many),
        };

        let target_spec = spec_for_type(spec, info.resource_type());
        target_spec.add_filter(FilterSpec::new(path, operator, value));
        Ok(())
    }

    fn parse_value(
        &self,
        key: &ParameterKey<'_>,
        raw: &str,
        value_type: &ValueType,
    ) -> Result<Value, ExtractionError> {
        self.parser
            .parse(raw, value_type)
            .map_err(|e| ExtractionError::invalid_parameter(key.name, e.to_string()))
    }
}

/// `filter[type][...]` and `sort[type]` address another resource type when
/// the first argument names a registered type that is not a field of the root.
fn resolve_target<'k, 'i>(
    key: &ParameterKey<'k>,
    root: &'i ResourceInformation,
    lookup: &'i dyn InformationLookup,
) -> (&'i ResourceInformation, Vec<&'k str>) {
    if let Some((first, rest)) = key.args.split_first() {
        if root.find_field_by_name(first).is_none() {
            if let Some(info) = lookup.information(first) {
                return (info, rest.to_vec());
            }
        }
    }
    (root, key.args.clone())
}

fn spec_for_type<'s>(spec: &'s mut QuerySpec, resource_type: &str) -> &'s mut QuerySpec {
    if spec.resource_type() == resource_type {
        spec
    } else {
        spec.related_mut(resource_type)
    }
}

/// Follows dotted wire names through relationships.
///
/// Returns the underlying path, the final field and the information of the
/// final field's target type when it is a relationship.
fn walk<'i>(
    key: &ParameterKey<'_>,
    info: &'i ResourceInformation,
    lookup: &'i dyn InformationLookup,
    names: &[&str],
) -> Result<(Vec<String>, &'i ResourceField, Option<&'i ResourceInformation>), ExtractionError> {
    let Some((last, intermediate)) = names.split_last() else {
        return Err(ExtractionError::invalid_parameter(key.name, "empty field path"));
    };

    let mut current = info;
    let mut path = Vec::with_capacity(names.len());
    for name in intermediate {
        let field = current.find_relationship_field_by_name(name).ok_or_else(|| {
            ExtractionError::invalid_parameter(
                key.name,
                format!("'{name}' is not a relationship of '{}'", current.resource_type()),
            )
        })?;
        path.push(field.underlying_name().to_string());
        current = field
            .opposite_resource_type()
            .and_then(|rt| lookup.information(rt))
            .ok_or_else(|| {
                ExtractionError::invalid_parameter(
                    key.name,
                    format!("target of '{name}' is not registered"),
                )
            })?;
    }

    let field = current.find_field_by_name(last).ok_or_else(|| {
        ExtractionError::invalid_parameter(
            key.name,
            format!("unknown field '{last}' on '{}'", current.resource_type()),
        )
    })?;
    path.push(field.underlying_name().to_string());
    let target = field
        .opposite_resource_type()
        .and_then(|rt| lookup.information(rt));
    Ok((path, field, target))
}

fn parse_sort(
    key: &ParameterKey<'_>,
    values: &[String],
    root: &ResourceInformation,
    lookup: &dyn InformationLookup,
    spec: &mut QuerySpec,
) -> Result<(), ExtractionError> {
    let (info, args) = resolve_target(key, root, lookup);
    if !args.is_empty() {
        return Err(ExtractionError::invalid_parameter(key.name, "unexpected argument"));
    }

    let mut sorts = Vec::new();
    for item in values.iter().flat_map(|v| v.split(',')).filter(|s| !s.is_empty()) {
        let (direction, name) = match item.strip_prefix('-') {
            Some(name) => (Direction::Descending, name),
            None => (Direction::Ascending, item),
        };
        let names: Vec<&str> = name.split('.').collect();
        let (path, field, _) = walk(key, info, lookup, &names)?;
        if field.is_relationship() || !field.access().sortable {
            return Err(ExtractionError::invalid_parameter(
                key.name,
                format!("field '{}' is not sortable", field.json_name()),
            ));
        }
        sorts.push(SortSpec::new(path, direction));
    }

    let target_spec = spec_for_type(spec, info.resource_type());
    for sort in sorts {
        target_spec.add_sort(sort);
    }
    Ok(())
}

fn parse_include(
    key: &ParameterKey<'_>,
    values: &[String],
    root: &ResourceInformation,
    lookup: &dyn InformationLookup,
    spec: &mut QuerySpec,
) -> Result<(), ExtractionError> {
    if !key.args.is_empty() {
        return Err(ExtractionError::invalid_parameter(key.name, "unexpected argument"));
    }

    for item in values.iter().flat_map(|v| v.split(',')).filter(|s| !s.is_empty()) {
        let mut current = root;
        let mut segments = Vec::new();
        for name in item.split('.') {
            let field = current.find_relationship_field_by_name(name).ok_or_else(|| {
                ExtractionError::invalid_parameter(
                    key.name,
                    format!("'{name}' is not a relationship of '{}'", current.resource_type()),
                )
            })?;
            segments.push(field.underlying_name().to_string());
            current = field
                .opposite_resource_type()
                .and_then(|rt| lookup.information(rt))
                .ok_or_else(|| {
                    ExtractionError::invalid_parameter(
                        key.name,
                        format!("target of '{name}' is not registered"),
                    )
                })?;
        }
        spec.add_include(IncludePath::new(segments));
    }
    Ok(())
}

fn parse_fields(
    key: &ParameterKey<'_>,
    values: &[String],
    root: &ResourceInformation,
    lookup: &dyn InformationLookup,
    spec: &mut QuerySpec,
) -> Result<(), ExtractionError> {
    let info = match key.args.as_slice() {
        [resource_type] if *resource_type == root.resource_type() => root,
        [resource_type] => lookup.information(resource_type).ok_or_else(|| {
            ExtractionError::invalid_parameter(
                key.name,
                format!("unknown resource type '{resource_type}'"),
            )
        })?,
        _ => {
            return Err(ExtractionError::invalid_parameter(
                key.name,
                "expected fields[type]",
            ))
        }
    };

    let mut names = Vec::new();
    for name in values.iter().flat_map(|v| v.split(',')).filter(|s| !s.is_empty()) {
        let field = info.find_field_by_name(name).ok_or_else(|| {
            ExtractionError::invalid_parameter(
                key.name,
                format!("unknown field '{name}' on '{}'", info.resource_type()),
            )
        })?;
        names.push(field.underlying_name().to_string());
    }

    let target_spec = spec_for_type(spec, info.resource_type());
    for name in names {
        target_spec.include_field(name);
    }
    Ok(())
}

fn last_value(values: &[String]) -> Option<&str> {
    values.last().map(String::as_str)
}

fn parse_number(key: &ParameterKey<'_>, values: &[String]) -> Result<u64, ExtractionError> {
    let raw = last_value(values).unwrap_or_default();
    raw.trim().parse().map_err(|_| {
        ExtractionError::invalid_parameter(key.name, format!("'{raw}' is not a non-negative integer"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_core::{FieldDescriptor, ResourceDescriptor, ResourceInformationBuilder};
    use serde_json::json;

    fn information() -> Vec<ResourceInformation> {
        let project = ResourceDescriptor::new("projects", "Project")
            .field(FieldDescriptor::id("id", "u64"))
            .field(FieldDescriptor::new("name", "String"))
            .field(FieldDescriptor::new("tasks", "Vec<Task>"));
        let tag = ResourceDescriptor::new("tags", "Tag")
            .field(FieldDescriptor::id("id", "String"))
            .field(FieldDescriptor::new("label", "String"));
        let task = ResourceDescriptor::new("tasks", "Task")
            .field(FieldDescriptor::id("id", "u64"))
            .field(FieldDescriptor::new("title", "String"))
            .field(FieldDescriptor::new("priority", "i32"))
            .field(FieldDescriptor::new("notes", "String").annotate(|a| a.non_sortable().non_filterable()))
            .field(FieldDescriptor::new("project", "Option<Project>"))
            .field(FieldDescriptor::new("tags", "Vec<Tag>"))
            .field(FieldDescriptor::new("ownerId", "Option<u64>").relation_ids("Project").json_name("owner"));

        let builder = ResourceInformationBuilder::new()
            .register(&project)
            .register(&tag)
            .register(&task);
        [project, tag, task]
            .iter()
            .map(|d| builder.build(d).unwrap())
            .collect()
    }

    fn parse(query: &str) -> Result<QuerySpec, ExtractionError> {
        parse_with(QueryParserSettings::default(), query)
    }

    fn parse_with(settings: QueryParserSettings, query: &str) -> Result<QuerySpec, ExtractionError> {
        let infos = information();
        let root = infos.information("tasks").unwrap();
        let params = parse_query_params(Some(query)).unwrap();
        QuerySpecDeserializer::new(settings).deserialize(root, &infos, &params)
    }

    #[test]
    fn test_empty_query() {
        let spec = parse("").unwrap();
        assert_eq!(spec.resource_type(), "tasks");
        assert!(spec.filters().is_empty());
        assert_eq!(spec.paging(), &PagingSpec::default());
    }

    #[test]
    fn test_simple_filter() {
        let spec = parse("filter[title]=docs").unwrap();
        assert_eq!(
            spec.filters(),
            &[FilterSpec::new(vec!["title".into()], FilterOperator::Eq, json!("docs"))]
        );
    }

    #[test]
    fn test_filter_with_operator_and_typed_values() {
        let spec = parse("filter[priority][GT]=2").unwrap();
        assert_eq!(spec.filters()[0].operator, FilterOperator::Gt);
        assert_eq!(spec.filters()[0].value, json!(2));

        let spec = parse("filter[priority]=1,3").unwrap();
        assert_eq!(spec.filters()[0].value, json!([1, 3]));
    }

    #[test]
    fn test_filter_value_must_parse() {
        let err = parse("filter[priority]=high").unwrap_err();
        assert_eq!(err.field(), Some("filter[priority]"));
    }

    #[test]
    fn test_filter_on_relationship() {
        let spec = parse("filter[project]=7").unwrap();
        assert_eq!(spec.filters()[0].path, vec!["project", "id"]);
        assert_eq!(spec.filters()[0].value, json!(7));

        let spec = parse("filter[owner]=3").unwrap();
        assert_eq!(spec.filters()[0].path, vec!["ownerId"]);

        let spec = parse("filter[project.name][LIKE]=web%").unwrap();
        assert_eq!(spec.filters()[0].path, vec!["project", "name"]);
        assert_eq!(spec.filters()[0].operator, FilterOperator::Like);
    }

    #[test]
    fn test_filter_on_related_type() {
        let spec = parse("filter[projects][name]=web").unwrap();
        assert!(spec.filters().is_empty());
        let related = spec.related("projects").unwrap();
        assert_eq!(related.filters()[0].path, vec!["name"]);
    }

    #[test]
    fn test_non_filterable_field() {
        assert!(parse("filter[notes]=x").is_err());
        assert!(parse("filter[missing]=x").is_err());
        assert!(parse("filter=x").is_err());
    }

    #[test]
    fn test_sort() {
        let spec = parse("sort=-priority,title").unwrap();
        assert_eq!(
            spec.sorts(),
            &[
                SortSpec::new(vec!["priority".into()], Direction::Descending),
                SortSpec::new(vec!["title".into()], Direction::Ascending),
            ]
        );

        let spec = parse("sort=project.name").unwrap();
        assert_eq!(spec.sorts()[0].path, vec!["project", "name"]);
    }

    #[test]
    fn test_sort_rejects_unsortable() {
        assert!(parse("sort=notes").is_err());
        assert!(parse("sort=project").is_err());
    }

    #[test]
    fn test_paging() {
        let spec = parse("page[offset]=20&page[limit]=10").unwrap();
        assert_eq!(
            spec.paging(),
            &PagingSpec::Offset {
                offset: 20,
                limit: Some(10)
            }
        );

        let spec = parse("page[cursor]=abc&page[limit]=5").unwrap();
        assert_eq!(
            spec.paging(),
            &PagingSpec::Cursor {
                cursor: Some("abc".into()),
                limit: Some(5)
            }
        );

        assert!(parse("page[offset]=-1").is_err());
        assert!(parse("page[size]=1").is_err());
    }

    #[test]
    fn test_page_limits() {
        let settings = QueryParserSettings {
            default_page_limit: Some(25),
            max_page_limit: Some(100),
            allow_unknown_parameters: false,
        };
        let spec = parse_with(settings.clone(), "").unwrap();
        assert_eq!(spec.paging().limit(), Some(25));

        let spec = parse_with(settings.clone(), "page[limit]=100").unwrap();
        assert_eq!(spec.paging().limit(), Some(100));

        let err = parse_with(settings, "page[limit]=101").unwrap_err();
        assert_eq!(err.field(), Some("page[limit]"));
    }

    #[test]
    fn test_include() {
        let spec = parse("include=project.tasks,tags").unwrap();
        let includes: Vec<String> = spec.includes().iter().map(ToString::to_string).collect();
        assert_eq!(includes, vec!["project.tasks", "tags"]);

        assert!(parse("include=title").is_err());
        assert!(parse("include=project.missing").is_err());
    }

    #[test]
    fn test_sparse_fieldsets() {
        let spec = parse("fields[tasks]=title,owner&fields[projects]=name").unwrap();
        assert_eq!(
            spec.included_fields(),
            Some(&["title".to_string(), "ownerId".to_string()][..])
        );
        assert_eq!(
            spec.related("projects").and_then(QuerySpec::included_fields),
            Some(&["name".to_string()][..])
        );

        assert!(parse("fields[nope]=a").is_err());
        assert!(parse("fields[tasks]=nope").is_err());
        assert!(parse("fields=title").is_err());
    }

    #[test]
    fn test_unknown_parameters() {
        let err = parse("foo=bar").unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_PARAMETER");

        let settings = QueryParserSettings {
            allow_unknown_parameters: true,
            ..QueryParserSettings::default()
        };
        assert!(parse_with(settings, "foo=bar").is_ok());
    }

    #[test]
    fn test_unbalanced_brackets() {
        assert!(parse("filter[title=x").is_err());
    }

    #[test]
    fn test_percent_encoded_keys() {
        let spec = parse("filter%5Btitle%5D=a%20b").unwrap();
        assert_eq!(spec.filters()[0].value, json!("a b"));
    }
}
