//! Resolution of the `included` section.
//!
//! Resources are visited breadth-first, starting from the primary data.
//! Every visit carries the include paths that remain below the visited
//! resource. A `(type, id, remaining paths)` combination is expanded once,
//! which bounds the walk over cyclic graphs without a depth limit. Related
//! resources are collected once per `(type, id)` in discovery order; primary
//! resources are never added.
//!
//! Discovery order follows the relationship declaration order of each
//! visited resource, not the order of the `include` parameter:
//! `include=tags,project` on a task whose `project` is declared before
//! `tags` yields the project first.
//!
//! Linkage always matches `included`. When related resources had to be
//! fetched (a relationship lookup, or bare ids resolved through the target
//! repository), the rendered linkage is replaced by the identifiers of the
//! resources actually found, so ids the repository no longer knows are
//! dropped from linkage as well.

use super::links::LinkBuilder;
use super::DocumentMapper;
use indexmap::IndexMap;
use meridian_core::{
    Entity, InformationLookup, JsonApiError, JsonApiResult, LookupIncludeBehavior, QueryAdapter,
    RelationshipData, RelationValue, Resource, ResourceField, ResourceIdentifier,
    ResourceInformation,
};
use std::collections::{HashMap, HashSet, VecDeque};

type ResourceKey = (String, String);
type IncludeTails = Vec<Vec<String>>;

#[derive(Debug, Clone, Copy)]
enum Slot {
    Primary(usize),
    Included(usize),
}

struct Visit {
    slot: Slot,
    resource_type: String,
    entity: Entity,
    paths: IncludeTails,
}

/// Related entities and whether the rendered linkage must be rebuilt from
/// them.
struct Related {
    entities: Vec<Entity>,
    rewrite_linkage: bool,
}

pub(super) struct IncludeResolver<'a> {
    mapper: &'a DocumentMapper,
    query: &'a QueryAdapter,
    links: &'a LinkBuilder,
}

impl<'a> IncludeResolver<'a> {
    pub(super) fn new(mapper: &'a DocumentMapper, query: &'a QueryAdapter, links: &'a LinkBuilder) -> Self {
        Self {
            mapper,
            query,
            links,
        }
    }

    /// Resolves the included resources of `primaries`.
    ///
    /// Linkage of relationships that had to be looked up is written back
    /// into the rendered resources.
    pub(super) async fn resolve(
        &self,
        resource_type: &str,
        entities: &[&Entity],
        primaries: &mut [Resource],
    ) -> JsonApiResult<Vec<Resource>> {
        let root_paths = normalize(
            self.query
                .spec_for(resource_type)
                .includes()
                .iter()
                .map(|path| path.segments().to_vec()),
        );

        let primary_index: HashMap<ResourceKey, usize> = primaries
            .iter()
            .enumerate()
            .filter_map(|(index, resource)| {
                resource
                    .id
                    .clone()
                    .map(|id| ((resource.resource_type.clone(), id), index))
            })
            .collect();

        let mut included: IndexMap<ResourceKey, Resource> = IndexMap::new();
        let mut expanded: HashSet<(ResourceKey, IncludeTails)> = HashSet::new();
        let mut queue: VecDeque<Visit> = VecDeque::new();

        for (index, entity) in entities.iter().enumerate() {
            if let Some(id) = primaries[index].id.clone() {
                expanded.insert(((resource_type.to_string(), id), root_paths.clone()));
            }
            queue.push_back(Visit {
                slot: Slot::Primary(index),
                resource_type: resource_type.to_string(),
                entity: (*entity).clone(),
                paths: root_paths.clone(),
            });
        }

        while let Some(visit) = queue.pop_front() {
            let info = self.mapper.information(&visit.resource_type)?;
            for field in info.relationship_fields() {
                let tails: Vec<&[String]> = visit
                    .paths
                    .iter()
                    .filter(|path| path.first().map(String::as_str) == Some(field.underlying_name()))
                    .map(|path| &path[1..])
                    .collect();
                if tails.is_empty() && !field.include_by_default() {
                    continue;
                }
                let Some(target_type) = field.opposite_resource_type() else {
                    continue;
                };
                let target_info = self.mapper.information(target_type)?;
                let Some(related) = self.related(info, target_info, &visit.entity, field).await? else {
                    continue;
                };
                let child_paths = normalize(tails.iter().map(|tail| tail.to_vec()));

                let mut identifiers = Vec::new();
                for target in related.entities {
                    let Some(id) = target_info
                        .entity_id(&target)
                        .map(|id| target_info.to_id_string(id))
                    else {
                        continue;
                    };
                    identifiers.push(ResourceIdentifier::new(target_type, id.clone()));
                    let key = (target_type.to_string(), id);

                    let slot = if let Some(&index) = primary_index.get(&key) {
                        Slot::Primary(index)
                    } else if let Some(index) = included.get_index_of(&key) {
                        Slot::Included(index)
                    } else {
                        let spec = self.query.spec_for(target_type);
                        let resource = self.mapper.to_resource(target_info, &target, &spec, self.links)?;
                        Slot::Included(included.insert_full(key.clone(), resource).0)
                    };

                    if expanded.insert((key, child_paths.clone())) {
                        queue.push_back(Visit {
                            slot,
                            resource_type: target_type.to_string(),
                            entity: target,
                            paths: child_paths.clone(),
                        });
                    }
                }

                if related.rewrite_linkage {
                    let resource = match visit.slot {
                        Slot::Primary(index) => primaries.get_mut(index),
                        Slot::Included(index) => included.get_index_mut(index).map(|(_, r)| r),
                    };
                    if let Some(relationship) =
                        resource.and_then(|r| r.relationships.get_mut(field.json_name()))
                    {
                        relationship.data = Some(linkage(field, identifiers));
                    }
                }
            }
        }

        Ok(included.into_values().collect())
    }

    /// The related entities of `field`, looked up when the lookup behavior
    /// asks for it.
    async fn related(
        &self,
        info: &ResourceInformation,
        target_info: &ResourceInformation,
        entity: &Entity,
        field: &ResourceField,
    ) -> JsonApiResult<Option<Related>> {
        let behavior = field
            .lookup_include()
            .unwrap_or_else(|| self.mapper.lookup_behavior());
        let value = entity.relation(field);

        let look_up = match behavior {
            LookupIncludeBehavior::Always => true,
            LookupIncludeBehavior::WhenNull => !value.is_loaded(),
            LookupIncludeBehavior::Never => false,
        };
        if look_up {
            return self.look_up(info, target_info, entity, field).await;
        }

        if let Some(entities) = value.target_entities() {
            return Ok(Some(Related {
                entities,
                rewrite_linkage: false,
            }));
        }
        if behavior == LookupIncludeBehavior::Never {
            return Ok(None);
        }
        self.load_by_ids(target_info, &value).await.map(Some)
    }

    async fn look_up(
        &self,
        info: &ResourceInformation,
        target_info: &ResourceInformation,
        entity: &Entity,
        field: &ResourceField,
    ) -> JsonApiResult<Option<Related>> {
        let Some(source_id) = info.entity_id(entity) else {
            return Ok(None);
        };
        let entry = self.mapper.registry().get_entry(info.resource_type())?;
        let adapter = entry.relationship_repository_for(field)?;
        let query = self.query.for_resource(target_info.resource_type());
        let entities = if field.is_collection() {
            adapter
                .find_many_targets(source_id, field, &query)
                .await?
                .into_entities()
        } else {
            adapter
                .find_one_target(source_id, field, &query)
                .await?
                .into_single()
                .into_iter()
                .collect()
        };
        Ok(Some(Related {
            entities,
            rewrite_linkage: true,
        }))
    }

    /// Entities for a relationship holding bare ids, in id order. Ids the
    /// target repository does not return are skipped.
    async fn load_by_ids(
        &self,
        target_info: &ResourceInformation,
        value: &RelationValue,
    ) -> JsonApiResult<Related> {
        let ids = value.target_ids(target_info);
        if ids.is_empty() {
            return Ok(Related {
                entities: Vec::new(),
                rewrite_linkage: false,
            });
        }
        let target_type = target_info.resource_type();
        let entry = self.mapper.registry().get_entry(target_type)?;
        let found = entry
            .repository()
            .find_all_by_ids(&ids, &self.query.for_resource(target_type))
            .await?
            .into_entities();
        let entities: Vec<Entity> = ids
            .iter()
            .filter_map(|id| {
                found
                    .iter()
                    .find(|entity| target_info.entity_id(entity) == Some(id))
                    .cloned()
            })
            .collect();
        if entities.len() < ids.len() {
            tracing::debug!(
                resource_type = target_type,
                requested = ids.len(),
                found = entities.len(),
                "dropping linkage to missing related resources"
            );
        }
        Ok(Related {
            entities,
            rewrite_linkage: true,
        })
    }
}

impl DocumentMapper {
    pub(super) fn information(&self, resource_type: &str) -> JsonApiResult<&ResourceInformation> {
        self.registry()
            .information(resource_type)
            .ok_or_else(|| JsonApiError::not_registered(resource_type))
    }
}

fn linkage(field: &ResourceField, identifiers: Vec<ResourceIdentifier>) -> RelationshipData {
    if field.is_collection() {
        RelationshipData::Many(identifiers)
    } else {
        RelationshipData::One(identifiers.into_iter().next())
    }
}

/// Drops empty paths and duplicates, sorted so equal sets compare equal.
fn normalize(paths: impl IntoIterator<Item = Vec<String>>) -> IncludeTails {
    let mut paths: IncludeTails = paths.into_iter().filter(|p| !p.is_empty()).collect();
    paths.sort();
    paths.dedup();
    paths
}
