use crate::information::ResourceDescriptor;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A domain type exposed as a JSON:API resource.
///
/// Usually derived with `#[derive(JsonApiResource)]`. Serde is the accessor
/// layer: the serialized member names are the underlying field names of the
/// descriptor.
///
/// ```
/// use meridian_core::{FieldDescriptor, JsonApiResource, ResourceDescriptor};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Tag {
///     id: u64,
///     label: String,
/// }
///
/// impl JsonApiResource for Tag {
///     const RESOURCE_TYPE: &'static str = "tags";
///     type Id = u64;
///
///     fn descriptor() -> ResourceDescriptor {
///         ResourceDescriptor::new(Self::RESOURCE_TYPE, "Tag")
///             .field(FieldDescriptor::id("id", "u64"))
///             .field(FieldDescriptor::new("label", "String"))
///     }
/// }
///
/// assert_eq!(Tag::descriptor().id_field_name().as_deref(), Some("id"));
/// ```
pub trait JsonApiResource: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Resource type on the wire.
    const RESOURCE_TYPE: &'static str;

    /// Id type.
    type Id: Serialize + DeserializeOwned + Clone + Send + Sync + 'static;

    /// Explicit schema of the type.
    fn descriptor() -> ResourceDescriptor;
}

/// Id type of a resource.
pub type IdOf<R> = <R as JsonApiResource>::Id;
