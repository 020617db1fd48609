//! Naming rules for deriving wire names from accessor and field names.

/// Lower-cases the first character of `name`, leaving the rest untouched.
///
/// ```
/// use meridian_core::naming::decapitalize;
///
/// assert_eq!(decapitalize("FirstName"), "firstName");
/// assert_eq!(decapitalize("URL"), "uRL");
/// assert_eq!(decapitalize(""), "");
/// ```
#[must_use]
pub fn decapitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Derives a property name from a getter name.
///
/// `get` is stripped for any return type, `is` only for boolean getters. The
/// remainder must start with an upper-case character. Returns `None` when the
/// name is not a getter.
///
/// ```
/// use meridian_core::naming::property_name_from_accessor;
///
/// assert_eq!(property_name_from_accessor("getFirstName", false).as_deref(), Some("firstName"));
/// assert_eq!(property_name_from_accessor("isActive", true).as_deref(), Some("active"));
/// assert_eq!(property_name_from_accessor("isActive", false), None);
/// assert_eq!(property_name_from_accessor("get", false), None);
/// ```
#[must_use]
pub fn property_name_from_accessor(name: &str, returns_bool: bool) -> Option<String> {
    strip_accessor_prefix(name, "get")
        .or_else(|| {
            if returns_bool {
                strip_accessor_prefix(name, "is")
            } else {
                None
            }
        })
        .map(decapitalize)
}

/// Returns `true` if `name` follows the setter convention (`setX`).
#[must_use]
pub fn is_setter_name(name: &str) -> bool {
    strip_accessor_prefix(name, "set").is_some()
}

/// Derives a property name from a setter name (`setFirstName` → `firstName`).
#[must_use]
pub fn property_name_from_setter(name: &str) -> Option<String> {
    strip_accessor_prefix(name, "set").map(decapitalize)
}

/// Converts a `snake_case` identifier into `camelCase`.
///
/// ```
/// use meridian_core::naming::snake_to_camel;
///
/// assert_eq!(snake_to_camel("created_at"), "createdAt");
/// assert_eq!(snake_to_camel("id"), "id");
/// ```
#[must_use]
pub fn snake_to_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for c in name.chars() {
        if c == '_' {
            upper_next = !out.is_empty();
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn strip_accessor_prefix<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = name.strip_prefix(prefix)?;
    rest.chars()
        .next()
        .filter(|c| c.is_uppercase())
        .map(|_| rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_getter_prefixes() {
        assert_eq!(
            property_name_from_accessor("getFirstName", false).as_deref(),
            Some("firstName")
        );
        assert_eq!(
            property_name_from_accessor("getActive", true).as_deref(),
            Some("active")
        );
        assert_eq!(property_name_from_accessor("getter", false), None);
        assert_eq!(property_name_from_accessor("island", true), None);
        assert_eq!(property_name_from_accessor("name", false), None);
    }

    #[test]
    fn test_setter_names() {
        assert!(is_setter_name("setName"));
        assert!(!is_setter_name("settings"));
        assert!(!is_setter_name("set"));
        assert_eq!(
            property_name_from_setter("setFirstName").as_deref(),
            Some("firstName")
        );
    }

    #[test]
    fn test_snake_to_camel_edge_cases() {
        assert_eq!(snake_to_camel("_private"), "private");
        assert_eq!(snake_to_camel("a__b"), "aB");
        assert_eq!(snake_to_camel("already_Camel"), "alreadyCamel");
    }

    proptest! {
        #[test]
        fn prop_getter_roundtrip(prop in "[a-z][a-zA-Z0-9]{0,12}") {
            let mut chars = prop.chars();
            let first = chars.next().unwrap().to_uppercase().collect::<String>();
            let getter = format!("get{}{}", first, chars.as_str());
            prop_assert_eq!(property_name_from_accessor(&getter, false), Some(prop));
        }

        #[test]
        fn prop_decapitalize_only_touches_first_char(name in "[A-Za-z][A-Za-z0-9]{0,16}") {
            let result = decapitalize(&name);
            prop_assert_eq!(&result[1..], &name[1..]);
            prop_assert!(!result.chars().next().unwrap().is_uppercase());
        }
    }
}
