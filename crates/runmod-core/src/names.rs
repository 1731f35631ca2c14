//! Routine naming: qualified names and case-insensitive matching.
//!
//! A routine's qualified name is `Namespace.Type.Routine`. Types declared
//! without a namespace qualify as `Type.Routine`.

/// Join a declaring type's namespace and name into its full name.
pub fn type_full_name(namespace: &str, type_name: &str) -> String {
    if namespace.is_empty() {
        type_name.to_owned()
    } else {
        format!("{namespace}.{type_name}")
    }
}

/// Build the qualified name of a routine.
pub fn qualified_name(namespace: &str, type_name: &str, routine: &str) -> String {
    format!("{}.{routine}", type_full_name(namespace, type_name))
}

/// Split a dotted type path at its last segment into `(namespace, name)`.
///
/// `"A.B.Type"` becomes `("A.B", "Type")`, `"Type"` becomes `("", "Type")`.
pub fn split_type_path(path: &str) -> (&str, &str) {
    match path.rfind('.') {
        Some(dot) => (&path[..dot], &path[dot + 1..]),
        None => ("", path),
    }
}

/// Compare two names ignoring case.
///
/// Uses full Unicode lowercasing so non-ASCII identifiers match the way a
/// user would expect.
pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    if a.is_ascii() && b.is_ascii() {
        return a.eq_ignore_ascii_case(b);
    }
    a.to_lowercase() == b.to_lowercase()
}
