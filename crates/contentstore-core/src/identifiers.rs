//! SQL identifier quoting.
//!
//! Column and table names come from user-editable configuration, so they are
//! always quoted when rendered into SQL.

/// Quote an identifier with double quotes, doubling embedded quotes.
///
/// ```
/// use contentstore_core::quote_ident;
/// assert_eq!(quote_ident("id"), "\"id\"");
/// assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
/// ```
pub fn quote_ident(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    out.push('"');
    for ch in name.chars() {
        if ch == '"' {
            out.push('"');
        }
        out.push(ch);
    }
    out.push('"');
    out
}

/// Reduce a configured name to `[a-z0-9_]`, for table names.
///
/// Runs of other characters become a single underscore; leading and trailing
/// underscores are trimmed.
pub fn sanitize_identifier(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_sep = false;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }
    out
}
