//! SQL identifier and literal utilities
//!
//! Dialect-independent helpers used by the renderer: detecting identifiers
//! that need quoting, quoting them with a given quote character, and escaping
//! string literals.

/// Whether `ident` matches `[A-Za-z_][A-Za-z0-9_]*`.
///
/// # Examples
/// ```
/// use relc_core::sql_utils::is_simple_identifier;
/// assert!(is_simple_identifier("foo_id"));
/// assert!(!is_simple_identifier("1abc"));
/// assert!(!is_simple_identifier("my col"));
/// ```
pub fn is_simple_identifier(ident: &str) -> bool {
    let mut chars = ident.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Quote an identifier with the given quote character.
///
/// Embedded quote characters are doubled.
///
/// # Examples
/// ```
/// use relc_core::sql_utils::quote_ident_with;
/// assert_eq!(quote_ident_with("else", '"'), r#""else""#);
/// assert_eq!(quote_ident_with("a`b", '`'), "`a``b`");
/// ```
pub fn quote_ident_with(ident: &str, quote: char) -> String {
    let doubled: String = [quote, quote].iter().collect();
    format!(
        "{quote}{}{quote}",
        ident.replace(quote, &doubled),
        quote = quote
    )
}

/// Quote each `.`-separated component of a qualified name that needs quoting.
///
/// `needs_quote` decides per component, so simple components stay bare.
pub fn quote_qualified_with(name: &str, quote: char, needs_quote: impl Fn(&str) -> bool) -> String {
    name.split('.')
        .map(|part| {
            if needs_quote(part) {
                quote_ident_with(part, quote)
            } else {
                part.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Escape a SQL string literal value by doubling single quotes.
///
/// This is for use inside single-quoted SQL string literals, not identifiers.
pub fn escape_sql_string(value: &str) -> String {
    value.replace('\'', "''")
}
