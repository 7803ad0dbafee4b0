//! Domain types shared by connectors, DAOs and the pipeline

mod element;
mod resource;
mod structure;

pub use element::Element;
pub use resource::Resource;
pub use structure::{Context, Structure, StructureBuilder};

/// Longest resource ID accepted; ET table names are derived from it.
pub const MAX_RESOURCE_ID_LEN: usize = 32;

/// Longest context column name accepted by MySQL identifiers.
pub const MAX_CONTEXT_NAME_LEN: usize = 64;

/// True if `ident` is safe to splice into SQL as a table or column name.
pub fn is_sql_identifier(ident: &str) -> bool {
    !ident.is_empty()
        && ident.len() <= MAX_CONTEXT_NAME_LEN
        && ident
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !ident.starts_with(|c: char| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sql_identifier() {
        assert!(is_sql_identifier("ct_title"));
        assert!(is_sql_identifier("UPKB_function"));
        assert!(!is_sql_identifier(""));
        assert!(!is_sql_identifier("1abc"));
        assert!(!is_sql_identifier("title; DROP TABLE x"));
        assert!(!is_sql_identifier("a-b"));
        assert!(!is_sql_identifier(&"x".repeat(65)));
    }
}
