//! Quoting of values embedded in CQL statements

/// Quote an identifier so Cassandra keeps its case, doubling embedded `"`
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a string literal, doubling embedded `'`
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_keep_case_and_escape_quotes() {
        assert_eq!(quote_identifier("MyShop"), r#""MyShop""#);
        assert_eq!(quote_identifier(r#"we"ird"#), r#""we""ird""#);
    }

    #[test]
    fn literals_escape_single_quotes() {
        assert_eq!(quote_literal("dc1"), "'dc1'");
        assert_eq!(quote_literal("o'neil"), "'o''neil'");
    }
}
