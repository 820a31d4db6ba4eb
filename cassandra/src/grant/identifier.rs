//! Identifier attributes of the grant resource and the conflicts between them

use std::fmt;

pub const KEYSPACE_NAME: &str = "keyspace_name";
pub const FUNCTION_NAME: &str = "function_name";
pub const TABLE_NAME: &str = "table_name";
pub const ROLE_NAME: &str = "role_name";
pub const MBEAN_NAME: &str = "mbean_name";
pub const MBEAN_PATTERN: &str = "mbean_pattern";

/// Attribute carrying the name of the object a grant targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Identifier {
    FunctionName,
    TableName,
    RoleName,
    MbeanName,
    MbeanPattern,
}

impl Identifier {
    pub fn attribute(&self) -> &'static str {
        match self {
            Identifier::FunctionName => FUNCTION_NAME,
            Identifier::TableName => TABLE_NAME,
            Identifier::RoleName => ROLE_NAME,
            Identifier::MbeanName => MBEAN_NAME,
            Identifier::MbeanPattern => MBEAN_PATTERN,
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.attribute())
    }
}

/// Every attribute taking part in the conflict rules
pub const QUALIFIER_ATTRIBUTES: [&str; 6] = [
    KEYSPACE_NAME,
    FUNCTION_NAME,
    TABLE_NAME,
    ROLE_NAME,
    MBEAN_NAME,
    MBEAN_PATTERN,
];

/// Attributes that must not be set together with `attribute`
pub fn conflicts_with(attribute: &str) -> &'static [&'static str] {
    match attribute {
        KEYSPACE_NAME => &[ROLE_NAME, MBEAN_NAME, MBEAN_PATTERN],
        FUNCTION_NAME => &[TABLE_NAME, ROLE_NAME, MBEAN_NAME, MBEAN_PATTERN],
        TABLE_NAME => &[FUNCTION_NAME, ROLE_NAME, MBEAN_NAME, MBEAN_PATTERN],
        ROLE_NAME => &[
            FUNCTION_NAME,
            TABLE_NAME,
            MBEAN_NAME,
            MBEAN_PATTERN,
            KEYSPACE_NAME,
        ],
        MBEAN_NAME => &[
            FUNCTION_NAME,
            TABLE_NAME,
            ROLE_NAME,
            MBEAN_PATTERN,
            KEYSPACE_NAME,
        ],
        MBEAN_PATTERN => &[
            FUNCTION_NAME,
            TABLE_NAME,
            ROLE_NAME,
            MBEAN_NAME,
            KEYSPACE_NAME,
        ],
        _ => &[],
    }
}

/// Pairs of set attributes that conflict, each pair reported once in
/// declaration order. `is_set` decides whether an attribute carries a value.
pub fn find_conflicts(is_set: impl Fn(&str) -> bool) -> Vec<(&'static str, &'static str)> {
    let mut conflicts = Vec::new();
    for (i, attribute) in QUALIFIER_ATTRIBUTES.iter().enumerate() {
        if !is_set(*attribute) {
            continue;
        }
        for other in &QUALIFIER_ATTRIBUTES[i + 1..] {
            if is_set(*other) && conflicts_with(attribute).contains(other) {
                conflicts.push((*attribute, *other));
            }
        }
    }
    conflicts
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn conflict_table_is_symmetric() {
        for attribute in QUALIFIER_ATTRIBUTES {
            for other in conflicts_with(attribute) {
                assert!(
                    conflicts_with(other).contains(&attribute),
                    "{} conflicts with {} but not the other way round",
                    attribute,
                    other
                );
            }
        }
    }

    #[test]
    fn keyspace_and_table_may_be_combined() {
        let set = [KEYSPACE_NAME, TABLE_NAME];
        assert!(find_conflicts(|a| set.contains(&a)).is_empty());
    }

    #[test]
    fn keyspace_and_role_conflict() {
        let set = [KEYSPACE_NAME, ROLE_NAME];
        assert_eq!(
            find_conflicts(|a| set.contains(&a)),
            vec![(KEYSPACE_NAME, ROLE_NAME)]
        );
    }

    #[test]
    fn every_pair_is_reported_once() {
        let set = [FUNCTION_NAME, TABLE_NAME, MBEAN_NAME];
        assert_eq!(
            find_conflicts(|a| set.contains(&a)),
            vec![
                (FUNCTION_NAME, TABLE_NAME),
                (FUNCTION_NAME, MBEAN_NAME),
                (TABLE_NAME, MBEAN_NAME),
            ]
        );
    }

    #[test]
    fn unknown_attribute_has_no_conflicts() {
        assert!(conflicts_with("grantee").is_empty());
    }
}
