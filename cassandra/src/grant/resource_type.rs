use super::identifier::Identifier;
use super::ValidationError;
use std::fmt;
use std::str::FromStr;

/// Class of CQL object a privilege targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    AllFunctions,
    AllFunctionsInKeyspace,
    Function,
    AllKeyspaces,
    Keyspace,
    Table,
    AllRoles,
    Role,
    Roles,
    Mbean,
    Mbeans,
    AllMbeans,
}

impl ResourceType {
    pub const ALL: [ResourceType; 12] = [
        ResourceType::AllFunctions,
        ResourceType::AllFunctionsInKeyspace,
        ResourceType::Function,
        ResourceType::AllKeyspaces,
        ResourceType::Keyspace,
        ResourceType::Table,
        ResourceType::AllRoles,
        ResourceType::Role,
        ResourceType::Roles,
        ResourceType::Mbean,
        ResourceType::Mbeans,
        ResourceType::AllMbeans,
    ];

    /// Terraform spelling, also the CQL resource keyword in lowercase
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::AllFunctions => "all functions",
            ResourceType::AllFunctionsInKeyspace => "all functions in keyspace",
            ResourceType::Function => "function",
            ResourceType::AllKeyspaces => "all keyspaces",
            ResourceType::Keyspace => "keyspace",
            ResourceType::Table => "table",
            ResourceType::AllRoles => "all roles",
            ResourceType::Role => "role",
            ResourceType::Roles => "roles",
            ResourceType::Mbean => "mbean",
            ResourceType::Mbeans => "mbeans",
            ResourceType::AllMbeans => "all mbeans",
        }
    }

    pub fn requires_keyspace(&self) -> bool {
        matches!(
            self,
            ResourceType::AllFunctionsInKeyspace
                | ResourceType::Function
                | ResourceType::Keyspace
                | ResourceType::Table
        )
    }

    /// Attribute naming the targeted object, if the type targets one
    pub fn identifier(&self) -> Option<Identifier> {
        match self {
            ResourceType::Function => Some(Identifier::FunctionName),
            ResourceType::Mbean => Some(Identifier::MbeanName),
            ResourceType::Mbeans => Some(Identifier::MbeanPattern),
            ResourceType::Table => Some(Identifier::TableName),
            ResourceType::Role => Some(Identifier::RoleName),
            _ => None,
        }
    }

    pub fn spellings() -> Vec<&'static str> {
        Self::ALL.iter().map(ResourceType::as_str).collect()
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownResourceType(s.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_spelling() {
        for resource_type in ResourceType::ALL {
            assert_eq!(
                resource_type.as_str().parse::<ResourceType>().unwrap(),
                resource_type
            );
        }
        assert!("columnfamily".parse::<ResourceType>().is_err());
    }

    #[test]
    fn keyspace_qualified_types() {
        let qualified: Vec<_> = ResourceType::ALL
            .into_iter()
            .filter(ResourceType::requires_keyspace)
            .collect();
        assert_eq!(
            qualified,
            vec![
                ResourceType::AllFunctionsInKeyspace,
                ResourceType::Function,
                ResourceType::Keyspace,
                ResourceType::Table,
            ]
        );
    }

    #[test]
    fn identifier_attributes() {
        assert_eq!(
            ResourceType::Table.identifier(),
            Some(Identifier::TableName)
        );
        assert_eq!(
            ResourceType::Mbeans.identifier(),
            Some(Identifier::MbeanPattern)
        );
        assert_eq!(ResourceType::Keyspace.identifier(), None);
        assert_eq!(ResourceType::Roles.identifier(), None);
    }
}
