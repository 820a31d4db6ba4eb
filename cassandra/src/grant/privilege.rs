use super::resource_type::ResourceType;
use super::ValidationError;
use std::fmt;
use std::str::FromStr;

/// CQL permission that can be granted to a role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Privilege {
    All,
    Create,
    Alter,
    Drop,
    Select,
    Modify,
    Authorize,
    Describe,
    Execute,
}

impl Privilege {
    pub const ALL: [Privilege; 9] = [
        Privilege::All,
        Privilege::Create,
        Privilege::Alter,
        Privilege::Drop,
        Privilege::Select,
        Privilege::Modify,
        Privilege::Authorize,
        Privilege::Describe,
        Privilege::Execute,
    ];

    /// Terraform spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            Privilege::All => "all",
            Privilege::Create => "create",
            Privilege::Alter => "alter",
            Privilege::Drop => "drop",
            Privilege::Select => "select",
            Privilege::Modify => "modify",
            Privilege::Authorize => "authorize",
            Privilege::Describe => "describe",
            Privilege::Execute => "execute",
        }
    }

    /// Resource types this privilege may be granted on
    pub fn permitted_resource_types(&self) -> &'static [ResourceType] {
        use ResourceType::*;

        match self {
            Privilege::All => &[
                AllFunctions,
                AllFunctionsInKeyspace,
                Function,
                AllKeyspaces,
                Keyspace,
                Table,
                AllRoles,
                Role,
            ],
            Privilege::Create => &[
                AllKeyspaces,
                Keyspace,
                AllFunctions,
                AllFunctionsInKeyspace,
                AllRoles,
            ],
            Privilege::Alter => &[
                AllKeyspaces,
                Keyspace,
                Table,
                AllFunctions,
                AllFunctionsInKeyspace,
                Function,
                AllRoles,
                Role,
            ],
            Privilege::Drop => &[
                Keyspace,
                Table,
                AllFunctions,
                AllFunctionsInKeyspace,
                Function,
                AllRoles,
                Role,
            ],
            Privilege::Select | Privilege::Modify => &[
                AllKeyspaces,
                Keyspace,
                Table,
                AllMbeans,
                Mbeans,
                Mbean,
            ],
            Privilege::Authorize => &[
                AllKeyspaces,
                Keyspace,
                Table,
                Function,
                AllFunctions,
                AllFunctionsInKeyspace,
                AllRoles,
                Roles,
            ],
            Privilege::Describe => &[AllRoles, AllMbeans],
            Privilege::Execute => &[AllFunctions, AllFunctionsInKeyspace, Function],
        }
    }

    pub fn permits(&self, resource_type: ResourceType) -> bool {
        self.permitted_resource_types().contains(&resource_type)
    }

    pub fn spellings() -> Vec<&'static str> {
        Self::ALL.iter().map(Privilege::as_str).collect()
    }
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Privilege {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownPrivilege(s.to_string()))
    }
}
