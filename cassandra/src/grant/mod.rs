//! Grant authorization model
//!
//! A grant gives a privilege on a resource to a role. Which resource types a
//! privilege applies to, which of them need a keyspace qualifier and which
//! name a specific object are fixed by Cassandra; this module holds those
//! tables, validates grants against them and renders the CQL for them.

pub mod identifier;
pub mod privilege;
pub mod resource_type;
pub mod statement;

pub use identifier::Identifier;
pub use privilege::Privilege;
pub use resource_type::ResourceType;
pub use statement::{render, Action};

use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is not a valid privilege, must be one of all, create, alter, drop, select, modify, authorize, describe, execute")]
    UnknownPrivilege(String),

    #[error(
        "{0} is not a valid resource type, must be one of all functions, all functions in keyspace, \
         function, all keyspaces, keyspace, table, all roles, role, roles, mbean, mbeans, all mbeans"
    )]
    UnknownResourceType(String),

    #[error("{resource_type} resource not applicable for privilege {privilege} - valid resource types are {permitted}")]
    NotPermitted {
        privilege: Privilege,
        resource_type: ResourceType,
        permitted: String,
    },

    #[error("grantee must be set")]
    MissingGrantee,

    #[error("keyspace_name must be set for resource type {0}")]
    MissingKeyspace(ResourceType),

    #[error("{identifier} needs to be set when resource_type = {resource_type}")]
    MissingIdentifier {
        identifier: Identifier,
        resource_type: ResourceType,
    },
}

/// A validated grant. Keyspace and identifier are only present when the
/// resource type uses them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Grant {
    pub privilege: Privilege,
    pub resource_type: ResourceType,
    pub grantee: String,
    pub keyspace: Option<String>,
    pub identifier: Option<String>,
}

impl Grant {
    /// Stable identity of the grant: hex SHA-256 of its canonical form
    pub fn id(&self) -> String {
        let canonical = format!(
            "{{Privilege:{} ResourceType:{} Grantee:{} Keyspace:{} Identifier:{}}}",
            self.privilege,
            self.resource_type,
            self.grantee,
            self.keyspace.as_deref().unwrap_or_default(),
            self.identifier.as_deref().unwrap_or_default()
        );
        hex::encode(Sha256::digest(canonical.as_bytes()))
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Validate a grant tuple against the authorization tables.
///
/// Fails when the resource type is not permitted for the privilege, when a
/// keyspace-qualified type has no keyspace, or when a type naming a specific
/// object has no identifier.
pub fn validate(
    privilege: &str,
    resource_type: &str,
    grantee: &str,
    keyspace: Option<&str>,
    identifier: Option<&str>,
) -> Result<Grant, ValidationError> {
    let privilege: Privilege = privilege.parse()?;
    let resource_type: ResourceType = resource_type.parse()?;

    if !privilege.permits(resource_type) {
        let permitted = privilege
            .permitted_resource_types()
            .iter()
            .map(ResourceType::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        return Err(ValidationError::NotPermitted {
            privilege,
            resource_type,
            permitted,
        });
    }

    if grantee.is_empty() {
        return Err(ValidationError::MissingGrantee);
    }

    let keyspace = if resource_type.requires_keyspace() {
        match non_empty(keyspace) {
            Some(keyspace) => Some(keyspace.to_string()),
            None => return Err(ValidationError::MissingKeyspace(resource_type)),
        }
    } else {
        None
    };

    let identifier = match resource_type.identifier() {
        Some(attribute) => match non_empty(identifier) {
            Some(identifier) => Some(identifier.to_string()),
            None => {
                return Err(ValidationError::MissingIdentifier {
                    identifier: attribute,
                    resource_type,
                })
            }
        },
        None => None,
    };

    Ok(Grant {
        privilege,
        resource_type,
        grantee: grantee.to_string(),
        keyspace,
        identifier,
    })
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn every_pair_outside_the_table_fails() {
        for privilege in Privilege::ALL {
            for resource_type in ResourceType::ALL {
                let result = validate(
                    privilege.as_str(),
                    resource_type.as_str(),
                    "app_user",
                    Some("shop"),
                    Some("target"),
                );
                if privilege.permits(resource_type) {
                    assert!(result.is_ok(), "{} on {}", privilege, resource_type);
                } else {
                    assert!(
                        matches!(result, Err(ValidationError::NotPermitted { .. })),
                        "{} on {} should be rejected",
                        privilege,
                        resource_type
                    );
                }
            }
        }
    }

    #[test]
    fn keyspace_qualified_types_need_a_keyspace() {
        for resource_type in ResourceType::ALL
            .into_iter()
            .filter(ResourceType::requires_keyspace)
        {
            let privilege = Privilege::ALL
                .into_iter()
                .find(|p| p.permits(resource_type))
                .unwrap();

            for keyspace in [None, Some("")] {
                let err = validate(
                    privilege.as_str(),
                    resource_type.as_str(),
                    "app_user",
                    keyspace,
                    Some("target"),
                )
                .unwrap_err();
                assert_eq!(err, ValidationError::MissingKeyspace(resource_type));
            }
        }
    }

    #[test]
    fn identifier_types_need_an_identifier() {
        let err = validate("select", "table", "app_user", Some("shop"), None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "table_name needs to be set when resource_type = table"
        );

        let err = validate("select", "mbeans", "app_user", None, Some("")).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::MissingIdentifier {
                identifier: Identifier::MbeanPattern,
                ..
            }
        ));
    }

    #[test]
    fn unused_qualifiers_are_dropped() {
        let grant = validate(
            "create",
            "all keyspaces",
            "app_user",
            Some("shop"),
            Some("orders"),
        )
        .unwrap();
        assert_eq!(grant.keyspace, None);
        assert_eq!(grant.identifier, None);
    }

    #[test]
    fn not_permitted_message_lists_valid_types() {
        let err = validate("describe", "table", "app_user", Some("shop"), Some("t")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "table resource not applicable for privilege describe - valid resource types are all roles, all mbeans"
        );
    }

    #[test]
    fn unknown_spellings_are_rejected() {
        assert!(matches!(
            validate("read", "table", "u", Some("k"), Some("t")),
            Err(ValidationError::UnknownPrivilege(_))
        ));
        assert!(matches!(
            validate("select", "tables", "u", Some("k"), Some("t")),
            Err(ValidationError::UnknownResourceType(_))
        ));
    }

    #[test]
    fn empty_grantee_is_rejected() {
        assert_eq!(
            validate("describe", "all roles", "", None, None),
            Err(ValidationError::MissingGrantee)
        );
    }

    #[test]
    fn id_is_stable_and_distinguishes_grants() {
        let grant = validate("select", "table", "app_user", Some("shop"), Some("orders")).unwrap();
        assert_eq!(
            grant.id(),
            "4aa8ca1cdc1baaeb0e151ae75c05563a49bc53c63db34a5e4540b29fa8e5018a"
        );

        let other = validate("modify", "table", "app_user", Some("shop"), Some("orders")).unwrap();
        assert_ne!(grant.id(), other.id());
        assert_eq!(grant.id(), grant.clone().id());
    }
}
