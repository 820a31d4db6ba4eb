use super::Grant;
use crate::cql::quote_identifier;

/// Statement kind rendered for a grant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Delete,
    Read,
}

/// Render the GRANT, REVOKE or LIST statement for a grant.
///
/// All three share the `<privilege> ON <resource>` part so the LIST of a
/// grant names exactly what its GRANT created.
pub fn render(action: Action, grant: &Grant) -> String {
    let (verb, preposition) = match action {
        Action::Create => ("GRANT", "TO"),
        Action::Delete => ("REVOKE", "FROM"),
        Action::Read => ("LIST", "OF"),
    };

    format!(
        "{} {} {} {}",
        verb,
        target(grant),
        preposition,
        quote_identifier(&grant.grantee)
    )
}

fn target(grant: &Grant) -> String {
    let mut target = format!(
        "{} ON {}",
        grant.privilege.as_str().to_uppercase(),
        grant.resource_type.as_str().to_uppercase()
    );

    let qualified = match (&grant.keyspace, &grant.identifier) {
        (Some(keyspace), Some(identifier)) => Some(format!(
            "{}.{}",
            quote_identifier(keyspace),
            quote_identifier(identifier)
        )),
        (Some(keyspace), None) => Some(quote_identifier(keyspace)),
        (None, Some(identifier)) => Some(quote_identifier(identifier)),
        (None, None) => None,
    };

    if let Some(qualified) = qualified {
        target.push(' ');
        target.push_str(&qualified);
    }
    target
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::grant::validate;

    fn grant(
        privilege: &str,
        resource_type: &str,
        keyspace: Option<&str>,
        identifier: Option<&str>,
    ) -> Grant {
        validate(privilege, resource_type, "app_user", keyspace, identifier).unwrap()
    }

    #[test]
    fn table_grant_renders_qualified_name() {
        let grant = grant("select", "table", Some("shop"), Some("orders"));
        assert_eq!(
            render(Action::Create, &grant),
            r#"GRANT SELECT ON TABLE "shop"."orders" TO "app_user""#
        );
        assert_eq!(
            render(Action::Delete, &grant),
            r#"REVOKE SELECT ON TABLE "shop"."orders" FROM "app_user""#
        );
        assert_eq!(
            render(Action::Read, &grant),
            r#"LIST SELECT ON TABLE "shop"."orders" OF "app_user""#
        );
    }

    #[test]
    fn unqualified_resource_has_single_spaces() {
        let grant = grant("create", "all keyspaces", None, None);
        assert_eq!(
            render(Action::Create, &grant),
            r#"GRANT CREATE ON ALL KEYSPACES TO "app_user""#
        );
    }

    #[test]
    fn keyspace_only_and_identifier_only() {
        let grant_ks = grant("modify", "keyspace", Some("shop"), None);
        assert_eq!(
            render(Action::Create, &grant_ks),
            r#"GRANT MODIFY ON KEYSPACE "shop" TO "app_user""#
        );

        let grant_role = grant("alter", "role", None, Some("reporting"));
        assert_eq!(
            render(Action::Create, &grant_role),
            r#"GRANT ALTER ON ROLE "reporting" TO "app_user""#
        );
    }

    #[test]
    fn functions_in_keyspace() {
        let grant = grant("execute", "all functions in keyspace", Some("udfs"), None);
        assert_eq!(
            render(Action::Read, &grant),
            r#"LIST EXECUTE ON ALL FUNCTIONS IN KEYSPACE "udfs" OF "app_user""#
        );
    }

    #[test]
    fn embedded_quotes_are_doubled() {
        let grant = validate("describe", "all roles", r#"o"neil"#, None, None).unwrap();
        assert_eq!(
            render(Action::Create, &grant),
            r#"GRANT DESCRIBE ON ALL ROLES TO "o""neil""#
        );
    }

    #[test]
    fn create_and_read_name_the_same_grant() {
        let grant = grant("select", "mbeans", None, Some("org.apache.cassandra.*"));
        let create = render(Action::Create, &grant);
        let read = render(Action::Read, &grant);

        let created_target = create
            .strip_prefix("GRANT ")
            .and_then(|s| s.rsplit_once(" TO "))
            .unwrap();
        let listed_target = read
            .strip_prefix("LIST ")
            .and_then(|s| s.rsplit_once(" OF "))
            .unwrap();
        assert_eq!(created_target, listed_target);
    }
}
