use crate::api::handlers::{health, users};
use utoipa::openapi::{Contact, InfoBuilder, License, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

/// `OpenAPI` document generated from the routed handlers.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Documented routes. `OPTIONS /health` and the Swagger UI are mounted by the
/// caller and stay out of the document.
pub(crate) fn api_router() -> OpenApiRouter {
    // `routes!` groups handlers sharing a path; each group is one `.routes` call.
    OpenApiRouter::with_openapi(package_openapi())
        .routes(routes!(health::health))
        .routes(routes!(users::list_users, users::create_user))
        .routes(routes!(
            users::get_user,
            users::update_user,
            users::patch_user_password,
            users::delete_user
        ))
}

fn tag(name: &str, description: &str) -> Tag {
    let mut tag = Tag::new(name);
    tag.description = Some(description.to_string());
    tag
}

fn package_openapi() -> utoipa::openapi::OpenApi {
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(non_empty(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = env!("CARGO_PKG_AUTHORS")
        .split(';')
        .next()
        .and_then(author_contact);
    info.license = non_empty(env!("CARGO_PKG_LICENSE")).map(|id| {
        let mut license = License::new(id);
        license.identifier = Some(id.to_string());
        license
    });

    let mut doc = OpenApiBuilder::new().info(info).build();
    doc.tags = Some(vec![
        tag("users", "User account management"),
        tag("health", "Service and store liveness"),
    ]);
    doc
}

fn non_empty(value: &str) -> Option<&str> {
    Some(value.trim()).filter(|v| !v.is_empty())
}

/// Parse a Cargo author entry, `Name <email>` or a bare name.
fn author_contact(author: &str) -> Option<Contact> {
    let (name, email) = match author.split_once('<') {
        Some((name, rest)) => (non_empty(name), non_empty(rest.trim_end().trim_end_matches('>'))),
        None => (non_empty(author), None),
    };

    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_user_and_health_paths() {
        let doc = openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        assert!(paths.iter().any(|p| p.as_str() == "/health"));
        assert!(paths.iter().any(|p| p.as_str() == "/users"));
        assert!(paths.iter().any(|p| p.as_str() == "/users/{id}"));
    }

    #[test]
    fn document_uses_package_metadata() {
        let doc = openapi();
        assert_eq!(doc.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(doc.info.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(
            doc.info.license.map(|l| l.name),
            Some("BSD-3-Clause".to_string())
        );
    }

    #[test]
    fn document_has_tags() {
        let names: Vec<String> = openapi()
            .tags
            .unwrap_or_default()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["users".to_string(), "health".to_string()]);
    }

    #[test]
    fn health_responses_are_single_objects() {
        let doc = serde_json::to_value(openapi()).unwrap_or_default();
        for status in ["200", "503"] {
            let schema = &doc["paths"]["/health"]["get"]["responses"][status]["content"]
                ["application/json"]["schema"];
            assert_eq!(schema["$ref"], "#/components/schemas/Health", "{status}");
            assert!(schema.get("items").is_none());
        }
    }

    #[test]
    fn author_with_email() {
        let contact = author_contact("Team Accounts <team@accounts.dev>");
        assert_eq!(
            contact.as_ref().and_then(|c| c.name.as_deref()),
            Some("Team Accounts")
        );
        assert_eq!(
            contact.as_ref().and_then(|c| c.email.as_deref()),
            Some("team@accounts.dev")
        );
    }

    #[test]
    fn author_without_email() {
        let contact = author_contact("Team Accounts");
        assert_eq!(
            contact.as_ref().and_then(|c| c.name.as_deref()),
            Some("Team Accounts")
        );
        assert_eq!(contact.and_then(|c| c.email), None);
    }

    #[test]
    fn blank_author_has_no_contact() {
        assert!(author_contact("   ").is_none());
        assert!(author_contact("<>").is_none());
    }
}
