use crate::api::handlers::{health, recovery, session};
use utoipa::openapi::{
    Components, Contact, InfoBuilder, License, OpenApiBuilder, Tag,
    security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    // Reuse the same router wiring and only return the generated OpenAPI spec.
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Build the router that also drives the `OpenAPI` document.
///
/// Add new endpoints here via `.routes(routes!(...))` so they are both served
/// and included in the generated `OpenAPI` spec.
/// Routes added outside (like `OPTIONS /health`) are not documented.
pub(crate) fn api_router() -> OpenApiRouter {
    // `routes!` groups handlers sharing one path; each binds its own method.
    let mut router = OpenApiRouter::with_openapi(cargo_openapi())
        .routes(routes!(health::health))
        .routes(routes!(session::login, session::logout, session::current))
        .routes(routes!(session::refresh))
        .routes(routes!(recovery::request_recovery))
        .routes(routes!(recovery::reset_password));

    let openapi = router.get_openapi_mut();

    let mut session_tag = Tag::new("session");
    session_tag.description = Some("Access and refresh token lifecycle".to_string());
    let mut recovery_tag = Tag::new("recovery");
    recovery_tag.description = Some("Password recovery links".to_string());
    let mut health_tag = Tag::new("health");
    health_tag.description = Some("Session and credential store status".to_string());
    openapi.tags = Some(vec![session_tag, recovery_tag, health_tag]);

    openapi
        .components
        .get_or_insert_with(Components::default)
        .add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );

    router
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    // Use Cargo.toml metadata instead of the utoipa-axum crate info defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = cargo_license();

    OpenApiBuilder::new().info(info).build()
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let authors = env!("CARGO_PKG_AUTHORS");
    let primary = authors.split(';').next().map(str::trim)?;
    if primary.is_empty() {
        return None;
    }

    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    let Some(start) = author.find('<') else {
        let name = author.trim();
        return ((!name.is_empty()).then_some(name), None);
    };
    let name = author[..start].trim();
    let email = author[start + 1..].trim_end_matches('>').trim();
    (
        (!name.is_empty()).then_some(name),
        (!email.is_empty()).then_some(email),
    )
}
