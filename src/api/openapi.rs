use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use super::{
    error::ErrorBody,
    handlers::{self, files, health, me, user_login, user_register},
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        user_register::register,
        user_login::login,
        me::me,
        files::upload,
        files::list,
        files::download,
    ),
    components(schemas(
        ErrorBody,
        handlers::Credentials,
        handlers::MessageResponse,
        health::Health,
        user_login::TokenResponse,
        me::MeResponse,
        files::UploadForm,
        files::UploadResponse,
        files::FileEntry,
        files::FileList,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration and login"),
        (name = "user", description = "Bearer-protected user and file routes"),
        (name = "health", description = "Service status"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/auth/register",
            "/auth/login",
            "/user/me",
            "/user/upload",
            "/user/download",
            "/user/download/{fileID}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn declares_bearer_scheme() {
        let doc = ApiDoc::openapi();
        let schemes = doc
            .components
            .map(|components| components.security_schemes)
            .unwrap_or_default();
        assert!(schemes.contains_key("bearer"));
    }
}
