//! Router construction.
//!
//! Builds the axum router with all routes and middleware.

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::get;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::language::CHANGE_LANGUAGE_PATH;
use crate::middleware::{language, security};
use crate::state::AppState;

/// Create the application router.
///
/// # Arguments
///
/// * `state` - Shared application state
/// * `asset_dir` - Directory served under `/assets`
pub(crate) fn create_router(state: Arc<AppState>, asset_dir: &Path) -> Router {
    // Content routes need a language on multilingual sites
    let content_routes = Router::new()
        .route("/", get(handlers::content::index))
        .route("/posts/{id}", get(handlers::content::post))
        .route("/pages/{id}", get(handlers::content::page))
        .layer(from_fn_with_state(Arc::clone(&state), language::negotiate));

    Router::new()
        .merge(content_routes)
        .route(
            CHANGE_LANGUAGE_PATH,
            get(handlers::language_select::change_language),
        )
        .route("/heartbeat", get(handlers::health::heartbeat))
        .nest_service("/assets", ServeDir::new(asset_dir))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new().gzip(true))
                .layer(from_fn(security::harden)),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use axum::body::{Body, to_bytes};
    use axum::http::header::{ACCEPT_ENCODING, CONTENT_ENCODING, COOKIE, REFERER, SET_COOKIE};
    use axum::http::{Method, Request, StatusCode};
    use folio_posts::{PostStore, post_filter};
    use folio_templates::{EmbeddedSource, Fragment, RegistryOptions, TemplateRegistry};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::*;
    use crate::Languages;

    fn write_templates(dir: &Path) {
        fs::create_dir_all(dir).unwrap();
        for fragment in Fragment::ALL {
            let source = match fragment {
                Fragment::Application => r#"{% include "content" %}"#,
                Fragment::Index => {
                    "{% for p in posts %}{{ p.id }};{% endfor %}|{% for p in pages %}{{ p.id }};{% endfor %}"
                }
                Fragment::Post => "{{ current.title }}:{{ current.content | safe }}",
                Fragment::LanguageSelect => r#"{{ redirect | safe }}:{{ languages | join(",") }}"#,
                _ => "",
            };
            fs::write(dir.join(fragment.file_name()), source).unwrap();
        }
    }

    fn write_post(dir: &Path, name: &str, header: &str, body: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(name), format!("{header}\n{body}")).unwrap();
    }

    fn site(multilingual: bool) -> (TempDir, Router) {
        site_with(multilingual, |_| {})
    }

    /// A site with two posts (`en`, `fr`), one hidden post and one page.
    /// `edit` runs on the site root before anything is loaded.
    fn site_with(multilingual: bool, edit: impl FnOnce(&Path)) -> (TempDir, Router) {
        let root = tempfile::tempdir().unwrap();
        let templates = root.path().join("templates");
        let posts = root.path().join("posts");
        let pages = root.path().join("pages");
        let assets = root.path().join("assets");

        write_templates(&templates);
        write_post(
            &posts,
            "hello.md",
            r#"{"title": "Hello", "language": "en", "date": "2020-01-02T00:00:00Z"}"#,
            "# Hello",
        );
        write_post(
            &posts,
            "bonjour.md",
            r#"{"title": "Bonjour", "language": "fr", "date": "2020-01-01T00:00:00Z"}"#,
            "Salut",
        );
        write_post(
            &posts,
            "draft.md",
            r#"{"title": "Draft", "invisible": true}"#,
            "wip",
        );
        write_post(&pages, "about.md", r#"{"title": "About"}"#, "Me");
        fs::create_dir_all(assets.join("css")).unwrap();
        fs::write(assets.join("css/site.css"), "body {}").unwrap();
        edit(root.path());

        let mut options = RegistryOptions::new(&templates);
        options.with_language_select = multilingual;
        let registry = TemplateRegistry::new(options, EmbeddedSource).unwrap();

        let post_store = PostStore::new(&posts, post_filter(None));
        post_store.load().unwrap();
        let page_store = PostStore::new(&pages, post_filter(None));
        page_store.load().unwrap();

        let state = Arc::new(AppState {
            templates: Arc::new(registry),
            posts: Arc::new(post_store),
            pages: Arc::new(page_store),
            languages: Languages {
                multilingual,
                available: vec!["en".to_owned(), "fr".to_owned()],
            },
        });
        let router = create_router(state, &assets);
        (root, router)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_text(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_index_lists_visible_posts_and_pages() {
        let (_root, app) = site(false);

        let response = app.oneshot(get_request("/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "hello;bonjour;|about;");
    }

    #[tokio::test]
    async fn test_single_language_site_ignores_query() {
        let (_root, app) = site(false);

        let response = app.oneshot(get_request("/?fr")).await.unwrap();

        assert!(response.headers().get(SET_COOKIE).is_none());
        assert_eq!(body_text(response).await, "hello;bonjour;|about;");
    }

    #[tokio::test]
    async fn test_post_renders_markdown() {
        let (_root, app) = site(false);

        let response = app.oneshot(get_request("/posts/hello")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "Hello:<h1>Hello</h1>\n");
    }

    #[tokio::test]
    async fn test_page_renders_with_post_bundle() {
        let (_root, app) = site(false);

        let response = app.oneshot(get_request("/pages/about")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "About:<p>Me</p>\n");
    }

    #[tokio::test]
    async fn test_unknown_and_invisible_posts_are_not_found() {
        let (_root, app) = site(false);

        let missing = app.clone().oneshot(get_request("/posts/nope")).await.unwrap();
        let hidden = app.clone().oneshot(get_request("/posts/draft")).await.unwrap();
        let page_as_post = app.oneshot(get_request("/posts/about")).await.unwrap();

        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(hidden.status(), StatusCode::NOT_FOUND);
        assert_eq!(page_as_post.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_heartbeat() {
        let (_root, app) = site(false);

        let response = app.oneshot(get_request("/heartbeat")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_assets_served_from_directory() {
        let (_root, app) = site(false);

        let found = app.clone().oneshot(get_request("/assets/css/site.css")).await.unwrap();
        let missing = app.oneshot(get_request("/assets/css/none.css")).await.unwrap();

        assert_eq!(found.status(), StatusCode::OK);
        assert_eq!(body_text(found).await, "body {}");
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_security_headers() {
        let (_root, app) = site(false);

        let response = app.oneshot(get_request("/")).await.unwrap();
        let headers = response.headers();

        assert_eq!(headers["x-content-type-options"], "nosniff");
        assert_eq!(headers["x-frame-options"], "DENY");
        assert!(headers.contains_key("content-security-policy"));
    }

    #[tokio::test]
    async fn test_hardening_headers_on_assets_and_not_found() {
        let (_root, app) = site(false);

        let asset = app.clone().oneshot(get_request("/assets/css/site.css")).await.unwrap();
        let missing = app.oneshot(get_request("/posts/nope")).await.unwrap();

        assert_eq!(asset.headers()["x-frame-options"], "DENY");
        assert_eq!(missing.headers()["x-content-type-options"], "nosniff");
    }

    #[tokio::test]
    async fn test_responses_gzip_when_accepted() {
        let long = "All work and no play makes a dull blog. ".repeat(20);
        let (_root, app) = site_with(false, |root| {
            write_post(&root.join("posts"), "long.md", r#"{"title": "Long"}"#, &long);
        });
        let request = Request::builder()
            .uri("/posts/long")
            .header(ACCEPT_ENCODING, "gzip")
            .body(Body::empty())
            .unwrap();

        let gzipped = app.clone().oneshot(request).await.unwrap();
        let plain = app.oneshot(get_request("/posts/long")).await.unwrap();

        assert_eq!(gzipped.status(), StatusCode::OK);
        assert_eq!(gzipped.headers()[CONTENT_ENCODING], "gzip");
        assert!(plain.headers().get(CONTENT_ENCODING).is_none());
        assert!(body_text(plain).await.contains(long.trim_end()));
    }

    #[tokio::test]
    async fn test_change_language_disabled_is_not_found() {
        let (_root, app) = site(false);

        let response = app.oneshot(get_request("/changelang")).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_multilingual_without_language_asks_for_one() {
        let (_root, app) = site(true);

        let response = app.oneshot(get_request("/posts/hello")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(SET_COOKIE).is_none());
        assert_eq!(body_text(response).await, "/posts/hello:en,fr");
    }

    #[tokio::test]
    async fn test_multilingual_query_filters_and_sets_cookie() {
        let (_root, app) = site(true);

        let response = app.oneshot(get_request("/?fr")).await.unwrap();

        assert_eq!(response.headers()[SET_COOKIE], "lang=fr; Path=/");
        assert_eq!(body_text(response).await, "bonjour;|");
    }

    #[tokio::test]
    async fn test_multilingual_cookie_selects_language() {
        let (_root, app) = site(true);
        let request = Request::builder()
            .uri("/")
            .header(COOKIE, "lang=en")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert!(response.headers().get(SET_COOKIE).is_none());
        assert_eq!(body_text(response).await, "hello;|");
    }

    #[tokio::test]
    async fn test_choice_from_language_select_replaces_cookie() {
        let (_root, app) = site(true);
        let request = Request::builder()
            .uri("/?fr")
            .header(COOKIE, "lang=en")
            .header(REFERER, "http://localhost:3000/changelang")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.headers()[SET_COOKIE], "lang=fr; Path=/");
    }

    #[tokio::test]
    async fn test_change_language_redirects_home() {
        let (_root, app) = site(true);

        let response = app.oneshot(get_request("/changelang")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "/:en,fr");
    }

    #[tokio::test]
    async fn test_render_failure_is_internal_error() {
        let (_root, app) = site_with(false, |root| {
            fs::write(
                root.join("templates/post.tmpl"),
                r#"{% include "nowhere" %}"#,
            )
            .unwrap();
        });

        let response = app.oneshot(get_request("/posts/hello")).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await, "500 internal server error");
    }
}
