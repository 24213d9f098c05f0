//! API Router with Swagger UI

use std::sync::Arc;
use std::time::Instant;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::dto::{account as account_dto, files as files_dto, ApiResponse};
use crate::api::handlers::{account, files, health};
use crate::api::metrics::{http_metrics_middleware, prometheus_metrics, MetricsState};
use crate::application::AccountService;
use crate::auth::{admin_middleware, auth_middleware, AuthState, JwtAuthConfig};
use crate::files::FileStore;

/// Security scheme modifier for OpenAPI
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT Bearer token"))
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health::health_check,
        // Account
        account::login,
        account::get_current_user,
        account::register,
        account::get_roles,
        account::grant_role,
        account::revoke_role,
        account::check_role,
        // Files
        files::list_files,
        files::get_file_info,
        files::download_file,
        files::file_digest,
        files::upload_file,
        files::delete_file,
        files::copy_file,
        // Digests
        files::body_digest,
    ),
    components(
        schemas(
            // Common
            ApiResponse<String>,
            // Account
            account_dto::LoginRequest,
            account_dto::LoginResponse,
            account_dto::UserInfo,
            account_dto::RegisterRequest,
            account_dto::RegisterResponse,
            account_dto::RolesResponse,
            account_dto::RoleMembershipResponse,
            // Files
            files_dto::FileInfoResponse,
            files_dto::UploadResponse,
            files_dto::CopyResponse,
            files_dto::DigestResponse,
            // Health
            health::HealthResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Server health check endpoints"),
        (name = "Account", description = "User authentication: login (JWT), registration, role management"),
        (name = "Files", description = "Stored file listing, download, upload, copy and digests"),
        (name = "Digests", description = "Digest computation over raw request bodies"),
    ),
    info(
        title = "File Server API",
        version = "1.0.0",
        description = "REST API for authenticated file storage with JWT role-based access",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

/// Create the API router with all routes
pub fn create_api_router(
    service: Arc<AccountService>,
    store: Arc<FileStore>,
    jwt_config: JwtAuthConfig,
    metrics_handle: PrometheusHandle,
) -> Router {
    let auth_state = AuthState { jwt_config };

    let account_state = account::AccountHandlerState {
        service: service.clone(),
    };
    let file_state = files::FileHandlerState { store };
    let health_state = health::HealthState {
        service,
        started_at: Arc::new(Instant::now()),
    };

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Account routes (public)
    let account_routes = Router::new()
        .route("/login", post(account::login))
        .with_state(account_state.clone());

    // Account routes (any authenticated user)
    let account_protected_routes = Router::new()
        .route("/me", get(account::get_current_user))
        .layer(middleware::from_fn_with_state(
            auth_state.clone(),
            auth_middleware,
        ))
        .with_state(account_state.clone());

    // Account routes (admin only). The auth layer is added last so it runs
    // before the admin check.
    let account_admin_routes = Router::new()
        .route("/register", post(account::register))
        .route("/{username}/roles", get(account::get_roles))
        .route(
            "/{username}/roles/{role}",
            put(account::grant_role)
                .delete(account::revoke_role)
                .get(account::check_role),
        )
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(
            auth_state.clone(),
            auth_middleware,
        ))
        .with_state(account_state);

    // File routes (any authenticated user)
    let file_routes = Router::new()
        .route("/", get(files::list_files))
        .route("/{file_name}/info", get(files::get_file_info))
        .route("/{file_name}/content", get(files::download_file))
        .route("/{file_name}/digest/{algorithm}", get(files::file_digest))
        .layer(middleware::from_fn_with_state(
            auth_state.clone(),
            auth_middleware,
        ))
        .with_state(file_state.clone());

    // File routes (admin only)
    let file_admin_routes = Router::new()
        .route(
            "/{file_name}",
            post(files::upload_file).delete(files::delete_file),
        )
        .route("/{file_name}/copy-to/{destination}", post(files::copy_file))
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(
            auth_state.clone(),
            auth_middleware,
        ))
        .with_state(file_state);

    // Request body digests (any authenticated user)
    let digest_routes = Router::new()
        .route("/{algorithm}", post(files::body_digest))
        .layer(middleware::from_fn_with_state(auth_state, auth_middleware));

    let health_routes = Router::new()
        .route("/health", get(health::health_check))
        .with_state(health_state);

    let metrics_routes = Router::new()
        .route("/metrics", get(prometheus_metrics))
        .with_state(MetricsState {
            handle: metrics_handle,
        });

    let swagger_routes = SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi());

    // Build router
    Router::new()
        // Swagger UI
        .merge(swagger_routes)
        // Health + metrics (public)
        .merge(health_routes)
        .merge(metrics_routes)
        // Account
        .nest("/api/v1/account", account_routes)
        .nest("/api/v1/account", account_protected_routes)
        .nest("/api/v1/account", account_admin_routes)
        // Files
        .nest("/api/v1/files", file_routes)
        .nest("/api/v1/files", file_admin_routes)
        // Digests
        .nest("/api/v1/digests", digest_routes)
        // Middleware
        .layer(middleware::from_fn(http_metrics_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use chrono::{Duration, Utc};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use serde_json::{json, Value};
    use tower::Service;

    use crate::auth::issue_token;
    use crate::identity::IdentityDirectory;

    struct TestApp {
        router: Router,
        _content_dir: tempfile::TempDir,
    }

    fn test_jwt() -> JwtAuthConfig {
        JwtAuthConfig {
            key: "router-test-key".to_string(),
            issuer: "router-test".to_string(),
            audience: "router-test-clients".to_string(),
            expires_time_minutes: 120,
        }
    }

    fn test_app() -> TestApp {
        let directory = Arc::new(IdentityDirectory::new());
        directory.register("plain", "plain-pw");

        let service = Arc::new(AccountService::new(directory, test_jwt()));
        let content_dir = tempfile::tempdir().unwrap();
        let store = Arc::new(FileStore::new(content_dir.path()));
        let handle = PrometheusBuilder::new().build_recorder().handle();

        TestApp {
            router: create_api_router(service, store, test_jwt(), handle),
            _content_dir: content_dir,
        }
    }

    async fn send(app: &TestApp, req: Request<Body>) -> axum::http::Response<Body> {
        let mut svc = app.router.clone().into_service();
        svc.call(req).await.unwrap()
    }

    async fn body_json(resp: axum::http::Response<Body>) -> Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn login(app: &TestApp, username: &str, password: &str) -> String {
        let req = Request::builder()
            .method("POST")
            .uri("/api/v1/account/login")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({"username": username, "password": password}).to_string(),
            ))
            .unwrap();
        let resp = send(app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        json["data"]["token"].as_str().unwrap().to_string()
    }

    fn get_with(uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .method("GET")
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    fn request_with(method: &str, uri: &str, token: &str, body: Body) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(body)
            .unwrap()
    }

    #[tokio::test]
    async fn login_issues_a_usable_session() {
        let app = test_app();
        let req = Request::builder()
            .method("POST")
            .uri("/api/v1/account/login")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({"username": "Admin", "password": "123"}).to_string(),
            ))
            .unwrap();

        let resp = send(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let json = body_json(resp).await;
        assert_eq!(json["success"], json!(true));
        assert_eq!(json["data"]["token_type"], json!("Bearer"));
        assert_eq!(json["data"]["user"]["username"], json!("Admin"));
        assert_eq!(json["data"]["user"]["role"], json!("Admin"));
        assert!(!json["data"]["token"].as_str().unwrap().is_empty());
        assert!(json["data"]["expires_at"].is_string());
    }

    #[tokio::test]
    async fn bad_credentials_get_the_same_answer() {
        let app = test_app();
        let mut errors = Vec::new();
        for (username, password) in [("Admin", "wrong"), ("ghost", "123")] {
            let req = Request::builder()
                .method("POST")
                .uri("/api/v1/account/login")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({"username": username, "password": password}).to_string(),
                ))
                .unwrap();
            let resp = send(&app, req).await;
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
            errors.push(body_json(resp).await["error"].clone());
        }
        assert_eq!(errors[0], errors[1]);
    }

    #[tokio::test]
    async fn empty_login_fields_fail_validation() {
        let app = test_app();
        let req = Request::builder()
            .method("POST")
            .uri("/api/v1/account/login")
            .header("content-type", "application/json")
            .body(Body::from(json!({"username": "", "password": ""}).to_string()))
            .unwrap();

        let resp = send(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn protected_routes_require_a_valid_token() {
        let app = test_app();

        let req = Request::builder()
            .method("GET")
            .uri("/api/v1/files")
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let resp = send(&app, get_with("/api/v1/files", "garbage-token")).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn expired_tokens_are_rejected() {
        let app = test_app();
        let stale = issue_token(
            "Admin",
            &["Admin".to_string(), "User".to_string()],
            Utc::now() - Duration::hours(3),
            &test_jwt(),
        )
        .unwrap();

        let resp = send(&app, get_with("/api/v1/files", &stale.token)).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn admin_routes_refuse_plain_users() {
        let app = test_app();
        let token = login(&app, "plain", "plain-pw").await;

        let register = request_with(
            "POST",
            "/api/v1/account/register",
            &token,
            Body::from(json!({"username": "x", "password": "y"}).to_string()),
        );
        let register = {
            let (mut parts, body) = register.into_parts();
            parts.headers.insert(
                header::CONTENT_TYPE,
                "application/json".parse().unwrap(),
            );
            Request::from_parts(parts, body)
        };
        assert_eq!(send(&app, register).await.status(), StatusCode::FORBIDDEN);

        let grant = request_with(
            "PUT",
            "/api/v1/account/plain/roles/Admin",
            &token,
            Body::empty(),
        );
        assert_eq!(send(&app, grant).await.status(), StatusCode::FORBIDDEN);

        let upload = request_with("POST", "/api/v1/files/a.txt", &token, Body::from("data"));
        assert_eq!(send(&app, upload).await.status(), StatusCode::FORBIDDEN);

        let delete = request_with("DELETE", "/api/v1/files/a.txt", &token, Body::empty());
        assert_eq!(send(&app, delete).await.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn admin_registers_and_manages_roles() {
        let app = test_app();
        let admin = login(&app, "Admin", "123").await;

        let req = Request::builder()
            .method("POST")
            .uri("/api/v1/account/register")
            .header(header::AUTHORIZATION, format!("Bearer {admin}"))
            .header("content-type", "application/json")
            .body(Body::from(
                json!({"username": "bob", "password": "hunter2"}).to_string(),
            ))
            .unwrap();
        let resp = send(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["data"]["username"], json!("bob"));

        // Fresh users carry the default role only.
        let resp = send(&app, get_with("/api/v1/account/bob/roles", &admin)).await;
        assert_eq!(body_json(resp).await["data"]["roles"], json!(["User"]));

        let grant = request_with(
            "PUT",
            "/api/v1/account/bob/roles/Admin",
            &admin,
            Body::empty(),
        );
        let resp = send(&app, grant).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            body_json(resp).await["data"]["roles"],
            json!(["Admin", "User"])
        );

        let resp = send(&app, get_with("/api/v1/account/bob/roles/Admin", &admin)).await;
        assert_eq!(body_json(resp).await["data"]["is_member"], json!(true));

        let revoke = request_with(
            "DELETE",
            "/api/v1/account/bob/roles/Admin",
            &admin,
            Body::empty(),
        );
        assert_eq!(send(&app, revoke).await.status(), StatusCode::OK);

        let resp = send(&app, get_with("/api/v1/account/bob/roles/Admin", &admin)).await;
        assert_eq!(body_json(resp).await["data"]["is_member"], json!(false));
    }

    #[tokio::test]
    async fn repeated_registration_keeps_the_first_password() {
        let app = test_app();
        let admin = login(&app, "Admin", "123").await;

        for password in ["first-pw", "second-pw"] {
            let req = Request::builder()
                .method("POST")
                .uri("/api/v1/account/register")
                .header(header::AUTHORIZATION, format!("Bearer {admin}"))
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({"username": "carol", "password": password}).to_string(),
                ))
                .unwrap();
            assert_eq!(send(&app, req).await.status(), StatusCode::OK);
        }

        login(&app, "carol", "first-pw").await;

        let req = Request::builder()
            .method("POST")
            .uri("/api/v1/account/login")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({"username": "carol", "password": "second-pw"}).to_string(),
            ))
            .unwrap();
        assert_eq!(send(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn me_sees_role_changes_without_a_new_token() {
        let app = test_app();
        let admin = login(&app, "Admin", "123").await;
        let plain = login(&app, "plain", "plain-pw").await;

        let resp = send(&app, get_with("/api/v1/account/me", &plain)).await;
        let json = body_json(resp).await;
        assert_eq!(json["data"]["username"], json!("plain"));
        assert_eq!(json["data"]["roles"], json!(["User"]));

        let grant = request_with(
            "PUT",
            "/api/v1/account/plain/roles/Auditor",
            &admin,
            Body::empty(),
        );
        assert_eq!(send(&app, grant).await.status(), StatusCode::OK);

        let resp = send(&app, get_with("/api/v1/account/me", &plain)).await;
        assert_eq!(
            body_json(resp).await["data"]["roles"],
            json!(["Auditor", "User"])
        );
    }

    #[tokio::test]
    async fn upload_download_digest_cycle() {
        let app = test_app();
        let admin = login(&app, "Admin", "123").await;
        let plain = login(&app, "plain", "plain-pw").await;

        let upload = request_with(
            "POST",
            "/api/v1/files/hello.txt",
            &admin,
            Body::from("hello world"),
        );
        let resp = send(&app, upload).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["data"]["name"], json!("hello.txt"));
        assert_eq!(json["data"]["length"], json!(11));

        let resp = send(&app, get_with("/api/v1/files", &plain)).await;
        let json = body_json(resp).await;
        assert_eq!(json["data"][0]["name"], json!("hello.txt"));
        assert_eq!(json["data"][0]["length"], json!(11));
        assert_eq!(json["data"][0]["extension"], json!("txt"));

        let resp = send(&app, get_with("/api/v1/files/hello.txt/content", &plain)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"hello.txt\""
        );
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"hello world");

        let resp = send(
            &app,
            get_with("/api/v1/files/hello.txt/digest/sha256", &plain),
        )
        .await;
        let json = body_json(resp).await;
        assert_eq!(
            json["data"]["digest"],
            json!("B94D27B9934D3E08A52E52D7DA7DABFAC484EFE37A5380EE9088F7ACE2EFCDE9")
        );

        let resp = send(
            &app,
            get_with("/api/v1/files/hello.txt/digest/crc32", &plain),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn copy_then_delete_updates_the_listing() {
        let app = test_app();
        let admin = login(&app, "Admin", "123").await;

        let upload = request_with(
            "POST",
            "/api/v1/files/src.txt",
            &admin,
            Body::from("payload"),
        );
        assert_eq!(send(&app, upload).await.status(), StatusCode::OK);

        let copy = request_with(
            "POST",
            "/api/v1/files/src.txt/copy-to/dup.txt",
            &admin,
            Body::empty(),
        );
        let resp = send(&app, copy).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["data"]["length"], json!(7));

        let delete = request_with("DELETE", "/api/v1/files/src.txt", &admin, Body::empty());
        assert_eq!(send(&app, delete).await.status(), StatusCode::OK);

        let resp = send(&app, get_with("/api/v1/files", &admin)).await;
        let json = body_json(resp).await;
        assert_eq!(json["data"].as_array().unwrap().len(), 1);
        assert_eq!(json["data"][0]["name"], json!("dup.txt"));

        let resp = send(&app, get_with("/api/v1/files/src.txt/info", &admin)).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn traversal_names_are_rejected_over_http() {
        let app = test_app();
        let admin = login(&app, "Admin", "123").await;

        let resp = send(&app, get_with("/api/v1/files/../info", &admin)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = send(&app, get_with("/api/v1/files/..%2Fconfig/info", &admin)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn body_digest_hashes_the_request_body() {
        let app = test_app();
        let plain = login(&app, "plain", "plain-pw").await;

        let req = request_with(
            "POST",
            "/api/v1/digests/md5",
            &plain,
            Body::from("hello world"),
        );
        let resp = send(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["data"]["algorithm"], json!("MD5"));
        assert_eq!(json["data"]["digest"], json!("5EB63BBBE01EEED093CB22BB8F5ACDC3"));
        assert!(json["data"].get("name").is_none());

        let req = Request::builder()
            .method("POST")
            .uri("/api/v1/digests/md5")
            .body(Body::from("hello world"))
            .unwrap();
        assert_eq!(send(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn health_and_metrics_are_public() {
        let app = test_app();

        let req = Request::builder()
            .method("GET")
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = send(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["status"], json!("ok"));
        assert!(json["registered_users"].as_u64().unwrap() >= 2);

        let req = Request::builder()
            .method("GET")
            .uri("/metrics")
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&app, req).await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let app = test_app();
        let req = Request::builder()
            .method("GET")
            .uri("/api-doc/openapi.json")
            .body(Body::empty())
            .unwrap();
        let resp = send(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["info"]["title"], json!("File Server API"));
    }
}
