//! # Server Configuration
//!
//! Router assembly, middleware stack, OpenAPI documentation and the server
//! entry point with graceful shutdown.

use std::sync::Arc;

use axum::{
    Router,
    extract::Request,
    http::HeaderValue,
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
};
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use crate::auth;
use crate::config::AppConfig;
use crate::handlers;
use crate::scheduler::NotificationScheduler;
use crate::telemetry::{self, TraceContext};

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
}

/// Build an AppState for tests without going through run_server.
pub fn create_test_app_state(config: AppConfig, db: DatabaseConnection) -> AppState {
    AppState {
        db,
        config: Arc::new(config),
    }
}

/// Middleware generating a per-request trace ID, exposing it through the
/// task-local context and echoing it back as X-Trace-Id.
async fn trace_context_middleware(request: Request, next: Next) -> Response {
    let trace_id = Uuid::new_v4().to_string();
    let context = TraceContext {
        trace_id: trace_id.clone(),
    };

    let mut request = request;
    request.extensions_mut().insert(context.clone());

    let mut response = telemetry::with_trace_context(context, next.run(request)).await;
    if let Ok(value) = HeaderValue::from_str(&trace_id) {
        response.headers_mut().insert("x-trace-id", value);
    }
    response
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let api = Router::new()
        // Tenants (operator surface)
        .route(
            "/api/v1/tenants",
            post(handlers::tenants::create_tenant).get(handlers::tenants::list_tenants),
        )
        .route("/api/v1/tenants/{id}", get(handlers::tenants::get_tenant))
        // Users
        .route(
            "/api/v1/users",
            post(handlers::users::create_user).get(handlers::users::list_users),
        )
        .route(
            "/api/v1/users/{id}",
            get(handlers::users::get_user).patch(handlers::users::update_user),
        )
        // Organizations
        .route(
            "/api/v1/organizations",
            post(handlers::organizations::create_organization)
                .get(handlers::organizations::list_organizations),
        )
        .route(
            "/api/v1/organizations/{id}",
            get(handlers::organizations::get_organization)
                .patch(handlers::organizations::update_organization)
                .delete(handlers::organizations::delete_organization),
        )
        .route(
            "/api/v1/organizations/{id}/applicability",
            get(handlers::applicability::list_for_organization),
        )
        .route(
            "/api/v1/organizations/{id}/compliance-records/ensure",
            post(handlers::compliance::ensure_records),
        )
        // Requirements and applicability
        .route(
            "/api/v1/requirements",
            post(handlers::requirements::create_requirement)
                .get(handlers::requirements::list_requirements),
        )
        .route(
            "/api/v1/requirements/{id}",
            get(handlers::requirements::get_requirement)
                .patch(handlers::requirements::update_requirement)
                .delete(handlers::requirements::delete_requirement),
        )
        .route(
            "/api/v1/requirements/{id}/rules",
            get(handlers::requirements::list_rules).put(handlers::requirements::replace_rules),
        )
        .route(
            "/api/v1/requirements/{id}/applicability",
            get(handlers::applicability::list_for_requirement),
        )
        .route(
            "/api/v1/requirements/{id}/applicability/recompute",
            post(handlers::applicability::recompute),
        )
        .route(
            "/api/v1/requirements/{id}/applicability/{organization_id}",
            put(handlers::applicability::set_override)
                .delete(handlers::applicability::clear_override),
        )
        // Compliance records
        .route(
            "/api/v1/compliance-records",
            post(handlers::compliance::create_record).get(handlers::compliance::list_records),
        )
        .route(
            "/api/v1/compliance-records/{id}",
            get(handlers::compliance::get_record).patch(handlers::compliance::update_record),
        )
        .route(
            "/api/v1/compliance-records/{id}/status",
            post(handlers::compliance::transition_record),
        )
        // Controls and measures
        .route(
            "/api/v1/controls",
            post(handlers::controls::create_control).get(handlers::controls::list_controls),
        )
        .route(
            "/api/v1/controls/{id}",
            get(handlers::controls::get_control)
                .patch(handlers::controls::update_control)
                .delete(handlers::controls::delete_control),
        )
        .route(
            "/api/v1/controls/{id}/requirements/{requirement_id}",
            post(handlers::controls::link_requirement)
                .delete(handlers::controls::unlink_requirement),
        )
        .route(
            "/api/v1/controls/{id}/measures",
            post(handlers::controls::create_measure).get(handlers::controls::list_measures),
        )
        .route(
            "/api/v1/measures/{id}",
            axum::routing::patch(handlers::controls::update_measure)
                .delete(handlers::controls::delete_measure),
        )
        // Evidence
        .route(
            "/api/v1/evidence",
            post(handlers::evidence::create_evidence).get(handlers::evidence::list_evidence),
        )
        .route(
            "/api/v1/evidence/{id}",
            get(handlers::evidence::get_evidence)
                .patch(handlers::evidence::update_evidence)
                .delete(handlers::evidence::delete_evidence),
        )
        .route(
            "/api/v1/evidence/{id}/links",
            post(handlers::evidence::link_evidence).delete(handlers::evidence::unlink_evidence),
        )
        // Risks
        .route(
            "/api/v1/risks",
            post(handlers::risks::create_risk).get(handlers::risks::list_risks),
        )
        .route(
            "/api/v1/risks/{id}",
            get(handlers::risks::get_risk)
                .patch(handlers::risks::update_risk)
                .delete(handlers::risks::delete_risk),
        )
        // Documents
        .route(
            "/api/v1/documents",
            post(handlers::documents::create_document).get(handlers::documents::list_documents),
        )
        .route(
            "/api/v1/documents/review-due",
            get(handlers::documents::review_due),
        )
        .route(
            "/api/v1/documents/{id}",
            get(handlers::documents::get_document)
                .patch(handlers::documents::update_document)
                .delete(handlers::documents::delete_document),
        )
        .route(
            "/api/v1/documents/{id}/versions",
            post(handlers::documents::create_version).get(handlers::documents::list_versions),
        )
        .route(
            "/api/v1/documents/{id}/versions/{version}",
            get(handlers::documents::get_version),
        )
        .route(
            "/api/v1/documents/{id}/diff",
            get(handlers::documents::diff_versions),
        )
        .route(
            "/api/v1/documents/{id}/status",
            post(handlers::documents::change_status),
        )
        // Approvals
        .route(
            "/api/v1/approval-routes",
            post(handlers::approvals::create_route).get(handlers::approvals::list_routes),
        )
        .route(
            "/api/v1/approval-routes/{id}",
            axum::routing::delete(handlers::approvals::delete_route),
        )
        .route(
            "/api/v1/approvals",
            post(handlers::approvals::start_approval).get(handlers::approvals::list_approvals),
        )
        .route(
            "/api/v1/approvals/{id}",
            get(handlers::approvals::get_approval),
        )
        .route(
            "/api/v1/approvals/{id}/decision",
            post(handlers::approvals::decide),
        )
        // Notifications
        .route(
            "/api/v1/notification-rules",
            post(handlers::notifications::create_rule).get(handlers::notifications::list_rules),
        )
        .route(
            "/api/v1/notification-rules/{id}",
            axum::routing::patch(handlers::notifications::update_rule)
                .delete(handlers::notifications::delete_rule),
        )
        .route(
            "/api/v1/notifications",
            get(handlers::notifications::list_notifications),
        )
        .route(
            "/api/v1/notifications/{id}/dismiss",
            post(handlers::notifications::dismiss_notification),
        )
        // Dashboard, exports, audit, cron
        .route("/api/v1/dashboard", get(handlers::dashboard::dashboard))
        .route(
            "/api/v1/exports/compliance.xlsx",
            get(handlers::exports::compliance_xlsx),
        )
        .route(
            "/api/v1/exports/compliance.csv",
            get(handlers::exports::compliance_csv),
        )
        .route(
            "/api/v1/audit-events",
            get(handlers::audit_events::list_audit_events),
        )
        .route(
            "/api/v1/cron/notifications",
            post(handlers::cron::run_notification_sweep),
        )
        // Projects and time tracking
        .route(
            "/api/v1/projects",
            post(handlers::projects::create_project).get(handlers::projects::list_projects),
        )
        .route(
            "/api/v1/projects/{id}",
            get(handlers::projects::get_project)
                .patch(handlers::projects::update_project)
                .delete(handlers::projects::delete_project),
        )
        .route(
            "/api/v1/projects/{id}/tasks",
            post(handlers::projects::create_task).get(handlers::projects::list_tasks),
        )
        .route(
            "/api/v1/projects/{id}/time-summary",
            get(handlers::projects::time_summary),
        )
        .route(
            "/api/v1/tasks/{id}",
            axum::routing::patch(handlers::projects::update_task)
                .delete(handlers::projects::delete_task),
        )
        .route(
            "/api/v1/tasks/{id}/time-entries",
            post(handlers::projects::create_time_entry).get(handlers::projects::list_time_entries),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .merge(api)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
        .layer(middleware::from_fn(trace_context_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Starts the server with the given configuration
pub async fn run_server(
    config: AppConfig,
    db: DatabaseConnection,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Arc::new(config);
    let state = AppState {
        db: db.clone(),
        config: Arc::clone(&config),
    };
    let app = create_app(state);

    let addr = config
        .bind_addr()
        .map_err(|e| format!("Invalid server address: {}", e))?;

    let shutdown = CancellationToken::new();

    let scheduler = NotificationScheduler::new(Arc::clone(&config), Arc::new(db));
    let scheduler_handle = tokio::spawn(scheduler.run(shutdown.clone()));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, profile = %config.profile, "Server listening");

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
            server_shutdown.cancel();
        })
        .await?;

    shutdown.cancel();
    let _ = scheduler_handle.await;

    Ok(())
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::health,
        crate::handlers::tenants::create_tenant,
        crate::handlers::tenants::get_tenant,
        crate::handlers::tenants::list_tenants,
        crate::handlers::users::create_user,
        crate::handlers::users::list_users,
        crate::handlers::users::get_user,
        crate::handlers::users::update_user,
        crate::handlers::organizations::create_organization,
        crate::handlers::organizations::list_organizations,
        crate::handlers::organizations::get_organization,
        crate::handlers::organizations::update_organization,
        crate::handlers::organizations::delete_organization,
        crate::handlers::requirements::create_requirement,
        crate::handlers::requirements::list_requirements,
        crate::handlers::requirements::get_requirement,
        crate::handlers::requirements::update_requirement,
        crate::handlers::requirements::delete_requirement,
        crate::handlers::requirements::list_rules,
        crate::handlers::requirements::replace_rules,
        crate::handlers::applicability::recompute,
        crate::handlers::applicability::list_for_requirement,
        crate::handlers::applicability::list_for_organization,
        crate::handlers::applicability::set_override,
        crate::handlers::applicability::clear_override,
        crate::handlers::compliance::create_record,
        crate::handlers::compliance::ensure_records,
        crate::handlers::compliance::list_records,
        crate::handlers::compliance::get_record,
        crate::handlers::compliance::update_record,
        crate::handlers::compliance::transition_record,
        crate::handlers::controls::create_control,
        crate::handlers::controls::list_controls,
        crate::handlers::controls::get_control,
        crate::handlers::controls::update_control,
        crate::handlers::controls::delete_control,
        crate::handlers::controls::link_requirement,
        crate::handlers::controls::unlink_requirement,
        crate::handlers::controls::create_measure,
        crate::handlers::controls::list_measures,
        crate::handlers::controls::update_measure,
        crate::handlers::controls::delete_measure,
        crate::handlers::evidence::create_evidence,
        crate::handlers::evidence::list_evidence,
        crate::handlers::evidence::get_evidence,
        crate::handlers::evidence::update_evidence,
        crate::handlers::evidence::delete_evidence,
        crate::handlers::evidence::link_evidence,
        crate::handlers::evidence::unlink_evidence,
        crate::handlers::risks::create_risk,
        crate::handlers::risks::list_risks,
        crate::handlers::risks::get_risk,
        crate::handlers::risks::update_risk,
        crate::handlers::risks::delete_risk,
        crate::handlers::documents::create_document,
        crate::handlers::documents::list_documents,
        crate::handlers::documents::review_due,
        crate::handlers::documents::get_document,
        crate::handlers::documents::update_document,
        crate::handlers::documents::delete_document,
        crate::handlers::documents::create_version,
        crate::handlers::documents::list_versions,
        crate::handlers::documents::get_version,
        crate::handlers::documents::diff_versions,
        crate::handlers::documents::change_status,
        crate::handlers::approvals::create_route,
        crate::handlers::approvals::list_routes,
        crate::handlers::approvals::delete_route,
        crate::handlers::approvals::start_approval,
        crate::handlers::approvals::get_approval,
        crate::handlers::approvals::list_approvals,
        crate::handlers::approvals::decide,
        crate::handlers::notifications::create_rule,
        crate::handlers::notifications::list_rules,
        crate::handlers::notifications::update_rule,
        crate::handlers::notifications::delete_rule,
        crate::handlers::notifications::list_notifications,
        crate::handlers::notifications::dismiss_notification,
        crate::handlers::dashboard::dashboard,
        crate::handlers::exports::compliance_xlsx,
        crate::handlers::exports::compliance_csv,
        crate::handlers::audit_events::list_audit_events,
        crate::handlers::cron::run_notification_sweep,
        crate::handlers::projects::create_project,
        crate::handlers::projects::list_projects,
        crate::handlers::projects::get_project,
        crate::handlers::projects::update_project,
        crate::handlers::projects::delete_project,
        crate::handlers::projects::create_task,
        crate::handlers::projects::list_tasks,
        crate::handlers::projects::update_task,
        crate::handlers::projects::delete_task,
        crate::handlers::projects::create_time_entry,
        crate::handlers::projects::list_time_entries,
        crate::handlers::projects::time_summary,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::error::ApiError,
        )
    ),
    info(
        title = "Compliance API",
        description = "Multi-tenant regulatory-compliance management API",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
