use crate::{
    auth::{
        router as auth_router,
        user::{AuthSession, Backend},
    },
    config::Config,
    email::EmailSender,
    error::AppResult,
    routes,
};
use axum::{
    Router,
    extract::State,
    response::{Html, IntoResponse, Redirect},
    routing::{get, get_service},
};
use axum_login::{
    AuthManagerLayerBuilder,
    tower_sessions::{
        Expiry, SessionManagerLayer,
        cookie::{SameSite, time},
    },
};
use minijinja::Environment;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tokio::{signal, task::AbortHandle};
use tower_http::services::ServeDir;
use tower_sessions_sqlx_store::PostgresStore;

// The connection is shared through an Arc rather than cloned directly;
// the mock driver used by the service tests strips Clone from it.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub templates: Arc<Environment<'static>>,
    pub mailer: Arc<dyn EmailSender>,
    pub config: Arc<Config>,
}

/// Render a template against the shared environment.
pub fn render(state: &AppState, name: &str, ctx: minijinja::Value) -> AppResult<Html<String>> {
    let tmpl = state.templates.get_template(name)?;
    Ok(Html(tmpl.render(ctx)?))
}

pub async fn create_router(
    db: DatabaseConnection,
    mailer: Arc<dyn EmailSender>,
    config: Arc<Config>,
    session_store: PostgresStore,
) -> anyhow::Result<Router> {
    let templates = setup_templates().await;

    let db = Arc::new(db);
    let state = AppState {
        db: db.clone(),
        templates: Arc::new(templates),
        mailer,
        config,
    };

    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::days(1)));

    // Auth service.
    //
    // This combines the session layer with our backend to establish the auth
    // service which will provide the auth session as a request extension.
    let backend = Backend::new(db.clone());
    let auth_layer = AuthManagerLayerBuilder::new(backend, session_layer).build();

    let app = Router::new()
        .route("/", get(index))
        .merge(auth_router::router())
        .merge(routes::dashboard::router())
        .merge(routes::categories::router())
        .merge(routes::houses::router())
        .merge(routes::report::router())
        .merge(routes::realtor::router())
        .merge(routes::signup::router())
        .merge(routes::api::router())
        .with_state(state)
        .nest_service("/static", get_service(ServeDir::new("static")))
        .layer(auth_layer);
    Ok(app)
}

async fn setup_templates() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_loader(minijinja::path_loader("templates"));
    env
}

async fn index(State(state): State<AppState>, auth_session: AuthSession) -> AppResult<axum::response::Response> {
    if auth_session.user.is_some() {
        Ok(Redirect::to("/dashboard").into_response())
    } else {
        Ok(render(&state, "index.html", minijinja::context! {})?.into_response())
    }
}

#[cfg(test)]
mod tests {
    use super::AppState;
    use crate::auth::user::Backend;

    fn assert_clone<T: Clone>() {}

    // The mock database driver removes Clone from DatabaseConnection, so
    // both handle types must stay cloneable through their Arc wrappers.
    #[test]
    fn shared_state_stays_cloneable() {
        assert_clone::<AppState>();
        assert_clone::<Backend>();
    }
}

pub async fn shutdown_signal(deletion_task_abort_handle: AbortHandle) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { deletion_task_abort_handle.abort() },
        _ = terminate => { deletion_task_abort_handle.abort() },
    }
}
