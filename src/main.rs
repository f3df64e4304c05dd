use axum::{
    routing::{get, patch, post},
    Router,
};
use cyberedu_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    routes, AppState,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Email worker: one in-flight task at a time. On shutdown the current
    // task runs to completion (or is nacked by the dispatcher) before the
    // loop exits.
    let worker = {
        let email = app_state.email_service.clone();
        let mut shutdown = shutdown_rx;
        let poll_interval = Duration::from_millis(config.email_poll_interval_ms);
        tokio::spawn(async move {
            loop {
                if *shutdown.borrow() {
                    break;
                }
                match email.run_once().await {
                    Ok(true) => {}
                    Ok(false) => {
                        tokio::select! {
                            _ = tokio::time::sleep(poll_interval) => {}
                            _ = shutdown.changed() => {}
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = ?e, "Email worker error");
                        tokio::time::sleep(Duration::from_secs(2)).await;
                    }
                }
            }
            info!("Email worker stopped");
        })
    };

    let app = Router::new()
        .route("/health", get(routes::health::health))
        .route("/api/accounts/register", post(routes::accounts::register))
        .route(
            "/api/accounts/confirm-email/:token",
            get(routes::accounts::confirm_email),
        )
        .route(
            "/api/accounts/resend-confirmation",
            post(routes::accounts::resend_confirmation),
        )
        .route(
            "/api/courses",
            get(routes::catalog::list_courses).post(routes::catalog::create_course),
        )
        .route(
            "/api/courses/:id",
            get(routes::catalog::get_course)
                .patch(routes::catalog::update_course)
                .delete(routes::catalog::delete_course),
        )
        .route(
            "/api/tests",
            get(routes::catalog::list_tests).post(routes::catalog::create_test),
        )
        .route(
            "/api/tests/user_results",
            get(routes::submissions::user_results),
        )
        .route(
            "/api/tests/:id",
            get(routes::catalog::get_test)
                .patch(routes::catalog::update_test)
                .delete(routes::catalog::delete_test),
        )
        .route("/api/tests/:id/submit", post(routes::submissions::submit_test))
        .route(
            "/api/questions",
            get(routes::catalog::list_questions).post(routes::catalog::create_question),
        )
        .route(
            "/api/questions/:id",
            get(routes::catalog::get_question)
                .patch(routes::catalog::update_question)
                .delete(routes::catalog::delete_question),
        )
        .route(
            "/api/answer-options",
            get(routes::catalog::list_answer_options).post(routes::catalog::create_answer_option),
        )
        .route(
            "/api/answer-options/:id",
            patch(routes::catalog::update_answer_option)
                .delete(routes::catalog::delete_answer_option),
        )
        .route(
            "/api/user-answers",
            get(routes::submissions::list_user_answers),
        )
        .route(
            "/api/selected-answers",
            get(routes::submissions::list_selected_answers),
        )
        .route("/api/progress", get(routes::progress::list_progress))
        .route("/api/progress/subscribe", post(routes::progress::subscribe))
        .route(
            "/api/progress/:id/unsubscribe",
            post(routes::progress::unsubscribe),
        )
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    let _ = worker.await;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
