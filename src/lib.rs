pub mod action;
pub mod caption;
pub mod commands;
pub mod config;
pub mod handlers;
pub mod lock;
pub mod model;
pub mod prompts;
pub mod quota;
pub mod server;
pub mod service;
pub mod session;
pub mod store;
pub mod trace;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

use config::AppConfig;
use groqai::GroqClient;
use handlers::get_update_handler;
use lock::InstanceLock;
use model::GroqModel;
use quota::QuotaPolicy;
use service::CaptionService;
use std::net::SocketAddr;
use std::sync::Arc;
use store::SqliteStore;
use teloxide::{
    dispatching::Dispatcher,
    error_handlers::LoggingErrorHandler,
    update_listeners::webhooks,
    {dptree, prelude::*},
};
use tokio::signal;
use trace::init_tracing;
use tracing::{error, info};

// Resolves on SIGINT, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl = signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut term_stream =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(err) => {
                    error!("Failed to register SIGTERM handler: {}", err);
                    if let Err(e) = ctrl.await {
                        error!("ctrl_c failed: {e}");
                    }
                    return;
                }
            };

        tokio::select! {
            _ = ctrl => {},
            _ = term_stream.recv() => {},
        }
    }
    #[cfg(not(unix))]
    {
        if let Err(e) = ctrl.await {
            error!("ctrl_c failed: {e}");
        }
    }
}

pub async fn run() -> Result<(), BoxError> {
    init_tracing();

    let cfg = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            return Err(Box::new(e) as BoxError);
        }
    };

    info!("Starting bot (hosting = {})", cfg.hosting);

    // Two pollers on one token steal each other's updates.
    let _instance_lock = if cfg.hosting {
        None
    } else {
        match InstanceLock::acquire(&cfg.lock_file) {
            Ok(lock) => {
                info!("Instance lock held at {}", lock.path().display());
                Some(lock)
            }
            Err(e) => {
                error!("Instance lock failed: {}", e);
                return Err(Box::new(e) as BoxError);
            }
        }
    };

    let bot = Bot::new(cfg.token.clone());

    let groq = match GroqClient::with_api_key(cfg.groq_api_key.clone()) {
        Ok(client) => client,
        Err(e) => {
            error!("The Groq client could not be started");
            return Err(Box::new(e) as BoxError);
        }
    };
    let model = GroqModel::new(
        groq,
        cfg.text_model.clone(),
        cfg.vision_model.clone(),
        cfg.model_timeout,
    );

    let store = match SqliteStore::connect(&cfg.database_url).await {
        Ok(store) => store,
        Err(e) => {
            error!("The database could not be connected");
            return Err(Box::new(e) as BoxError);
        }
    };

    let policy = QuotaPolicy {
        daily_limit: cfg.daily_limit,
        cooldown: cfg.cooldown,
    };
    let service = Arc::new(CaptionService::new(
        Arc::new(store),
        Arc::new(model),
        policy,
        cfg.model_timeout,
    ));

    let handler = get_update_handler();
    let mut dispatcher = Dispatcher::builder(bot.clone(), handler)
        .dependencies(dptree::deps![service.clone()])
        .enable_ctrlc_handler()
        .build();

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));

    if !cfg.hosting {
        info!("Running in polling mode (local development).");

        // Health routes still answer so liveness checks work in polling mode too.
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let health = tokio::spawn(async move {
            let app = server::build_router(None);
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
            {
                error!("Health server error: {}", e);
            }
        });

        info!("Bot started");
        dispatcher.dispatch().await;
        info!("Dispatcher exited (polling mode).");
        health.abort();
        return Ok(());
    }

    let Some(webhook_url) = cfg.webhook_url.clone() else {
        error!("HOSTING=true but WEBHOOK_URL not provided");
        return Err(Box::new(config::ConfigError::MissingEnv("WEBHOOK_URL")) as BoxError);
    };

    info!("Configuring webhook for URL: {}", webhook_url);

    let options = webhooks::Options::new(addr, webhook_url.clone());
    let (update_listener, stop_future, webhook_router) =
        match webhooks::axum_to_router(bot.clone(), options).await {
            Ok(v) => v,
            Err(e) => {
                error!("Failed to configure webhook: {}", e);
                return Err(Box::new(e) as BoxError);
            }
        };

    info!("Webhook configured");
    info!("Bot started");

    let app = server::build_router(Some(webhook_router));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let server = axum::serve(listener, app);

    let server_with_shutdown = server.with_graceful_shutdown(async {
        tokio::select! {
            _ = shutdown_signal() => {
                info!("Shutdown signal received (SIGINT/SIGTERM). Stopping listener & server.");
            }
            _ = stop_future => {
                info!("Listener stop_future resolved.");
            }
        }
    });

    let server_handle = tokio::spawn(async move {
        if let Err(e) = server_with_shutdown.await {
            error!("Axum server error: {}", e);
        }
    });

    dispatcher
        .dispatch_with_listener(update_listener, LoggingErrorHandler::new())
        .await;

    if let Err(e) = server_handle.await {
        error!("Server task join error: {}", e);
    }

    info!("Bot shutdown complete.");
    Ok(())
}
