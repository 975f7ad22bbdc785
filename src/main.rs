use actix_web::{dev::ServiceRequest, middleware::Logger, web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use std::process::ExitCode;
use std::sync::Arc;

use tasksafe::audit::redact_path;
use tasksafe::store::{MemoryStore, PgStore};
use tasksafe::{routes, server, AppState, Config, FailureAuditor};

// Same fields as Logger::default(), with the path redacted.
const ACCESS_LOG_FORMAT: &str = r#"%a "%{route}xi" %s %b "%{Referer}i" "%{User-Agent}i" %T"#;

fn loggable_route(req: &ServiceRequest) -> String {
    format!("{} {}", req.method(), redact_path(req.path()))
}

async fn build_state(config: &Config) -> Result<AppState, String> {
    match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .map_err(|e| format!("Failed to connect to database: {}", e))?;
            let store = PgStore::new(pool);
            store
                .migrate()
                .await
                .map_err(|e| format!("Failed to run migrations: {}", e))?;
            log::info!("Using Postgres store");
            Ok(AppState::new(Arc::new(store), config))
        }
        None => {
            log::warn!("DATABASE_URL not set; using in-memory store, data is lost on restart");
            Ok(AppState::new(Arc::new(MemoryStore::new()), config))
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<ExitCode> {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    let state = match build_state(&config).await {
        Ok(state) => state,
        Err(e) => {
            log::error!("{}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    if !config.environment.is_production() {
        log::warn!("Not running in production: forgot-password responses include reset tokens");
    }
    log::info!("Starting server at {}", config.server_url());

    let data = web::Data::new(state);
    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            // Last wrap is outermost: Logger > security headers > Cors > FailureAuditor > routes.
            .wrap(FailureAuditor::new(data.audit.clone()))
            .wrap(server::cors())
            .wrap(server::security_headers())
            .wrap(Logger::new(ACCESS_LOG_FORMAT).custom_request_replace("route", loggable_route))
            .configure(routes::config)
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .run()
    .await?;

    Ok(ExitCode::SUCCESS)
}
