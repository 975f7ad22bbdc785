use actix_web::{get, web, HttpResponse, Responder};
use chrono::Utc;
use serde_json::json;

use crate::state::AppState;

/// Liveness probe. Reports the deployment flavour so a misconfigured production instance
/// (one that would echo reset tokens) is visible at a glance.
#[get("/health")]
pub async fn health(state: web::Data<AppState>) -> impl Responder {
    let environment = if state.environment.is_production() {
        "production"
    } else {
        "development"
    };

    HttpResponse::Ok().json(json!({
        "status": "ok",
        "environment": environment,
        "timestamp": Utc::now()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::store::MemoryStore;
    use actix_web::test;
    use std::sync::Arc;

    #[actix_web::test]
    async fn test_health_endpoint() {
        let config = Config::from_lookup(|key| (key == "JWT_SECRET").then(|| "s".to_string()))
            .unwrap();
        let state = AppState::new(Arc::new(MemoryStore::new()), &config);
        let app = test::init_service(
            actix_web::App::new()
                .app_data(web::Data::new(state))
                .service(health),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;

        assert!(resp.status().is_success());

        let body = test::read_body(resp).await;
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["status"], "ok");
        assert_eq!(json["environment"], "development");
        assert!(json["timestamp"].is_string());
    }
}
