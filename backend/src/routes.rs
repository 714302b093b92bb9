use crate::context::AppContext;
use crate::error::ApiError;
use actix_web::{web, HttpResponse};
use log::{error, info, warn};
use serde_json::json;
use shared::RawRequest;
use uuid::Uuid;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .service(web::resource("/predict").route(web::post().to(handle_predict)))
        .service(web::resource("/health").route(web::get().to(health)));
}

/// Unparseable or non-object bodies get the same JSON error shape as
/// validation failures.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| ApiError::BadRequest(err.to_string()).into())
}

async fn handle_predict(
    context: web::Data<AppContext>,
    payload: web::Json<RawRequest>,
) -> Result<HttpResponse, ApiError> {
    let request_id = Uuid::new_v4();
    let raw = payload.into_inner();

    let response = match context.infer(&raw) {
        Ok(response) => response,
        Err(e) => {
            if e.is_client_error() {
                warn!("[{}] Rejected request: {}", request_id, e);
            } else {
                error!("[{}] Model or schema contract violated: {}", request_id, e);
            }
            return Err(e);
        }
    };
    info!(
        "[{}] churn_prediction={} churn_probability={}",
        request_id, response.churn_prediction, response.churn_probability
    );

    if let Some(logger) = context.logger() {
        let logger = logger.clone();
        let record = response.clone();
        if let Err(e) = web::block(move || logger.record(&raw, &record)).await {
            warn!("[{}] Inference log task failed: {}", request_id, e);
        }
    }

    Ok(HttpResponse::Ok().json(response))
}

async fn health(context: web::Data<AppContext>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "model": context.model_name(),
        "features": context.feature_count(),
    }))
}
