mod config;
mod context;
mod error;
mod inference_log;
mod model;
mod routes;
#[cfg(test)]
mod test_support;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use config::AppConfig;
use context::AppContext;
use routes::configure_routes;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config_path = config::config_path();
    log::info!("Loading configuration from {}", config_path.display());
    let config = AppConfig::load(&config_path).map_err(startup_failure)?;

    let context = AppContext::load(&config).map_err(startup_failure)?;
    log::info!(
        "Model '{}' ready with {} features",
        context.model_name(),
        context.feature_count()
    );
    match context.logger() {
        Some(logger) => log::info!("Logging inferences to {}", logger.path().display()),
        None => log::info!("Inference logging disabled"),
    }

    let context = web::Data::new(context);
    let server_context = context.clone();

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    log::info!("Starting server on {}", bind_address);

    let mut server = HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .app_data(server_context.clone())
            .configure(configure_routes)
    });
    if let Some(workers) = config.server.workers {
        server = server.workers(workers);
    }

    server.bind(&bind_address)?.run().await?;

    context.shutdown();
    Ok(())
}

fn startup_failure(err: impl std::fmt::Display) -> std::io::Error {
    log::error!("Startup failed: {}", err);
    std::io::Error::other(err.to_string())
}
