mod advisor;
mod classifier;
mod error;
mod intake;
mod routes;
mod weather;

use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use std::env;

use advisor::AdvisorService;
use classifier::Classifier;
use intake::UploadStore;
use routes::configure_routes;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    dotenv::dotenv().ok();

    let api_key = env::var("OPENAI_API_KEY").map_err(|_| {
        std::io::Error::other("OPENAI_API_KEY is not set")
    })?;
    let api_base =
        env::var("OPENAI_API_BASE").unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
    let completion_model =
        env::var("COMPLETION_MODEL").unwrap_or_else(|_| "gpt-3.5-turbo-instruct".to_string());
    let model_path = env::var("MODEL_PATH").unwrap_or_else(|_| "model/model.pt".to_string());
    let upload_dir = env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string());

    // The classifier is loaded exactly once; a broken artifact keeps the
    // process from starting at all.
    let classifier = match Classifier::load(&model_path) {
        Ok(classifier) => classifier,
        Err(e) => {
            log::error!("Failed to load classifier from {}: {:?}", model_path, e);
            return Err(std::io::Error::other(format!(
                "Model loading failed: {:?}",
                e
            )));
        }
    };
    log::info!("Loaded classifier from {}", model_path);

    let uploads = UploadStore::new(&upload_dir)?;
    let advisor = AdvisorService::new(api_key, api_base, completion_model);

    let port = env::var("PORT").unwrap_or_else(|_| "8081".to_string());
    let bind_address = format!("0.0.0.0:{}", port);
    log::info!("Starting server on {}", bind_address);

    HttpServer::new(move || {
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
            .app_data(web::Data::new(classifier.clone()))
            .app_data(web::Data::new(advisor.clone()))
            .app_data(web::Data::new(uploads.clone()))
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}
