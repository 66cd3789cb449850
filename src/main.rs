use actix_cors::Cors;
use actix_web::{App, HttpResponse, HttpServer, middleware::Logger, web};
use dotenv::dotenv;
use std::sync::Arc;

use mentions_bot::agent::AgentService;
use mentions_bot::ai::OpenAIClient;
use mentions_bot::config::Config;
use mentions_bot::server::{self, AppState};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env();
    let port = config.port;

    if config.x_mcp_url.is_none() {
        log::warn!("X_MCP_HTTP not set; replies cannot be posted");
    }

    let backend = OpenAIClient::from_env().expect("Failed to create reasoning backend");
    log::info!("Reasoning backend model: {}", backend.model());
    let agent = Arc::new(AgentService::new(config.clone(), Arc::new(backend)));

    log::info!("Starting mentions-bot server on port {}", port);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(AppState {
                config: config.clone(),
                agent: Arc::clone(&agent),
            }))
            .wrap(Logger::default())
            .wrap(cors)
            .route("/", web::get().to(HttpResponse::Ok))
            .configure(server::mentions::config)
            .configure(server::ask::config)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
