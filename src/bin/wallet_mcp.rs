//! Wallet MCP server: exposes the wallet lifecycle and transaction
//! tools over the HTTP tool-invocation protocol.

use actix_web::{App, HttpServer, middleware::Logger, web};
use dotenv::dotenv;
use std::sync::Arc;

use mentions_bot::config::{defaults, env_vars};
use mentions_bot::mcp::{McpServer, mcp_endpoint};
use mentions_bot::wallet::{TxSigner, WalletService, WalletStore, build_wallet_server};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();
    env_logger::init();

    let database_url = std::env::var(env_vars::DATABASE_URL)
        .unwrap_or_else(|_| defaults::DATABASE_URL.to_string());
    let port: u16 = std::env::var(env_vars::WALLET_MCP_PORT)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults::WALLET_MCP_PORT);

    log::info!("Initializing wallet store at {}", database_url);
    let store = Arc::new(WalletStore::new(&database_url).expect("Failed to initialize wallet store"));
    let service = Arc::new(WalletService::new(store));
    let signer = Arc::new(TxSigner::new(service.clone()));

    let server = Arc::new(build_wallet_server(service, signer));
    log::info!(
        "wallet-mcp serving {} tools on :{}/mcp",
        server.tool_count(),
        port
    );

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(Arc::clone(&server)))
            .wrap(Logger::default())
            .route("/mcp", web::post().to(mcp_endpoint))
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
