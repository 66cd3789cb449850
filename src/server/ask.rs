//! Direct ask endpoint: answer without posting anywhere.

use crate::server::AppState;
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub input: String,
    pub twitter_id: String,
}

#[derive(Debug, Serialize)]
struct AskResponse {
    response: String,
    length: usize,
}

#[derive(Debug, Serialize)]
struct AskError {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    partial: Option<String>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/ask").route(web::post().to(ask)));
}

async fn ask(state: web::Data<AppState>, body: web::Json<AskRequest>) -> impl Responder {
    let request = body.into_inner();
    if request.input.trim().is_empty() {
        return HttpResponse::BadRequest().json(AskError {
            error: "input must not be empty".to_string(),
            partial: None,
        });
    }

    match state
        .agent
        .answer(
            &request.input,
            &request.twitter_id,
            None,
            &[],
            CancellationToken::new(),
        )
        .await
    {
        Ok(answer) => HttpResponse::Ok().json(AskResponse {
            length: answer.len(),
            response: answer,
        }),
        Err(e) => {
            log::error!("[ASK] agent run failed: {}", e.message);
            HttpResponse::InternalServerError().json(AskError {
                error: e.message,
                partial: e.partial_output,
            })
        }
    }
}
