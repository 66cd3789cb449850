//! Mentions webhook: each mention triggers one agent run that answers
//! and posts the reply under the originating tweet.

use crate::server::AppState;
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// One mention payload item
#[derive(Debug, Clone, Deserialize)]
pub struct Mention {
    pub tweet_id: String,
    pub text: String,
    #[serde(rename = "twitter_id")]
    pub author_id: String,
    #[serde(default)]
    pub author_username: String,
    #[serde(default)]
    pub conversation_id: String,
    #[serde(default)]
    pub created_at: String,
}

/// Full body as delivered by the mention poller
#[derive(Debug, Clone, Deserialize)]
pub struct MentionsPayload {
    #[serde(default)]
    pub count: i64,
    #[serde(default)]
    pub mentions: Vec<Mention>,
    #[serde(default)]
    pub meta: Option<Value>,
}

#[derive(Debug, Serialize)]
struct MentionResult {
    tweet_id: String,
    posted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct MentionsSummary {
    received: i64,
    processed: usize,
    results: Vec<MentionResult>,
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/mentions").route(web::post().to(handle_mentions)));
}

async fn handle_mentions(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Bytes,
) -> impl Responder {
    if let Some(secret) = &state.config.webhook_secret {
        let provided = req
            .headers()
            .get("X-Webhook-Secret")
            .and_then(|h| h.to_str().ok())
            .unwrap_or_default();
        if provided != secret {
            return HttpResponse::Unauthorized().body("unauthorized");
        }
    }

    // The poller may deliver one payload object or an array of them
    let payloads: Vec<MentionsPayload> = match serde_json::from_slice::<Vec<MentionsPayload>>(&body)
    {
        Ok(list) => list,
        Err(_) => match serde_json::from_slice::<MentionsPayload>(&body) {
            Ok(single) => vec![single],
            Err(e) => {
                log::warn!("[MENTIONS] bad request body: {}", e);
                return HttpResponse::BadRequest().body("bad request");
            }
        },
    };

    let mut received: i64 = payloads.iter().map(|p| p.count.max(0)).sum();
    let mentions: Vec<Mention> = payloads.into_iter().flat_map(|p| p.mentions).collect();
    if received == 0 {
        received = mentions.len() as i64;
    }

    let lookup = XUserLookup::new(state.config.xauth_token.clone());
    let mut results = Vec::with_capacity(mentions.len());

    for mention in &mentions {
        let question = normalize_tweet_text(&mention.text);
        let mentioned_ids = lookup.resolve_mentions(&mention.text).await;

        log::info!(
            "[MENTIONS] tweet {} from {}: {}",
            mention.tweet_id,
            mention.author_id,
            question
        );

        match state
            .agent
            .answer(
                &question,
                &mention.author_id,
                Some(&mention.tweet_id),
                &mentioned_ids,
                CancellationToken::new(),
            )
            .await
        {
            Ok(_) => results.push(MentionResult {
                tweet_id: mention.tweet_id.clone(),
                posted: true,
                error: None,
            }),
            Err(e) => {
                if let Some(partial) = &e.partial_output {
                    log::warn!(
                        "[MENTIONS] tweet {} failed with partial output: {}",
                        mention.tweet_id,
                        partial
                    );
                }
                results.push(MentionResult {
                    tweet_id: mention.tweet_id.clone(),
                    posted: false,
                    error: Some(e.message),
                });
            }
        }
    }

    HttpResponse::Accepted().json(MentionsSummary {
        received,
        processed: mentions.len(),
        results,
    })
}

static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").expect("valid url regex"));
static HANDLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@[A-Za-z0-9_]+").expect("valid handle regex"));
static MENTION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"@(\w+)").expect("valid mention regex"));

/// Strip handles and URLs and collapse whitespace to form a concise
/// question input.
pub fn normalize_tweet_text(text: &str) -> String {
    let without_urls = URL_RE.replace_all(text, " ");
    let without_handles = HANDLE_RE.replace_all(&without_urls, " ");
    without_handles
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Usernames mentioned in a tweet, in order of appearance
pub fn mentioned_usernames(text: &str) -> Vec<String> {
    MENTION_RE
        .captures_iter(text)
        .map(|caps| caps[1].to_string())
        .collect()
}

#[derive(Debug, Deserialize)]
struct XUserData {
    id: String,
}

#[derive(Debug, Deserialize)]
struct XUserResponse {
    #[serde(default)]
    data: Option<XUserData>,
}

/// Resolves @-handles to X user ids so identity-scoped tools can
/// target mentioned users (e.g. "transfer to @bob").
pub struct XUserLookup {
    client: reqwest::Client,
    token: Option<String>,
}

impl XUserLookup {
    pub fn new(token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
        }
    }

    pub async fn resolve_mentions(&self, text: &str) -> Vec<String> {
        let mut ids = Vec::new();
        for username in mentioned_usernames(text) {
            if let Some(id) = self.user_id(&username).await {
                ids.push(id);
            }
        }
        ids
    }

    async fn user_id(&self, username: &str) -> Option<String> {
        let token = self.token.as_ref()?;
        let url = format!("https://api.x.com/2/users/by/username/{}", username);

        let response = match self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                log::warn!("[MENTIONS] X lookup for {} failed: {}", username, e);
                return None;
            }
        };

        if !response.status().is_success() {
            log::warn!(
                "[MENTIONS] X lookup for {} returned {}",
                username,
                response.status()
            );
            return None;
        }

        match response.json::<XUserResponse>().await {
            Ok(parsed) => {
                let id = parsed.data.map(|d| d.id).filter(|id| !id.is_empty());
                if id.is_none() {
                    log::warn!("[MENTIONS] no user data for {}", username);
                }
                id
            }
            Err(e) => {
                log::warn!("[MENTIONS] unparseable X response for {}: {}", username, e);
                None
            }
        }
    }
}
