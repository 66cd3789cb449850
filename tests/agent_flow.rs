//! End-to-end agent flow against live in-process MCP backends: the
//! wallet is guaranteed before the loop, tools are discovered fresh,
//! the loop answers, and the sanitized reply is posted.

use async_trait::async_trait;
use mentions_bot::agent::AgentService;
use mentions_bot::ai::{Message, ReasoningBackend};
use mentions_bot::config::Config;
use mentions_bot::mcp::protocol::ToolDescriptor;
use mentions_bot::mcp::server::{McpServer, ToolHandler};
use mentions_bot::mcp::JsonRpcRequest;
use mentions_bot::wallet::{TxSigner, WalletService, WalletStore, build_wallet_server};
use serde_json::{json, Map, Value};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// Serve an [`McpServer`] over a real TCP port with a minimal
/// single-request-per-connection HTTP loop.
async fn spawn_mcp(server: McpServer) -> SocketAddr {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = Arc::new(server);

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let server = server.clone();
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 4096];
                let body = loop {
                    let n = match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => n,
                    };
                    buf.extend_from_slice(&chunk[..n]);
                    let text = String::from_utf8_lossy(&buf);
                    if let Some(header_end) = text.find("\r\n\r\n") {
                        let content_length = text
                            .lines()
                            .find_map(|l| {
                                l.to_ascii_lowercase()
                                    .strip_prefix("content-length:")
                                    .map(|v| v.trim().parse::<usize>().unwrap_or(0))
                            })
                            .unwrap_or(0);
                        let body_start = header_end + 4;
                        if buf.len() >= body_start + content_length {
                            break buf[body_start..body_start + content_length].to_vec();
                        }
                    }
                };

                let request: JsonRpcRequest = serde_json::from_slice(&body).unwrap();
                let payload = match server.handle(request).await {
                    Some(response) => serde_json::to_vec(&response).unwrap(),
                    None => Vec::new(),
                };
                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    payload.len()
                );
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(&payload).await;
            });
        }
    });
    addr
}

/// Records every reply posted through the fake X backend
struct PostReplyRecorder {
    posted: Arc<Mutex<Vec<(String, String)>>>,
}

#[async_trait]
impl ToolHandler for PostReplyRecorder {
    async fn call(&self, arguments: Map<String, Value>) -> Result<String, String> {
        let in_reply_to = arguments
            .get("in_reply_to_tweet_id")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let text = arguments
            .get("text")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        self.posted.lock().unwrap().push((in_reply_to, text));
        Ok("posted".to_string())
    }
}

fn x_backend(posted: Arc<Mutex<Vec<(String, String)>>>) -> McpServer {
    let mut server = McpServer::new("x-mcp");
    server.add_tool(
        ToolDescriptor {
            name: "twitter.post_reply".to_string(),
            description: "Reply under a tweet".to_string(),
            input_schema: Some(json!({
                "type": "object",
                "properties": {
                    "in_reply_to_tweet_id": {"type": "string"},
                    "text": {"type": "string"},
                },
                "required": ["in_reply_to_tweet_id", "text"],
            })),
        },
        Arc::new(PostReplyRecorder { posted }),
    );
    server
}

/// Scripted reasoning backend returning canned completions in order
struct ScriptedBackend {
    responses: Mutex<Vec<String>>,
}

impl ScriptedBackend {
    fn new(responses: Vec<&str>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.iter().rev().map(|s| s.to_string()).collect()),
        })
    }
}

#[async_trait]
impl ReasoningBackend for ScriptedBackend {
    async fn complete(&self, _messages: Vec<Message>) -> Result<String, String> {
        self.responses
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| "script exhausted".to_string())
    }
}

#[tokio::test]
async fn mention_flow_ensures_wallet_answers_and_posts_sanitized_reply() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("wallets.db");
    let store = Arc::new(WalletStore::new(db_path.to_str().unwrap()).unwrap());
    let wallet_service = Arc::new(WalletService::new(store.clone()));
    let signer = Arc::new(TxSigner::new(wallet_service.clone()));

    let wallet_addr = spawn_mcp(build_wallet_server(wallet_service.clone(), signer)).await;
    let posted = Arc::new(Mutex::new(Vec::new()));
    let x_addr = spawn_mcp(x_backend(posted.clone())).await;

    let config = Config {
        port: 0,
        database_url: db_path.to_str().unwrap().to_string(),
        x_mcp_url: Some(format!("http://{}/mcp", x_addr)),
        wallet_mcp_url: Some(format!("http://{}/mcp", wallet_addr)),
        bnb_mcp_url: None,
        webhook_secret: None,
        xauth_token: None,
    };

    let backend = ScriptedBackend::new(vec![
        "Thought: read the wallet back\nAction: wallet_read_wallet\nAction Input: {\"twitter_id\": \"42\"}",
        "Thought: done\nFinal Answer: Your wallet is ready.\n```\ndebug\n```\nThought: should not leak",
    ]);

    let agent = AgentService::new(config, backend);
    let answer = agent
        .answer(
            "create me a wallet",
            "42",
            Some("777"),
            &[],
            CancellationToken::new(),
        )
        .await
        .unwrap();

    // The wallet was guaranteed before the loop ran
    let record = wallet_service.get("42").unwrap().expect("wallet created");
    assert!(record.keys.eth.public_address.starts_with("0x"));

    // The answer is sanitized: no fences, no scaffolding lines
    assert!(answer.contains("Your wallet is ready."));
    assert!(!answer.contains("```"));
    assert!(!answer.to_lowercase().contains("thought:"));

    // The reply landed under the right tweet with the sanitized text
    let posted = posted.lock().unwrap();
    assert_eq!(posted.len(), 1);
    assert_eq!(posted[0].0, "777");
    assert_eq!(posted[0].1, answer);
}

#[tokio::test]
async fn reply_required_without_x_backend_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("wallets.db");

    let config = Config {
        port: 0,
        database_url: db_path.to_str().unwrap().to_string(),
        x_mcp_url: None,
        wallet_mcp_url: None,
        bnb_mcp_url: None,
        webhook_secret: None,
        xauth_token: None,
    };

    let backend = ScriptedBackend::new(vec!["Final Answer: unreachable"]);
    let agent = AgentService::new(config, backend);

    let err = agent
        .answer("hi", "42", Some("777"), &[], CancellationToken::new())
        .await
        .unwrap_err();
    assert!(err.message.contains("X backend is not available"));
}
