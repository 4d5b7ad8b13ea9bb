use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{Json, Response},
    routing::post,
    Router,
};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::handler;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct GitHubWebhookPayload {
    pub action: Option<String>,
    pub pull_request: Option<PullRequest>,
    pub repository: Option<Repository>,
    pub installation: Option<Installation>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Installation {
    pub id: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PullRequest {
    pub number: u64,
    pub title: Option<String>,
    pub body: Option<String>,
    pub state: String,
    pub head: PullRequestRef,
    pub base: PullRequestRef,
}

impl PullRequest {
    pub fn is_closed(&self) -> bool {
        self.state == "closed"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PullRequestRef {
    pub sha: String,
    #[serde(rename = "ref")]
    pub ref_name: String,
    /// Missing when the ref's repository has been deleted.
    pub repo: Option<RefRepository>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RefRepository {
    pub id: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Repository {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub owner: User,
}

#[derive(Debug, Deserialize, Clone)]
pub struct User {
    pub id: u64,
    pub login: String,
}

#[derive(Serialize)]
pub struct WebhookResponse {
    pub message: String,
}

type HmacSha256 = Hmac<Sha256>;

fn verify_github_signature(secret: &str, payload: &[u8], signature: &str) -> bool {
    if !signature.starts_with("sha256=") {
        return false;
    }

    let signature_hex = &signature[7..]; // Remove "sha256=" prefix

    let signature_bytes = match hex::decode(signature_hex) {
        Ok(bytes) => bytes,
        Err(_) => return false,
    };

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return false,
    };

    mac.update(payload);

    // Constant-time comparison
    mac.verify_slice(&signature_bytes).is_ok()
}

async fn verify_webhook_signature(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let (parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?;

    let signature = parts
        .headers
        .get("x-hub-signature-256")
        .and_then(|h| h.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if !verify_github_signature(&state.config.github_webhook_secret, &bytes, signature) {
        error!("Invalid webhook signature");
        return Err(StatusCode::UNAUTHORIZED);
    }

    let new_request = Request::from_parts(parts, axum::body::Body::from(bytes));
    Ok(next.run(new_request).await)
}

pub async fn github_webhook_handler(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<WebhookResponse>, StatusCode> {
    // GitHub's delivery id, for correlating log lines with redeliveries
    let delivery = request
        .headers()
        .get("x-github-delivery")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    info!("Received webhook delivery {}", delivery);

    let (_parts, body) = request.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?;

    let payload: GitHubWebhookPayload =
        serde_json::from_slice(&bytes).map_err(|_| StatusCode::BAD_REQUEST)?;

    match payload.action.as_deref() {
        Some("opened") | Some("reopened") | Some("edited") | Some("synchronize") => {
            info!("Processing PR event: {:?}", payload.action);

            if let (Some(pull_request), Some(repository), Some(installation)) =
                (payload.pull_request, payload.repository, payload.installation)
            {
                let state = state.clone();
                let installation_id = installation.id;

                tokio::spawn(async move {
                    if let Err(e) = handler::process_pull_request(
                        &state.config,
                        state.github.as_ref(),
                        installation_id,
                        &repository,
                        &pull_request,
                    )
                    .await
                    {
                        error!(
                            "Failed to process pull request event (delivery {}): {:#}",
                            delivery, e
                        );
                    }
                });
            } else {
                warn!(
                    "Webhook delivery {} missing pull request, repository, or installation data",
                    delivery
                );
            }
        }
        other => {
            info!("Ignoring webhook action {:?}", other);
        }
    }

    Ok(Json(WebhookResponse {
        message: "ok".to_string(),
    }))
}

pub fn webhook_router(middleware_state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/webhook", post(github_webhook_handler))
        .route_layer(middleware::from_fn_with_state(
            middleware_state,
            verify_webhook_signature,
        ))
}
