use std::sync::Arc;
use std::time::Duration;
use actix_web::{guard, http::header, web, HttpRequest, HttpResponse};
use chrono::Utc;
use tracing::{debug, info};

use crate::auth::IdentityVerifier;
use crate::error::ApiError;
use crate::filter::{self, Rejection, Screened, Verdict};
use crate::models::*;
use crate::moderation::{ModerationRouter, Route, Submission};
use crate::naming;
use crate::resolver::ThreadResolver;
use crate::settings::SettingsCache;
use crate::store::{ContentStore, RepoRef};

pub const BANNED_HEADER: &str = "X-Banned";

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/")
            .route(web::get().to(index))
            .route(web::post().to(post_comment)),
    )
    // guarded so other methods fall through to later services such as the docs
    .service(
        web::resource("/{path:.*}")
            .guard(guard::Post())
            .route(web::post().to(post_comment)),
    );
}

/// Where and how accepted comments are written.
#[derive(Clone, Debug)]
pub struct Publishing {
    pub repository: RepoRef,
    pub published_branch: String,
    pub threads_source: String,
    pub store_timeout: Duration,
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ContentStore>,
    pub resolver: Arc<dyn ThreadResolver>,
    pub settings: Arc<SettingsCache>,
    pub verifier: IdentityVerifier,
    pub publishing: Publishing,
}

#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service metadata", body = ServiceInfo)
    )
)]
pub async fn index() -> HttpResponse {
    HttpResponse::Ok().json(ServiceInfo {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        description: "Accepts comments and files them into a git-hosted content repository".to_string(),
    })
}

/// `Some(response)` when the verdict ends the request.
fn settle(verdict: Verdict) -> Result<Option<HttpResponse>, ApiError> {
    match verdict {
        Verdict::Allowed => Ok(None),
        Verdict::SilentBan(category) => {
            info!(category = category.header_value(), "submission dropped by deny list");
            Ok(Some(
                HttpResponse::Ok()
                    .insert_header((BANNED_HEADER, category.header_value()))
                    .json(serde_json::json!({})),
            ))
        }
        Verdict::VisibleReject(Rejection::ThreadClosed) => Err(ApiError::ThreadClosed),
    }
}

fn client_ip(req: &HttpRequest) -> String {
    req.peer_addr().map(|a| a.ip().to_string()).unwrap_or_default()
}

#[utoipa::path(
    post,
    path = "/{path}",
    params(("path" = String, Path, description = "Path of the published entry being commented on")),
    request_body = RawComment,
    responses(
        (status = 200, description = "Comment stored, or silently dropped (empty object with X-Banned header)", body = ParsedComment),
        (status = 400, description = "Entry metadata missing, unreadable or malformed"),
        (status = 401, description = "Thread closed for new comments"),
        (status = 422, description = "Not JSON or undecodable body"),
        (status = 500, description = "Content repository write failed")
    )
)]
pub async fn post_comment(
    req: HttpRequest,
    body: web::Bytes,
    data: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let settings = data.settings.snapshot().await;
    let ip = client_ip(&req);
    if let Some(resp) = settle(filter::screen_address(&settings, &ip))? {
        return Ok(resp);
    }

    let entry = data.resolver.resolve(req.path()).await?;
    let thread_dir = entry.directory()?;
    if let Some(resp) = settle(filter::check_time_limit(&settings, &entry, Utc::now()))? {
        return Ok(resp);
    }

    let mut comment: RawComment =
        serde_json::from_slice(&body).map_err(|e| ApiError::InvalidBody(e.to_string()))?;
    let screened = Screened { email: &comment.email, body: &comment.body, url: &comment.url };
    if let Some(resp) = settle(filter::screen_content(&settings, screened))? {
        return Ok(resp);
    }

    let authorization = req.headers().get(header::AUTHORIZATION).and_then(|v| v.to_str().ok());
    let verified = data.verifier.verify(&comment.email, authorization);
    let now = Utc::now();
    comment.stamp(&ip, now, verified);

    let publishing = &data.publishing;
    let path = naming::comment_path(&publishing.threads_source, &thread_dir, now, &comment.body);
    let excerpt = naming::excerpt(&comment.body);
    let content = serde_json::to_vec(&comment).map_err(|_| ApiError::Internal)?;
    let route = Route::select(settings.require_approval, comment.is_suspicious());
    debug!(comment_id = %comment.id, ?route, %path, "filing comment");

    let router = ModerationRouter::new(
        data.store.as_ref(),
        &publishing.repository,
        &publishing.published_branch,
        publishing.store_timeout,
    );
    router
        .persist(route, &Submission { comment_id: &comment.id, path: &path, content: &content, excerpt: &excerpt })
        .await?;

    Ok(HttpResponse::Ok().json(comment.to_parsed()))
}
