use crate::models::{ModerationSettings, ParsedComment, RawComment, ServiceInfo, ThreadEntry};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::index,
        crate::routes::post_comment,
    ),
    components(schemas(
        RawComment, ParsedComment, ServiceInfo, ThreadEntry, ModerationSettings
    )),
    tags(
        (name = "comments", description = "Comment submission"),
    )
)]
pub struct ApiDoc;
