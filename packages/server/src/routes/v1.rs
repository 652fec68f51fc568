use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/auth", auth_routes())
        .nest("/stories", story_routes())
        .nest("/chat", chat_routes())
        .nest("/categories", category_routes())
        .merge(profile_routes())
        .merge(comment_routes())
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::auth::register))
        .routes(routes!(handlers::auth::login))
        .routes(routes!(handlers::auth::logout))
        .routes(routes!(handlers::auth::me))
}

fn story_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::story::list_stories,
            handlers::story::create_story
        ))
        .routes(routes!(
            handlers::story::get_story,
            handlers::story::update_story,
            handlers::story::delete_story
        ))
        .routes(routes!(handlers::story::download_story_file))
        .routes(routes!(handlers::story::toggle_like))
        .layer(handlers::story::upload_body_limit())
}

fn profile_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::profile::get_my_profile,
            handlers::profile::update_profile
        ))
        .routes(routes!(handlers::profile::upload_avatar))
        .routes(routes!(handlers::profile::get_profile))
        .routes(routes!(handlers::profile::toggle_follow))
        .routes(routes!(handlers::profile::get_avatar))
        .layer(handlers::profile::avatar_body_limit())
}

fn comment_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::comment::add_comment))
        .routes(routes!(
            handlers::comment::update_comment,
            handlers::comment::delete_comment
        ))
        .routes(routes!(handlers::comment::add_reply))
        .routes(routes!(
            handlers::comment::update_reply,
            handlers::comment::delete_reply
        ))
}

fn chat_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::chat::inbox))
        .routes(routes!(
            handlers::chat::get_conversation,
            handlers::chat::send_message
        ))
}

fn category_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(handlers::category::list_categories))
}
