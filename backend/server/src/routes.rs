use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{
        self, Path, Query,
        rejection::{PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::{
    database::{self, Order, SortBy},
    error::AppError,
    models::NewArticle,
    state::State,
    utils::{
        ARTICLE_SHAPE, COMMENT_SHAPE, INVALID_ARTICLE_ID, INVALID_COMMENT_ID, Payload,
        VOTES_NOT_INTEGER, as_integer, check_article_id, check_new_article, check_new_comment,
        check_new_topic, check_votes, get_optional_str, get_str, parse_id, parse_payload,
        topic_rejection, validate_comment,
    },
};

type SharedState = extract::State<Arc<State>>;

#[derive(Deserialize)]
pub struct ArticlesQuery {
    topic: Option<String>,
    sort_by: Option<String>,
    order: Option<String>,
}

pub async fn api_handler() -> impl IntoResponse {
    Json(json!({
        "endpoints": {
            "GET /api": "serves this description of every endpoint",
            "GET /api/topics": "serves an array of all topics",
            "POST /api/topics": "adds a topic, body { slug, description }",
            "GET /api/articles": "serves an array of all articles, queries: topic, sort_by, order",
            "POST /api/articles": "adds an article, body { author, title, body, topic, article_img_url? }",
            "GET /api/articles/:article_id": "serves a single article with its comment_count",
            "PATCH /api/articles/:article_id": "updates article votes, body { inc_votes }",
            "DELETE /api/articles/:article_id": "deletes an article and its comments",
            "GET /api/articles/:article_id/comments": "serves the comments of an article, newest first",
            "POST /api/articles/:article_id/comments": "adds a comment, body { username, body }",
            "PATCH /api/comments/:comment_id": "updates comment votes, body { inc_votes }",
            "DELETE /api/comments/:comment_id": "deletes a comment",
            "GET /api/users": "serves an array of all users",
            "GET /api/users/:username": "serves a single user",
        }
    }))
}

pub async fn topics_handler(extract::State(state): SharedState) -> Result<impl IntoResponse, AppError> {
    let topics = database::fetch_topics(&state.pool).await?;

    Ok(Json(json!({ "topics": topics })))
}

pub async fn post_topic_handler(
    extract::State(state): SharedState,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let payload = parse_payload(&body)?;
    let new_topic = check_new_topic(&payload)?;

    let slug = get_str(new_topic, "slug").ok_or_else(topic_rejection)?;
    let description = get_optional_str(new_topic, "description", topic_rejection)?;

    let topic = database::insert_topic(&state.pool, slug, description).await?;
    info!("Created topic {}", topic.slug);

    Ok((StatusCode::CREATED, Json(json!({ "topic": topic }))))
}

pub async fn articles_handler(
    extract::State(state): SharedState,
    query: Result<Query<ArticlesQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(query) = query?;
    let sort_by = match query.sort_by.as_deref() {
        Some(sort_by) => sort_by.parse::<SortBy>()?,
        None => SortBy::default(),
    };
    let order = match query.order.as_deref() {
        Some(order) => order.parse::<Order>()?,
        None => Order::default(),
    };

    let articles =
        database::fetch_articles(&state.pool, query.topic.as_deref(), sort_by, order).await?;

    Ok(Json(json!({ "articles": articles })))
}

fn article_from_payload(payload: &Payload) -> Result<NewArticle, AppError> {
    let rejection = || AppError::bad_request(ARTICLE_SHAPE);
    let required = |field| {
        get_str(payload, field)
            .map(str::to_string)
            .ok_or_else(rejection)
    };

    Ok(NewArticle {
        author: required("author")?,
        title: required("title")?,
        body: required("body")?,
        topic: required("topic")?,
        article_img_url: get_optional_str(payload, "article_img_url", rejection)?
            .map(str::to_string),
    })
}

pub async fn post_article_handler(
    extract::State(state): SharedState,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let payload = parse_payload(&body)?;
    let new_article = article_from_payload(check_new_article(&payload)?)?;

    let article = database::insert_article(&state.pool, &new_article).await?;
    info!("Created article {}", article.article_id);

    Ok((StatusCode::CREATED, Json(json!({ "article": article }))))
}

fn article_id(raw: &str) -> Result<i32, AppError> {
    parse_id(check_article_id(raw)?, INVALID_ARTICLE_ID)
}

fn comment_id(raw: &str) -> Result<i32, AppError> {
    parse_id(validate_comment(raw)?, INVALID_COMMENT_ID)
}

/// Vote delta as a column-sized integer.
fn inc_votes(body: &Bytes) -> Result<i32, AppError> {
    let payload = parse_payload(body)?;
    let votes = check_votes(&payload)?;

    votes
        .get("inc_votes")
        .and_then(as_integer)
        .and_then(|inc| i32::try_from(inc).ok())
        .ok_or_else(|| AppError::unprocessable(VOTES_NOT_INTEGER))
}

pub async fn article_handler(
    extract::State(state): SharedState,
    path: Result<Path<String>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(raw_id) = path?;
    let article = database::fetch_article_by_id(&state.pool, article_id(&raw_id)?).await?;

    Ok(Json(json!({ "article": article })))
}

pub async fn patch_article_handler(
    extract::State(state): SharedState,
    path: Result<Path<String>, PathRejection>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let Path(raw_id) = path?;
    let id = article_id(&raw_id)?;
    let inc = inc_votes(&body)?;

    let article = database::update_article_votes(&state.pool, id, inc).await?;

    Ok(Json(json!({ "article": article })))
}

pub async fn delete_article_handler(
    extract::State(state): SharedState,
    path: Result<Path<String>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(raw_id) = path?;
    let id = article_id(&raw_id)?;

    database::remove_article(&state.pool, id).await?;
    info!("Deleted article {id}");

    Ok(StatusCode::NO_CONTENT)
}

pub async fn article_comments_handler(
    extract::State(state): SharedState,
    path: Result<Path<String>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(raw_id) = path?;
    let comments = database::fetch_article_comments(&state.pool, article_id(&raw_id)?).await?;

    Ok(Json(json!({ "comments": comments })))
}

pub async fn post_comment_handler(
    extract::State(state): SharedState,
    path: Result<Path<String>, PathRejection>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let Path(raw_id) = path?;
    let id = article_id(&raw_id)?;
    let payload = parse_payload(&body)?;
    let new_comment = check_new_comment(&payload)?;

    let rejection = || AppError::bad_request(COMMENT_SHAPE);
    let username = get_str(new_comment, "username").ok_or_else(rejection)?;
    let comment_body = get_str(new_comment, "body").ok_or_else(rejection)?;

    let comment = database::insert_comment(&state.pool, id, username, comment_body).await?;

    Ok((StatusCode::CREATED, Json(json!({ "comment": comment }))))
}

pub async fn patch_comment_handler(
    extract::State(state): SharedState,
    path: Result<Path<String>, PathRejection>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let Path(raw_id) = path?;
    let id = comment_id(&raw_id)?;
    let inc = inc_votes(&body)?;

    let comment = database::update_comment_votes(&state.pool, id, inc).await?;

    Ok(Json(json!({ "comment": comment })))
}

pub async fn delete_comment_handler(
    extract::State(state): SharedState,
    path: Result<Path<String>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(raw_id) = path?;
    let id = comment_id(&raw_id)?;

    database::remove_comment(&state.pool, id).await?;
    info!("Deleted comment {id}");

    Ok(StatusCode::NO_CONTENT)
}

pub async fn users_handler(extract::State(state): SharedState) -> Result<impl IntoResponse, AppError> {
    let users = database::fetch_users(&state.pool).await?;

    Ok(Json(json!({ "users": users })))
}

pub async fn user_handler(
    extract::State(state): SharedState,
    path: Result<Path<String>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(username) = path?;
    let user = database::fetch_user_by_id(&state.pool, &username).await?;

    Ok(Json(json!({ "user": user })))
}

pub async fn fallback_handler() -> impl IntoResponse {
    AppError::not_found("Path not found")
}
