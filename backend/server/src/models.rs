//! Rows returned by the data-access layer, serialized straight into responses.

use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::FromRow;

pub const DEFAULT_ARTICLE_IMG_URL: &str =
    "https://images.pexels.com/photos/97050/pexels-photo-97050.jpeg?w=700&h=700";

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Topic {
    pub slug: String,
    pub description: Option<String>,
    pub img_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub username: String,
    pub name: String,
    pub avatar_url: Option<String>,
}

/// Listing shape, no `body`.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ArticleSummary {
    pub article_id: i32,
    pub title: String,
    pub topic: String,
    pub author: String,
    pub created_at: NaiveDateTime,
    pub votes: i32,
    pub article_img_url: Option<String>,
    pub comment_count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Article {
    pub article_id: i32,
    pub title: String,
    pub topic: String,
    pub author: String,
    pub body: String,
    pub created_at: NaiveDateTime,
    pub votes: i32,
    pub article_img_url: Option<String>,
    pub comment_count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Comment {
    pub comment_id: i32,
    pub article_id: i32,
    pub body: String,
    pub votes: i32,
    pub author: String,
    pub created_at: NaiveDateTime,
}

/// Validated body of `POST /api/articles`.
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub author: String,
    pub title: String,
    pub body: String,
    pub topic: String,
    pub article_img_url: Option<String>,
}
