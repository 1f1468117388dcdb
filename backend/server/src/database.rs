//! # Postgres
//!
//! Relational store for topics, users, articles and comments.
//!
//! ## Schema
//! - `topics`: slug (**primary key**), description, img_url
//! - `users`: username (**primary key**), name, avatar_url
//! - `articles`: article_id (**serial**), title, topic -> topics, author -> users, body, created_at, votes, article_img_url
//! - `comments`: comment_id (**serial**), article_id -> articles (cascade on delete), body, votes, author -> users, created_at
//!
//! Every query is parameterized. The only interpolated SQL is the `ORDER BY`
//! clause, which is built from the [`SortBy`] and [`Order`] whitelists.
use std::{str::FromStr, time::Duration};

use sqlx::{PgPool, postgres::PgPoolOptions};

use crate::{
    error::AppError,
    models::{Article, ArticleSummary, Comment, DEFAULT_ARTICLE_IMG_URL, NewArticle, Topic, User},
};

pub const ARTICLE_NOT_FOUND: &str = "Article not found";
pub const COMMENT_NOT_FOUND: &str = "Comment not found";
pub const TOPIC_NOT_FOUND: &str = "Topic not found";
pub const USERS_NOT_FOUND: &str = "Unable to find: Users";
pub const USERNAME_NOT_FOUND: &str = "Username not found";

pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(3))
        .connect(database_url)
        .await
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortBy {
    ArticleId,
    Title,
    Topic,
    Author,
    #[default]
    CreatedAt,
    Votes,
    CommentCount,
}

impl SortBy {
    fn column(self) -> &'static str {
        match self {
            SortBy::ArticleId => "a.article_id",
            SortBy::Title => "a.title",
            SortBy::Topic => "a.topic",
            SortBy::Author => "a.author",
            SortBy::CreatedAt => "a.created_at",
            SortBy::Votes => "a.votes",
            SortBy::CommentCount => "comment_count",
        }
    }
}

impl FromStr for SortBy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "article_id" => Ok(SortBy::ArticleId),
            "title" => Ok(SortBy::Title),
            "topic" => Ok(SortBy::Topic),
            "author" => Ok(SortBy::Author),
            "created_at" => Ok(SortBy::CreatedAt),
            "votes" => Ok(SortBy::Votes),
            "comment_count" => Ok(SortBy::CommentCount),
            _ => Err(AppError::bad_request("Invalid sort query")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Order {
    Asc,
    #[default]
    Desc,
}

impl Order {
    fn keyword(self) -> &'static str {
        match self {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        }
    }
}

impl FromStr for Order {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Order::Asc),
            "desc" => Ok(Order::Desc),
            _ => Err(AppError::bad_request("Invalid order query")),
        }
    }
}

pub async fn fetch_topics(pool: &PgPool) -> Result<Vec<Topic>, AppError> {
    let topics = sqlx::query_as::<_, Topic>("SELECT slug, description, img_url FROM topics;")
        .fetch_all(pool)
        .await?;

    Ok(topics)
}

pub async fn insert_topic(
    pool: &PgPool,
    slug: &str,
    description: Option<&str>,
) -> Result<Topic, AppError> {
    let topic = sqlx::query_as::<_, Topic>(
        "INSERT INTO topics (slug, description) VALUES ($1, $2) RETURNING slug, description, img_url;",
    )
    .bind(slug)
    .bind(description)
    .fetch_one(pool)
    .await?;

    Ok(topic)
}

async fn topic_exists(pool: &PgPool, slug: &str) -> Result<bool, AppError> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM topics WHERE slug = $1);")
        .bind(slug)
        .fetch_one(pool)
        .await?;

    Ok(exists)
}

pub async fn fetch_articles(
    pool: &PgPool,
    topic: Option<&str>,
    sort_by: SortBy,
    order: Order,
) -> Result<Vec<ArticleSummary>, AppError> {
    let query = format!(
        "SELECT a.article_id, a.title, a.topic, a.author, a.created_at, a.votes, a.article_img_url,
                COUNT(c.comment_id) AS comment_count
         FROM articles a
         LEFT JOIN comments c ON c.article_id = a.article_id
         WHERE ($1::VARCHAR IS NULL OR a.topic = $1)
         GROUP BY a.article_id
         ORDER BY {} {};",
        sort_by.column(),
        order.keyword()
    );

    let articles = sqlx::query_as::<_, ArticleSummary>(&query)
        .bind(topic)
        .fetch_all(pool)
        .await?;

    if let Some(slug) = topic {
        if articles.is_empty() && !topic_exists(pool, slug).await? {
            return Err(AppError::not_found(TOPIC_NOT_FOUND));
        }
    }

    Ok(articles)
}

pub async fn fetch_article_by_id(pool: &PgPool, article_id: i32) -> Result<Article, AppError> {
    sqlx::query_as::<_, Article>(
        "SELECT a.*, COUNT(c.comment_id) AS comment_count
         FROM articles a
         LEFT JOIN comments c ON c.article_id = a.article_id
         WHERE a.article_id = $1
         GROUP BY a.article_id;",
    )
    .bind(article_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found(ARTICLE_NOT_FOUND))
}

pub async fn insert_article(pool: &PgPool, article: &NewArticle) -> Result<Article, AppError> {
    let img_url = article
        .article_img_url
        .as_deref()
        .unwrap_or(DEFAULT_ARTICLE_IMG_URL);

    let article = sqlx::query_as::<_, Article>(
        "INSERT INTO articles (author, title, body, topic, article_img_url)
         VALUES ($1, $2, $3, $4, $5)
         RETURNING *, 0::BIGINT AS comment_count;",
    )
    .bind(&article.author)
    .bind(&article.title)
    .bind(&article.body)
    .bind(&article.topic)
    .bind(img_url)
    .fetch_one(pool)
    .await?;

    Ok(article)
}

pub async fn update_article_votes(
    pool: &PgPool,
    article_id: i32,
    inc_votes: i32,
) -> Result<Article, AppError> {
    sqlx::query_as::<_, Article>(
        "WITH updated AS (
             UPDATE articles SET votes = votes + $1 WHERE article_id = $2 RETURNING *
         )
         SELECT updated.*,
                (SELECT COUNT(*) FROM comments c WHERE c.article_id = updated.article_id) AS comment_count
         FROM updated;",
    )
    .bind(inc_votes)
    .bind(article_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found(ARTICLE_NOT_FOUND))
}

pub async fn remove_article(pool: &PgPool, article_id: i32) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM articles WHERE article_id = $1;")
        .bind(article_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found(ARTICLE_NOT_FOUND));
    }

    Ok(())
}

async fn article_exists(pool: &PgPool, article_id: i32) -> Result<bool, AppError> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM articles WHERE article_id = $1);")
            .bind(article_id)
            .fetch_one(pool)
            .await?;

    Ok(exists)
}

pub async fn fetch_article_comments(pool: &PgPool, article_id: i32) -> Result<Vec<Comment>, AppError> {
    let comments = sqlx::query_as::<_, Comment>(
        "SELECT comment_id, article_id, body, votes, author, created_at
         FROM comments
         WHERE article_id = $1
         ORDER BY created_at DESC;",
    )
    .bind(article_id)
    .fetch_all(pool)
    .await?;

    if comments.is_empty() && !article_exists(pool, article_id).await? {
        return Err(AppError::not_found(ARTICLE_NOT_FOUND));
    }

    Ok(comments)
}

pub async fn insert_comment(
    pool: &PgPool,
    article_id: i32,
    username: &str,
    body: &str,
) -> Result<Comment, AppError> {
    let comment = sqlx::query_as::<_, Comment>(
        "INSERT INTO comments (article_id, author, body)
         VALUES ($1, $2, $3)
         RETURNING comment_id, article_id, body, votes, author, created_at;",
    )
    .bind(article_id)
    .bind(username)
    .bind(body)
    .fetch_one(pool)
    .await?;

    Ok(comment)
}

pub async fn update_comment_votes(
    pool: &PgPool,
    comment_id: i32,
    inc_votes: i32,
) -> Result<Comment, AppError> {
    sqlx::query_as::<_, Comment>(
        "UPDATE comments SET votes = votes + $1
         WHERE comment_id = $2
         RETURNING comment_id, article_id, body, votes, author, created_at;",
    )
    .bind(inc_votes)
    .bind(comment_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found(COMMENT_NOT_FOUND))
}

pub async fn remove_comment(pool: &PgPool, comment_id: i32) -> Result<(), AppError> {
    let result = sqlx::query("DELETE FROM comments WHERE comment_id = $1;")
        .bind(comment_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found(COMMENT_NOT_FOUND));
    }

    Ok(())
}

pub async fn fetch_users(pool: &PgPool) -> Result<Vec<User>, AppError> {
    let users = sqlx::query_as::<_, User>("SELECT username, name, avatar_url FROM users;")
        .fetch_all(pool)
        .await?;

    if users.is_empty() {
        return Err(AppError::not_found(USERS_NOT_FOUND));
    }

    Ok(users)
}

pub async fn fetch_user_by_id(pool: &PgPool, username: &str) -> Result<User, AppError> {
    sqlx::query_as::<_, User>("SELECT username, name, avatar_url FROM users WHERE username = $1;")
        .bind(username)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::not_found(USERNAME_NOT_FOUND))
}
