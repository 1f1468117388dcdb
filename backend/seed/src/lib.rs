//! # Seeding
//!
//! Rebuilds the schema and loads a data set of topics, users, articles and comments.
//!
//! ## Data Set
//!
//! A directory of four JSON arrays:
//! - `topics.json`: slug, description, img_url
//! - `users.json`: username, name, avatar_url
//! - `articles.json`: title, topic, author, body, created_at (**epoch ms**), votes, article_img_url
//! - `comments.json`: body, belongs_to (**article title**), created_by, votes, created_at (**epoch ms**)
//!
//! ## Steps
//! 1. Drop and recreate every table inside one transaction.
//! 2. Insert topics and users as they are.
//! 3. Insert articles with `created_at` turned into a date, keeping the generated ids.
//! 4. Build a title to `article_id` lookup from the inserted rows.
//! 5. Format comments through that lookup and insert them.
//!
//! Any failure rolls the whole transaction back, so a half-seeded database is never left behind.
use std::{fs, path::Path};

use anyhow::{Context, Result, bail};
use chrono::NaiveDateTime;
use indicatif::{ProgressBar, ProgressStyle};
use serde::de::DeserializeOwned;
use server::models::DEFAULT_ARTICLE_IMG_URL;
use sqlx::{PgConnection, PgPool};
use tracing::info;

pub mod models;
pub mod utils;

use models::{ARTICLES_FILE, COMMENTS_FILE, Field, Record, TOPICS_FILE, USERS_FILE};
use utils::{convert_timestamp_to_date, create_ref, format_comments};

const SCHEMA: &str = r#"
    DROP TABLE IF EXISTS comments;
    DROP TABLE IF EXISTS articles;
    DROP TABLE IF EXISTS users;
    DROP TABLE IF EXISTS topics;

    CREATE TABLE topics (
        slug VARCHAR PRIMARY KEY,
        description VARCHAR,
        img_url VARCHAR(1000)
    );

    CREATE TABLE users (
        username VARCHAR PRIMARY KEY,
        name VARCHAR NOT NULL,
        avatar_url VARCHAR(1000)
    );

    CREATE TABLE articles (
        article_id SERIAL PRIMARY KEY,
        title VARCHAR NOT NULL,
        topic VARCHAR NOT NULL REFERENCES topics(slug),
        author VARCHAR NOT NULL REFERENCES users(username),
        body VARCHAR NOT NULL,
        created_at TIMESTAMP DEFAULT NOW() NOT NULL,
        votes INT DEFAULT 0 NOT NULL,
        article_img_url VARCHAR(1000)
    );

    CREATE TABLE comments (
        comment_id SERIAL PRIMARY KEY,
        article_id INT NOT NULL REFERENCES articles(article_id) ON DELETE CASCADE,
        body VARCHAR NOT NULL,
        votes INT DEFAULT 0 NOT NULL,
        author VARCHAR NOT NULL REFERENCES users(username),
        created_at TIMESTAMP DEFAULT NOW() NOT NULL
    );
"#;

pub struct SeedData {
    pub topics: Vec<Record>,
    pub users: Vec<Record>,
    pub articles: Vec<Record>,
    pub comments: Vec<Record>,
}

impl SeedData {
    pub fn len(&self) -> usize {
        self.topics.len() + self.users.len() + self.articles.len() + self.comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn load_data(dir: &Path) -> Result<SeedData> {
    Ok(SeedData {
        topics: read_records(&dir.join(TOPICS_FILE))?,
        users: read_records(&dir.join(USERS_FILE))?,
        articles: read_records(&dir.join(ARTICLES_FILE))?,
        comments: read_records(&dir.join(COMMENTS_FILE))?,
    })
}

fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let json = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;

    serde_json::from_str(&json).with_context(|| format!("Failed to parse {}", path.display()))
}

pub async fn run(pool: &PgPool, dir: &Path) -> Result<()> {
    let data = load_data(dir)?;

    info!("Loaded Topics: {}", data.topics.len());
    info!("Loaded Users: {}", data.users.len());
    info!("Loaded Articles: {}", data.articles.len());
    info!("Loaded Comments: {}", data.comments.len());

    seed(pool, &data).await
}

pub async fn seed(pool: &PgPool, data: &SeedData) -> Result<()> {
    let pb = ProgressBar::new(data.len() as u64);
    pb.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )?
        .progress_chars("=> "),
    );

    let mut tx = pool.begin().await?;

    pb.set_message("Creating tables");
    sqlx::raw_sql(SCHEMA).execute(&mut *tx).await?;

    pb.set_message("Inserting topics");
    for topic in &data.topics {
        insert_topic(&mut tx, topic).await?;
        pb.inc(1);
    }

    pb.set_message("Inserting users");
    for user in &data.users {
        insert_user(&mut tx, user).await?;
        pb.inc(1);
    }

    pb.set_message("Inserting articles");
    let mut inserted = Vec::with_capacity(data.articles.len());
    for article in &data.articles {
        inserted.push(insert_article(&mut tx, &convert_timestamp_to_date(article)).await?);
        pb.inc(1);
    }

    let id_lookup = create_ref(&inserted, "title", "article_id");

    pb.set_message("Inserting comments");
    for comment in format_comments(&data.comments, &id_lookup) {
        insert_comment(&mut tx, &comment).await?;
        pb.inc(1);
    }

    tx.commit().await?;
    pb.finish_with_message("Done");

    info!("Seeded {} rows", data.len());

    Ok(())
}

fn text(record: &Record, field: &str) -> Option<String> {
    record.get(field).and_then(Field::as_text).map(str::to_string)
}

/// Absent or null reads as `None` so the column default applies. Anything
/// else has to fit an `INT`.
fn integer(record: &Record, field: &str) -> Result<Option<i32>> {
    match record.get(field) {
        None | Some(Field::Null) => Ok(None),
        Some(value) => value
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .map(Some)
            .with_context(|| format!("Field {field} is not an integer: {value:?}")),
    }
}

/// Expects `created_at` to have been through the timestamp normalizer, which
/// drops falsy values and converts epoch milliseconds.
fn timestamp(record: &Record) -> Result<Option<NaiveDateTime>> {
    match record.get("created_at") {
        None => Ok(None),
        Some(Field::Date(date)) => Ok(Some(date.naive_utc())),
        Some(value) => bail!("Field created_at is not a timestamp: {value:?}"),
    }
}

async fn insert_topic(conn: &mut PgConnection, topic: &Record) -> Result<()> {
    sqlx::query("INSERT INTO topics (slug, description, img_url) VALUES ($1, $2, $3);")
        .bind(text(topic, "slug"))
        .bind(text(topic, "description"))
        .bind(text(topic, "img_url"))
        .execute(conn)
        .await?;

    Ok(())
}

async fn insert_user(conn: &mut PgConnection, user: &Record) -> Result<()> {
    sqlx::query("INSERT INTO users (username, name, avatar_url) VALUES ($1, $2, $3);")
        .bind(text(user, "username"))
        .bind(text(user, "name"))
        .bind(text(user, "avatar_url"))
        .execute(conn)
        .await?;

    Ok(())
}

/// Returns the stored title and generated id as a record for the lookup.
async fn insert_article(conn: &mut PgConnection, article: &Record) -> Result<Record> {
    let (article_id, title): (i32, String) = sqlx::query_as(
        "INSERT INTO articles (title, topic, author, body, created_at, votes, article_img_url)
         VALUES ($1, $2, $3, $4, COALESCE($5, NOW()::TIMESTAMP), COALESCE($6, 0), COALESCE($7, $8))
         RETURNING article_id, title;",
    )
    .bind(text(article, "title"))
    .bind(text(article, "topic"))
    .bind(text(article, "author"))
    .bind(text(article, "body"))
    .bind(timestamp(article)?)
    .bind(integer(article, "votes")?)
    .bind(text(article, "article_img_url"))
    .bind(DEFAULT_ARTICLE_IMG_URL)
    .fetch_one(conn)
    .await?;

    Ok(Record::from([
        ("article_id".to_string(), Field::from(article_id)),
        ("title".to_string(), Field::from(title)),
    ]))
}

async fn insert_comment(conn: &mut PgConnection, comment: &Record) -> Result<()> {
    sqlx::query(
        "INSERT INTO comments (article_id, body, votes, author, created_at)
         VALUES ($1, $2, COALESCE($3, 0), $4, COALESCE($5, NOW()::TIMESTAMP));",
    )
    .bind(integer(comment, "article_id")?)
    .bind(text(comment, "body"))
    .bind(integer(comment, "votes")?)
    .bind(text(comment, "author"))
    .bind(timestamp(comment)?)
    .execute(conn)
    .await
    .with_context(|| format!("Failed to insert comment {comment:?}"))?;

    Ok(())
}
