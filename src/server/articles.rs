use std::collections::{BTreeSet, HashMap};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::{Access, AuthError};
use crate::error::AppError;
use crate::server::{require_access, AppState};
use crate::storage::Article;

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new("<[^>]+>").unwrap());

/// GET /v1/articles: public listing with paging, tag filter, and snippets.
pub async fn list_articles(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let page = parse_param(&params, "page", 1)?;
    let limit = parse_param(&params, "limit", 10)?;
    let snippet = parse_param(&params, "snippet", 140)?;
    if page < 1 || limit < 1 {
        return Err(AppError::user("bad_paging", "Syntax error."));
    }
    let (page, limit) = (page as usize, limit as usize);

    let articles = match params.get("tag") {
        Some(tag) if !tag.is_empty() => state.store.articles_by_tag(tag)?,
        _ => state.store.articles()?,
    };

    let total = articles.len();
    let offset = (page - 1) * limit;
    let page_items: Vec<&Article> = articles.iter().skip(offset).take(limit).collect();
    let shown = offset.min(total) + page_items.len();

    let article_arr: Vec<serde_json::Value> = page_items
        .iter()
        .map(|a| {
            json!({
                "id": a.id,
                "title": a.title,
                "content": snippet_of(&a.content, snippet),
                "tags": a.tags,
                "author": a.author,
                "timestamp": a.timestamp,
            })
        })
        .collect();

    let mut response = json!({
        "status": "ok",
        "info": "Retrieved articles.",
        "articles": article_arr,
    });
    if shown < total {
        response["next"] = json!(page + 1);
    }
    Ok((StatusCode::OK, Json(response)))
}

#[derive(Debug, Deserialize)]
pub struct CreateArticlePayload {
    title: String,
    content: String,
    #[serde(default)]
    tags: Option<BTreeSet<String>>,
}

/// POST /v1/articles: create an article authored by the acting user.
pub async fn create_article(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateArticlePayload>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let token = require_access(&state, &headers, Access::Client)?;
    let author = token.user().ok_or(AppError::from(AuthError::Unauthorized))?;

    let mut id = Uuid::new_v4();
    while state.store.article_by_id(id)?.is_some() {
        id = Uuid::new_v4();
    }

    let article = Article {
        id,
        author,
        title: payload.title,
        content: payload.content,
        tags: payload.tags.unwrap_or_default(),
        timestamp: chrono::Utc::now().timestamp_millis(),
    };
    state.store.set_article(&article)?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "status": "ok",
            "info": "Article created.",
        })),
    ))
}

/// GET /v1/articles/{article}: public retrieval with the author embedded.
pub async fn get_article(
    State(state): State<AppState>,
    Path(article): Path<String>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let article = lookup_article(&state, &article)?;

    let author = state
        .store
        .user_by_id(article.author)?
        .map(|u| json!({ "id": u.id, "username": u.username }))
        .unwrap_or(serde_json::Value::Null);

    Ok((
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "info": "Retrieved article.",
            "id": article.id,
            "title": article.title,
            "content": article.content,
            "tags": article.tags,
            "author": author,
            "timestamp": article.timestamp,
        })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct ModifyArticlePayload {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tags: Option<BTreeSet<String>>,
}

/// PATCH /v1/articles/{article}: partial update.
pub async fn modify_article(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(article): Path<String>,
    Json(payload): Json<ModifyArticlePayload>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    require_access(&state, &headers, Access::Client)?;

    let mut article = lookup_article(&state, &article)?;
    if let Some(title) = payload.title {
        article.title = title;
    }
    if let Some(content) = payload.content {
        article.content = content;
    }
    if let Some(tags) = payload.tags {
        article.tags = tags;
    }
    state.store.set_article(&article)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "status": "ok",
            "info": "Article updated.",
        })),
    ))
}

/// DELETE /v1/articles/{article}.
pub async fn delete_article(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(article): Path<String>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    require_access(&state, &headers, Access::Client)?;

    let article = lookup_article(&state, &article)?;
    state.store.delete_article(article.id)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "status": "ok",
            "info": "Article deleted.",
        })),
    ))
}

/// GET /v1/tags: sorted union of all article tags.
pub async fn list_tags(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    let mut tags = BTreeSet::new();
    for article in state.store.articles()? {
        tags.extend(article.tags);
    }
    Ok((
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "info": "Retrieved tags.",
            "tags": tags,
        })),
    ))
}

/// Resolve a path parameter to an article; unparsable ids and unknown ids
/// are the same 404.
fn lookup_article(state: &AppState, raw_id: &str) -> Result<Article, AppError> {
    let id = raw_id.parse::<Uuid>().ok();
    let article = match id {
        Some(id) => state.store.article_by_id(id)?,
        None => None,
    };
    article.ok_or_else(|| AppError::not_found("article_not_found", "Article not found."))
}

fn parse_param(params: &HashMap<String, String>, key: &str, default: i64) -> Result<i64, AppError> {
    match params.get(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<i64>()
            .map_err(|_| AppError::user("bad_paging", "Syntax error.")),
    }
}

/// Trim article content to a listing snippet: strip HTML tags, then cut at
/// the first word boundary at or past `limit` characters. A negative limit
/// disables trimming.
fn snippet_of(content: &str, limit: i64) -> String {
    let cleaned = HTML_TAG.replace_all(content, " ").replace("&#xA0; ", "");
    if limit < 0 {
        return cleaned;
    }
    let limit = limit as usize;
    let chars: Vec<char> = cleaned.chars().collect();
    if chars.len() <= limit {
        return cleaned;
    }
    let cut = chars
        .iter()
        .enumerate()
        .skip(limit)
        .find(|(_, c)| **c == ' ')
        .map(|(i, _)| i)
        .unwrap_or(chars.len());
    chars[..cut].iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_strips_html_and_cuts_at_word_boundary() {
        let content = "<p>alpha beta</p> gamma delta";
        // tags replaced by spaces: " alpha beta  gamma delta"
        let out = snippet_of(content, 8);
        assert_eq!(out, " alpha beta");
        assert!(!out.contains('<'));
    }

    #[test]
    fn snippet_shorter_than_limit_is_untouched() {
        assert_eq!(snippet_of("short text", 140), "short text");
    }

    #[test]
    fn snippet_without_a_late_space_keeps_everything() {
        let content = "word ".repeat(2) + &"x".repeat(50);
        let out = snippet_of(&content, 20);
        assert_eq!(out, content);
    }

    #[test]
    fn negative_snippet_limit_disables_trimming() {
        let content = "a ".repeat(200);
        assert_eq!(snippet_of(&content, -1).len(), content.len());
    }

    #[test]
    fn parse_param_defaults_and_rejects_junk() {
        let mut params = HashMap::new();
        assert_eq!(parse_param(&params, "page", 1).unwrap(), 1);
        params.insert("page".to_string(), "3".to_string());
        assert_eq!(parse_param(&params, "page", 1).unwrap(), 3);
        params.insert("page".to_string(), "x".to_string());
        assert!(parse_param(&params, "page", 1).is_err());
    }
}
