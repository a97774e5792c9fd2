use axum::{
    Json,
    extract::{Query, State},
};
use tracing::{debug, error};

use feedwatch_types::api::{SearchQuery, SearchResponse};
use feedwatch_types::models::{Message, Notice};

use crate::error::{ApiError, SearchError};
use crate::{AppState, with_db};

const NO_MATCHES: &str = "No messages found for the given keyword";

/// A successful search. An empty pool hit is its own case so callers can show
/// it as information rather than as a failure.
#[derive(Debug, PartialEq, Eq)]
pub enum SearchOutcome {
    Matches(Vec<Message>),
    NoMatches,
}

/// Case-insensitive substring search over the shared message pool.
/// The keyword must not be blank; it is otherwise matched as given,
/// surrounding whitespace included.
pub async fn search(state: &AppState, keyword: &str) -> Result<SearchOutcome, SearchError> {
    if keyword.trim().is_empty() {
        return Err(SearchError::Validation(
            "Please enter a keyword to filter messages.".into(),
        ));
    }

    let kw = keyword.to_string();
    let rows = with_db(state, move |db| db.search_messages(&kw))
        .await
        .inspect_err(|e| error!("Message search for {:?} failed: {:#}", keyword, e))?;

    let messages = rows
        .into_iter()
        .map(Message::try_from)
        .collect::<anyhow::Result<Vec<_>>>()?;

    debug!("Search {:?} matched {} messages", keyword, messages.len());
    if messages.is_empty() {
        Ok(SearchOutcome::NoMatches)
    } else {
        Ok(SearchOutcome::Matches(messages))
    }
}

/// GET /messages/search?keyword=..
pub async fn search_messages(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<SearchResponse>, ApiError> {
    let response = match search(&state, &query.keyword).await? {
        SearchOutcome::Matches(messages) => SearchResponse { messages, notice: None },
        SearchOutcome::NoMatches => SearchResponse {
            messages: Vec::new(),
            notice: Some(Notice::info(NO_MATCHES)),
        },
    };
    Ok(Json(response))
}
