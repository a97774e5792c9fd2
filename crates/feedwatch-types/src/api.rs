use serde::{Deserialize, Serialize};

use crate::models::{Channel, Message, Notice};

// -- Session --

/// JWT claims for the application session minted after a code exchange.
/// `sub` is the identity provider's opaque user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub redirect_to: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub user_id: String,
    /// False when the login went through but the provider token was never
    /// stored, so downstream provider calls will not work.
    pub token_on_file: bool,
}

/// Body of every non-2xx JSON response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

// -- Channels --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddChannelRequest {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChannelListResponse {
    pub channels: Vec<Channel>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddChannelResponse {
    pub channel: Channel,
    pub channels: Vec<Channel>,
    pub notice: Notice,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteChannelResponse {
    pub channels: Vec<Channel>,
    pub notice: Notice,
}

// -- Messages --

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub keyword: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    pub messages: Vec<Message>,
    /// Present when the query succeeded but matched nothing.
    pub notice: Option<Notice>,
}
