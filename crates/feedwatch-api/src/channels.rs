use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{error, info, warn};
use uuid::Uuid;

use feedwatch_db::ChannelInsert;
use feedwatch_types::api::{
    AddChannelRequest, AddChannelResponse, ChannelListResponse, Claims, DeleteChannelResponse,
};
use feedwatch_types::models::{Channel, Notice};

use crate::error::{ApiError, RegistryError};
use crate::{AppState, with_db};

const FIELDS_REQUIRED: &str = "Channel name and URL are required";

/// All channels owned by `owner_id`, in insertion order.
pub async fn list(state: &AppState, owner_id: &str) -> Result<Vec<Channel>, RegistryError> {
    let oid = owner_id.to_string();
    let rows = with_db(state, move |db| db.list_channels(&oid))
        .await
        .inspect_err(|e| error!("Failed to list channels for {}: {:#}", owner_id, e))?;

    rows.into_iter()
        .map(Channel::try_from)
        .collect::<anyhow::Result<Vec<_>>>()
        .map_err(RegistryError::Store)
}

/// Register a channel for `owner_id`. Name and URL are trimmed; both must be
/// non-empty. A URL the owner already has is refused.
pub async fn add(
    state: &AppState,
    owner_id: &str,
    name: &str,
    url: &str,
) -> Result<Channel, RegistryError> {
    let name = name.trim();
    let url = url.trim();
    if name.is_empty() || url.is_empty() {
        return Err(RegistryError::Validation(FIELDS_REQUIRED.into()));
    }

    let id = Uuid::new_v4().to_string();
    let (oid, n, u) = (owner_id.to_string(), name.to_string(), url.to_string());

    let outcome = with_db(state, move |db| {
        if db.find_channel_by_url(&oid, &u)?.is_some() {
            return Ok(ChannelInsert::DuplicateUrl);
        }
        // A concurrent add can slip past the check above; the UNIQUE
        // constraint catches it and reports DuplicateUrl the same way.
        db.insert_channel(&id, &oid, &n, &u)
    })
    .await
    .inspect_err(|e| error!("Failed to add channel for {}: {:#}", owner_id, e))?;

    match outcome {
        ChannelInsert::Created(row) => {
            let channel = Channel::try_from(row)?;
            info!(owner_id = %owner_id, channel_id = %channel.id, "Channel added");
            Ok(channel)
        }
        ChannelInsert::DuplicateUrl => {
            warn!(owner_id = %owner_id, url = %url, "Duplicate channel URL refused");
            Err(RegistryError::DuplicateUrl)
        }
    }
}

/// Delete one of `owner_id`'s channels. Succeeds whether or not anything was
/// removed; ids belonging to other owners are left alone.
pub async fn remove(state: &AppState, owner_id: &str, channel_id: Uuid) -> Result<(), RegistryError> {
    let (oid, cid) = (owner_id.to_string(), channel_id.to_string());
    let removed = with_db(state, move |db| db.delete_channel(&oid, &cid))
        .await
        .inspect_err(|e| error!("Failed to delete channel {}: {:#}", channel_id, e))?;

    if removed == 0 {
        info!(owner_id = %owner_id, channel_id = %channel_id, "Delete matched no owned channel");
    } else {
        info!(owner_id = %owner_id, channel_id = %channel_id, "Channel deleted");
    }
    Ok(())
}

// -- Handlers --

/// GET /channels
pub async fn list_channels(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ChannelListResponse>, ApiError> {
    let channels = list(&state, &claims.sub).await?;
    Ok(Json(ChannelListResponse { channels }))
}

/// POST /channels, responding with the new channel and the refreshed list.
pub async fn add_channel(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AddChannelRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let channel = add(&state, &claims.sub, &req.name, &req.url).await?;
    let channels = list(&state, &claims.sub).await?;

    Ok((
        StatusCode::CREATED,
        Json(AddChannelResponse {
            channel,
            channels,
            notice: Notice::success("Channel added successfully"),
        }),
    ))
}

/// DELETE /channels/{channel_id}, responding with the refreshed list.
pub async fn delete_channel(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<DeleteChannelResponse>, ApiError> {
    let channel_id: Uuid = channel_id
        .parse()
        .map_err(|_| RegistryError::Validation(format!("Invalid channel id '{}'", channel_id)))?;
    remove(&state, &claims.sub, channel_id).await?;
    let channels = list(&state, &claims.sub).await?;

    Ok(Json(DeleteChannelResponse {
        channels,
        notice: Notice::success("Channel deleted successfully"),
    }))
}
