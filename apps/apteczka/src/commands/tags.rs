//! Tag management commands.

use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use apteczka_core::validation::validate_tag_name;
use apteczka_core::{Tag, LIVE_SEARCH_LIMIT};

/// All tags, ordered by name.
pub async fn list_tags(state: &AppState) -> ApiResult<Vec<Tag>> {
    Ok(state.db().tags().list_all().await?)
}

/// Live tag search for the tag picker.
pub async fn search_tags(state: &AppState, query: &str, limit: Option<u32>) -> ApiResult<Vec<Tag>> {
    let limit = limit.unwrap_or(LIVE_SEARCH_LIMIT);
    debug!(query = %query, limit, "search_tags command");
    Ok(state.db().tags().search(query, limit).await?)
}

/// Returns the tag with this name, creating it when new.
///
/// Names differing only in case or surrounding spaces resolve to the
/// existing tag, which keeps its original spelling.
pub async fn add_tag(state: &AppState, name: &str) -> ApiResult<Tag> {
    let name = validate_tag_name(name)?;
    let tags = state.db().tags();

    let uuid = tags.add_tag(&name).await?;
    tags.get_by_id(&uuid)
        .await?
        .ok_or_else(|| ApiError::internal(format!("Tag {} vanished after insert", uuid)))
}

pub async fn rename_tag(state: &AppState, uuid: &str, name: &str) -> ApiResult<()> {
    let name = validate_tag_name(name)?;
    Ok(state.db().tags().rename(uuid, &name).await?)
}

/// Deletes the tag and detaches it from every product and package.
pub async fn delete_tag(state: &AppState, uuid: &str) -> ApiResult<()> {
    Ok(state.db().tags().delete(uuid).await?)
}
