use crate::config::{GET_TIERLIST_ENDPOINT, LOGOUT_ENDPOINT, SAVE_TIERLIST_ENDPOINT};
use crate::data::DataError;
use gloo_net::http::{Request, Response};
use log::info;
use serde::{Deserialize, Serialize};

/// Blob written by a reset; the server refuses empty bodies.
pub const EMPTY_TIER_LIST: &str = "{}";

#[derive(Debug, Serialize, Deserialize)]
struct TierListPayload {
    #[serde(default)]
    tierlist: Option<String>,
}

/// The server keeps one opaque blob per logged-in user.
pub async fn pull_tier_list() -> Result<Option<String>, DataError> {
    let response = Request::get(GET_TIERLIST_ENDPOINT)
        .send()
        .await
        .map_err(DataError::network)?;
    ensure_ok(&response, GET_TIERLIST_ENDPOINT)?;

    let text = response.text().await.map_err(DataError::network)?;
    parse_pull_response(&text)
}

pub async fn push_tier_list(raw: &str) -> Result<(), DataError> {
    let payload = TierListPayload {
        tierlist: Some(raw.to_owned()),
    };
    let response = Request::post(SAVE_TIERLIST_ENDPOINT)
        .json(&payload)
        .map_err(DataError::parse)?
        .send()
        .await
        .map_err(DataError::network)?;
    ensure_ok(&response, SAVE_TIERLIST_ENDPOINT)?;

    info!("Pushed tier list ({} bytes)", raw.len());
    Ok(())
}

pub async fn clear_remote() -> Result<(), DataError> {
    push_tier_list(EMPTY_TIER_LIST).await
}

pub async fn logout() -> Result<(), DataError> {
    let response = Request::get(LOGOUT_ENDPOINT)
        .send()
        .await
        .map_err(DataError::network)?;
    ensure_ok(&response, LOGOUT_ENDPOINT)
}

fn ensure_ok(response: &Response, endpoint: &str) -> Result<(), DataError> {
    if response.ok() {
        Ok(())
    } else {
        Err(DataError::Network(format!(
            "HTTP {} from {}",
            response.status(),
            endpoint
        )))
    }
}

fn parse_pull_response(text: &str) -> Result<Option<String>, DataError> {
    let payload: TierListPayload = serde_json::from_str(text).map_err(DataError::parse)?;
    Ok(payload.tierlist.filter(|blob| !blob.trim().is_empty()))
}
