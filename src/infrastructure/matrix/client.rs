//! Reqwest-based implementation of the [`ChatClient`] port.

use std::fmt::Write as _;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::sync::OnceCell;
use tracing::debug;
use uuid::Uuid;

use crate::domain::models::{EventPage, Notice, SyncUpdate};
use crate::domain::ports::{ChatClient, ClientError, ClientResult, SyncSelector};

use super::types::{
    ApiErrorBody, CreateRoomResponse, JoinedRoomsResponse, MessagesResponse, SendResponse,
    SyncResponse, WhoamiResponse,
};

const CLIENT_API: &str = "/_matrix/client/v3";

/// Homeserver client speaking the Matrix client-server API.
pub struct MatrixClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
    user_id: OnceCell<String>,
}

impl MatrixClient {
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|err| ClientError::Http(err.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
            user_id: OnceCell::new(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{CLIENT_API}{path}", self.base_url)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.bearer_auth(&self.access_token)
    }

    async fn execute<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ClientResult<T> {
        let response = self
            .authorized(builder)
            .send()
            .await
            .map_err(|err| ClientError::Http(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|err| ClientError::Malformed(err.to_string()));
        }

        let body: ApiErrorBody = response.json().await.unwrap_or_default();
        let errcode = body.errcode.unwrap_or_else(|| "M_UNKNOWN".to_string());
        let message = body.error.unwrap_or_default();

        Err(match status {
            StatusCode::TOO_MANY_REQUESTS => ClientError::RateLimited {
                retry_after_ms: body.retry_after_ms.unwrap_or(5_000),
            },
            StatusCode::NOT_FOUND if errcode == "M_NOT_FOUND" => ClientError::NotFound(message),
            _ => ClientError::Api {
                status: status.as_u16(),
                errcode,
                message,
            },
        })
    }

    async fn user_id(&self) -> ClientResult<&str> {
        self.user_id
            .get_or_try_init(|| self.whoami())
            .await
            .map(String::as_str)
    }

    fn txn_id() -> String {
        Uuid::new_v4().to_string()
    }
}

/// Percent-encode a path segment (room ids, event ids and user ids carry
/// `!`, `$`, `@` and `:`, and server names may carry ports).
fn encode(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char);
            }
            _ => {
                let _ = write!(out, "%{byte:02X}");
            }
        }
    }
    out
}

fn sync_filter(selector: &SyncSelector) -> serde_json::Value {
    json!({
        "room": {
            "not_rooms": selector.exclude_rooms,
            "timeline": {
                "not_types": selector.exclude_types,
                "limit": selector.timeline_limit,
            }
        }
    })
}

#[async_trait]
impl ChatClient for MatrixClient {
    async fn whoami(&self) -> ClientResult<String> {
        let response: WhoamiResponse = self
            .execute(self.http.get(self.url("/account/whoami")))
            .await?;
        Ok(response.user_id)
    }

    async fn joined_rooms(&self) -> ClientResult<Vec<String>> {
        let response: JoinedRoomsResponse = self
            .execute(self.http.get(self.url("/joined_rooms")))
            .await?;
        Ok(response.joined_rooms)
    }

    async fn next_update(
        &self,
        since: Option<&str>,
        selector: &SyncSelector,
        timeout_ms: u64,
    ) -> ClientResult<SyncUpdate> {
        let filter = sync_filter(selector).to_string();
        let mut request = self
            .http
            .get(self.url("/sync"))
            .query(&[("timeout", timeout_ms.to_string()), ("filter", filter)])
            // leave headroom beyond the server-side long-poll window
            .timeout(Duration::from_millis(timeout_ms + 30_000));
        if let Some(since) = since {
            request = request.query(&[("since", since)]);
        }

        let response: SyncResponse = self.execute(request).await?;
        debug!(next_batch = %response.next_batch, "sync cycle received");
        Ok(response.into_update())
    }

    async fn room_messages(
        &self,
        room_id: &str,
        from: &str,
        limit: u32,
        exclude_types: &[String],
    ) -> ClientResult<EventPage> {
        let filter = json!({ "not_types": exclude_types }).to_string();
        let request = self
            .http
            .get(self.url(&format!("/rooms/{}/messages", encode(room_id))))
            .query(&[
                ("from", from.to_string()),
                ("dir", "b".to_string()),
                ("limit", limit.to_string()),
                ("filter", filter),
            ]);

        let response: MessagesResponse = self.execute(request).await?;
        Ok(EventPage {
            events: response.chunk,
            next_token: response.end,
        })
    }

    async fn redact_event(
        &self,
        room_id: &str,
        event_id: &str,
        reason: &str,
    ) -> ClientResult<String> {
        let request = self
            .http
            .put(self.url(&format!(
                "/rooms/{}/redact/{}/{}",
                encode(room_id),
                encode(event_id),
                Self::txn_id()
            )))
            .json(&json!({ "reason": reason }));

        let response: SendResponse = self.execute(request).await?;
        Ok(response.event_id)
    }

    async fn send_notice(&self, room_id: &str, notice: &Notice) -> ClientResult<String> {
        let mut content = json!({
            "msgtype": "m.notice",
            "body": notice.body,
        });
        if let Some(formatted) = &notice.formatted_body {
            content["format"] = json!("org.matrix.custom.html");
            content["formatted_body"] = json!(formatted);
        }

        let request = self
            .http
            .put(self.url(&format!(
                "/rooms/{}/send/m.room.message/{}",
                encode(room_id),
                Self::txn_id()
            )))
            .json(&content);

        let response: SendResponse = self.execute(request).await?;
        Ok(response.event_id)
    }

    async fn get_account_data(&self, kind: &str) -> ClientResult<Option<serde_json::Value>> {
        let user_id = self.user_id().await?.to_owned();
        let request = self.http.get(self.url(&format!(
            "/user/{}/account_data/{}",
            encode(&user_id),
            encode(kind)
        )));

        match self.execute(request).await {
            Ok(value) => Ok(Some(value)),
            Err(ClientError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn set_account_data(&self, kind: &str, value: &serde_json::Value) -> ClientResult<()> {
        let user_id = self.user_id().await?.to_owned();
        let request = self
            .http
            .put(self.url(&format!(
                "/user/{}/account_data/{}",
                encode(&user_id),
                encode(kind)
            )))
            .json(value);

        let _: serde_json::Value = self.execute(request).await?;
        Ok(())
    }

    async fn create_private_room(&self, name: &str, invite: &[String]) -> ClientResult<String> {
        let request = self.http.post(self.url("/createRoom")).json(&json!({
            "name": name,
            "invite": invite,
            "visibility": "private",
            "preset": "private_chat",
        }));

        let response: CreateRoomResponse = self.execute(request).await?;
        Ok(response.room_id)
    }

    async fn room_name(&self, room_id: &str) -> ClientResult<Option<String>> {
        let request = self.http.get(self.url(&format!(
            "/rooms/{}/state/m.room.name/",
            encode(room_id)
        )));

        match self.execute::<serde_json::Value>(request).await {
            Ok(content) => Ok(content
                .get("name")
                .and_then(|v| v.as_str())
                .map(ToOwned::to_owned)),
            Err(ClientError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn member_display_name(
        &self,
        room_id: &str,
        user_id: &str,
    ) -> ClientResult<Option<String>> {
        let request = self.http.get(self.url(&format!(
            "/rooms/{}/state/m.room.member/{}",
            encode(room_id),
            encode(user_id)
        )));

        match self.execute::<serde_json::Value>(request).await {
            Ok(content) => {
                if let Some(name) = content.get("displayname").and_then(|v| v.as_str()) {
                    return Ok(Some(name.to_owned()));
                }
            }
            Err(ClientError::NotFound(_)) => {}
            Err(err) => return Err(err),
        }

        // fall back to the global profile
        let request = self
            .http
            .get(self.url(&format!("/profile/{}", encode(user_id))));
        match self.execute::<serde_json::Value>(request).await {
            Ok(profile) => Ok(profile
                .get("displayname")
                .and_then(|v| v.as_str())
                .map(ToOwned::to_owned)),
            Err(ClientError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }
}
