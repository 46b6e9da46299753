use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use tracing::debug;

use muster_domain::{
    AttendanceRecord, ChangeBatch, Event, RemoteStore, StoreConfig, UpsertOutcome, Watermark,
};

/// Remote attendance service reached over JSON/HTTP.
///
/// `PUT records/{id}` answers `409 Conflict` with the prevailing record as its body
/// when another id already holds the same member and event.
pub struct HttpRemoteStore {
    client: Client,
    base_url: Url,
    api_token: Option<String>,
}

impl HttpRemoteStore {
    pub fn new(base_url: &str, api_token: Option<String>, timeout_seconds: u64) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|err| anyhow!("invalid remote url '{}': {}", base_url, err))?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow!("remote url '{}' cannot be a base", base_url));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds.max(1)))
            .build()?;
        Ok(Self {
            client,
            base_url,
            api_token,
        })
    }

    /// `None` when no remote is configured.
    pub fn from_config(config: &StoreConfig) -> Result<Option<Self>> {
        config
            .remote_base_url
            .as_deref()
            .map(|url| {
                Self::new(
                    url,
                    config.remote_api_token.clone(),
                    config.remote_timeout_seconds,
                )
            })
            .transpose()
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => builder.header(AUTHORIZATION, format!("Bearer {}", token)),
            None => builder,
        }
    }

    async fn get_optional<T: serde::de::DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<Option<T>> {
        let response = self.authorize(builder).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = checked(response).await?;
        Ok(response.json::<Option<T>>().await?)
    }
}

async fn checked(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(anyhow!("remote responded {}: {}", status, body.trim()))
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn get_event(&self, id: &str) -> Result<Option<Event>> {
        let url = self.endpoint(&["events", id]);
        self.get_optional(self.client.get(url)).await
    }

    async fn get_record(
        &self,
        member_id: &str,
        event_id: &str,
    ) -> Result<Option<AttendanceRecord>> {
        let url = self.endpoint(&["records"]);
        let builder = self
            .client
            .get(url)
            .query(&[("member_id", member_id), ("event_id", event_id)]);
        self.get_optional(builder).await
    }

    async fn upsert_record(&self, record: &AttendanceRecord) -> Result<UpsertOutcome> {
        let url = self.endpoint(&["records", &record.id]);
        let response = self
            .authorize(self.client.put(url).json(record))
            .send()
            .await?;
        if response.status() == StatusCode::CONFLICT {
            let holder = response.json::<AttendanceRecord>().await?;
            debug!(record_id = %record.id, holder_id = %holder.id, "record superseded");
            return Ok(UpsertOutcome::Superseded(holder));
        }
        checked(response).await?;
        debug!(record_id = %record.id, "record pushed");
        Ok(UpsertOutcome::Applied)
    }

    async fn list_changed_since(&self, watermark: Watermark) -> Result<ChangeBatch> {
        let url = self.endpoint(&["records", "changes"]);
        let builder = self.client.get(url).query(&[("since", watermark.0)]);
        let response = checked(self.authorize(builder).send().await?).await?;
        Ok(response.json::<ChangeBatch>().await?)
    }

    async fn ping(&self) -> Result<()> {
        let url = self.endpoint(&["health"]);
        checked(self.authorize(self.client.get(url)).send().await?).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use mockito::Matcher;
    use muster_domain::AttendanceStatus;

    use super::*;

    fn record() -> AttendanceRecord {
        let at = Utc.with_ymd_and_hms(2026, 5, 4, 9, 3, 0).unwrap();
        AttendanceRecord {
            id: "rec-1".to_string(),
            member_id: "m1".to_string(),
            event_id: "standup".to_string(),
            arrived_at: at,
            status: AttendanceStatus::Present,
            penalty: None,
            fix: None,
            synced: true,
            note: None,
            departed_at: None,
            departure_status: None,
            departure_penalty: None,
            updated_at: at,
        }
    }

    fn store(server: &mockito::Server) -> HttpRemoteStore {
        HttpRemoteStore::new(&format!("{}/api/", server.url()), Some("secret".to_string()), 5)
            .unwrap()
    }

    #[tokio::test]
    async fn missing_event_is_none() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/events/standup")
            .match_header("authorization", "Bearer secret")
            .with_status(404)
            .create_async()
            .await;

        assert!(store(&server).get_event("standup").await.unwrap().is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn record_lookup_sends_key_as_query() {
        let mut server = mockito::Server::new_async().await;
        let body = serde_json::to_string(&record()).unwrap();
        let mock = server
            .mock("GET", "/api/records")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("member_id".into(), "m1".into()),
                Matcher::UrlEncoded("event_id".into(), "standup".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let found = store(&server).get_record("m1", "standup").await.unwrap();
        assert_eq!(found, Some(record()));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn push_puts_record_by_id() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/api/records/rec-1")
            .match_header("authorization", "Bearer secret")
            .match_body(Matcher::PartialJsonString(
                r#"{"id":"rec-1","status":"PRESENT"}"#.to_string(),
            ))
            .with_status(204)
            .create_async()
            .await;

        assert_eq!(
            store(&server).upsert_record(&record()).await.unwrap(),
            UpsertOutcome::Applied
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn conflict_returns_prevailing_record() {
        let mut server = mockito::Server::new_async().await;
        let mut holder = record();
        holder.id = "rec-0".to_string();
        server
            .mock("PUT", "/api/records/rec-1")
            .with_status(409)
            .with_header("content-type", "application/json")
            .with_body(serde_json::to_string(&holder).unwrap())
            .create_async()
            .await;

        let outcome = store(&server).upsert_record(&record()).await.unwrap();
        assert_eq!(outcome, UpsertOutcome::Superseded(holder));
    }

    #[tokio::test]
    async fn server_error_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PUT", "/api/records/rec-1")
            .with_status(503)
            .with_body("maintenance")
            .create_async()
            .await;

        let err = store(&server).upsert_record(&record()).await.unwrap_err();
        assert!(err.to_string().contains("503"));
    }

    #[tokio::test]
    async fn change_feed_carries_watermark() {
        let mut server = mockito::Server::new_async().await;
        let batch = ChangeBatch {
            records: vec![record()],
            next_watermark: Watermark(17),
        };
        let mock = server
            .mock("GET", "/api/records/changes")
            .match_query(Matcher::UrlEncoded("since".into(), "9".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(serde_json::to_string(&batch).unwrap())
            .create_async()
            .await;

        let fetched = store(&server).list_changed_since(Watermark(9)).await.unwrap();
        assert_eq!(fetched, batch);
        mock.assert_async().await;
    }

    #[test]
    fn no_remote_configured() {
        let config = StoreConfig {
            database_path: "muster.db".to_string(),
            remote_base_url: None,
            remote_api_token: None,
            remote_timeout_seconds: 5,
        };
        assert!(HttpRemoteStore::from_config(&config).unwrap().is_none());
    }
}
