use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::Deserialize;

use crate::error::StoreError;
use crate::schemas::Collection;
use crate::store::GroupStore;

pub const DEFAULT_GROUPS_KEY: &str = "expense:groups";

/// Keeps the collection as one JSON string value in Upstash Redis, reached
/// through its REST API.
pub struct UpstashStore {
    client: Client,
    endpoint: Url,
    token: String,
    key: String,
}

#[derive(Deserialize)]
struct UpstashReply {
    result: Option<String>,
    error: Option<String>,
}

impl UpstashStore {
    pub fn new(url: &str, token: String, key: String) -> Result<Self, StoreError> {
        let endpoint = Url::parse(url)
            .ok()
            .filter(|endpoint| !endpoint.cannot_be_a_base())
            .ok_or_else(|| StoreError::InvalidEndpoint(url.to_string()))?;
        Ok(UpstashStore {
            client: Client::new(),
            endpoint,
            token,
            key,
        })
    }

    /// `{endpoint}/{command}/{key}`, with the key percent-encoded as one segment.
    fn command_url(&self, command: &str) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(command).push(&self.key);
        }
        url
    }

    async fn reply(response: Response) -> Result<Option<String>, StoreError> {
        let status = response.status();
        let text = response.text().await?;
        let reply: Option<UpstashReply> = serde_json::from_str(&text).ok();

        match reply {
            Some(UpstashReply {
                error: Some(message),
                ..
            }) => Err(StoreError::Upstream {
                status: status.as_u16(),
                message,
            }),
            Some(reply) if status.is_success() => Ok(reply.result),
            _ => Err(StoreError::Upstream {
                status: status.as_u16(),
                message: text,
            }),
        }
    }
}

#[async_trait]
impl GroupStore for UpstashStore {
    async fn load(&self) -> Result<Collection, StoreError> {
        let response = self
            .client
            .get(self.command_url("get"))
            .bearer_auth(&self.token)
            .send()
            .await?;

        match Self::reply(response).await? {
            Some(document) => serde_json::from_str(&document).map_err(StoreError::Corrupt),
            None => Ok(Collection::new()),
        }
    }

    async fn save(&self, groups: &Collection) -> Result<(), StoreError> {
        let document = serde_json::to_string(groups).map_err(StoreError::Encode)?;
        let response = self
            .client
            .post(self.command_url("set"))
            .bearer_auth(&self.token)
            .body(document)
            .send()
            .await?;

        Self::reply(response).await?;
        tracing::debug!(key = %self.key, groups = groups.len(), "saved collection");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schemas::Group;
    use httpmock::prelude::*;
    use serde_json::json;

    fn store(server: &MockServer) -> UpstashStore {
        UpstashStore::new(
            &server.base_url(),
            "secret".to_string(),
            DEFAULT_GROUPS_KEY.to_string(),
        )
        .unwrap()
    }

    fn trip() -> Collection {
        let mut groups = Collection::new();
        groups.insert(
            "group_1700000000000".to_string(),
            Group::new(
                "group_1700000000000".to_string(),
                serde_json::json!("Trip"),
                "2023-11-14T22:13:20.000Z".to_string(),
            ),
        );
        groups
    }

    #[tokio::test]
    async fn missing_key_loads_as_empty_collection() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/get/expense:groups")
                    .header("authorization", "Bearer secret");
                then.status(200).json_body(json!({ "result": null }));
            })
            .await;

        let groups = store(&server).load().await.unwrap();

        mock.assert_async().await;
        assert!(groups.is_empty());
    }

    #[tokio::test]
    async fn stored_document_is_decoded() {
        let server = MockServer::start_async().await;
        let document = serde_json::to_string(&trip()).unwrap();
        server
            .mock_async(|when, then| {
                when.method(GET).path("/get/expense:groups");
                then.status(200).json_body(json!({ "result": document }));
            })
            .await;

        let groups = store(&server).load().await.unwrap();
        assert_eq!(groups, trip());
    }

    #[tokio::test]
    async fn save_sets_the_whole_document() {
        let server = MockServer::start_async().await;
        let document = serde_json::to_string(&trip()).unwrap();
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/set/expense:groups")
                    .header("authorization", "Bearer secret")
                    .body(document);
                then.status(200).json_body(json!({ "result": "OK" }));
            })
            .await;

        store(&server).save(&trip()).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn upstream_errors_are_surfaced() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/get/expense:groups");
                then.status(401)
                    .json_body(json!({ "error": "Unauthorized" }));
            })
            .await;

        let err = store(&server).load().await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Upstream { status: 401, ref message } if message == "Unauthorized"
        ));
    }

    #[tokio::test]
    async fn non_json_failures_keep_the_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/set/expense:groups");
                then.status(502).body("bad gateway");
            })
            .await;

        let err = store(&server).save(&trip()).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Upstream { status: 502, ref message } if message == "bad gateway"
        ));
    }

    #[tokio::test]
    async fn malformed_document_is_corrupt() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/get/expense:groups");
                then.status(200).json_body(json!({ "result": "[1, 2, 3]" }));
            })
            .await;

        let err = store(&server).load().await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
    }

    #[tokio::test]
    async fn trailing_slash_in_url_is_ignored() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/get/expense:groups");
                then.status(200).json_body(json!({ "result": null }));
            })
            .await;

        let store = UpstashStore::new(
            &format!("{}/", server.base_url()),
            "secret".to_string(),
            DEFAULT_GROUPS_KEY.to_string(),
        )
        .unwrap();
        store.load().await.unwrap();
        mock.assert_async().await;
    }

    #[test]
    fn key_is_encoded_as_a_single_path_segment() {
        let store = UpstashStore::new(
            "https://example.upstash.io",
            "secret".to_string(),
            "groups/a?b#c".to_string(),
        )
        .unwrap();
        assert_eq!(
            store.command_url("get").as_str(),
            "https://example.upstash.io/get/groups%2Fa%3Fb%23c"
        );
        assert_eq!(
            store.command_url("set").as_str(),
            "https://example.upstash.io/set/groups%2Fa%3Fb%23c"
        );
    }

    #[test]
    fn endpoint_path_prefix_is_kept() {
        let store = UpstashStore::new(
            "https://example.upstash.io/proxy/",
            "secret".to_string(),
            DEFAULT_GROUPS_KEY.to_string(),
        )
        .unwrap();
        assert_eq!(
            store.command_url("get").as_str(),
            "https://example.upstash.io/proxy/get/expense:groups"
        );
    }

    #[test]
    fn unusable_endpoint_is_rejected() {
        for url in ["not a url", "mailto:ops@example.com"] {
            let err = UpstashStore::new(url, "secret".to_string(), "k".to_string());
            assert!(matches!(err, Err(StoreError::InvalidEndpoint(_))));
        }
    }
}
