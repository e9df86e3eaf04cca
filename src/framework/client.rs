use super::types::ShardReply;
use crate::worker::types::{ShardCredential, ShardId};

use anyhow::Result;
use serde_json::{Map, Value};

/// HTTP client for shard endpoints.
///
/// Requests carry no timeout; barrier calls stay parked until the shard's condition holds.
#[derive(Clone, Default)]
pub struct ShardClient {
    http_client: reqwest::Client,
}

impl ShardClient {
    pub fn new() -> Self {
        Self {
            http_client: reqwest::Client::new(),
        }
    }

    /// POSTs `base_msg` plus the shard credential to `path` on the shard at `uri`.
    pub async fn post(
        &self,
        uri: &str,
        path: &str,
        credential: &ShardCredential,
        base_msg: Value,
    ) -> Result<ShardReply> {
        let url = format!("http://{}/{}", uri, path.trim_start_matches('/'));
        let payload = with_credential(base_msg, credential);

        tracing::debug!("POST {} as {}", url, credential);

        let response = self
            .http_client
            .post(url.clone())
            .json(&payload)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("POST {} failed: {}", url, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| anyhow::anyhow!("Reading reply from {} failed: {}", url, e))?;

        if !status.is_success() {
            tracing::warn!("{} answered {}: {}", url, status, body.trim_end());
        }

        Ok(ShardReply {
            shard_id: ShardId(credential.shard_id.clone()),
            status,
            body,
        })
    }
}

/// Merges the credential into a JSON object message.
///
/// A non-object message is wrapped under `"payload"`; `null` becomes an empty object.
pub fn with_credential(base_msg: Value, credential: &ShardCredential) -> Value {
    let mut msg = match base_msg {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("payload".to_string(), other);
            map
        }
    };

    msg.insert("prefix".to_string(), Value::String(credential.prefix.clone()));
    msg.insert(
        "shard_id".to_string(),
        Value::String(credential.shard_id.clone()),
    );

    Value::Object(msg)
}
