//! Call control objects.

use std::collections::BTreeMap;

use serde::Serialize;

use super::CALL_UUID_HEADER;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum NccoAction {
    Connect {
        #[serde(rename = "eventType", skip_serializing_if = "Option::is_none")]
        event_type: Option<String>,
        endpoint: Vec<NccoEndpoint>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NccoEndpoint {
    Websocket {
        uri: String,
        /// Vonage only honours the hyphenated key
        #[serde(rename = "content-type")]
        content_type: String,
        #[serde(skip_serializing_if = "BTreeMap::is_empty")]
        headers: BTreeMap<String, String>,
    },
}

/// NCCO connecting the call to the media websocket.
pub fn answer_ncco(uri: &str, content_type: &str, call_uuid: Option<&str>) -> Vec<NccoAction> {
    let mut headers = BTreeMap::new();
    if let Some(uuid) = call_uuid {
        headers.insert(CALL_UUID_HEADER.to_string(), uuid.to_string());
    }

    vec![NccoAction::Connect {
        event_type: Some("synchronous".to_string()),
        endpoint: vec![NccoEndpoint::Websocket {
            uri: uri.to_string(),
            content_type: content_type.to_string(),
            headers,
        }],
    }]
}
