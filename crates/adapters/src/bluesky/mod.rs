//! Bluesky (AT Protocol) destination adapter over XRPC

use async_trait::async_trait;
use courtside_domain::{
    BlobRef, Credentials, Destination, DestinationError, Embed, LinkFacet, PostRecord, RecordRef,
    Session, SessionGrant,
};
use reqwest::{Client, Response, StatusCode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;

pub const DEFAULT_SERVICE_URL: &str = "https://bsky.social";

const POST_COLLECTION: &str = "app.bsky.feed.post";

/// XRPC client for a Bluesky PDS
pub struct BlueskyClient {
    client: Client,
    service_url: String,
}

impl BlueskyClient {
    pub fn new(client: Client, service_url: impl Into<String>) -> Self {
        Self {
            client,
            service_url: service_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn xrpc_url(&self, method: &str) -> String {
        format!("{}/xrpc/{}", self.service_url, method)
    }
}

#[derive(Serialize)]
struct CreateSessionRequest<'a> {
    identifier: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionResponse {
    access_jwt: String,
    did: String,
}

#[derive(Deserialize)]
struct UploadBlobResponse {
    blob: serde_json::Value,
}

#[derive(Serialize)]
struct CreateRecordRequest<'a> {
    repo: &'a str,
    collection: &'static str,
    record: FeedPost<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FeedPost<'a> {
    #[serde(rename = "$type")]
    kind: &'static str,
    text: &'a str,
    created_at: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    facets: Vec<Facet<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    embed: Option<EmbedJson<'a>>,
}

#[derive(Serialize)]
struct Facet<'a> {
    index: ByteSlice,
    features: [LinkFeature<'a>; 1],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ByteSlice {
    byte_start: usize,
    byte_end: usize,
}

#[derive(Serialize)]
struct LinkFeature<'a> {
    #[serde(rename = "$type")]
    kind: &'static str,
    uri: &'a str,
}

#[derive(Serialize)]
#[serde(tag = "$type")]
enum EmbedJson<'a> {
    #[serde(rename = "app.bsky.embed.images")]
    Images { images: Vec<ImageJson<'a>> },
    #[serde(rename = "app.bsky.embed.external")]
    External { external: ExternalJson<'a> },
}

#[derive(Serialize)]
struct ImageJson<'a> {
    image: &'a BlobRef,
    alt: &'a str,
}

#[derive(Serialize)]
struct ExternalJson<'a> {
    uri: &'a str,
    title: &'a str,
    description: &'a str,
}

#[derive(Deserialize)]
struct CreateRecordResponse {
    uri: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct XrpcError {
    error: Option<String>,
    message: Option<String>,
}

fn facet_json(facet: &LinkFacet) -> Facet<'_> {
    Facet {
        index: ByteSlice {
            byte_start: facet.byte_start,
            byte_end: facet.byte_end,
        },
        features: [LinkFeature {
            kind: "app.bsky.richtext.facet#link",
            uri: &facet.uri,
        }],
    }
}

fn embed_json(embed: &Embed) -> EmbedJson<'_> {
    match embed {
        Embed::Images(images) => EmbedJson::Images {
            images: images
                .iter()
                .map(|m| ImageJson {
                    image: &m.blob,
                    alt: &m.alt_text,
                })
                .collect(),
        },
        Embed::External {
            uri,
            title,
            description,
        } => EmbedJson::External {
            external: ExternalJson {
                uri,
                title,
                description,
            },
        },
    }
}

/// Map a non-success XRPC response to a typed error.
/// 401 and expired/invalid token errors are auth failures; 5xx is a server error.
async fn error_from_response(response: Response) -> DestinationError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let xrpc: XrpcError = serde_json::from_str(&body).unwrap_or_default();

    let name = xrpc.error.unwrap_or_default();
    let message = match xrpc.message {
        Some(message) if !name.is_empty() => format!("{}: {}", name, message),
        Some(message) => message,
        None if !name.is_empty() => name.clone(),
        None => body,
    };

    if status == StatusCode::UNAUTHORIZED || name == "ExpiredToken" || name == "InvalidToken" {
        return DestinationError::Auth(message);
    }
    if status.is_server_error() {
        return DestinationError::Server {
            status: status.as_u16(),
            message,
        };
    }
    DestinationError::Rejected {
        status: status.as_u16(),
        message,
    }
}

fn network_error(e: reqwest::Error) -> DestinationError {
    DestinationError::Network(e.to_string())
}

#[async_trait]
impl Destination for BlueskyClient {
    async fn create_session(
        &self,
        credentials: &Credentials,
    ) -> Result<SessionGrant, DestinationError> {
        let request = CreateSessionRequest {
            identifier: &credentials.identifier,
            password: credentials.password.expose_secret(),
        };

        let response = self
            .client
            .post(self.xrpc_url("com.atproto.server.createSession"))
            .json(&request)
            .send()
            .await
            .map_err(network_error)?;

        if !response.status().is_success() {
            let error = error_from_response(response).await;
            tracing::warn!(error = %error, "createSession failed");
            return Err(error);
        }

        let session: CreateSessionResponse = response
            .json()
            .await
            .map_err(|e| DestinationError::Malformed(e.to_string()))?;

        Ok(SessionGrant {
            access_jwt: session.access_jwt,
            did: session.did,
        })
    }

    async fn upload_blob(
        &self,
        session: &Session,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<BlobRef, DestinationError> {
        let size = bytes.len();
        let response = self
            .client
            .post(self.xrpc_url("com.atproto.repo.uploadBlob"))
            .bearer_auth(&session.access_jwt)
            .header("Content-Type", content_type)
            .body(bytes)
            .send()
            .await
            .map_err(network_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let uploaded: UploadBlobResponse = response
            .json()
            .await
            .map_err(|e| DestinationError::Malformed(e.to_string()))?;

        if uploaded.blob.is_null() {
            return Err(DestinationError::Malformed(
                "uploadBlob returned no blob".to_string(),
            ));
        }

        tracing::debug!(bytes = size, content_type = %content_type, "Uploaded blob");
        Ok(BlobRef(uploaded.blob))
    }

    async fn create_record(
        &self,
        session: &Session,
        record: &PostRecord,
    ) -> Result<RecordRef, DestinationError> {
        let created_at = record
            .created_at
            .format(&Rfc3339)
            .map_err(|e| DestinationError::Malformed(e.to_string()))?;

        let request = CreateRecordRequest {
            repo: &session.did,
            collection: POST_COLLECTION,
            record: FeedPost {
                kind: POST_COLLECTION,
                text: &record.text,
                created_at,
                facets: record.facets.iter().map(facet_json).collect(),
                embed: record.embed.as_ref().map(embed_json),
            },
        };

        let response = self
            .client
            .post(self.xrpc_url("com.atproto.repo.createRecord"))
            .bearer_auth(&session.access_jwt)
            .json(&request)
            .send()
            .await
            .map_err(network_error)?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let created: CreateRecordResponse = response
            .json()
            .await
            .map_err(|e| DestinationError::Malformed(e.to_string()))?;

        Ok(RecordRef { uri: created.uri })
    }
}
