use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_config::timeout::TimeoutConfig;
use aws_sdk_textract::error::DisplayErrorContext;
use aws_sdk_textract::types as sdk;
use tracing::debug;

use crate::schema::{AnalyzeDocumentOutput, Block, BlockType, EntityType, Relationship, RelationshipType};

/// Where the uploaded image lives in object storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentLocation {
    pub bucket: String,
    pub name: String,
}

/// Forms-analysis OCR service.
#[async_trait]
pub trait DocumentAnalyzer: Send + Sync {
    async fn analyze(&self, location: &DocumentLocation) -> Result<AnalyzeDocumentOutput>;
}

/// `AnalyzeDocument` with the `FORMS` feature through the AWS SDK.
#[derive(Clone)]
pub struct TextractClient {
    client: aws_sdk_textract::Client,
}

impl TextractClient {
    pub fn new(client: aws_sdk_textract::Client) -> Self {
        Self { client }
    }

    /// Client for the region and credentials in `sdk_config`. `endpoint`
    /// overrides the regional endpoint (local emulators).
    pub fn from_sdk_config(sdk_config: &SdkConfig, endpoint: Option<&str>, timeout: Duration) -> Self {
        let mut builder = aws_sdk_textract::config::Builder::from(sdk_config)
            .timeout_config(TimeoutConfig::builder().operation_timeout(timeout).build());

        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        Self::new(aws_sdk_textract::Client::from_conf(builder.build()))
    }
}

#[async_trait]
impl DocumentAnalyzer for TextractClient {
    async fn analyze(&self, location: &DocumentLocation) -> Result<AnalyzeDocumentOutput> {
        let document = sdk::Document::builder()
            .s3_object(
                sdk::S3Object::builder()
                    .bucket(&location.bucket)
                    .name(&location.name)
                    .build(),
            )
            .build();

        let response = self
            .client
            .analyze_document()
            .document(document)
            .feature_types(sdk::FeatureType::Forms)
            .send()
            .await
            .map_err(|e| anyhow!("AnalyzeDocument failed: {}", DisplayErrorContext(&e)))?;

        let output = AnalyzeDocumentOutput {
            blocks: response
                .blocks
                .map(|blocks| blocks.into_iter().map(convert_block).collect()),
        };

        debug!(
            document = %location.name,
            blocks = output.blocks.as_ref().map_or(0, Vec::len),
            "OCR analysis complete"
        );

        Ok(output)
    }
}

/// SDK block → the crate's block model. Kinds the extractor never looks at
/// collapse into `Other`.
fn convert_block(block: sdk::Block) -> Block {
    Block {
        id: block.id,
        block_type: block.block_type.map(|kind| match kind {
            sdk::BlockType::KeyValueSet => BlockType::KeyValueSet,
            sdk::BlockType::Page => BlockType::Page,
            sdk::BlockType::Line => BlockType::Line,
            sdk::BlockType::Word => BlockType::Word,
            sdk::BlockType::SelectionElement => BlockType::SelectionElement,
            _ => BlockType::Other,
        }),
        entity_types: block
            .entity_types
            .unwrap_or_default()
            .into_iter()
            .map(|kind| match kind {
                sdk::EntityType::Key => EntityType::Key,
                sdk::EntityType::Value => EntityType::Value,
                _ => EntityType::Other,
            })
            .collect(),
        text: block.text,
        confidence: block.confidence,
        relationships: block.relationships.map(|relationships| {
            relationships
                .into_iter()
                .map(|rel| Relationship {
                    relationship_type: match rel.r#type {
                        Some(sdk::RelationshipType::Child) => RelationshipType::Child,
                        Some(sdk::RelationshipType::Value) => RelationshipType::Value,
                        _ => RelationshipType::Other,
                    },
                    ids: rel.ids.unwrap_or_default(),
                })
                .collect()
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_textract::config::{Credentials, Region};
    use axum::{
        Router,
        http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
        routing::post,
    };
    use serde_json::{Value, json};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn client_for(endpoint: &str) -> TextractClient {
        let config = aws_sdk_textract::Config::builder()
            .behavior_version_latest()
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new("AKIDEXAMPLE", "secret", None, None, "test"))
            .endpoint_url(endpoint)
            .build();
        TextractClient::new(aws_sdk_textract::Client::from_conf(config))
    }

    fn location() -> DocumentLocation {
        DocumentLocation {
            bucket: "passports".to_string(),
            name: "passport_1700000000000.jpg".to_string(),
        }
    }

    #[tokio::test]
    async fn test_analyze_sends_signed_forms_request() {
        let app = Router::new().route(
            "/",
            post(|headers: HeaderMap, body: String| async move {
                assert_eq!(headers["x-amz-target"], "Textract.AnalyzeDocument");
                let auth = headers["authorization"].to_str().unwrap();
                assert!(auth.starts_with("AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/"), "{auth}");
                assert!(auth.contains("/us-east-1/textract/"), "{auth}");

                let request: Value = serde_json::from_str(&body).unwrap();
                assert_eq!(
                    request,
                    json!({
                        "Document": {"S3Object": {"Bucket": "passports", "Name": "passport_1700000000000.jpg"}},
                        "FeatureTypes": ["FORMS"]
                    })
                );
                (
                    [(CONTENT_TYPE, "application/x-amz-json-1.1")],
                    json!({
                        "DocumentMetadata": {"Pages": 1},
                        "Blocks": [
                            {"BlockType": "WORD", "Id": "w1", "Text": "12", "Confidence": 99.5},
                            {
                                "BlockType": "KEY_VALUE_SET",
                                "Id": "k1",
                                "EntityTypes": ["KEY"],
                                "Relationships": [
                                    {"Type": "VALUE", "Ids": ["v1"]},
                                    {"Type": "CHILD", "Ids": ["w1"]}
                                ]
                            },
                            {"BlockType": "TABLE", "Id": "t1"}
                        ]
                    })
                    .to_string(),
                )
            }),
        );
        let endpoint = serve(app).await;

        let output = client_for(&endpoint).analyze(&location()).await.unwrap();

        let blocks = output.blocks.unwrap();
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].text.as_deref(), Some("12"));
        assert_eq!(blocks[0].confidence, Some(99.5));
        assert!(blocks[1].is_key());
        assert_eq!(blocks[1].relationship_ids(RelationshipType::Value).collect::<Vec<_>>(), ["v1"]);
        assert_eq!(blocks[1].relationship_ids(RelationshipType::Child).collect::<Vec<_>>(), ["w1"]);
        assert_eq!(blocks[2].block_type, Some(BlockType::Other));
    }

    #[tokio::test]
    async fn test_analyze_reports_service_error() {
        let app = Router::new().route(
            "/",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    [(CONTENT_TYPE, "application/x-amz-json-1.1")],
                    r#"{"__type":"InvalidS3ObjectException","Message":"Unable to get object metadata from S3."}"#,
                )
            }),
        );
        let endpoint = serve(app).await;

        let err = client_for(&endpoint).analyze(&location()).await.unwrap_err();

        assert!(err.to_string().contains("InvalidS3ObjectException"), "{err}");
    }

    #[test]
    fn test_convert_block_without_optional_parts() {
        let block = convert_block(
            sdk::Block::builder()
                .id("v1")
                .block_type(sdk::BlockType::KeyValueSet)
                .entity_types(sdk::EntityType::Value)
                .build(),
        );

        assert_eq!(block.id.as_deref(), Some("v1"));
        assert_eq!(block.entity_types, vec![EntityType::Value]);
        assert!(!block.is_key());
        assert_eq!(block.relationships, None);
        assert_eq!(block.text, None);
    }
}
