use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use common::{error::AppError, record::Record};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use super::{require_param, string_param, Connector};
use crate::pipeline::IngestionPipeline;

const GRAPH_BASE: &str = "https://graph.microsoft.com/v1.0";

/// Outlook mail via the Microsoft Graph API. Every message becomes a record,
/// and every file attachment becomes a further, distinct record. A failed
/// attachment download never aborts its siblings.
pub struct OutlookConnector {
    http: reqwest::Client,
    user_id: Option<String>,
    access_token: Option<String>,
    page_size: usize,
}

impl OutlookConnector {
    pub fn from_params(params: &Map<String, Value>, http: reqwest::Client, page_size: usize) -> Self {
        Self {
            http,
            user_id: string_param(params, "user_id"),
            access_token: string_param(params, "access_token")
                .or_else(|| std::env::var("OUTLOOK_ACCESS_TOKEN").ok()),
            page_size,
        }
    }

    fn token(&self) -> &str {
        self.access_token.as_deref().unwrap_or_default()
    }

    async fn message_page(&self, skip: usize) -> Result<MessagePage, AppError> {
        let user_id = self.user_id.as_deref().unwrap_or_default();
        let page = self
            .http
            .get(format!("{GRAPH_BASE}/users/{user_id}/messages"))
            .query(&[("$top", self.page_size.to_string()), ("$skip", skip.to_string())])
            .bearer_auth(self.token())
            .send()
            .await?
            .error_for_status()
            .map_err(|e| AppError::Processing(format!("graph message request failed: {e}")))?
            .json()
            .await?;
        Ok(page)
    }

    async fn fetch_attachments(&self, message_id: &str) -> Result<Vec<Attachment>, AppError> {
        let user_id = self.user_id.as_deref().unwrap_or_default();
        let page: AttachmentPage = self
            .http
            .get(format!(
                "{GRAPH_BASE}/users/{user_id}/messages/{message_id}/attachments"
            ))
            .bearer_auth(self.token())
            .send()
            .await?
            .error_for_status()
            .map_err(|e| AppError::Processing(format!("graph attachment request failed: {e}")))?
            .json()
            .await?;
        Ok(page.value)
    }

    fn message_record(message: &Message) -> Record {
        let subject = message.subject.clone().unwrap_or_default();
        let body = message
            .body
            .as_ref()
            .map(|b| b.content.clone())
            .unwrap_or_default();

        Record::from_text(format!("message-{}.txt", message.id), format!("{subject}\n\n{body}"))
            .with_field("message_id", json!(message.id))
            .with_field("subject", json!(subject))
            .with_field(
                "received_at",
                message
                    .received_date_time
                    .clone()
                    .map_or(Value::Null, Value::String),
            )
    }

    fn attachment_record(message_id: &str, attachment: &Attachment) -> Option<Record> {
        let content = attachment.content_bytes.as_deref()?;
        let bytes = match BASE64.decode(content) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(
                    attachment = %attachment.name,
                    error = %e,
                    "skipping attachment with undecodable content"
                );
                return None;
            }
        };
        Some(
            Record::from_bytes(attachment.name.clone(), bytes)
                .with_field("message_id", json!(message_id))
                .with_field("attachment_id", json!(attachment.id)),
        )
    }
}

#[derive(Debug, Deserialize)]
struct MessagePage {
    #[serde(default)]
    value: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    id: String,
    subject: Option<String>,
    body: Option<MessageBody>,
    #[serde(rename = "receivedDateTime")]
    received_date_time: Option<String>,
    #[serde(rename = "hasAttachments", default)]
    has_attachments: bool,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct AttachmentPage {
    #[serde(default)]
    value: Vec<Attachment>,
}

#[derive(Debug, Deserialize)]
struct Attachment {
    id: String,
    name: String,
    #[serde(rename = "contentBytes")]
    content_bytes: Option<String>,
}

#[async_trait]
impl Connector for OutlookConnector {
    fn name(&self) -> &'static str {
        "outlook"
    }

    fn validate_config(&self) -> Result<(), AppError> {
        require_param(&self.user_id, "outlook", "user_id")?;
        require_param(&self.access_token, "outlook", "access_token")?;
        Ok(())
    }

    async fn fetch_data(&self, pipeline: &IngestionPipeline) -> Result<(), AppError> {
        let mut skip = 0usize;
        let mut messages = 0usize;
        let mut attachments = 0usize;

        loop {
            let page = self.message_page(skip).await?;
            if page.value.is_empty() {
                break;
            }
            let page_len = page.value.len();

            for message in page.value {
                pipeline.process_record(Self::message_record(&message)).await;
                messages += 1;

                if !message.has_attachments {
                    continue;
                }
                match self.fetch_attachments(&message.id).await {
                    Ok(items) => {
                        for attachment in items {
                            if let Some(record) = Self::attachment_record(&message.id, &attachment)
                            {
                                pipeline.process_record(record).await;
                                attachments += 1;
                            }
                        }
                    }
                    Err(e) => {
                        warn!(
                            message_id = %message.id,
                            error = %e,
                            "skipping attachments for message"
                        );
                    }
                }
            }

            skip += page_len;
            if page_len < self.page_size {
                break;
            }
        }

        info!(messages, attachments, "outlook enumeration finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_becomes_a_text_record() {
        let message: Message = serde_json::from_value(json!({
            "id": "m1",
            "subject": "Quarterly report",
            "body": { "content": "Numbers attached." },
            "receivedDateTime": "2025-02-01T10:00:00Z",
            "hasAttachments": true
        }))
        .expect("message parses");

        let record = OutlookConnector::message_record(&message);
        assert_eq!(record.file_name.as_deref(), Some("message-m1.txt"));
        assert_eq!(
            record.text.as_deref(),
            Some("Quarterly report\n\nNumbers attached.")
        );
        assert_eq!(record.lookup_path("message_id"), Some(json!("m1")));
    }

    #[test]
    fn attachment_becomes_a_distinct_binary_record() {
        let attachment: Attachment = serde_json::from_value(json!({
            "id": "a1",
            "name": "report.pdf",
            "contentBytes": BASE64.encode(b"%PDF-1.7")
        }))
        .expect("attachment parses");

        let record =
            OutlookConnector::attachment_record("m1", &attachment).expect("record built");
        assert_eq!(record.file_name.as_deref(), Some("report.pdf"));
        assert_eq!(record.file_bytes.as_deref(), Some(b"%PDF-1.7".as_slice()));
        assert_eq!(record.lookup_path("message_id"), Some(json!("m1")));
    }

    #[test]
    fn undecodable_attachment_is_skipped() {
        let attachment = Attachment {
            id: "a2".into(),
            name: "broken.bin".into(),
            content_bytes: Some("not-base64!!!".into()),
        };
        assert!(OutlookConnector::attachment_record("m1", &attachment).is_none());
    }
}
