use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::paginate::Page;

const MESSAGE_DATE_KEYS: &[&str] = &[
    "receivedDateTime",
    "sentDateTime",
    "createdDateTime",
    "lastModifiedDateTime",
];
const ATTACHMENT_DATE_KEYS: &[&str] = &["lastModifiedDateTime"];

/// Graph collection response: `{"value": [...], "@odata.nextLink": "..."}`.
#[derive(Debug, Deserialize)]
pub struct GraphPage<T> {
    pub value: Vec<T>,
    #[serde(rename = "@odata.nextLink", default)]
    pub next_link: Option<String>,
}

impl<T> From<GraphPage<T>> for Page<T> {
    fn from(page: GraphPage<T>) -> Self {
        Page::new(page.value, page.next_link.filter(|link| !link.is_empty()))
    }
}

/// A message exactly as Graph returned it, apart from normalized timestamps.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct MailMessage {
    pub fields: Map<String, Value>,
}

impl MailMessage {
    pub fn id(&self) -> Option<&str> {
        self.fields.get("id").and_then(Value::as_str)
    }
}

impl From<Map<String, Value>> for MailMessage {
    fn from(mut fields: Map<String, Value>) -> Self {
        normalize_dates(&mut fields, MESSAGE_DATE_KEYS);
        Self { fields }
    }
}

impl Serialize for MailMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

/// Attachment metadata. `contentBytes`, when Graph embeds it, is kept as is.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "Map<String, Value>")]
pub struct Attachment {
    pub fields: Map<String, Value>,
}

impl From<Map<String, Value>> for Attachment {
    fn from(mut fields: Map<String, Value>) -> Self {
        normalize_dates(&mut fields, ATTACHMENT_DATE_KEYS);
        Self { fields }
    }
}

impl Serialize for Attachment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

/// One line of the results file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OutputRecord {
    pub message: MailMessage,
    pub attachments: Vec<Attachment>,
}

/// Rewrites RFC 3339 strings under `keys` as UTC with millisecond precision.
/// Nulls and anything unparseable are left alone.
fn normalize_dates(fields: &mut Map<String, Value>, keys: &[&str]) {
    for key in keys {
        if let Some(Value::String(raw)) = fields.get_mut(*key) {
            if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
                *raw = dt
                    .with_timezone(&Utc)
                    .to_rfc3339_opts(SecondsFormat::Millis, true);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn next_link_becomes_the_cursor() {
        let page: GraphPage<MailMessage> = serde_json::from_value(json!({
            "@odata.context": "https://graph.microsoft.com/v1.0/$metadata#users('a')/messages",
            "value": [{"id": "m1"}],
            "@odata.nextLink": "https://graph.microsoft.com/v1.0/users/a/messages?$skip=10"
        }))
        .unwrap();
        let page: Page<MailMessage> = page.into();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id(), Some("m1"));
        assert_eq!(
            page.next_cursor.as_deref(),
            Some("https://graph.microsoft.com/v1.0/users/a/messages?$skip=10")
        );
    }

    #[test]
    fn last_page_has_no_cursor() {
        let page: GraphPage<Attachment> = serde_json::from_value(json!({"value": []})).unwrap();
        let page: Page<Attachment> = page.into();
        assert!(page.items.is_empty());
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn dates_are_normalized_to_utc() {
        let message: MailMessage = serde_json::from_value(json!({
            "id": "m1",
            "receivedDateTime": "2024-03-01T10:15:00+02:00",
            "sentDateTime": "2024-03-01T08:14:59.5Z",
            "importance": "high",
            "subject": "Quarterly numbers"
        }))
        .unwrap();

        let out = serde_json::to_value(&message).unwrap();
        assert_eq!(out["receivedDateTime"], "2024-03-01T08:15:00.000Z");
        assert_eq!(out["sentDateTime"], "2024-03-01T08:14:59.500Z");
        assert_eq!(out["importance"], "high");
        assert_eq!(out["subject"], "Quarterly numbers");
        assert!(out.get("createdDateTime").is_none());
    }

    #[test]
    fn null_dates_are_written_back_as_null() {
        let message: MailMessage =
            serde_json::from_value(json!({"id": "m1", "sentDateTime": null})).unwrap();
        let out = serde_json::to_value(&message).unwrap();
        assert_eq!(out, json!({"id": "m1", "sentDateTime": null}));
    }

    #[test]
    fn unparseable_dates_pass_through() {
        let message: MailMessage = serde_json::from_value(json!({
            "id": "m1",
            "receivedDateTime": "yesterday-ish",
            "createdDateTime": 1709280900
        }))
        .unwrap();
        let out = serde_json::to_value(&message).unwrap();
        assert_eq!(out["receivedDateTime"], "yesterday-ish");
        assert_eq!(out["createdDateTime"], 1709280900);
    }

    #[test]
    fn attachment_without_id_is_accepted() {
        let page: GraphPage<Attachment> = serde_json::from_value(json!({
            "value": [{"name": "a", "size": 12, "contentType": null}]
        }))
        .unwrap();
        let out = serde_json::to_value(&page.value[0]).unwrap();
        assert_eq!(out, json!({"name": "a", "size": 12, "contentType": null}));
    }

    #[test]
    fn message_without_id_has_no_id() {
        let message: MailMessage = serde_json::from_value(json!({"subject": "x"})).unwrap();
        assert_eq!(message.id(), None);
    }

    #[test]
    fn record_uses_pascal_case_keys() {
        let record = OutputRecord {
            message: serde_json::from_value(json!({"id": "m1"})).unwrap(),
            attachments: vec![
                serde_json::from_value(json!({
                    "@odata.type": "#microsoft.graph.fileAttachment",
                    "id": "a1",
                    "name": "report.pdf",
                    "contentBytes": "JVBERi0x"
                }))
                .unwrap(),
            ],
        };
        let out = serde_json::to_value(&record).unwrap();
        assert_eq!(out["Message"]["id"], "m1");
        assert_eq!(out["Attachments"][0]["name"], "report.pdf");
        assert_eq!(out["Attachments"][0]["contentBytes"], "JVBERi0x");
        assert_eq!(
            out["Attachments"][0]["@odata.type"],
            "#microsoft.graph.fileAttachment"
        );
    }
}
