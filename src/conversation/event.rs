//! Inbound event normalization for WhatsApp Cloud API webhook payloads.

use serde_json::Value;

/// Fixed trigger words that open the menu.
const GREETINGS: &[&str] = &["hi", "hello", "hai", "hey"];

/// What kind of message the user sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Case-insensitive exact match against the greeting set.
    Greeting,
    /// Any other free text, as sent.
    Text(String),
    /// Button choice — interactive reply or template quick-reply.
    Button { id: String },
}

/// One normalized platform-delivered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    /// Platform message id, consulted for redelivery dedupe.
    pub message_id: String,
    /// Sender address.
    pub from: String,
    pub kind: EventKind,
}

/// Map a raw webhook payload to a normalized event.
///
/// Returns `None` when the payload carries no inbound message. Delivery
/// status callbacks and other non-message payloads are valid, silent
/// outcomes, never errors.
pub fn normalize_payload(payload: &Value) -> Option<InboundEvent> {
    let value = payload
        .get("entry")?
        .get(0)?
        .get("changes")?
        .get(0)?
        .get("value")?;
    let message = value.get("messages")?.get(0)?;
    let from = message.get("from")?.as_str()?.to_string();
    let message_id = message
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    // Interactive button reply (Cloud API) or template quick-reply payload.
    if let Some(id) = message
        .get("interactive")
        .and_then(|i| i.get("button_reply"))
        .and_then(|b| b.get("id"))
        .and_then(Value::as_str)
        .or_else(|| {
            message
                .get("button")
                .and_then(|b| b.get("payload"))
                .and_then(Value::as_str)
        })
    {
        return Some(InboundEvent {
            message_id,
            from,
            kind: EventKind::Button { id: id.to_string() },
        });
    }

    let text = message.get("text")?.get("body")?.as_str()?;
    let kind = if is_greeting(text) {
        EventKind::Greeting
    } else {
        EventKind::Text(text.to_string())
    };
    Some(InboundEvent {
        message_id,
        from,
        kind,
    })
}

/// Exact-string greeting match, case-insensitive after trimming.
pub fn is_greeting(text: &str) -> bool {
    let normalized = text.trim().to_lowercase();
    GREETINGS.iter().any(|g| *g == normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_payload(from: &str, id: &str, body: &str) -> Value {
        serde_json::json!({
            "object": "whatsapp_business_account",
            "entry": [{
                "changes": [{
                    "value": {
                        "messaging_product": "whatsapp",
                        "messages": [{
                            "from": from,
                            "id": id,
                            "type": "text",
                            "text": { "body": body }
                        }]
                    }
                }]
            }]
        })
    }

    #[test]
    fn normalizes_free_text() {
        let event = normalize_payload(&text_payload("111", "wamid.1", "john doe")).unwrap();
        assert_eq!(event.from, "111");
        assert_eq!(event.message_id, "wamid.1");
        assert_eq!(event.kind, EventKind::Text("john doe".into()));
    }

    #[test]
    fn normalizes_greeting_case_insensitive() {
        for body in ["hi", "Hello", "HAI", " hey "] {
            let event = normalize_payload(&text_payload("111", "wamid.2", body)).unwrap();
            assert_eq!(event.kind, EventKind::Greeting, "body: {body}");
        }
    }

    #[test]
    fn greeting_is_exact_match_not_substring() {
        let event = normalize_payload(&text_payload("111", "wamid.3", "hi there")).unwrap();
        assert_eq!(event.kind, EventKind::Text("hi there".into()));
    }

    #[test]
    fn normalizes_interactive_button_reply() {
        let payload = serde_json::json!({
            "entry": [{
                "changes": [{
                    "value": {
                        "messages": [{
                            "from": "111",
                            "id": "wamid.4",
                            "type": "interactive",
                            "interactive": {
                                "type": "button_reply",
                                "button_reply": { "id": "book", "title": "Book Laundry" }
                            }
                        }]
                    }
                }]
            }]
        });
        let event = normalize_payload(&payload).unwrap();
        assert_eq!(event.kind, EventKind::Button { id: "book".into() });
    }

    #[test]
    fn normalizes_template_quick_reply() {
        let payload = serde_json::json!({
            "entry": [{
                "changes": [{
                    "value": {
                        "messages": [{
                            "from": "111",
                            "id": "wamid.5",
                            "button": { "payload": "slots", "text": "Check Slots" }
                        }]
                    }
                }]
            }]
        });
        let event = normalize_payload(&payload).unwrap();
        assert_eq!(event.kind, EventKind::Button { id: "slots".into() });
    }

    #[test]
    fn status_callback_is_no_event() {
        let payload = serde_json::json!({
            "entry": [{
                "changes": [{
                    "value": {
                        "messaging_product": "whatsapp",
                        "statuses": [{ "id": "wamid.6", "status": "delivered" }]
                    }
                }]
            }]
        });
        assert!(normalize_payload(&payload).is_none());
    }

    #[test]
    fn malformed_payloads_are_no_event() {
        for payload in [
            serde_json::json!({}),
            serde_json::json!({"entry": []}),
            serde_json::json!({"entry": [{"changes": [{}]}]}),
            serde_json::json!(null),
            serde_json::json!("not an object"),
        ] {
            assert!(normalize_payload(&payload).is_none(), "payload: {payload}");
        }
    }

    #[test]
    fn message_without_text_body_is_no_event() {
        // e.g. an image message: no text, no button
        let payload = serde_json::json!({
            "entry": [{
                "changes": [{
                    "value": {
                        "messages": [{
                            "from": "111",
                            "id": "wamid.7",
                            "type": "image",
                            "image": { "id": "media.1" }
                        }]
                    }
                }]
            }]
        });
        assert!(normalize_payload(&payload).is_none());
    }
}
