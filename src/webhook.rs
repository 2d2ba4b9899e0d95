//! The client for the external webhook that categorizes spending.
//!
//! The webhook receives the submitted receipt file or free text as a
//! multipart form and replies with JSON like
//! `{"category": "food", "total": 12.5, "used": "lunch"}`.

use std::fmt::Debug;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::Value;

use crate::{
    Error,
    session::{SESSION_USER_ID_HEADER, SessionHeaders},
};

/// The content type used when a file has none and its extension is unknown.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// The spending submitted by a client.
#[derive(Debug, Clone, PartialEq)]
pub enum SpendingInput {
    /// A receipt image or document.
    File {
        file_name: String,
        /// The content type sent by the client, if any.
        content_type: Option<String>,
        bytes: Vec<u8>,
    },
    /// A free text description, e.g. "lunch 12.50".
    Text(String),
}

/// What the webhook extracted from the submitted spending.
///
/// Fields the webhook did not provide are left empty or zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedSpending {
    pub category: String,
    /// The amount in major units, e.g. dollars.
    pub amount: f64,
    /// The name of the item or service paid for.
    pub name: String,
}

impl ParsedSpending {
    /// Read the `category`, `total` and `used` fields of a webhook reply.
    ///
    /// Missing or mistyped fields are left empty. A `total` sent as a string
    /// is accepted if it holds a number.
    pub fn from_json(value: &Value) -> Self {
        let text = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .map(|text| text.trim().to_owned())
                .unwrap_or_default()
        };

        let amount = match value.get("total") {
            Some(Value::Number(number)) => number.as_f64().unwrap_or_default(),
            Some(Value::String(text)) => text.trim().parse().unwrap_or_default(),
            _ => 0.0,
        };

        Self {
            category: text("category"),
            amount,
            name: text("used"),
        }
    }
}

/// The outcome of a call to the webhook.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WebhookReply {
    pub spending: ParsedSpending,
    /// The reply body, if it was valid JSON.
    pub body: Option<Value>,
}

/// Extracts the category, amount and item name from submitted spending.
#[async_trait]
pub trait SpendingParser: Send + Sync + Debug {
    /// Parse `input`, forwarding the session headers of the request.
    ///
    /// Transport failures and unreadable replies are not errors, they produce
    /// an empty [WebhookReply] instead.
    ///
    /// # Errors
    /// Returns [Error::WebhookError] if the request could not be built.
    async fn parse(
        &self,
        input: SpendingInput,
        session: &SessionHeaders,
    ) -> Result<WebhookReply, Error>;
}

/// A [SpendingParser] that calls the categorization webhook over HTTP.
#[derive(Debug, Clone)]
pub struct WebhookParser {
    url: String,
    client: reqwest::Client,
}

impl WebhookParser {
    /// Create a parser that posts to `url`.
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_owned(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl SpendingParser for WebhookParser {
    async fn parse(
        &self,
        input: SpendingInput,
        session: &SessionHeaders,
    ) -> Result<WebhookReply, Error> {
        let form = build_form(input)?;

        let mut request = self.client.post(&self.url).multipart(form);
        if let Some(session_user_id) = &session.session_user_id {
            request = request.header(SESSION_USER_ID_HEADER, session_user_id);
        }
        if let Some(authorization) = &session.authorization {
            request = request.header(reqwest::header::AUTHORIZATION, authorization);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!("could not reach the categorization webhook: {error}");
                return Ok(WebhookReply::default());
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("the categorization webhook responded with {status}");
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(error) => {
                tracing::warn!("could not read the categorization webhook reply: {error}");
                return Ok(WebhookReply::default());
            }
        };

        Ok(decode_reply(&body))
    }
}

/// Decode a webhook reply body.
pub fn decode_reply(body: &[u8]) -> WebhookReply {
    match serde_json::from_slice::<Value>(body) {
        Ok(value) => WebhookReply {
            spending: ParsedSpending::from_json(&value),
            body: Some(value),
        },
        Err(error) => {
            tracing::warn!(
                "the categorization webhook reply is not JSON ({error}): {}",
                String::from_utf8_lossy(body)
            );
            WebhookReply::default()
        }
    }
}

fn build_form(input: SpendingInput) -> Result<Form, Error> {
    let form = match input {
        SpendingInput::File {
            file_name,
            content_type,
            bytes,
        } => {
            let content_type = content_type
                .filter(|content_type| !content_type.trim().is_empty())
                .unwrap_or_else(|| content_type_from_extension(&file_name).to_owned());

            let part = Part::bytes(bytes)
                .file_name(file_name)
                .mime_str(&content_type)
                .map_err(|error| Error::WebhookError(error.to_string()))?;

            Form::new().part("file", part)
        }
        SpendingInput::Text(text) => Form::new().text("text", text),
    };

    Ok(form)
}

/// Guess the content type of a file from its extension.
pub fn content_type_from_extension(file_name: &str) -> &'static str {
    let extension = match file_name.rsplit_once('.') {
        Some((_, extension)) => extension.to_ascii_lowercase(),
        None => return DEFAULT_CONTENT_TYPE,
    };

    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "pdf" => "application/pdf",
        "txt" => "text/plain; charset=utf-8",
        "csv" => "text/csv; charset=utf-8",
        "json" => "application/json",
        _ => DEFAULT_CONTENT_TYPE,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::webhook::{
        DEFAULT_CONTENT_TYPE, ParsedSpending, SpendingInput, WebhookReply, build_form,
        content_type_from_extension, decode_reply,
    };

    #[test]
    fn reads_webhook_fields() {
        let got = ParsedSpending::from_json(&json!({
            "category": "food",
            "total": 12.5,
            "used": "lunch",
            "confidence": 0.9,
        }));

        assert_eq!(
            got,
            ParsedSpending {
                category: "food".to_owned(),
                amount: 12.5,
                name: "lunch".to_owned(),
            }
        );
    }

    #[test]
    fn accepts_total_as_string() {
        let got = ParsedSpending::from_json(&json!({"total": " 100.50 "}));

        assert_eq!(got.amount, 100.5);
    }

    #[test]
    fn missing_fields_are_empty() {
        let got = ParsedSpending::from_json(&json!({"total": "lots", "category": 5}));

        assert_eq!(got, ParsedSpending::default());
    }

    #[test]
    fn non_json_reply_degrades_to_empty() {
        let got = decode_reply(b"<html>Bad gateway</html>");

        assert_eq!(got, WebhookReply::default());
    }

    #[test]
    fn json_reply_keeps_body() {
        let got = decode_reply(br#"{"category":"rent","total":900,"used":"March rent"}"#);

        assert_eq!(got.spending.category, "rent");
        assert_eq!(got.spending.amount, 900.0);
        assert_eq!(
            got.body,
            Some(json!({"category": "rent", "total": 900, "used": "March rent"}))
        );
    }

    #[test]
    fn guesses_content_type_from_extension() {
        assert_eq!(content_type_from_extension("receipt.JPG"), "image/jpeg");
        assert_eq!(content_type_from_extension("scan.pdf"), "application/pdf");
        assert_eq!(content_type_from_extension("receipt"), DEFAULT_CONTENT_TYPE);
        assert_eq!(content_type_from_extension("receipt.xyz"), DEFAULT_CONTENT_TYPE);
    }

    #[test]
    fn builds_form_for_file_without_content_type() {
        let input = SpendingInput::File {
            file_name: "receipt.png".to_owned(),
            content_type: None,
            bytes: vec![1, 2, 3],
        };

        let form = build_form(input);

        assert!(form.is_ok());
        assert!(!form.unwrap().boundary().is_empty());
    }
}
