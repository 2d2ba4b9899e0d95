//! The endpoint that records new spending from a receipt or free text.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Multipart, State, multipart::MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde_json::{Map, Value};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use uuid::Uuid;

use crate::{
    AppState, Error,
    response::SuccessWithData,
    session::SessionHeaders,
    spending::{
        domain::{CreateSpending, DEFAULT_CATEGORY_ID},
        service::{create_spending, submit_summary_update},
    },
    summary::SummaryQueue,
    webhook::{SpendingInput, SpendingParser, WebhookReply},
};

/// The state needed to create spending.
#[derive(Debug, Clone)]
pub struct CreateSpendingState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub summary_queue: SummaryQueue,
    pub spending_parser: Arc<dyn SpendingParser>,
}

impl FromRef<AppState> for CreateSpendingState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            summary_queue: state.summary_queue.clone(),
            spending_parser: state.spending_parser.clone(),
        }
    }
}

/// Record a spending from a multipart form with either a `file` part or a `text` field.
///
/// The input is categorized by the webhook, stored, and its summaries are
/// updated in the background. The response data is the webhook reply with the
/// ID of the new spending added.
pub async fn create_spending_endpoint(
    State(state): State<CreateSpendingState>,
    session: SessionHeaders,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, Error> {
    let input = read_spending_input(multipart?).await?;

    let reply = state.spending_parser.parse(input, &session).await?;

    let now = OffsetDateTime::now_utc();
    let request = build_request(&session, &reply, now)?;

    let spending = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        create_spending(&request, now, &connection)?
    };

    if !submit_summary_update(&spending, &state.summary_queue) {
        tracing::warn!("summaries were not updated for spending {}", spending.id);
    }

    Ok(SuccessWithData::new(
        StatusCode::CREATED,
        "Create spending successfully",
        response_data(reply.body, spending.id),
    )
    .into_response())
}

/// The webhook reply with the spending ID added.
///
/// Replies that are not JSON objects are replaced by an object holding only the ID.
fn response_data(body: Option<Value>, id: Uuid) -> Value {
    let mut data = match body {
        Some(Value::Object(body)) => body,
        _ => Map::new(),
    };
    data.insert("id".to_owned(), Value::String(id.to_string()));

    Value::Object(data)
}

/// Read the `file` part or, failing that, the `text` field of the form.
async fn read_spending_input(mut multipart: Multipart) -> Result<SpendingInput, Error> {
    let mut file = None;
    let mut text = None;

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("file") if file.is_none() => {
                let file_name = field.file_name().unwrap_or_default().to_owned();
                let content_type = field.content_type().map(str::to_owned);
                let bytes = field.bytes().await?.to_vec();

                file = Some(SpendingInput::File {
                    file_name,
                    content_type,
                    bytes,
                });
            }
            Some("text") if text.is_none() => {
                let value = field.text().await?;

                if !value.trim().is_empty() {
                    text = Some(SpendingInput::Text(value));
                }
            }
            _ => {}
        }
    }

    file.or(text).ok_or(Error::MissingSpendingInput)
}

fn build_request(
    session: &SessionHeaders,
    reply: &WebhookReply,
    now: OffsetDateTime,
) -> Result<CreateSpending, Error> {
    let datetime = now
        .format(&Rfc3339)
        .map_err(|error| Error::TimestampFormat(error.to_string()))?;

    Ok(CreateSpending {
        user_session_id: session.session_user_id.clone().unwrap_or_default(),
        category: reply.spending.category.clone(),
        category_id: DEFAULT_CATEGORY_ID.to_owned(),
        name: reply.spending.name.clone(),
        amount: reply.spending.amount,
        description: None,
        datetime,
        is_confirm: true,
    })
}
