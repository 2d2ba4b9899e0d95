#![allow(missing_docs)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum_test::TestServer;
use rusqlite::Connection;
use serde_json::Value;
use time::OffsetDateTime;

use crate::{
    AppState, Error, PaginationConfig, build_router,
    session::SessionHeaders,
    summary::{SummaryUpdate, apply_amount},
    webhook::{SpendingInput, SpendingParser, WebhookReply, decode_reply},
};

/// An app backed by an in-memory database.
///
/// Must be created inside a tokio runtime since the summary worker is spawned.
pub struct TestApp {
    pub state: AppState,
}

impl TestApp {
    /// An app whose webhook replies as if it could not be reached.
    pub fn new() -> Self {
        Self::with_parser(Arc::new(StubParser::default()))
    }

    pub fn with_parser(spending_parser: Arc<dyn SpendingParser>) -> Self {
        let (state, _worker) = AppState::new(
            Connection::open_in_memory().expect("Could not open database."),
            "Etc/UTC",
            PaginationConfig::default(),
            64,
            spending_parser,
        )
        .expect("Could not create app state.");

        Self { state }
    }

    pub fn server(&self) -> TestServer {
        TestServer::try_new(build_router(self.state.clone())).expect("Could not create test server.")
    }
}

/// Apply `update` to the summaries right away instead of through the worker.
pub fn apply_summary_update(state: &AppState, update: &SummaryUpdate) {
    let connection = state.db_connection.lock().unwrap();
    let report = apply_amount(update, state.local_timezone, OffsetDateTime::now_utc(), &connection);

    assert!(report.is_complete(), "summary update failed: {report:?}");
}

/// A [SpendingParser] that gives the same reply to every call and records its inputs.
#[derive(Debug, Default)]
pub struct StubParser {
    reply: WebhookReply,
    calls: Mutex<Vec<(SpendingInput, SessionHeaders)>>,
}

impl StubParser {
    /// A parser that replies with `body` as if the webhook sent it.
    pub fn replying(body: Value) -> Self {
        Self {
            reply: decode_reply(body.to_string().as_bytes()),
            calls: Mutex::default(),
        }
    }

    pub fn calls(&self) -> Vec<(SpendingInput, SessionHeaders)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpendingParser for StubParser {
    async fn parse(
        &self,
        input: SpendingInput,
        session: &SessionHeaders,
    ) -> Result<WebhookReply, Error> {
        self.calls.lock().unwrap().push((input, session.clone()));

        Ok(self.reply.clone())
    }
}
