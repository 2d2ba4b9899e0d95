//! Records spending and keeps the summaries in step with it.

use rusqlite::Connection;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use uuid::Uuid;

use crate::{
    Error,
    category::get_or_create_category,
    session::parse_owner_id,
    spending::{
        Spending,
        db::insert_spending,
        domain::CreateSpending,
    },
    summary::{SummaryQueue, SummaryUpdate, to_minor_units},
    validation::{FieldViolation, ValidationErrors, validate},
};

/// Validate `request` and store it as a new spending record.
///
/// The category is looked up by name and created if it does not exist yet,
/// the `category_id` of the request is ignored. The category and the spending
/// are written in one transaction.
///
/// # Errors
/// Returns:
/// - [Error::Validation] if a field is missing or invalid,
/// - [Error::InvalidOwnerId] if the user session ID is not a UUID,
/// - [Error::Conflict] if the record already exists,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_spending(
    request: &CreateSpending,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<Spending, Error> {
    validate(request)?;

    let owner = parse_owner_id(&request.user_session_id)?;
    let datetime = OffsetDateTime::parse(request.datetime.trim(), &Rfc3339)
        .map_err(|_| {
            ValidationErrors::new(vec![FieldViolation::new(
                "datetime",
                "must be an RFC 3339 date-time",
            )])
        })?;

    let transaction = connection.unchecked_transaction()?;

    let category = get_or_create_category(request.category.trim(), now, &transaction)
        .inspect_err(|error| tracing::error!("could not get or create category: {error}"))?;

    let spending = Spending {
        id: Uuid::new_v4(),
        user_session_id: owner,
        category: category.name,
        category_id: category.id,
        name: request.name.trim().to_owned(),
        amount: request.amount,
        description: request.description.clone().unwrap_or_default(),
        datetime,
        is_confirm: request.is_confirm,
        created_at: now,
        updated_at: now,
    };

    insert_spending(&spending, &transaction)
        .inspect_err(|error| tracing::error!("could not create spending: {error}"))?;

    transaction.commit()?;

    Ok(spending)
}

/// Queue the summary update for `spending`.
///
/// Returns whether the update was queued. Amounts that cannot be counted in
/// minor units are not queued.
pub fn submit_summary_update(spending: &Spending, queue: &SummaryQueue) -> bool {
    let Some(amount) = to_minor_units(spending.amount) else {
        tracing::error!(
            "amount {} of spending {} is out of range for summaries",
            spending.amount,
            spending.id
        );
        return false;
    };

    let update = SummaryUpdate {
        owner: spending.user_session_id,
        category_id: spending.category_id,
        category_name: spending.category.clone(),
        amount,
        timestamp: spending.datetime,
    };

    queue.submit(update)
}
