//! The API endpoint URIs.

/// The route to record a spending.
pub const SPENDING: &str = "/spending";
/// The route to list spending.
pub const SPENDING_LIST: &str = "/spending/list";
/// The route to list spending categories.
pub const CATEGORIES: &str = "/spending/categories";
/// The route to list an owner's spending totals per category.
pub const SUMMARY: &str = "/spending/summary";
/// The route for the total spending of the current period.
pub const SUMMARY_TOTAL: &str = "/spending/summary/total";
/// The route to request a cup of coffee (experimental).
pub const COFFEE: &str = "/api/coffee";
