use chrono::Utc;
use db::{entry::ApiEntry, DbConn};
use rocket::{
    serde::json::{self, Json},
    State,
};
use tracing::Instrument;
use trace_request::TracingSpan;

use super::{create_entry, list_entries, EntryFilter, NewEntryRequest};
use crate::{config::Gifs, error::ApiError};

#[derive(FromForm, Debug)]
pub struct EntriesQuery {
    #[field(name = "userId")]
    pub user_id: Option<String>,
    #[field(name = "currentWeek")]
    pub current_week: Option<bool>,
}

impl From<EntriesQuery> for EntryFilter {
    fn from(query: EntriesQuery) -> Self {
        EntryFilter {
            user_id: query.user_id.filter(|id| !id.is_empty()),
            current_week: query.current_week.unwrap_or(false),
        }
    }
}

#[get("/api/entries?<query..>")]
pub async fn get_entries(
    query: EntriesQuery,
    db: DbConn,
    span: TracingSpan,
) -> Result<Json<Vec<ApiEntry>>, ApiError> {
    let filter = EntryFilter::from(query);
    let entries = db
        .run(move |conn| list_entries(conn, &filter, Utc::now().naive_utc()))
        .instrument(span.0)
        .await?;
    Ok(Json(entries))
}

#[post("/api/entries", data = "<body>")]
pub async fn post_entry(
    body: Result<Json<NewEntryRequest>, json::Error<'_>>,
    db: DbConn,
    gifs: &State<Gifs>,
    span: TracingSpan,
) -> Result<Json<ApiEntry>, ApiError> {
    let request = body
        .map_err(|e| ApiError::InvalidBody(e.to_string()))?
        .into_inner();

    let entry = create_entry(
        &db,
        gifs.0.as_ref(),
        request,
        Utc::now().naive_utc(),
    )
    .instrument(span.0)
    .await?;

    Ok(Json(entry))
}
