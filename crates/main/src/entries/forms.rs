use chrono::Utc;
use db::{user::User, DbConn};
use rocket::{
    form::Form,
    response::{Flash, Redirect},
    State,
};
use serde::Serialize;
use tracing::Instrument;
use trace_request::TracingSpan;

use super::{create_entry, NewEntryRequest};
use crate::{config::Gifs, error::ApiError};

#[derive(FromForm, Serialize, Debug)]
pub struct NewEntryForm {
    pub url: String,
}

/// Records an entry for whoever is logged in.
#[post("/entries/new", data = "<form>")]
pub async fn do_create_entry(
    user: User,
    form: Form<NewEntryForm>,
    db: DbConn,
    gifs: &State<Gifs>,
    span: TracingSpan,
) -> Result<Flash<Redirect>, Flash<Redirect>> {
    let request = NewEntryRequest {
        user_id: user.public_id.clone(),
        url: form.into_inner().url,
        created_at: None,
    };

    match create_entry(&db, gifs.0.as_ref(), request, Utc::now().naive_utc())
        .instrument(span.0)
        .await
    {
        Ok(_) => Ok(Flash::success(Redirect::to("/user"), "Entry recorded.")),
        Err(ApiError::InvalidBody(_)) => Err(Flash::error(
            Redirect::to("/user"),
            "Please paste the URL of an image.",
        )),
        Err(e) => {
            tracing::error!("Could not record entry: {e}");
            Err(Flash::error(
                Redirect::to("/user"),
                "Something went wrong while saving your entry.",
            ))
        }
    }
}
