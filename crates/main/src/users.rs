use chrono::Utc;
use db::{
    entry::ApiEntry,
    schema::teams,
    user::{ApiUser, User},
    DbConn,
};
use diesel::prelude::*;
use maud::{html, Markup};
use rocket::{http::Status, request::FlashMessage, serde::json::Json};
use tracing::Instrument;
use trace_request::TracingSpan;
use ui::{page_of_body, page_title};

use crate::{
    entries::{list_entries, EntryFilter},
    error::ApiError,
};

#[get("/api/users/<user_id>")]
pub async fn get_user(
    user_id: &str,
    db: DbConn,
    span: TracingSpan,
) -> Result<Json<ApiUser>, ApiError> {
    let user_id = user_id.to_string();
    let user = db
        .run(move |conn| User::by_public_id(&user_id, conn))
        .instrument(span.0)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(ApiUser::from(&user)))
}

/// A grid of entry thumbnails.
pub fn entry_gallery(entries: &[ApiEntry], show_owner: bool) -> Markup {
    html! {
        div class="row row-cols-2 row-cols-md-4 g-3" {
            @for entry in entries {
                div class="col" {
                    div class="card h-100" {
                        a href=(entry.images.original.url) {
                            img class="card-img-top" src=(entry.display_url()) alt="entry";
                        }
                        div class="card-body" {
                            @if show_owner {
                                h6 class="card-title" { (entry.user.username) }
                            }
                            p class="card-text text-muted small" {
                                (entry.created_at.format("%a %-d %b %Y, %H:%M"))
                            }
                        }
                    }
                }
            }
        }
    }
}

/// The logged in user's own page: their entries and a form to add one.
#[get("/user")]
pub async fn profile_page(
    user: User,
    flash: Option<FlashMessage<'_>>,
    db: DbConn,
    span: TracingSpan,
) -> Result<Markup, Status> {
    let filter = EntryFilter {
        user_id: Some(user.public_id.clone()),
        current_week: false,
    };
    let current_team = user.current_team_id;

    let (entries, team_name) = db
        .run(move |conn| -> QueryResult<_> {
            let entries = list_entries(conn, &filter, Utc::now().naive_utc())?;
            let team_name = match current_team {
                Some(team_id) => teams::table
                    .find(team_id)
                    .select(teams::name)
                    .first::<String>(conn)
                    .optional()?,
                None => None,
            };
            Ok((entries, team_name))
        })
        .instrument(span.0)
        .await
        .map_err(|e| {
            tracing::error!("Could not load profile: {e}");
            Status::InternalServerError
        })?;

    let markup = html! {
        (page_title(format!("Hello {}", user.username)))
        @if let Some(flash) = flash {
            @let class = if flash.kind() == "success" { "alert alert-success" } else { "alert alert-danger" };
            div class=(class) role="alert" { (flash.message()) }
        }
        @if let Some(name) = team_name {
            p { "You are currently taking part in " b { (name) } "." }
        }

        h3 { "How are you feeling?" }
        form method="post" action="/entries/new" class="mb-4" {
            div class="input-group" {
                input type="url" class="form-control" name="url" placeholder="Paste a GIF or image URL" required;
                button type="submit" class="btn btn-primary" { "Add entry" }
            }
        }

        h3 { "My entries" }
        @if entries.is_empty() {
            p { "Nothing yet." }
        } @else {
            (entry_gallery(&entries, false))
        }
    };

    Ok(page_of_body(markup, Some(&user)))
}
