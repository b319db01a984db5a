use std::sync::Arc;

use auth::{
    login::{do_password_login, login_page},
    logout,
    register::{do_register, register_page},
};
use chrono::Utc;
use config::{AppConfig, Gifs};
use db::{user::User, DbConn};
use diesel_migrations::{
    embed_migrations, EmbeddedMigrations, MigrationHarness,
};
use entries::{
    api::{get_entries, post_entry},
    forms::do_create_entry,
    list_entries, EntryFilter,
};
use giphy::{GifLookup, GiphyClient};
use maud::{html, Markup};
use rocket::{
    fairing::AdHoc,
    figment::{
        providers::Env,
        util::map,
        value::{Map, Value},
    },
    http::Status,
    response::Redirect,
    Build, Rocket,
};
use teams::{
    do_create_team, leave_team, next_entry, start_session, team_page,
    team_stage, view_teams,
};
use trace_request::{RequestTracing, TracingSpan};
use tracing::Instrument;
use ui::{error_404, page_of_body, page_title};
use users::{entry_gallery, get_user, profile_page};

pub mod auth;
pub mod config;
pub mod entries;
pub mod error;
pub mod teams;
pub mod users;
pub mod util;


#[macro_use]
extern crate rocket;

pub const MIGRATIONS: EmbeddedMigrations =
    embed_migrations!("../../migrations");

/// Everyone's entries from this week.
#[get("/")]
async fn index(
    user: Option<User>,
    db: DbConn,
    span: TracingSpan,
) -> Result<Markup, Status> {
    let filter = EntryFilter {
        user_id: None,
        current_week: true,
    };
    let entries = db
        .run(move |conn| list_entries(conn, &filter, Utc::now().naive_utc()))
        .instrument(span.0)
        .await
        .map_err(|e| {
            tracing::error!("Could not load this week's entries: {e}");
            Status::InternalServerError
        })?;

    Ok(page_of_body(
        html! {
            (page_title("This week"))
            @if entries.is_empty() {
                p { "No entries yet this week." }
            } @else {
                (entry_gallery(&entries, true))
            }
            @if user.is_none() {
                p class="mt-4" {
                    a href="/login" { "Log in" } " to add your own."
                }
            }
        },
        user.as_ref(),
    ))
}

#[catch(404)]
fn not_found() -> Markup {
    error_404(None::<String>, None)
}

#[catch(401)]
fn unauthorized() -> Redirect {
    Redirect::to("/login")
}

pub fn make_rocket(db_url: &str) -> Rocket<Build> {
    make_rocket_with(db_url, None)
}

/// Builds the application. When `gifs` is `None` the Giphy client is
/// created from configuration at ignition.
pub fn make_rocket_with(
    db_url: &str,
    gifs: Option<Arc<dyn GifLookup>>,
) -> Rocket<Build> {
    let db: Map<_, Value> = map![
        "url" => db_url.into(),
        "pool_size" => 10.into(),
        "timeout" => 5.into(),
    ];

    let figment = rocket::Config::figment()
        .merge(Env::prefixed("SMILEYS_").global())
        .merge(("databases", map!["smileys" => db]));

    if let Err(e) = db::install_query_tracing() {
        tracing::warn!("Could not install query tracing: {e}");
    }

    let rocket = rocket::custom(figment)
        .attach(DbConn::fairing())
        .attach(AdHoc::try_on_ignite("migrations", |rocket| async move {
            let Some(db_conn) = DbConn::get_one(&rocket).await else {
                tracing::error!("No database connection available for migrations");
                return Err(rocket);
            };

            let ret: Result<(), Box<dyn std::error::Error + Send + Sync>> =
                db_conn
                    .run(move |conn| {
                        conn.run_pending_migrations(MIGRATIONS)?;
                        Ok(())
                    })
                    .await;

            match ret {
                Ok(_) => Ok(rocket),
                Err(e) => {
                    tracing::error!("Migrations failed: {e}");
                    Err(rocket)
                }
            }
        }))
        .attach(AdHoc::config::<AppConfig>());

    let rocket = match gifs {
        Some(gifs) => rocket.manage(Gifs(gifs)),
        None => rocket.attach(AdHoc::try_on_ignite(
            "giphy",
            |rocket| async move {
                let giphy = match rocket.state::<AppConfig>() {
                    Some(config) => config.giphy(),
                    None => return Err(rocket),
                };
                if giphy.api_key.is_none() {
                    tracing::warn!(
                        "No Giphy API key configured, entries will not be enriched"
                    );
                }
                match GiphyClient::new(giphy) {
                    Ok(client) => Ok(rocket.manage(Gifs(Arc::new(client)))),
                    Err(e) => {
                        tracing::error!("Could not build Giphy client: {e}");
                        Err(rocket)
                    }
                }
            },
        )),
    };

    rocket
        .mount(
            "/",
            routes![
                index,
                login_page,
                do_password_login,
                register_page,
                do_register,
                logout::logout,
                get_entries,
                post_entry,
                do_create_entry,
                get_user,
                profile_page,
                view_teams,
                do_create_team,
                team_page,
                team_stage,
                leave_team,
                start_session,
                next_entry
            ],
        )
        .register("/", catchers![not_found, unauthorized])
        .attach(RequestTracing)
}
