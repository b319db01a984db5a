use chrono::Utc;
use db::{
    gen_public_id,
    schema::teams,
    team::Team,
    user::{ApiUser, User},
    DbConn,
};
use diesel::{
    dsl::{exists, insert_into, select},
    prelude::*,
};
use either::Either;
use maud::{html, Markup, PreEscaped};
use rocket::{
    form::Form,
    http::Status,
    response::{status::Custom, Flash, Redirect},
};
use serde::Serialize;
use tracing::Instrument;
use trace_request::TracingSpan;
use ui::{error_403, page_of_body, page_title};

pub mod session;
pub mod view;

use view::render_stage;

fn internal_error(e: diesel::result::Error) -> Status {
    tracing::error!("Database error on team route: {e}");
    Status::InternalServerError
}

fn create_team_form(error: Option<&str>) -> Markup {
    html! {
        @if let Some(err) = error {
            div class="alert alert-danger" role="alert" {
                (err)
            }
        }
        form method="post" action="/teams/new" {
            div class="form-group" {
                label for="name" { "Name" }
                input type="text" class="form-control" id="name" name="name" required {}
            }
            button type="submit" class="btn btn-primary mt-2" { "Create team" }
        }
    }
}

fn teams_page(teams: &[Team], user: &User, error: Option<&str>) -> Markup {
    page_of_body(
        html! {
            (page_title("Teams"))
            @if teams.is_empty() {
                p { "There are no teams yet." }
            } @else {
                table class="table" {
                    thead {
                        tr {
                            th scope="col" { "Team" }
                            th scope="col" { "Status" }
                        }
                    }
                    tbody {
                        @for team in teams {
                            tr {
                                th scope="row" {
                                    a href=(format!("/teams/{}", team.public_id)) { (team.name) }
                                }
                                td {
                                    @if team.active { "Session running" } @else { "Idle" }
                                }
                            }
                        }
                    }
                }
            }
            h3 { "New team" }
            (create_team_form(error))
        },
        Some(user),
    )
}

fn load_teams(conn: &mut SqliteConnection) -> QueryResult<Vec<Team>> {
    teams::table
        .order_by(teams::name.asc())
        .select(Team::as_select())
        .load(conn)
}

#[get("/teams")]
pub async fn view_teams(
    user: User,
    db: DbConn,
    span: TracingSpan,
) -> Result<Markup, Status> {
    let teams = db
        .run(load_teams)
        .instrument(span.0)
        .await
        .map_err(internal_error)?;
    Ok(teams_page(&teams, &user, None))
}

#[derive(FromForm, Serialize, Debug)]
pub struct CreateTeamForm {
    pub name: String,
}

#[post("/teams/new", data = "<form>")]
pub async fn do_create_team(
    user: User,
    form: Form<CreateTeamForm>,
    db: DbConn,
    span: TracingSpan,
) -> Result<Either<Markup, Redirect>, Status> {
    let name = form.into_inner().name.trim().to_string();

    let created = db
        .run(move |conn| {
            conn.transaction(|conn| -> QueryResult<Result<String, (&'static str, Vec<Team>)>> {
                if !Team::validate_name(&name) {
                    return Ok(Err((
                        "Team names need between 2 and 64 characters.",
                        load_teams(conn)?,
                    )));
                }

                let name_taken = select(exists(
                    teams::table.filter(teams::name.eq(&name)),
                ))
                .get_result::<bool>(conn)?;
                if name_taken {
                    return Ok(Err((
                        "A team with that name already exists - please pick another.",
                        load_teams(conn)?,
                    )));
                }

                let public_id = gen_public_id();
                insert_into(teams::table)
                    .values((
                        teams::public_id.eq(&public_id),
                        teams::name.eq(&name),
                        teams::active.eq(false),
                        teams::created_at.eq(Utc::now().naive_utc()),
                    ))
                    .execute(conn)?;
                Ok(Ok(public_id))
            })
        })
        .instrument(span.0)
        .await
        .map_err(internal_error)?;

    Ok(match created {
        Ok(public_id) => {
            Either::Right(Redirect::to(format!("/teams/{public_id}")))
        }
        Err((error, teams)) => {
            Either::Left(teams_page(&teams, &user, Some(error)))
        }
    })
}

/// Tells the server the user navigated away, so that they drop out of the
/// participant list.
fn leave_on_pagehide(team: &Team) -> Markup {
    let script = format!(
        "window.addEventListener('pagehide', function () {{ navigator.sendBeacon('/teams/{}/leave'); }});",
        team.public_id
    );
    html! {
        script { (PreEscaped(script)) }
    }
}

/// Makes the viewer a participant of `team` unless they already are. Checks
/// the stored row, not the request's copy of the user.
fn join_viewer(
    conn: &mut SqliteConnection,
    user: &User,
    team: &Team,
) -> QueryResult<()> {
    if session::join(conn, user, team)? {
        tracing::info!(team = %team.public_id, "user joined team");
    }
    Ok(())
}

/// The team page. Visiting it makes the user a participant.
#[get("/teams/<team_id>")]
pub async fn team_page(
    user: User,
    team_id: &str,
    db: DbConn,
    span: TracingSpan,
) -> Result<Option<Markup>, Status> {
    let team_id = team_id.to_string();
    let viewer = ApiUser::from(&user);
    let joining = user.clone();

    let stage = db
        .run(move |conn| {
            conn.transaction(|conn| -> QueryResult<_> {
                let Some(team) = Team::by_public_id(&team_id, conn)? else {
                    return Ok(None);
                };
                join_viewer(conn, &joining, &team)?;
                session::load_stage(conn, &team_id)
            })
        })
        .instrument(span.0)
        .await
        .map_err(internal_error)?;

    Ok(stage.map(|stage| {
        page_of_body(
            html! {
                (page_title(&stage.team.name))
                (render_stage(&stage, &viewer))
                (leave_on_pagehide(&stage.team))
            },
            Some(&user),
        )
    }))
}

/// The live part of the team page, polled by the page itself.
#[get("/teams/<team_id>/stage")]
pub async fn team_stage(
    user: User,
    team_id: &str,
    db: DbConn,
    span: TracingSpan,
) -> Result<Option<Markup>, Status> {
    let team_id = team_id.to_string();
    let viewer = ApiUser::from(&user);
    let stage = db
        .run(move |conn| {
            conn.transaction(|conn| -> QueryResult<_> {
                let Some(team) = Team::by_public_id(&team_id, conn)? else {
                    return Ok(None);
                };
                // a leave sent by the page the viewer just navigated away
                // from can arrive after this page joined
                join_viewer(conn, &user, &team)?;
                session::load_stage(conn, &team_id)
            })
        })
        .instrument(span.0)
        .await
        .map_err(internal_error)?;

    Ok(stage.map(|stage| render_stage(&stage, &viewer)))
}

#[post("/teams/<team_id>/leave")]
pub async fn leave_team(
    user: User,
    team_id: &str,
    db: DbConn,
    span: TracingSpan,
) -> Result<Option<Status>, Status> {
    let team_id = team_id.to_string();
    let user_id = user.id;
    db.run(move |conn| -> QueryResult<Option<Status>> {
        let Some(team) = Team::by_public_id(&team_id, conn)? else {
            return Ok(None);
        };
        if session::leave(conn, user_id, team.id)? {
            tracing::info!(team = %team.public_id, "user left team");
        }
        Ok(Some(Status::NoContent))
    })
    .instrument(span.0)
    .await
    .map_err(internal_error)
}

/// Loads the team for a route that only participants may use.
fn team_for_participant(
    conn: &mut SqliteConnection,
    team_id: &str,
    user: &User,
) -> QueryResult<Option<Result<Team, Custom<Markup>>>> {
    Ok(Team::by_public_id(team_id, conn)?.map(|team| {
        if user.is_participant_of(team.id) {
            Ok(team)
        } else {
            Err(Custom(
                Status::Forbidden,
                error_403(
                    Some("Open the team page to join the team first."),
                    Some(user),
                ),
            ))
        }
    }))
}

#[post("/teams/<team_id>/sessions/new")]
pub async fn start_session(
    user: User,
    team_id: &str,
    db: DbConn,
    span: TracingSpan,
) -> Result<Option<Either<Custom<Markup>, Flash<Redirect>>>, Status> {
    let team_id = team_id.to_string();
    db.run(move |conn| -> QueryResult<Option<Either<Custom<Markup>, Flash<Redirect>>>> {
        let Some(team) = team_for_participant(conn, &team_id, &user)? else {
            return Ok(None);
        };
        let team = match team {
            Ok(team) => team,
            Err(forbidden) => return Ok(Some(Either::Left(forbidden))),
        };

        let started = session::start(conn, &user, &team, Utc::now().naive_utc())?;
        tracing::info!(session = %started.public_id, team = %team.public_id, "started session");

        Ok(Some(Either::Right(Flash::success(
            Redirect::to(format!("/teams/{}", team.public_id)),
            "Session started.",
        ))))
    })
    .instrument(span.0)
    .await
    .map_err(internal_error)
}

#[post("/teams/<team_id>/next")]
pub async fn next_entry(
    user: User,
    team_id: &str,
    db: DbConn,
    span: TracingSpan,
) -> Result<Option<Either<Custom<Markup>, Redirect>>, Status> {
    let team_id = team_id.to_string();
    db.run(move |conn| -> QueryResult<Option<Either<Custom<Markup>, Redirect>>> {
        let Some(team) = team_for_participant(conn, &team_id, &user)? else {
            return Ok(None);
        };
        let team = match team {
            Ok(team) => team,
            Err(forbidden) => return Ok(Some(Either::Left(forbidden))),
        };

        session::advance(conn, &team, Utc::now().naive_utc())?;

        Ok(Some(Either::Right(Redirect::to(format!(
            "/teams/{}",
            team.public_id
        )))))
    })
    .instrument(span.0)
    .await
    .map_err(internal_error)
}
