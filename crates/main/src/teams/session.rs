//! Joining, leaving and stepping through a team's session.

use chrono::NaiveDateTime;
use db::{
    gen_public_id,
    schema::{entries, sessions, teams, users},
    team::{Session, Team},
    user::User,
};
use diesel::prelude::*;

use super::view::Stage;
use crate::entries::{current_week, entry_with_owner};

/// Loads the current state of a team's stage.
pub fn load_stage(
    conn: &mut SqliteConnection,
    team_id: &str,
) -> QueryResult<Option<Stage>> {
    let Some(team) = Team::by_public_id(team_id, conn)? else {
        return Ok(None);
    };

    let participants = team.participants(conn)?;
    let entry = match team.current_entry_id {
        Some(entry_id) => entry_with_owner(conn, entry_id)?,
        None => None,
    };

    Ok(Some(Stage {
        team,
        participants,
        entry,
    }))
}

/// Adds `user` to the team's participants unless they are already there.
/// Returns whether anything changed.
pub fn join(
    conn: &mut SqliteConnection,
    user: &User,
    team: &Team,
) -> QueryResult<bool> {
    let n = diesel::update(
        users::table
            .filter(users::id.eq(user.id))
            .filter(
                users::current_team_id
                    .is_null()
                    .or(users::current_team_id.ne(team.id)),
            ),
    )
    .set(users::current_team_id.eq(Some(team.id)))
    .execute(conn)?;
    Ok(n > 0)
}

/// Removes `user` from the team's participants. Only clears the user's team
/// if it is still this one, so a late leave from a previous page cannot undo
/// a join on the next.
pub fn leave(
    conn: &mut SqliteConnection,
    user_id: i64,
    team_id: i64,
) -> QueryResult<bool> {
    let n = diesel::update(
        users::table
            .filter(users::id.eq(user_id))
            .filter(users::current_team_id.eq(team_id)),
    )
    .set(users::current_team_id.eq(None::<i64>))
    .execute(conn)?;
    Ok(n > 0)
}

/// Starts a fresh session: closes any open one, marks the team active with
/// nothing on screen, and joins the user who started it.
pub fn start(
    conn: &mut SqliteConnection,
    user: &User,
    team: &Team,
    now: NaiveDateTime,
) -> QueryResult<Session> {
    conn.transaction(|conn| {
        diesel::update(sessions::table.filter(Session::open_for_team(team.id)))
            .set(sessions::ended_at.eq(Some(now)))
            .execute(conn)?;

        let session = diesel::insert_into(sessions::table)
            .values((
                sessions::public_id.eq(gen_public_id()),
                sessions::team_id.eq(team.id),
                sessions::started_by.eq(user.id),
                sessions::created_at.eq(now),
            ))
            .returning(Session::as_returning())
            .get_result(conn)?;

        diesel::update(teams::table.find(team.id))
            .set((
                teams::active.eq(true),
                teams::current_entry_id.eq(None::<i64>),
            ))
            .execute(conn)?;

        join(conn, user, team)?;

        Ok(session)
    })
}

/// Ends the team's session: nothing on screen and the team inactive.
pub fn end(
    conn: &mut SqliteConnection,
    team: &Team,
    now: NaiveDateTime,
) -> QueryResult<()> {
    conn.transaction(|conn| {
        diesel::update(teams::table.find(team.id))
            .set((
                teams::active.eq(false),
                teams::current_entry_id.eq(None::<i64>),
            ))
            .execute(conn)?;

        diesel::update(sessions::table.filter(Session::open_for_team(team.id)))
            .set(sessions::ended_at.eq(Some(now)))
            .execute(conn)?;

        Ok(())
    })
}

/// Moves the presentation on to the next entry from this week by someone
/// taking part, oldest first. When there is nothing left the session ends.
///
/// Returns the ID of the entry now on screen, if any.
pub fn advance(
    conn: &mut SqliteConnection,
    team: &Team,
    now: NaiveDateTime,
) -> QueryResult<Option<i64>> {
    if !team.active {
        return Ok(None);
    }

    conn.transaction(|conn| {
        let week = current_week(now);

        let participant_ids = users::table
            .filter(users::current_team_id.eq(team.id))
            .select(users::id)
            .load::<i64>(conn)?;

        let mut candidates = entries::table
            .filter(entries::user_id.eq_any(participant_ids))
            .filter(entries::created_at.ge(week.start))
            .filter(entries::created_at.le(week.end))
            .into_boxed();

        if let Some(current_id) = team.current_entry_id {
            let current = entries::table
                .find(current_id)
                .select((entries::created_at, entries::id))
                .first::<(NaiveDateTime, i64)>(conn)
                .optional()?;

            if let Some((created_at, id)) = current {
                candidates = candidates.filter(
                    entries::created_at.gt(created_at).or(entries::created_at
                        .eq(created_at)
                        .and(entries::id.gt(id))),
                );
            }
        }

        let next = candidates
            .order_by((entries::created_at.asc(), entries::id.asc()))
            .select(entries::id)
            .first::<i64>(conn)
            .optional()?;

        match next {
            Some(entry_id) => {
                diesel::update(teams::table.find(team.id))
                    .set(teams::current_entry_id.eq(Some(entry_id)))
                    .execute(conn)?;
            }
            None => end(conn, team, now)?,
        }

        Ok(next)
    })
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};
    use db::{
        entry::NewEntry,
        schema::{entries, sessions, teams, users},
        team::{Session, Team},
        user::User,
    };
    use diesel::prelude::*;
    use diesel_migrations::MigrationHarness;

    use super::{advance, join, leave, load_stage, start};
    use crate::{teams::view::SessionView, MIGRATIONS};

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn setup() -> (SqliteConnection, User, User, Team) {
        let mut conn = SqliteConnection::establish(":memory:").unwrap();
        conn.run_pending_migrations(MIGRATIONS).unwrap();

        for name in ["ada", "grace"] {
            diesel::insert_into(users::table)
                .values((
                    users::public_id.eq(name),
                    users::username.eq(name),
                    users::email.eq(format!("{name}@example.com")),
                    users::password_hash.eq("unused"),
                    users::created_at.eq(at(1, 0)),
                ))
                .execute(&mut conn)
                .unwrap();
        }
        diesel::insert_into(teams::table)
            .values((
                teams::public_id.eq("team"),
                teams::name.eq("Team"),
                teams::created_at.eq(at(1, 0)),
            ))
            .execute(&mut conn)
            .unwrap();

        let ada = User::by_public_id("ada", &mut conn).unwrap().unwrap();
        let grace = User::by_public_id("grace", &mut conn).unwrap().unwrap();
        let team = Team::by_public_id("team", &mut conn).unwrap().unwrap();
        (conn, ada, grace, team)
    }

    fn add_entry(conn: &mut SqliteConnection, user: &User, name: &str, at: NaiveDateTime) {
        diesel::insert_into(entries::table)
            .values(&NewEntry {
                public_id: name,
                user_id: user.id,
                created_at: at,
                original_url: name,
                giphy_id: None,
                preview_url: None,
            })
            .execute(conn)
            .unwrap();
    }

    fn reload(conn: &mut SqliteConnection) -> Team {
        Team::by_public_id("team", conn).unwrap().unwrap()
    }

    #[test]
    fn join_is_idempotent_and_leave_only_clears_this_team() {
        let (mut conn, ada, _, team) = setup();
        assert!(join(&mut conn, &ada, &team).unwrap());
        assert!(!join(&mut conn, &ada, &team).unwrap());

        let stage = load_stage(&mut conn, "team").unwrap().unwrap();
        assert_eq!(stage.participants.len(), 1);
        assert_eq!(stage.participants[0].id, "ada");

        assert!(!leave(&mut conn, ada.id, team.id + 1).unwrap());
        assert!(leave(&mut conn, ada.id, team.id).unwrap());
        let stage = load_stage(&mut conn, "team").unwrap().unwrap();
        assert!(stage.participants.is_empty());
    }

    #[test]
    fn a_session_walks_through_this_weeks_entries_then_ends() {
        let (mut conn, ada, grace, team) = setup();
        // 2026-10-14 is a Wednesday
        let now = at(14, 12);
        add_entry(&mut conn, &ada, "last-week", at(9, 9));
        add_entry(&mut conn, &grace, "monday", at(12, 9));
        add_entry(&mut conn, &ada, "tuesday", at(13, 9));

        join(&mut conn, &grace, &team).unwrap();
        start(&mut conn, &ada, &team, now).unwrap();

        let stage = load_stage(&mut conn, "team").unwrap().unwrap();
        assert_eq!(stage.view(), SessionView::Lobby);
        assert_eq!(stage.participants.len(), 2);

        let team = reload(&mut conn);
        advance(&mut conn, &team, now).unwrap();
        let stage = load_stage(&mut conn, "team").unwrap().unwrap();
        assert_eq!(stage.view(), SessionView::Presentation);
        assert_eq!(stage.entry.unwrap().id, "monday");

        let team = reload(&mut conn);
        advance(&mut conn, &team, now).unwrap();
        let stage = load_stage(&mut conn, "team").unwrap().unwrap();
        assert_eq!(stage.entry.unwrap().id, "tuesday");

        let team = reload(&mut conn);
        assert_eq!(advance(&mut conn, &team, now).unwrap(), None);
        let stage = load_stage(&mut conn, "team").unwrap().unwrap();
        assert_eq!(stage.view(), SessionView::Ending);

        let open = sessions::table
            .filter(Session::open_for_team(team.id))
            .count()
            .get_result::<i64>(&mut conn)
            .unwrap();
        assert_eq!(open, 0);
    }

    #[test]
    fn entries_of_people_who_left_are_skipped() {
        let (mut conn, ada, grace, team) = setup();
        let now = at(14, 12);
        add_entry(&mut conn, &grace, "grace", at(12, 9));
        add_entry(&mut conn, &ada, "ada", at(13, 9));

        start(&mut conn, &ada, &team, now).unwrap();
        let team = reload(&mut conn);
        assert!(advance(&mut conn, &team, now).unwrap().is_some());
        let stage = load_stage(&mut conn, "team").unwrap().unwrap();
        assert_eq!(stage.entry.unwrap().id, "ada");
    }
}
