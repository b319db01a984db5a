use chrono::NaiveDateTime;
use diesel::{prelude::*, sql_types::Bool, sqlite::Sqlite};
use serde::Serialize;

use crate::{
    schema::{sessions, teams, users},
    user::{ApiUser, User},
};

#[derive(Debug, Queryable, Selectable, Identifiable, Serialize, Clone)]
#[diesel(table_name = teams)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Team {
    pub id: i64,
    pub public_id: String,
    pub name: String,
    pub active: bool,
    pub current_entry_id: Option<i64>,
    pub created_at: NaiveDateTime,
}

impl Team {
    pub fn validate_name(name: &str) -> bool {
        let name = name.trim();
        name.chars().count() >= 2 && name.chars().count() <= 64
    }

    pub fn by_public_id(
        pid: &str,
        conn: &mut SqliteConnection,
    ) -> QueryResult<Option<Team>> {
        teams::table
            .filter(teams::public_id.eq(pid))
            .select(Team::as_select())
            .first(conn)
            .optional()
    }

    /// Everyone currently taking part in this team's session, in the order
    /// they joined the application.
    pub fn participants(
        &self,
        conn: &mut SqliteConnection,
    ) -> QueryResult<Vec<ApiUser>> {
        let users = users::table
            .filter(users::current_team_id.eq(self.id))
            .order_by(users::id.asc())
            .select(User::as_select())
            .load(conn)?;
        Ok(users.iter().map(ApiUser::from).collect())
    }
}

/// One run through a team's entries.
#[derive(Debug, Queryable, Selectable, Identifiable, Clone)]
#[diesel(table_name = sessions)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Session {
    pub id: i64,
    pub public_id: String,
    pub team_id: i64,
    pub started_by: i64,
    pub created_at: NaiveDateTime,
    pub ended_at: Option<NaiveDateTime>,
}

impl Session {
    pub fn open_for_team(
        team_id: i64,
    ) -> Box<dyn BoxableExpression<sessions::table, Sqlite, SqlType = Bool>>
    {
        Box::new(
            sessions::team_id
                .eq(team_id)
                .and(sessions::ended_at.is_null()),
        )
    }
}
