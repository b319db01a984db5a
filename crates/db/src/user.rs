use chrono::NaiveDateTime;
use diesel::prelude::*;
use rocket::{
    http::{Cookie, CookieJar, Status},
    outcome::try_outcome,
    request::{self, FromRequest},
    Request,
};
use serde::{Deserialize, Serialize};

use crate::{schema::users, DbConn};

pub const LOGIN_COOKIE: &str = "smileys_login";

#[derive(Debug, Queryable, Selectable, Identifiable, Clone)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct User {
    pub id: i64,
    pub public_id: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub avatar_url: Option<String>,
    pub current_team_id: Option<i64>,
    pub created_at: NaiveDateTime,
}

/// The parts of a user that other users (and API clients) may see.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApiUser {
    pub id: String,
    pub username: String,
    pub avatar_url: Option<String>,
}

impl From<&User> for ApiUser {
    fn from(user: &User) -> Self {
        ApiUser {
            id: user.public_id.clone(),
            username: user.username.clone(),
            avatar_url: user.avatar_url.clone(),
        }
    }
}

type WithPublicId<'a> = diesel::dsl::Eq<users::public_id, &'a str>;

impl User {
    pub fn with_public_id(pid: &str) -> WithPublicId<'_> {
        users::public_id.eq(pid)
    }

    pub fn validate_username(name: &str) -> bool {
        let name = name.trim();
        !name.is_empty()
            && name.chars().count() <= 32
            && name
                .chars()
                .all(|c| c.is_alphanumeric() || c == ' ' || c == '_' || c == '-')
    }

    /// Looks a user up by the id clients know them by.
    pub fn by_public_id(
        pid: &str,
        conn: &mut SqliteConnection,
    ) -> QueryResult<Option<User>> {
        users::table
            .filter(User::with_public_id(pid))
            .select(User::as_select())
            .first(conn)
            .optional()
    }

    pub fn is_participant_of(&self, team_id: i64) -> bool {
        self.current_team_id == Some(team_id)
    }
}

#[derive(Debug)]
pub enum AuthError {
    CookieMissingOrMalformed,
    NoDatabase,
    Unauthorized,
}

#[derive(serde::Serialize, serde::Deserialize)]
pub struct LoginSession {
    id: i64,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for User {
    type Error = AuthError;

    async fn from_request(
        request: &'r Request<'_>,
    ) -> request::Outcome<Self, AuthError> {
        let db = try_outcome!(request
            .guard::<DbConn>()
            .await
            .map_error(|(t, _)| (t, AuthError::NoDatabase)));

        let Some(login_cookie) = request.cookies().get_private(LOGIN_COOKIE)
        else {
            return request::Outcome::Error((
                Status::Unauthorized,
                AuthError::CookieMissingOrMalformed,
            ));
        };

        let login: LoginSession = match serde_json::from_str(login_cookie.value())
        {
            Ok(t) => t,
            Err(e) => {
                tracing::debug!("Discarding malformed login cookie: {e}");
                // a malformed cookie would otherwise stop the user from
                // ever logging in again
                request.cookies().remove_private(LOGIN_COOKIE);
                return request::Outcome::Error((
                    Status::BadRequest,
                    AuthError::CookieMissingOrMalformed,
                ));
            }
        };

        let user = db
            .run(move |conn| {
                users::table
                    .filter(users::id.eq(login.id))
                    .select(User::as_select())
                    .first(conn)
                    .optional()
            })
            .await;

        match user {
            Ok(Some(user)) => request::Outcome::Success(user),
            Ok(None) => {
                request.cookies().remove_private(LOGIN_COOKIE);
                request::Outcome::Error((
                    Status::Unauthorized,
                    AuthError::Unauthorized,
                ))
            }
            Err(e) => {
                tracing::error!("Could not load the logged in user: {e}");
                request::Outcome::Error((
                    Status::InternalServerError,
                    AuthError::NoDatabase,
                ))
            }
        }
    }
}

pub fn set_login_cookie(id: i64, jar: &CookieJar<'_>) {
    let session = LoginSession { id };
    // serializing a struct holding a single integer cannot fail
    if let Ok(value) = serde_json::to_string(&session) {
        jar.add_private(Cookie::new(LOGIN_COOKIE, value));
    }
}

pub fn clear_login_cookie(jar: &CookieJar<'_>) {
    jar.remove_private(LOGIN_COOKIE);
}
