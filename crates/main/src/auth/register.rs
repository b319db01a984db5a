use chrono::Utc;
use db::{gen_public_id, schema::users, user::{set_login_cookie, User}, DbConn};
use diesel::{
    dsl::{exists, insert_into, select},
    prelude::*,
};
use maud::Markup;
use rocket::{
    form::Form,
    http::{CookieJar, Status},
    response::Redirect,
};
use serde::Serialize;
use tracing::Instrument;
use trace_request::TracingSpan;
use ui::{page_of_body, page_title};

use super::hash_password;
use crate::util::is_valid_email;

#[get("/register")]
pub async fn register_page(user: Option<User>) -> Result<Markup, Redirect> {
    if user.is_some() {
        return Err(Redirect::to("/user"));
    }

    Ok(register_form(None, None))
}

fn register_form(form: Option<&RegisterForm>, error: Option<&str>) -> Markup {
    let markup = maud::html! {
        (page_title("Register"))
        @if let Some(err) = error {
            div class="alert alert-danger" role="alert" {
                (err)
            }
        }
        form method="post" action="/register" {
            div class="form-group" {
                label for="username" { "Username" }
                input type="text" class="form-control" id="username" name="username" value=(form.map(|f| f.username.clone()).unwrap_or_default());
            }
            div class="form-group" {
                label for="email" { "Email" }
                input type="email" class="form-control" id="email" name="email" value=(form.map(|f| f.email.clone()).unwrap_or_default());
            }
            div class="form-group" {
                label for="password" { "Password" }
                input type="password" class="form-control" id="password" name="password";
            }
            div class="form-group" {
                label for="password2" { "Confirm Password" }
                input type="password" class="form-control" id="password2" name="password2";
            }
            button type="submit" class="btn btn-primary mt-2" { "Register" }
        }
    };
    page_of_body(markup, None)
}

#[derive(FromForm, Serialize, Debug)]
pub struct RegisterForm {
    pub(crate) username: String,
    pub(crate) email: String,
    pub(crate) password: String,
    pub(crate) password2: String,
}

/// Creates an account and logs the new user in.
#[post("/register", data = "<form>")]
pub async fn do_register(
    form: Form<RegisterForm>,
    jar: &CookieJar<'_>,
    db: DbConn,
    span: TracingSpan,
) -> Result<Result<Redirect, Markup>, Status> {
    let form = form.into_inner();

    if form.password != form.password2 {
        return Ok(Err(register_form(
            Some(&form),
            Some("Error: your passwords do not match."),
        )));
    }

    if form.password.chars().count() < 8 {
        return Ok(Err(register_form(
            Some(&form),
            Some("Error: passwords need at least 8 characters."),
        )));
    }

    if !is_valid_email(form.email.trim()) {
        return Ok(Err(register_form(
            Some(&form),
            Some("Error: that email is not valid."),
        )));
    }

    if !User::validate_username(&form.username) {
        return Ok(Err(register_form(
            Some(&form),
            Some("Error: names may only contain letters, digits, spaces, dashes and underscores."),
        )));
    }

    let password_hash = hash_password(&form.password).map_err(|e| {
        tracing::error!("Could not hash password: {e}");
        Status::InternalServerError
    })?;

    let username = form.username.trim().to_string();
    let email = form.email.trim().to_string();
    let created = db
        .run(move |conn| {
            conn.transaction(|conn| -> QueryResult<Option<i64>> {
                let email_taken = select(exists(
                    users::table.filter(users::email.eq(&email)),
                ))
                .get_result::<bool>(conn)?;

                if email_taken {
                    return Ok(None);
                }

                insert_into(users::table)
                    .values((
                        users::public_id.eq(gen_public_id()),
                        users::username.eq(&username),
                        users::email.eq(&email),
                        users::password_hash.eq(&password_hash),
                        users::created_at.eq(Utc::now().naive_utc()),
                    ))
                    .returning(users::id)
                    .get_result::<i64>(conn)
                    .map(Some)
            })
        })
        .instrument(span.0)
        .await
        .map_err(|e| {
            tracing::error!("Could not register user: {e}");
            Status::InternalServerError
        })?;

    match created {
        Some(id) => {
            set_login_cookie(id, jar);
            Ok(Ok(Redirect::to("/user")))
        }
        None => Ok(Err(register_form(
            Some(&form),
            Some("Error: an account with that email already exists."),
        ))),
    }
}
