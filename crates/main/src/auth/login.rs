use db::{
    schema::users,
    user::{set_login_cookie, User},
    DbConn,
};
use diesel::prelude::*;
use maud::Markup;
use rocket::{
    form::Form,
    http::{CookieJar, Status},
    response::{Flash, Redirect},
};
use serde::Serialize;
use tracing::Instrument;
use trace_request::TracingSpan;
use ui::page_of_body;

use super::verify_password;

#[get("/login")]
pub async fn login_page(user: Option<User>) -> Result<Markup, Flash<Redirect>> {
    if user.is_some() {
        return Err(Flash::error(
            Redirect::to("/"),
            "You are already logged in!",
        ));
    }

    Ok(page_of_body(login_form(None), None))
}

#[derive(FromForm, Serialize, Debug)]
pub struct PasswordLoginForm {
    pub email: String,
    pub password: String,
}

#[post("/login", data = "<form>")]
pub async fn do_password_login(
    form: Form<PasswordLoginForm>,
    jar: &CookieJar<'_>,
    db: DbConn,
    span: TracingSpan,
) -> Result<Result<Redirect, Markup>, Status> {
    let form = form.into_inner();
    let email = form.email.trim().to_string();

    let user = db
        .run(move |conn| {
            users::table
                .filter(users::email.eq(email))
                .select(User::as_select())
                .first(conn)
                .optional()
        })
        .instrument(span.0)
        .await
        .map_err(|e| {
            tracing::error!("Could not look up user to log in: {e}");
            Status::InternalServerError
        })?;

    match user {
        Some(user) if verify_password(&form.password, &user.password_hash) => {
            set_login_cookie(user.id, jar);
            Ok(Ok(Redirect::to("/")))
        }
        // the same message either way, so that the form does not reveal
        // which emails have accounts
        _ => Ok(Err(page_of_body(
            login_form(Some("Incorrect email or password.")),
            None,
        ))),
    }
}

fn login_form(error: Option<&str>) -> Markup {
    maud::html! {
        div class="container" {
            h1 { "Login" }
            @if let Some(err) = error {
                div class="alert alert-danger" {
                    (err)
                }
            }
            form method="post" action="/login" {
                div class="form-group" {
                    label for="email" { "Email address" }
                    input type="email" class="form-control" id="email" name="email" placeholder="Enter email";
                }
                div class="form-group" {
                    label for="password" { "Password" }
                    input type="password" class="form-control" id="password" name="password" placeholder="Password";
                }
                button type="submit" class="btn btn-primary mt-2" { "Submit" }
                p class="mt-2" {
                    "No account yet? "
                    a href="/register" { "Register here" }
                    "."
                }
            }
        }
    }
}
