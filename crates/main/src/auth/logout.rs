use db::user::clear_login_cookie;
use rocket::{http::CookieJar, response::Redirect};

#[post("/logout")]
pub async fn logout(jar: &CookieJar<'_>) -> Redirect {
    clear_login_cookie(jar);
    Redirect::to("/")
}
