use db::user::User;
use maud::{html, Markup, DOCTYPE};

/// Wraps page content in the application shell. The right-hand side of the
/// navigation bar depends on whether someone is logged in.
pub fn page_of_body(body: Markup, user: Option<&User>) -> Markup {
    html! {
        (DOCTYPE)
        html {
            head {
                title { "Smileys" }
                script src="https://unpkg.com/htmx.org@2.0.2" integrity="sha384-Y7hw+L/jvKeWIRRkqWYfPcvVxHzVzn5REgzbawhxAuQGwX1XWe70vji+VSeHOThJ" crossorigin="anonymous" {}
                link href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.3/dist/css/bootstrap.min.css" rel="stylesheet" integrity="sha384-QWTKZyjpPEjISv5WaRU9OFeRpok6YctnYmDr5pNlyT2bRjXh0JMhjY6hW+ALEwIH" crossorigin="anonymous" {}
                meta name="viewport" content="width=device-width, initial-scale=1" {}
            }
            body {
                nav class="navbar navbar-expand" style="background-color: #F5B700" data-bs-theme="light" {
                    div class="container-fluid" {
                        ul class="nav nav-justify-start" {
                            li class="nav-item" {
                                a class="nav-link text-dark fw-bold" href="/" { "Smileys" }
                            }
                            @if user.is_some() {
                                li class="nav-item" {
                                    a class="nav-link text-dark" href="/teams" { "Teams" }
                                }
                            }
                        }
                        ul class="nav nav-justify-end" {
                            @if let Some(user) = user {
                                li class="nav-item" {
                                    a class="nav-link text-dark" aria-current="page" href="/user" { (user.username) }
                                }
                                li class="nav-item" {
                                    form method="post" action="/logout" {
                                        button type="submit" class="btn btn-link nav-link text-dark" { "Logout" }
                                    }
                                }
                            } @else {
                                li class="nav-item" {
                                    a class="nav-link text-dark" href="/login" { "Login" }
                                }
                                li class="nav-item" {
                                    a class="nav-link text-dark" href="/register" { "Register" }
                                }
                            }
                        }
                    }
                }
                div class="container" {
                    div class="mt-4" {
                        (body)
                    }
                }
            }
        }
    }
}

fn error_page<T: ToString>(
    code: u16,
    title: &str,
    lead: &str,
    error: Option<T>,
    user: Option<&User>,
) -> Markup {
    page_of_body(
        html! {
            div class="text-center" {
                h1 class="display-1 text-danger" { (code) }
                h2 class="mb-4" { (title) }
                p class="lead" { (lead) }
                @if let Some(err) = error {
                    div class="alert alert-danger" role="alert" {
                        (err.to_string())
                    }
                }
                a class="btn btn-danger" href="/" { "Return Home" }
            }
        },
        user,
    )
}

pub fn error_403<T: ToString>(error: Option<T>, user: Option<&User>) -> Markup {
    error_page(
        403,
        "Forbidden",
        "You don't have permission to access this resource.",
        error,
        user,
    )
}

pub fn error_404<T: ToString>(error: Option<T>, user: Option<&User>) -> Markup {
    error_page(404, "Not found", "We couldn't find that page.", error, user)
}

pub fn page_title<T: ToString>(title: T) -> Markup {
    html! {
        div class="col-md m-3 h2 d-flex align-items-center" {
            h1 { (title.to_string()) }
        }
    }
}

#[cfg(test)]
mod tests {
    use maud::html;

    use super::{error_404, page_of_body};

    #[test]
    fn logged_out_pages_offer_login() {
        let page = page_of_body(html! { p { "hello" } }, None).into_string();
        assert!(page.contains("<p>hello</p>"));
        assert!(page.contains("href=\"/login\""));
        assert!(page.contains("href=\"/register\""));
        assert!(!page.contains("action=\"/logout\""));
    }

    #[test]
    fn error_pages_share_the_shell() {
        let page = error_404(Some("no such team"), None).into_string();
        assert!(page.contains("no such team"));
        assert!(page.contains("htmx.org"));
    }
}
