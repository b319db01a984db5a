//! What the stage of a team page shows.

use db::{entry::ApiEntry, team::Team, user::ApiUser};
use maud::{html, Markup};

/// The three things a team page can show. Which one is decided only by
/// whether the team is active and whether it has a current entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionView {
    /// Session running, nobody's entry on screen yet.
    Lobby,
    /// Session running, an entry on screen.
    Presentation,
    /// No session running.
    Ending,
}

impl SessionView {
    pub fn select(active: bool, has_current_entry: bool) -> SessionView {
        match (active, has_current_entry) {
            (true, true) => SessionView::Presentation,
            (true, false) => SessionView::Lobby,
            (false, _) => SessionView::Ending,
        }
    }
}

/// Everything needed to draw the stage.
#[derive(Debug, Clone)]
pub struct Stage {
    pub team: Team,
    pub participants: Vec<ApiUser>,
    pub entry: Option<ApiEntry>,
}

impl Stage {
    pub fn view(&self) -> SessionView {
        SessionView::select(self.team.active, self.entry.is_some())
    }
}

pub fn stage_id(team: &Team) -> String {
    format!("stage-{}", team.public_id)
}

/// Renders the stage. The outer element re-fetches itself every two seconds
/// so everyone in the room sees the same thing.
pub fn render_stage(stage: &Stage, viewer: &ApiUser) -> Markup {
    let team = &stage.team;
    html! {
        div id=(stage_id(team))
            hx-get=(format!("/teams/{}/stage", team.public_id))
            hx-trigger="every 2s"
            hx-swap="outerHTML" {
            @match stage.view() {
                SessionView::Lobby => (lobby(stage, viewer)),
                SessionView::Presentation => {
                    @if let Some(entry) = &stage.entry {
                        (presentation(stage, entry))
                    }
                },
                SessionView::Ending => (ending(stage, viewer)),
            }
        }
    }
}

fn participant_list(participants: &[ApiUser], viewer: &ApiUser) -> Markup {
    html! {
        ul class="list-group mb-3" {
            @for participant in participants {
                li class="list-group-item" {
                    (participant.username)
                    @if participant.id == viewer.id {
                        " " span class="badge bg-secondary" { "you" }
                    }
                }
            }
        }
    }
}

fn lobby(stage: &Stage, viewer: &ApiUser) -> Markup {
    html! {
        div data-view="lobby" {
            h3 { "Waiting for everyone to arrive" }
            p { (stage.participants.len()) " here so far:" }
            (participant_list(&stage.participants, viewer))
            form method="post" action=(format!("/teams/{}/next", stage.team.public_id)) {
                button type="submit" class="btn btn-primary" { "Show the first entry" }
            }
        }
    }
}

fn presentation(stage: &Stage, entry: &ApiEntry) -> Markup {
    html! {
        div data-view="presentation" class="text-center" {
            h3 { (entry.user.username) }
            p class="text-muted" { (entry.created_at.format("%A %-d %B, %H:%M")) }
            img class="img-fluid rounded mb-3" src=(entry.images.original.url) alt=(format!("Entry by {}", entry.user.username));
            form method="post" action=(format!("/teams/{}/next", stage.team.public_id)) {
                button type="submit" class="btn btn-primary" { "Next" }
            }
        }
    }
}

fn ending(stage: &Stage, viewer: &ApiUser) -> Markup {
    html! {
        div data-view="ending" {
            h3 { "No session in progress" }
            @if !stage.participants.is_empty() {
                p { "Around right now:" }
                (participant_list(&stage.participants, viewer))
            }
            form method="post" action=(format!("/teams/{}/sessions/new", stage.team.public_id)) {
                button type="submit" class="btn btn-secondary" { "Start Smileys" }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use db::{
        entry::{ApiEntry, EntryImages, ImageLink},
        team::Team,
        user::ApiUser,
    };

    use super::{render_stage, SessionView, Stage};

    #[test]
    fn every_combination_selects_exactly_one_view() {
        assert_eq!(SessionView::select(true, true), SessionView::Presentation);
        assert_eq!(SessionView::select(true, false), SessionView::Lobby);
        assert_eq!(SessionView::select(false, true), SessionView::Ending);
        assert_eq!(SessionView::select(false, false), SessionView::Ending);
    }

    fn viewer() -> ApiUser {
        ApiUser {
            id: "u1".to_string(),
            username: "ada".to_string(),
            avatar_url: None,
        }
    }

    fn stage(active: bool, with_entry: bool) -> Stage {
        let created_at = NaiveDate::from_ymd_opt(2026, 10, 14)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        Stage {
            team: Team {
                id: 1,
                public_id: "t1".to_string(),
                name: "Team".to_string(),
                active,
                current_entry_id: with_entry.then_some(7),
                created_at,
            },
            participants: vec![viewer()],
            entry: with_entry.then(|| ApiEntry {
                id: "e1".to_string(),
                user: viewer(),
                created_at,
                images: EntryImages {
                    original: ImageLink {
                        url: "https://example.com/smile.gif".to_string(),
                    },
                    giphy_id: None,
                    preview: None,
                },
            }),
        }
    }

    #[test]
    fn rendered_stage_matches_selected_view() {
        for (active, with_entry, expected) in [
            (true, true, "presentation"),
            (true, false, "lobby"),
            (false, true, "ending"),
            (false, false, "ending"),
        ] {
            let html = render_stage(&stage(active, with_entry), &viewer()).into_string();
            let shown: Vec<&str> = ["lobby", "presentation", "ending"]
                .into_iter()
                .filter(|view| html.contains(&format!("data-view=\"{view}\"")))
                .collect();
            assert_eq!(shown, vec![expected]);
        }
    }

    #[test]
    fn presentation_shows_the_entry() {
        let html = render_stage(&stage(true, true), &viewer()).into_string();
        assert!(html.contains("https://example.com/smile.gif"));
        assert!(html.contains("/teams/t1/next"));
    }
}
