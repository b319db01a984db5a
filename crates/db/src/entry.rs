use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    schema::entries,
    user::{ApiUser, User},
};

#[derive(Debug, Queryable, Selectable, Identifiable, Clone)]
#[diesel(table_name = entries)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Entry {
    pub id: i64,
    pub public_id: String,
    pub user_id: i64,
    pub created_at: NaiveDateTime,
    pub original_url: String,
    pub giphy_id: Option<String>,
    pub preview_url: Option<String>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = entries)]
pub struct NewEntry<'a> {
    pub public_id: &'a str,
    pub user_id: i64,
    pub created_at: NaiveDateTime,
    pub original_url: &'a str,
    pub giphy_id: Option<&'a str>,
    pub preview_url: Option<&'a str>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ImageLink {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EntryImages {
    pub original: ImageLink,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub giphy_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub preview: Option<ImageLink>,
}

/// An entry as clients see it: annotated with its owner.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ApiEntry {
    pub id: String,
    pub user: ApiUser,
    pub created_at: NaiveDateTime,
    pub images: EntryImages,
}

impl ApiEntry {
    pub fn of_row(entry: Entry, user: &User) -> ApiEntry {
        ApiEntry {
            id: entry.public_id,
            user: ApiUser::from(user),
            created_at: entry.created_at,
            images: EntryImages {
                original: ImageLink {
                    url: entry.original_url,
                },
                giphy_id: entry.giphy_id,
                preview: entry.preview_url.map(|url| ImageLink { url }),
            },
        }
    }

    /// The URL to show in compact listings: the preview if there is one.
    pub fn display_url(&self) -> &str {
        self.images
            .preview
            .as_ref()
            .map(|preview| preview.url.as_str())
            .unwrap_or(&self.images.original.url)
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{ApiEntry, Entry};
    use crate::user::User;

    #[test]
    fn rows_become_api_entries() {
        let created_at = NaiveDate::from_ymd_opt(2026, 10, 12)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let user = User {
            id: 1,
            public_id: "u1".to_string(),
            username: "ada".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: String::new(),
            avatar_url: None,
            current_team_id: None,
            created_at,
        };
        let entry = Entry {
            id: 7,
            public_id: "e1".to_string(),
            user_id: 1,
            created_at,
            original_url: "https://giphy.com/gifs/abc123".to_string(),
            giphy_id: Some("abc123".to_string()),
            preview_url: Some("https://media.giphy.com/media/abc123/giphy-preview.gif".to_string()),
        };

        let api = ApiEntry::of_row(entry.clone(), &user);
        assert_eq!(api.id, "e1");
        assert_eq!(api.user.id, "u1");
        assert_eq!(api.display_url(), "https://media.giphy.com/media/abc123/giphy-preview.gif");

        let plain = ApiEntry::of_row(
            Entry {
                giphy_id: None,
                preview_url: None,
                ..entry
            },
            &user,
        );
        assert_eq!(plain.display_url(), "https://giphy.com/gifs/abc123");
        let json = serde_json::to_value(&plain).unwrap();
        assert!(json["images"].get("preview").is_none());
        assert!(json["images"].get("giphyId").is_none());
    }
}
