//! Recording entries and reading them back.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use db::{
    entry::{ApiEntry, Entry, NewEntry},
    gen_public_id,
    schema::{entries, users},
    user::User,
    DbConn,
};
use diesel::prelude::*;
use giphy::{Gif, GifLookup};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ApiError;

pub mod api;
pub mod forms;

/// A Monday-to-Sunday week. Both ends are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl WeekWindow {
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.start <= at && at <= self.end
    }
}

/// The week containing `now`: from Monday 00:00 up to the last nanosecond of
/// the following Sunday.
pub fn current_week(now: NaiveDateTime) -> WeekWindow {
    let date = now.date();
    let monday =
        date - Duration::days(date.weekday().num_days_from_monday() as i64);
    let start = monday.and_time(NaiveTime::MIN);
    let end = start + Duration::days(7) - Duration::nanoseconds(1);
    WeekWindow { start, end }
}

#[derive(Debug, Default, Clone)]
pub struct EntryFilter {
    /// Public ID of the user whose entries to return.
    pub user_id: Option<String>,
    pub current_week: bool,
}

/// Entries matching `filter`, newest first, each with its owner.
#[tracing::instrument(skip(conn))]
pub fn list_entries(
    conn: &mut SqliteConnection,
    filter: &EntryFilter,
    now: NaiveDateTime,
) -> QueryResult<Vec<ApiEntry>> {
    let mut query = entries::table
        .inner_join(users::table)
        .select((Entry::as_select(), User::as_select()))
        .into_boxed();

    if let Some(user_id) = &filter.user_id {
        query = query.filter(users::public_id.eq(user_id.clone()));
    }

    if filter.current_week {
        let week = current_week(now);
        query = query
            .filter(entries::created_at.ge(week.start))
            .filter(entries::created_at.le(week.end));
    }

    let rows = query
        .order_by((entries::created_at.desc(), entries::id.desc()))
        .load::<(Entry, User)>(conn)?;

    Ok(rows
        .into_iter()
        .map(|(entry, user)| ApiEntry::of_row(entry, &user))
        .collect())
}

/// Loads a single entry together with its owner.
pub fn entry_with_owner(
    conn: &mut SqliteConnection,
    entry_id: i64,
) -> QueryResult<Option<ApiEntry>> {
    let row = entries::table
        .find(entry_id)
        .inner_join(users::table)
        .select((Entry::as_select(), User::as_select()))
        .first::<(Entry, User)>(conn)
        .optional()?;
    Ok(row.map(|(entry, user)| ApiEntry::of_row(entry, &user)))
}

/// The body accepted by `POST /api/entries`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEntryRequest {
    pub user_id: String,
    pub url: String,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub created_at: Option<NaiveDateTime>,
}

/// Accepts RFC 3339 timestamps (converted to UTC), offset-less ISO 8601
/// date-times, and plain dates.
fn deserialize_timestamp<'de, D>(
    deserializer: D,
) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    raw.map(|raw| {
        parse_timestamp(&raw).ok_or_else(|| {
            <D::Error as serde::de::Error>::custom(format!(
                "invalid date `{raw}`"
            ))
        })
    })
    .transpose()
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.naive_utc())
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .map(|date| date.and_time(NaiveTime::MIN))
        })
}

impl NewEntryRequest {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.user_id.trim().is_empty() {
            return Err(ApiError::InvalidBody("`userId` is empty".to_string()));
        }
        if self.url.trim().is_empty() {
            return Err(ApiError::InvalidBody("`url` is empty".to_string()));
        }
        Ok(())
    }
}

/// Best-effort Giphy metadata for `url`. Failures are logged and otherwise
/// ignored.
async fn enrich(gifs: &dyn GifLookup, url: &str) -> Option<(String, Gif)> {
    let giphy_id = giphy::giphy_id(url)?;

    match gifs.gif(&giphy_id).await {
        Ok(Some(gif)) => Some((giphy_id, gif)),
        Ok(None) => {
            tracing::warn!("Unable to fetch giphy image: {giphy_id}");
            None
        }
        Err(e) => {
            tracing::warn!("Error fetching giphy image {giphy_id}: {e}");
            None
        }
    }
}

/// Records a new entry and returns it joined with its owner.
///
/// The owner must already exist. Giphy enrichment happens between the
/// owner check and the insert, outside of any database transaction.
#[tracing::instrument(skip(db, gifs))]
pub async fn create_entry(
    db: &DbConn,
    gifs: &dyn GifLookup,
    request: NewEntryRequest,
    now: NaiveDateTime,
) -> Result<ApiEntry, ApiError> {
    request.validate()?;

    let owner_id = request.user_id.trim().to_string();
    let owner = db
        .run(move |conn| User::by_public_id(&owner_id, conn))
        .await?
        .ok_or(ApiError::UnknownUser)?;

    let enrichment = enrich(gifs, &request.url).await;

    let user_id = owner.id;
    let url = request.url.trim().to_string();
    let created_at = request.created_at.unwrap_or(now);
    let entry = db
        .run(move |conn| {
            let public_id = gen_public_id();
            let (giphy_id, preview_url) = match &enrichment {
                Some((id, gif)) => {
                    (Some(id.as_str()), Some(gif.preview.url.as_str()))
                }
                None => (None, None),
            };
            diesel::insert_into(entries::table)
                .values(&NewEntry {
                    public_id: &public_id,
                    user_id,
                    created_at,
                    original_url: &url,
                    giphy_id,
                    preview_url,
                })
                .returning(Entry::as_returning())
                .get_result(conn)
        })
        .await?;

    tracing::info!(entry = %entry.public_id, "recorded entry");

    Ok(ApiEntry::of_row(entry, &owner))
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
    use db::{
        entry::NewEntry,
        schema::{entries, users},
    };
    use diesel::prelude::*;
    use diesel_migrations::MigrationHarness;

    use super::*;
    use crate::MIGRATIONS;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    fn memory_db() -> SqliteConnection {
        let mut conn = SqliteConnection::establish(":memory:").unwrap();
        conn.run_pending_migrations(MIGRATIONS).unwrap();
        conn
    }

    fn add_user(conn: &mut SqliteConnection, name: &str) -> i64 {
        diesel::insert_into(users::table)
            .values((
                users::public_id.eq(format!("user-{name}")),
                users::username.eq(name),
                users::email.eq(format!("{name}@example.com")),
                users::password_hash.eq("unused"),
                users::created_at.eq(at(2026, 1, 1, 0, 0, 0)),
            ))
            .returning(users::id)
            .get_result(conn)
            .unwrap()
    }

    fn add_entry(
        conn: &mut SqliteConnection,
        user_id: i64,
        url: &str,
        created_at: NaiveDateTime,
    ) {
        diesel::insert_into(entries::table)
            .values(&NewEntry {
                public_id: url,
                user_id,
                created_at,
                original_url: url,
                giphy_id: None,
                preview_url: None,
            })
            .execute(conn)
            .unwrap();
    }

    #[test]
    fn week_runs_monday_to_sunday() {
        // 2026-10-14 is a Wednesday
        let week = current_week(at(2026, 10, 14, 15, 30, 0));
        assert_eq!(week.start, at(2026, 10, 12, 0, 0, 0));
        assert_eq!(
            week.end,
            NaiveDate::from_ymd_opt(2026, 10, 18)
                .unwrap()
                .and_hms_nano_opt(23, 59, 59, 999_999_999)
                .unwrap()
        );
    }

    #[test]
    fn week_of_its_own_boundaries() {
        let monday = at(2026, 10, 12, 0, 0, 0);
        assert_eq!(current_week(monday).start, monday);

        let late_sunday = NaiveDate::from_ymd_opt(2026, 10, 18)
            .unwrap()
            .and_time(NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999).unwrap());
        assert_eq!(current_week(late_sunday), current_week(monday));
        assert!(current_week(monday).contains(late_sunday));
        assert!(!current_week(monday).contains(at(2026, 10, 19, 0, 0, 0)));
    }

    #[test]
    fn current_week_filter_keeps_boundaries_and_drops_outside() {
        let mut conn = memory_db();
        let ada = add_user(&mut conn, "ada");
        let now = at(2026, 10, 14, 12, 0, 0);
        let week = current_week(now);

        add_entry(&mut conn, ada, "start", week.start);
        add_entry(&mut conn, ada, "end", week.end);
        add_entry(&mut conn, ada, "middle", now);
        add_entry(
            &mut conn,
            ada,
            "before",
            week.start - chrono::Duration::nanoseconds(1),
        );
        add_entry(
            &mut conn,
            ada,
            "after",
            week.end + chrono::Duration::nanoseconds(1),
        );

        let filter = EntryFilter {
            user_id: None,
            current_week: true,
        };
        let urls: Vec<String> = list_entries(&mut conn, &filter, now)
            .unwrap()
            .into_iter()
            .map(|entry| entry.images.original.url)
            .collect();
        assert_eq!(urls, vec!["end", "middle", "start"]);

        let everything =
            list_entries(&mut conn, &EntryFilter::default(), now).unwrap();
        assert_eq!(everything.len(), 5);
    }

    #[test]
    fn user_filter_and_ordering() {
        let mut conn = memory_db();
        let ada = add_user(&mut conn, "ada");
        let grace = add_user(&mut conn, "grace");
        add_entry(&mut conn, ada, "a1", at(2026, 3, 1, 9, 0, 0));
        add_entry(&mut conn, grace, "g1", at(2026, 3, 2, 9, 0, 0));
        add_entry(&mut conn, ada, "a2", at(2026, 3, 3, 9, 0, 0));

        let now = at(2026, 10, 14, 12, 0, 0);
        let all = list_entries(&mut conn, &EntryFilter::default(), now).unwrap();
        let urls: Vec<&str> =
            all.iter().map(|e| e.images.original.url.as_str()).collect();
        assert_eq!(urls, vec!["a2", "g1", "a1"]);
        assert_eq!(all[1].user.username, "grace");

        let only_ada = list_entries(
            &mut conn,
            &EntryFilter {
                user_id: Some("user-ada".to_string()),
                current_week: false,
            },
            now,
        )
        .unwrap();
        assert_eq!(only_ada.len(), 2);
        assert!(only_ada.iter().all(|e| e.user.id == "user-ada"));

        let nobody = list_entries(
            &mut conn,
            &EntryFilter {
                user_id: Some("no-such-user".to_string()),
                current_week: false,
            },
            now,
        )
        .unwrap();
        assert!(nobody.is_empty());
    }

    #[test]
    fn request_parsing() {
        let request: NewEntryRequest = serde_json::from_str(
            r#"{"userId": "u1", "url": "https://example.com/a.gif", "createdAt": "2026-10-14T10:00:00+02:00"}"#,
        )
        .unwrap();
        assert_eq!(request.created_at, Some(at(2026, 10, 14, 8, 0, 0)));

        let request: NewEntryRequest = serde_json::from_str(
            r#"{"userId": "u1", "url": "https://example.com/a.gif", "createdAt": "2026-10-14"}"#,
        )
        .unwrap();
        assert_eq!(request.created_at, Some(at(2026, 10, 14, 0, 0, 0)));

        let request: NewEntryRequest =
            serde_json::from_str(r#"{"userId": "u1", "url": "x"}"#).unwrap();
        assert_eq!(request.created_at, None);

        assert!(serde_json::from_str::<NewEntryRequest>(r#"{"userId": "u1"}"#).is_err());
        assert!(serde_json::from_str::<NewEntryRequest>(
            r#"{"userId": "u1", "url": "x", "createdAt": "yesterday"}"#
        )
        .is_err());
        assert!(serde_json::from_str::<NewEntryRequest>(r#"{"userId": 4, "url": "x"}"#).is_err());
    }

    #[test]
    fn blank_fields_are_invalid() {
        let request = NewEntryRequest {
            user_id: "u1".to_string(),
            url: "  ".to_string(),
            created_at: None,
        };
        assert!(matches!(request.validate(), Err(ApiError::InvalidBody(_))));
    }
}
