//! Document record schema and validation
//!
//! The persisted shape is `{_id, executor, document, dateGiven, dateReturned,
//! createdAt, updatedAt}`; field names must match existing stored data
//! exactly. `status` is never stored, it is derived from `dateReturned`.
//!
//! Validation reasons are domain-language strings the original audience
//! expects verbatim, so they live in a configurable [`Messages`] catalog
//! rather than being hardcoded at the check sites.

use bson::{doc, oid::ObjectId, Document};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Deserializer, Serialize};

use crate::clock::Clock;
use crate::db::mongo::IntoIndexes;
use crate::types::DocError;

/// Collection name for documents
pub const DOCUMENT_COLLECTION: &str = "documents";

pub const EXECUTOR_MIN: usize = 5;
pub const EXECUTOR_MAX: usize = 100;
pub const TITLE_MIN: usize = 5;
pub const TITLE_MAX: usize = 200;

/// Validation message catalog
///
/// Defaults are the original system's strings, kept verbatim. Deployments
/// can override any of them.
#[derive(Debug, Clone)]
pub struct Messages {
    pub executor_required: String,
    pub executor_too_short: String,
    pub executor_too_long: String,
    pub title_required: String,
    pub title_too_short: String,
    pub title_too_long: String,
    pub date_given_required: String,
    pub date_given_in_future: String,
    pub date_returned_before_given: String,
    pub no_fields_to_update: String,
    pub invalid_status: String,
    pub invalid_id: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            executor_required: "Виконавець є обов'язковим полем".to_string(),
            executor_too_short: "Ім'я виконавця повинно містити мінімум 5 символів".to_string(),
            executor_too_long: "Ім'я виконавця не може перевищувати 100 символів".to_string(),
            title_required: "Назва документа є обов'язковим полем".to_string(),
            title_too_short: "Назва документа повинна містити мінімум 5 символів".to_string(),
            title_too_long: "Назва документа не може перевищувати 200 символів".to_string(),
            date_given_required: "Дата передачі є обов'язковим полем".to_string(),
            date_given_in_future: "Дата передачі не може бути в майбутньому".to_string(),
            date_returned_before_given: "Дата повернення не може бути раніше дати передачі"
                .to_string(),
            no_fields_to_update: "No fields to update".to_string(),
            invalid_status: r#"Invalid status. Use "active" or "returned""#.to_string(),
            invalid_id: "Invalid document ID format".to_string(),
        }
    }
}

/// Document status, derived from `dateReturned`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Active,
    Returned,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Active => "active",
            Status::Returned => "returned",
        }
    }

    /// Parse a client-supplied status filter value
    pub fn parse(value: &str, messages: &Messages) -> Result<Self, DocError> {
        match value {
            "active" => Ok(Status::Active),
            "returned" => Ok(Status::Returned),
            _ => Err(DocError::validation("status", &messages.invalid_status)),
        }
    }
}

/// Derive the status from the presence of a return date
pub fn derive_status(date_returned: Option<&bson::DateTime>) -> Status {
    match date_returned {
        Some(_) => Status::Returned,
        None => Status::Active,
    }
}

/// An incoming timestamp, either timezone-aware or naive
///
/// The two kinds compare against different "now"s and normalize differently
/// when mixed, matching how clients have always supplied these values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stamp {
    Aware(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
}

impl Stamp {
    /// Parse from a string: RFC 3339 with offset, then naive datetime,
    /// then plain date (midnight)
    pub fn parse(value: &str) -> Option<Self> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Some(Stamp::Aware(dt));
        }
        for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(value, fmt) {
                return Some(Stamp::Naive(naive));
            }
        }
        if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
            return Some(Stamp::Naive(date.and_hms_opt(0, 0, 0)?));
        }
        None
    }

    /// Whether this timestamp is strictly after "now"
    ///
    /// Aware stamps compare against UTC now, naive stamps against local
    /// naive now, so a naive value never crashes against an aware clock.
    pub fn is_in_future(&self, clock: &dyn Clock) -> bool {
        match self {
            Stamp::Aware(dt) => dt.with_timezone(&Utc) > clock.now_utc(),
            Stamp::Naive(naive) => *naive > clock.now_naive(),
        }
    }

    /// Whether `self` is strictly before `other`
    ///
    /// Same-kind stamps compare directly; mixed kinds normalize to UTC,
    /// treating the naive side as already-UTC.
    pub fn is_before(&self, other: &Stamp) -> bool {
        match (self, other) {
            (Stamp::Aware(a), Stamp::Aware(b)) => a < b,
            (Stamp::Naive(a), Stamp::Naive(b)) => a < b,
            _ => self.to_utc() < other.to_utc(),
        }
    }

    /// Normalize to a UTC instant, treating naive values as UTC
    fn to_utc(&self) -> DateTime<Utc> {
        match self {
            Stamp::Aware(dt) => dt.with_timezone(&Utc),
            Stamp::Naive(naive) => Utc.from_utc_datetime(naive),
        }
    }

    /// Convert to a BSON datetime for storage
    pub fn to_bson(&self) -> bson::DateTime {
        bson::DateTime::from_chrono(self.to_utc())
    }
}

impl<'de> Deserialize<'de> for Stamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Stamp::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", raw)))
    }
}

/// Presence-tracking field wrapper for partial updates
///
/// Distinguishes "field omitted" (left untouched) from "field explicitly
/// null" (cleared, where the field allows it). A bare `Option` cannot
/// represent the difference.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Patch<T> {
    #[default]
    Unset,
    Null,
    Value(T),
}

impl<T> Patch<T> {
    pub fn is_unset(&self) -> bool {
        matches!(self, Patch::Unset)
    }
}

impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    // serde(default) yields Unset for omitted fields; a present field
    // deserializes here, so null maps to Null
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => Patch::Value(value),
            None => Patch::Null,
        })
    }
}

/// Document as persisted in MongoDB
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    pub executor: String,

    /// Document title (field name "document" in the stored shape)
    pub document: String,

    #[serde(rename = "dateGiven")]
    pub date_given: bson::DateTime,

    #[serde(rename = "dateReturned")]
    pub date_returned: Option<bson::DateTime>,

    #[serde(rename = "createdAt")]
    pub created_at: bson::DateTime,

    #[serde(rename = "updatedAt")]
    pub updated_at: bson::DateTime,
}

impl DocumentRecord {
    /// Derived status, never stored
    pub fn status(&self) -> Status {
        derive_status(self.date_returned.as_ref())
    }
}

impl IntoIndexes for DocumentRecord {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (
                doc! { "executor": 1 },
                Some(IndexOptions::builder().name("executor_index".to_string()).build()),
            ),
            (
                doc! { "dateGiven": -1 },
                Some(IndexOptions::builder().name("date_given_desc".to_string()).build()),
            ),
            (
                doc! { "dateReturned": 1 },
                Some(IndexOptions::builder().name("date_returned_index".to_string()).build()),
            ),
        ]
    }
}

/// Create command: the four base fields, nothing else
///
/// Timestamps and id are assigned server-side.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDocument {
    pub executor: String,
    pub document: String,
    #[serde(rename = "dateGiven")]
    pub date_given: Stamp,
    #[serde(rename = "dateReturned")]
    pub date_returned: Option<Stamp>,
}

impl CreateDocument {
    /// Validate field constraints and cross-field date invariants
    pub fn validate(&self, clock: &dyn Clock, messages: &Messages) -> Result<(), DocError> {
        validate_executor(&self.executor, messages)?;
        validate_title(&self.document, messages)?;
        validate_date_given(&self.date_given, clock, messages)?;

        if let Some(ref returned) = self.date_returned {
            if returned.is_before(&self.date_given) {
                return Err(DocError::validation(
                    "dateReturned",
                    &messages.date_returned_before_given,
                ));
            }
        }

        Ok(())
    }
}

/// Update command: each field independently omitted, null, or set
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDocument {
    #[serde(default)]
    pub executor: Patch<String>,
    #[serde(default)]
    pub document: Patch<String>,
    #[serde(default, rename = "dateGiven")]
    pub date_given: Patch<Stamp>,
    #[serde(default, rename = "dateReturned")]
    pub date_returned: Patch<Stamp>,
}

impl UpdateDocument {
    /// Validate present fields and build the `$set` document
    ///
    /// Omitted fields are left untouched. Explicit null is only meaningful
    /// for `dateReturned` (clears the return date); the other fields are
    /// required on every stored record, so nulling them is rejected with the
    /// field's "required" reason. An update that touches nothing fails
    /// before any store call.
    pub fn validate(&self, clock: &dyn Clock, messages: &Messages) -> Result<Document, DocError> {
        let mut set = doc! {};

        match &self.executor {
            Patch::Unset => {}
            Patch::Null => {
                return Err(DocError::validation("executor", &messages.executor_required))
            }
            Patch::Value(executor) => {
                validate_executor(executor, messages)?;
                set.insert("executor", executor.as_str());
            }
        }

        match &self.document {
            Patch::Unset => {}
            Patch::Null => return Err(DocError::validation("document", &messages.title_required)),
            Patch::Value(title) => {
                validate_title(title, messages)?;
                set.insert("document", title.as_str());
            }
        }

        match &self.date_given {
            Patch::Unset => {}
            Patch::Null => {
                return Err(DocError::validation("dateGiven", &messages.date_given_required))
            }
            Patch::Value(given) => {
                validate_date_given(given, clock, messages)?;
                set.insert("dateGiven", given.to_bson());
            }
        }

        match &self.date_returned {
            Patch::Unset => {}
            Patch::Null => {
                set.insert("dateReturned", bson::Bson::Null);
            }
            Patch::Value(returned) => {
                // Ordering is checked only when both dates travel in the same
                // patch; a lone dateReturned is accepted against the stored
                // dateGiven without a pre-read
                if let Patch::Value(ref given) = self.date_given {
                    if returned.is_before(given) {
                        return Err(DocError::validation(
                            "dateReturned",
                            &messages.date_returned_before_given,
                        ));
                    }
                }
                set.insert("dateReturned", returned.to_bson());
            }
        }

        if set.is_empty() {
            return Err(DocError::validation("update", &messages.no_fields_to_update));
        }

        Ok(set)
    }
}

fn validate_executor(value: &str, messages: &Messages) -> Result<(), DocError> {
    let len = value.chars().count();
    if len < EXECUTOR_MIN {
        return Err(DocError::validation("executor", &messages.executor_too_short));
    }
    if len > EXECUTOR_MAX {
        return Err(DocError::validation("executor", &messages.executor_too_long));
    }
    Ok(())
}

fn validate_title(value: &str, messages: &Messages) -> Result<(), DocError> {
    let len = value.chars().count();
    if len < TITLE_MIN {
        return Err(DocError::validation("document", &messages.title_too_short));
    }
    if len > TITLE_MAX {
        return Err(DocError::validation("document", &messages.title_too_long));
    }
    Ok(())
}

fn validate_date_given(value: &Stamp, clock: &dyn Clock, messages: &Messages) -> Result<(), DocError> {
    if value.is_in_future(clock) {
        return Err(DocError::validation("dateGiven", &messages.date_given_in_future));
    }
    Ok(())
}
