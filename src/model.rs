//! Data model for directory entities and their linked records.
//!
//! Everything here is constructed once from a raw JSON response and never
//! mutated afterwards, so values can be shared across workers without
//! synchronization.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::text::{normalize, normalize_json};

/// A resolved directory person.
///
/// `stable_id` is the durable textual identifier used by every linked-record
/// query; `numeric_id` is the integer identifier used for direct by-id fetch
/// and ID-space scanning. A profile missing either one is unresolved and is
/// never turned into an `OwnerRecord`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerRecord {
    pub stable_id: String,
    pub numeric_id: u64,
    pub given_name: String,
    pub family_name: String,
    pub email: String,
    pub orcid: String,
    pub departments: BTreeSet<String>,
    pub position_titles: BTreeSet<String>,
    pub biography: String,
    pub research_interests: Vec<String>,
    pub teaching_summary: String,
}

impl OwnerRecord {
    /// Builds an owner from one raw profile response.
    ///
    /// Returns `None` when the payload lacks either identifier.
    pub fn from_profile(js: &Value) -> Option<Self> {
        let stable_id = js.get("discoveryUrlId")?.as_str()?.to_string();
        let numeric_id = js.get("objectId")?.as_u64()?;
        if stable_id.is_empty() {
            return None;
        }

        let mut departments = BTreeSet::new();
        let mut position_titles = BTreeSet::new();
        if let Some(positions) = js.get("positions").and_then(Value::as_array) {
            for p in positions {
                let dept = normalize_json(p.get("department").unwrap_or(&Value::Null));
                if !dept.is_empty() {
                    departments.insert(dept);
                }
                let title = normalize_json(p.get("position").unwrap_or(&Value::Null));
                if !title.is_empty() {
                    position_titles.insert(title);
                }
            }
        }
        // Institutional appointments carry extra titles on some profiles.
        if let Some(appts) = js.get("institutionalAppointments").and_then(Value::as_array) {
            for a in appts {
                let title = normalize_json(a.get("position").unwrap_or(&Value::Null));
                if !title.is_empty() {
                    position_titles.insert(title);
                }
            }
        }

        Some(Self {
            stable_id,
            numeric_id,
            given_name: field(js, "firstName"),
            family_name: field(js, "lastName"),
            email: js
                .get("emailAddress")
                .and_then(|e| e.get("address"))
                .map(normalize_json)
                .unwrap_or_default(),
            orcid: orcid_field(js),
            departments,
            position_titles,
            biography: field(js, "overview"),
            research_interests: research_interests(js.get("researchInterests")),
            teaching_summary: field(js, "teachingSummary"),
        })
    }

    /// Display name: `"given family"` with surrounding whitespace dropped.
    pub fn full_name(&self) -> String {
        normalize(&format!("{} {}", self.given_name, self.family_name))
    }

    /// Public profile URL under `base` (the directory site root).
    pub fn profile_url(&self, base: &str) -> String {
        format!("{}/{}", base.trim_end_matches('/'), self.stable_id)
    }

    /// True when any department string contains `needle`, case-insensitively.
    pub fn department_contains(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.departments
            .iter()
            .any(|d| d.to_lowercase().contains(&needle))
    }

    /// True when any research-interest string contains `keyword`,
    /// case-insensitively.
    pub fn interests_contain(&self, keyword: &str) -> bool {
        let keyword = keyword.to_lowercase();
        self.research_interests
            .iter()
            .any(|r| r.to_lowercase().contains(&keyword))
    }
}

fn field(js: &Value, key: &str) -> String {
    js.get(key).map(normalize_json).unwrap_or_default()
}

/// `orcid` has appeared both as a bare string and as `{value: ...}`.
fn orcid_field(js: &Value) -> String {
    match js.get("orcid") {
        Some(Value::String(s)) => normalize(s),
        Some(obj @ Value::Object(_)) => obj.get("value").map(normalize_json).unwrap_or_default(),
        _ => String::new(),
    }
}

/// `researchInterests` has appeared as a plain string, a list of strings,
/// and a list of `{value|text|description}` objects.
fn research_interests(raw: Option<&Value>) -> Vec<String> {
    let mut out = Vec::new();
    match raw {
        Some(Value::String(s)) => {
            let cleaned = normalize(s);
            if !cleaned.is_empty() {
                out.push(cleaned);
            }
        }
        Some(Value::Array(items)) => {
            for item in items {
                let cleaned = match item {
                    Value::String(s) => normalize(s),
                    Value::Object(obj) => ["value", "text", "description"]
                        .iter()
                        .find_map(|k| obj.get(*k).and_then(Value::as_str))
                        .map(normalize)
                        .unwrap_or_default(),
                    _ => String::new(),
                };
                if !cleaned.is_empty() {
                    out.push(cleaned);
                }
            }
        }
        _ => {}
    }
    out
}

/// A calendar date the directory reports piecemeal; any part may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialDate {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

impl PartialDate {
    pub fn from_value(v: Option<&Value>) -> Self {
        let Some(v) = v else {
            return Self::default();
        };
        Self {
            year: v.get("year").and_then(Value::as_i64).map(|y| y as i32),
            month: v.get("month").and_then(Value::as_u64).map(|m| m as u32),
            day: v.get("day").and_then(Value::as_u64).map(|d| d as u32),
        }
    }
}

/// The three linked-record collections the directory exposes per owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    Publications,
    Grants,
    Teaching,
}

impl RecordKind {
    pub const ALL: [RecordKind; 3] = [
        RecordKind::Publications,
        RecordKind::Grants,
        RecordKind::Teaching,
    ];

    /// API path of the linked-to collection endpoint.
    pub fn endpoint(&self) -> &'static str {
        match self {
            RecordKind::Publications => "publications/linkedTo",
            RecordKind::Grants => "grants/linkedTo",
            RecordKind::Teaching => "teachingActivities/linkedTo",
        }
    }

    /// Page size the directory handles comfortably for this collection.
    pub fn default_page_size(&self) -> usize {
        match self {
            RecordKind::Publications | RecordKind::Grants => 25,
            RecordKind::Teaching => 50,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Publications => "publications",
            RecordKind::Grants => "grants",
            RecordKind::Teaching => "teaching",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One flattened publication, grant, or teaching-activity item.
///
/// Always carries the `stable_id` of the owner it was fetched under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedRecord {
    pub object_id: String,
    pub owner_stable_id: String,
    pub title: String,
    pub date: PartialDate,
    pub labels: Vec<String>,
    pub detail: RecordDetail,
}

/// Kind-specific fields of a [`LinkedRecord`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RecordDetail {
    Publication {
        journal: String,
        doi: String,
        url: Option<String>,
        authors: Vec<String>,
        volume: String,
        issue: String,
        pages: String,
        issn: String,
    },
    Grant {
        funder: String,
        award_type: String,
    },
    Teaching {
        activity_type: String,
        end_date: PartialDate,
    },
}

impl LinkedRecord {
    /// Flattens one page item into a record owned by `owner_stable_id`.
    pub fn from_item(kind: RecordKind, owner_stable_id: &str, item: &Value) -> Self {
        let object_id = match item.get("objectId") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        let labels = item
            .get("labels")
            .and_then(Value::as_array)
            .map(|ls| {
                ls.iter()
                    .filter_map(|l| l.get("value").and_then(Value::as_str))
                    .map(normalize)
                    .collect()
            })
            .unwrap_or_default();

        let (date, detail) = match kind {
            RecordKind::Publications => {
                let doi = field(item, "doi");
                let url = item
                    .get("url")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .or_else(|| (!doi.is_empty()).then(|| format!("https://doi.org/{doi}")));
                let authors = item
                    .get("authors")
                    .and_then(Value::as_array)
                    .map(|authors| {
                        authors
                            .iter()
                            .filter_map(|a| a.get("fullName").and_then(Value::as_str))
                            .map(normalize)
                            .collect()
                    })
                    .unwrap_or_default();
                (
                    PartialDate::from_value(item.get("publicationDate")),
                    RecordDetail::Publication {
                        journal: field(item, "journal"),
                        doi,
                        url,
                        authors,
                        volume: field(item, "volume"),
                        issue: field(item, "issue"),
                        // The remote reuses "pagination" for page ranges here.
                        pages: field(item, "pagination"),
                        issn: field(item, "issn"),
                    },
                )
            }
            RecordKind::Grants => (
                PartialDate::from_value(item.get("date1")),
                RecordDetail::Grant {
                    funder: field(item, "funderName"),
                    award_type: field(item, "objectTypeDisplayName"),
                },
            ),
            RecordKind::Teaching => (
                PartialDate::from_value(item.get("date1")),
                RecordDetail::Teaching {
                    activity_type: field(item, "objectTypeDisplayName"),
                    end_date: PartialDate::from_value(item.get("date2")),
                },
            ),
        };

        Self {
            object_id,
            owner_stable_id: owner_stable_id.to_string(),
            title: field(item, "title"),
            date,
            labels,
            detail,
        }
    }
}
