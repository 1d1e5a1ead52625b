//! Fuzzy name-to-identifier resolution.
//!
//! Resolution tries each name variant in confidence order: an exact
//! candidate match wins immediately, loose matches are held back and scored,
//! and "nobody matched" is a normal outcome, distinct from "every lookup
//! blew up".

use std::collections::HashMap;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::directory::client::DirectoryClient;
use crate::model::OwnerRecord;
use crate::names::{NameQuery, VariantGenerator};
use crate::text::normalize;

/// Outcome of a resolution attempt. `NotFound` is expected, not an error.
#[derive(Debug, Clone)]
pub enum Resolution {
    Resolved(OwnerRecord),
    NotFound,
}

impl Resolution {
    pub fn owner(self) -> Option<OwnerRecord> {
        match self {
            Resolution::Resolved(owner) => Some(owner),
            Resolution::NotFound => None,
        }
    }
}

/// Resolution failed outright: every variant lookup raised a transport or
/// parse error. Distinct from [`Resolution::NotFound`].
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("all {attempts} variant lookups failed for '{name}'")]
    AllVariantsFailed { name: String, attempts: usize },
}

/// A loose match waiting to see if a later variant produces an exact one.
struct LooseCandidate {
    score: u32,
    owner: OwnerRecord,
}

/// Resolves full names to directory owners.
pub struct Resolver<'a> {
    client: &'a DirectoryClient,
    generator: VariantGenerator,
    /// Normalized full name -> stable id; checked first, always wins.
    overrides: HashMap<String, String>,
}

impl<'a> Resolver<'a> {
    pub fn new(client: &'a DirectoryClient) -> Self {
        Self {
            client,
            generator: VariantGenerator::default(),
            overrides: HashMap::new(),
        }
    }

    pub fn with_generator(mut self, generator: VariantGenerator) -> Self {
        self.generator = generator;
        self
    }

    /// Known-troublesome names mapped straight to their stable ids.
    pub fn with_overrides(mut self, overrides: HashMap<String, String>) -> Self {
        self.overrides = overrides
            .into_iter()
            .map(|(name, id)| (normalize(&name), id))
            .collect();
        self
    }

    /// Resolves `full_name` to its best-matching owner.
    ///
    /// Per-variant failures are swallowed and resolution moves on; only when
    /// every variant attempt errored does this return [`ResolveError`].
    pub async fn resolve(&self, full_name: &str) -> Result<Resolution, ResolveError> {
        let name = normalize(full_name);

        if let Some(stable_id) = self.overrides.get(&name) {
            debug!(%name, %stable_id, "manual override hit");
            return match self.client.owner_by_stable_id(stable_id).await {
                Ok(Some(owner)) => Ok(Resolution::Resolved(owner)),
                Ok(None) => Ok(Resolution::NotFound),
                Err(error) => {
                    debug!(%name, %error, "override profile fetch failed");
                    Err(ResolveError::AllVariantsFailed { name, attempts: 1 })
                }
            };
        }

        let variants = self.generator.variants(&name);
        if variants.is_empty() {
            return Ok(Resolution::NotFound);
        }

        let mut best_loose: Option<LooseCandidate> = None;
        let mut failures = 0usize;

        for variant in &variants {
            let page = match self
                .client
                .search_users(
                    &variant.search_text(),
                    0,
                    self.client.config().search_page_size,
                )
                .await
            {
                Ok(page) => page,
                Err(error) => {
                    debug!(query = %variant.search_text(), %error, "variant lookup failed");
                    failures += 1;
                    continue;
                }
            };

            for candidate in &page.candidates {
                if is_exact_match(candidate, variant) {
                    if let Some(owner) = OwnerRecord::from_profile(candidate) {
                        info!(
                            name = %name,
                            stable_id = %owner.stable_id,
                            rule = ?variant.rule,
                            "exact match"
                        );
                        return Ok(Resolution::Resolved(owner));
                    }
                } else if is_loose_match(candidate, variant) {
                    consider_loose(&mut best_loose, candidate);
                }
            }
        }

        if failures == variants.len() {
            return Err(ResolveError::AllVariantsFailed {
                name,
                attempts: failures,
            });
        }

        match best_loose {
            Some(loose) => {
                info!(
                    name = %name,
                    stable_id = %loose.owner.stable_id,
                    score = loose.score,
                    "loose match"
                );
                Ok(Resolution::Resolved(loose.owner))
            }
            None => Ok(Resolution::NotFound),
        }
    }
}

fn candidate_names(candidate: &Value) -> (String, String) {
    let get = |key| {
        candidate
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_lowercase()
    };
    (get("firstName"), get("lastName"))
}

/// Candidate given/family equal the query's, case-insensitively.
fn is_exact_match(candidate: &Value, query: &NameQuery) -> bool {
    let (given, family) = candidate_names(candidate);
    given == query.given.to_lowercase() && family == query.family.to_lowercase()
}

/// Family names equal and one given name is a prefix of the other.
fn is_loose_match(candidate: &Value, query: &NameQuery) -> bool {
    let (given, family) = candidate_names(candidate);
    if family != query.family.to_lowercase() || given.is_empty() {
        return false;
    }
    let queried = query.given.to_lowercase();
    given.starts_with(&queried) || queried.starts_with(&given)
}

/// Profile completeness: a point each for listed positions and publications.
fn loose_score(candidate: &Value) -> u32 {
    let present = |key| {
        candidate
            .get(key)
            .map(|v| match v {
                Value::Array(a) => !a.is_empty(),
                Value::Null => false,
                Value::String(s) => !s.is_empty(),
                _ => true,
            })
            .unwrap_or(false)
    };
    present("positions") as u32 + present("publications") as u32
}

fn consider_loose(best: &mut Option<LooseCandidate>, candidate: &Value) {
    let Some(owner) = OwnerRecord::from_profile(candidate) else {
        return; // unresolvable candidates are never eligible
    };
    let score = loose_score(candidate);
    let better = match best {
        None => true,
        // Higher score wins; equal scores break ties toward the smaller
        // numeric id so repeated runs pick the same record.
        Some(current) => {
            score > current.score
                || (score == current.score && owner.numeric_id < current.owner.numeric_id)
        }
    };
    if better {
        *best = Some(LooseCandidate { score, owner });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::client::ClientConfig;
    use crate::testutil::{profile_json, MockTransport};
    use serde_json::json;
    use std::sync::Arc;

    fn search_body(candidates: Vec<Value>) -> Value {
        let total = candidates.len();
        json!({"resource": candidates, "pagination": {"total": total}})
    }

    fn client_searching(
        handler: impl Fn(&str) -> Result<Value, crate::directory::client::TransportError>
            + Send
            + Sync
            + 'static,
    ) -> (DirectoryClient, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::new(
            |path| Err(MockTransport::status_error(path, 404)),
            move |_, payload| {
                let text = payload["params"]["text"].as_str().unwrap_or_default();
                handler(text)
            },
        ));
        (
            DirectoryClient::with_transport(ClientConfig::default(), transport.clone()),
            transport,
        )
    }

    #[tokio::test]
    async fn first_exact_match_wins_and_later_variants_are_not_queried() {
        // Variant #1 "Maria Garcia" (hyphen-stripped comes later); both would
        // match exactly, only the first may be consulted.
        let (client, transport) = client_searching(|text| {
            Ok(match text {
                "Maria Lopez-Garcia" => {
                    search_body(vec![profile_json(9, "9-maria", "Maria", "Lopez-Garcia")])
                }
                _ => search_body(vec![profile_json(11, "11-other", "Maria", "Garcia")]),
            })
        });

        let resolved = Resolver::new(&client)
            .resolve("Maria Lopez-Garcia")
            .await
            .unwrap()
            .owner()
            .unwrap();
        assert_eq!(resolved.stable_id, "9-maria");
        assert_eq!(transport.posts().len(), 1);
    }

    #[tokio::test]
    async fn loose_matches_scored_by_completeness_with_id_tie_break() {
        // No exact match anywhere: candidate given names are prefixes of the
        // query's. Completeness scoring picks the fuller profile; on ties the
        // smaller numeric id wins.
        let sparse = json!({
            "objectId": 3, "discoveryUrlId": "3-rob", "firstName": "Rob", "lastName": "Hale"
        });
        let full = json!({
            "objectId": 8, "discoveryUrlId": "8-rob", "firstName": "Rob", "lastName": "Hale",
            "positions": [{"department": "Surgery"}],
            "publications": [{"objectId": 1}]
        });
        let (client, _) =
            client_searching(move |_| Ok(search_body(vec![sparse.clone(), full.clone()])));
        let resolved = Resolver::new(&client)
            .resolve("Robert Hale")
            .await
            .unwrap()
            .owner()
            .unwrap();
        assert_eq!(resolved.stable_id, "8-rob");

        let twin_a = json!({
            "objectId": 21, "discoveryUrlId": "21-rob", "firstName": "Rob", "lastName": "Hale"
        });
        let twin_b = json!({
            "objectId": 12, "discoveryUrlId": "12-rob", "firstName": "Rob", "lastName": "Hale"
        });
        let (client, _) =
            client_searching(move |_| Ok(search_body(vec![twin_a.clone(), twin_b.clone()])));
        let resolved = Resolver::new(&client)
            .resolve("Robert Hale")
            .await
            .unwrap()
            .owner()
            .unwrap();
        assert_eq!(resolved.numeric_id, 12);
    }

    #[tokio::test]
    async fn no_candidates_is_not_found_not_an_error() {
        let (client, _) = client_searching(|_| Ok(search_body(vec![])));
        let outcome = Resolver::new(&client).resolve("Nobody Here").await.unwrap();
        assert!(matches!(outcome, Resolution::NotFound));
    }

    #[tokio::test]
    async fn partial_failures_continue_but_total_failure_errors() {
        // First variant errors, second succeeds with an exact match.
        let (client, _) = client_searching(|text| {
            if text == "Maria Lopez-Garcia" {
                Err(MockTransport::status_error("users", 500))
            } else {
                Ok(search_body(vec![profile_json(5, "5-maria", "Maria", "Garcia")]))
            }
        });
        let resolved = Resolver::new(&client)
            .resolve("Maria Lopez-Garcia")
            .await
            .unwrap()
            .owner()
            .unwrap();
        assert_eq!(resolved.stable_id, "5-maria");

        // Every variant errors: surfaced as a failure, not NotFound.
        let (client, _) = client_searching(|_| Err(MockTransport::status_error("users", 500)));
        let err = Resolver::new(&client)
            .resolve("Maria Lopez-Garcia")
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::AllVariantsFailed { .. }));
    }

    #[tokio::test]
    async fn manual_override_bypasses_search() {
        let transport = Arc::new(MockTransport::new(
            |path| {
                assert_eq!(path, "users/12139-kristen-allen-watts");
                Ok(profile_json(12139, "12139-kristen-allen-watts", "Kristen", "Allen Watts"))
            },
            |_, _| panic!("override must not search"),
        ));
        let client = DirectoryClient::with_transport(ClientConfig::default(), transport);
        let overrides = HashMap::from([(
            "Kristen  Allen-Watts".to_string(), // normalization applies to keys
            "12139-kristen-allen-watts".to_string(),
        )]);
        let resolved = Resolver::new(&client)
            .with_overrides(overrides)
            .resolve("Kristen Allen-Watts")
            .await
            .unwrap()
            .owner()
            .unwrap();
        assert_eq!(resolved.numeric_id, 12139);
    }

    #[tokio::test]
    async fn nickname_variant_resolves_when_literal_tokens_would_not() {
        // "Jim Allen Watts": the literal (Jim, Watts) variant matches nothing;
        // the nickname-mapped (James, Allen Watts) variant matches exactly.
        let (client, _) = client_searching(|text| {
            Ok(if text == "James Allen Watts" {
                search_body(vec![profile_json(77, "77-james", "James", "Allen Watts")])
            } else {
                search_body(vec![])
            })
        });
        let resolved = Resolver::new(&client)
            .resolve("Jim Allen Watts")
            .await
            .unwrap()
            .owner()
            .unwrap();
        assert_eq!(resolved.stable_id, "77-james");
    }
}
