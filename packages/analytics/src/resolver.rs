//! Region resolution.
//!
//! Two modes: an explicit comma-separated id list resolves to a
//! [`RegionSet`] with unknown ids recorded as missing; free text resolves to
//! a single [`Region`] through caller context, a fixed gazetteer, and a
//! small set of prepositional patterns, followed by a name lookup in the
//! store.

use std::sync::LazyLock;

use ingres_analytics_models::{QueryContext, RegionSet};
use ingres_database::GroundwaterStore;
use ingres_database_models::{RegionOrder, RegionQuery};
use ingres_groundwater_models::Region;
use regex::Regex;

use crate::{AnalyticsError, params};

/// Indian states and major cities recognised by name, in match priority.
pub const GAZETTEER: [&str; 35] = [
    "andhra pradesh",
    "arunachal pradesh",
    "assam",
    "bihar",
    "chhattisgarh",
    "goa",
    "gujarat",
    "haryana",
    "himachal pradesh",
    "jharkhand",
    "karnataka",
    "kerala",
    "madhya pradesh",
    "maharashtra",
    "manipur",
    "meghalaya",
    "mizoram",
    "nagaland",
    "odisha",
    "punjab",
    "rajasthan",
    "sikkim",
    "tamil nadu",
    "telangana",
    "tripura",
    "uttar pradesh",
    "uttarakhand",
    "west bengal",
    "delhi",
    "mumbai",
    "bangalore",
    "chennai",
    "hyderabad",
    "kolkata",
    "pune",
];

const MIN_PHRASE_LEN: usize = 3;
const MAX_PHRASE_LEN: usize = 29;

/// `in <phrase>`, `for <phrase>`, `of <phrase>`, in priority order. The
/// phrase is letters and spaces, so it stops at punctuation.
static PHRASE_PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    ["in", "for", "of"].map(|word| {
        Regex::new(&format!(r"\b{word}\s+([a-z][a-z\s]*)")).unwrap_or_else(|_| unreachable!())
    })
});

/// Resolves a comma-separated id list.
///
/// Regions come back in input order with duplicates collapsed; ids with no
/// stored region are listed in `missing`, also in input order.
///
/// # Errors
///
/// * [`AnalyticsError::MalformedIdentifier`] if a token is not an integer
/// * [`AnalyticsError::Database`] if the read fails
pub async fn resolve_id_list(
    store: &dyn GroundwaterStore,
    raw: &str,
) -> Result<RegionSet, AnalyticsError> {
    let ids = params::parse_id_list(raw)?;
    resolve_ids(store, &ids).await
}

/// Resolves already-parsed ids. See [`resolve_id_list`].
///
/// # Errors
///
/// Returns [`AnalyticsError::Database`] if the read fails.
pub async fn resolve_ids(
    store: &dyn GroundwaterStore,
    ids: &[i64],
) -> Result<RegionSet, AnalyticsError> {
    let mut unique = Vec::with_capacity(ids.len());
    for id in ids {
        if !unique.contains(id) {
            unique.push(*id);
        }
    }

    if unique.is_empty() {
        return Ok(RegionSet {
            regions: vec![],
            missing: vec![],
        });
    }

    let found = store
        .regions(&RegionQuery {
            ids: unique.clone(),
            ..RegionQuery::default()
        })
        .await?;

    let mut regions = Vec::with_capacity(found.len());
    let mut missing = Vec::new();
    for id in unique {
        match found.iter().find(|r| r.id == id) {
            Some(region) => regions.push(region.clone()),
            None => missing.push(id),
        }
    }

    Ok(RegionSet { regions, missing })
}

/// Looks up a single region by id.
///
/// # Errors
///
/// * [`AnalyticsError::RegionNotFound`] if no such region exists
/// * [`AnalyticsError::Database`] if the read fails
pub async fn resolve_id(store: &dyn GroundwaterStore, id: i64) -> Result<Region, AnalyticsError> {
    store
        .region_by_id(id)
        .await?
        .ok_or_else(|| AnalyticsError::RegionNotFound {
            reference: id.to_string(),
        })
}

/// Picks a region name out of free text without touching the store.
///
/// Context wins (`location` before `region`), then the first gazetteer
/// entry contained in the query, then the first prepositional phrase of
/// acceptable length.
#[must_use]
pub fn extract_region_name(query: &str, context: Option<&QueryContext>) -> Option<String> {
    if let Some(context) = context {
        let hint = [context.location.as_deref(), context.region.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|h| !h.is_empty());
        if let Some(hint) = hint {
            return Some(hint.to_string());
        }
    }

    let query = query.to_lowercase();

    if let Some(name) = GAZETTEER.iter().find(|name| query.contains(*name)) {
        return Some((*name).to_string());
    }

    PHRASE_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures_iter(&query)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
            .find(|phrase| (MIN_PHRASE_LEN..=MAX_PHRASE_LEN).contains(&phrase.chars().count()))
            .map(ToString::to_string)
    })
}

/// Looks up the first region (lowest id) whose name contains `name`,
/// case-insensitively.
///
/// # Errors
///
/// * [`AnalyticsError::RegionNotFound`] if nothing matches
/// * [`AnalyticsError::Database`] if the read fails
pub async fn find_by_name(
    store: &dyn GroundwaterStore,
    name: &str,
) -> Result<Region, AnalyticsError> {
    let query = RegionQuery {
        name_contains: Some(name.to_string()),
        order: RegionOrder::Id,
        limit: Some(1),
        ..RegionQuery::default()
    };
    store
        .regions(&query)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| AnalyticsError::RegionNotFound {
            reference: name.to_string(),
        })
}

/// Resolves free text (plus optional context) to a stored region.
///
/// # Errors
///
/// * [`AnalyticsError::RegionNotIdentified`] if no name can be extracted
/// * [`AnalyticsError::RegionNotFound`] if the extracted name matches no
///   stored region
/// * [`AnalyticsError::Database`] if the read fails
pub async fn resolve_text(
    store: &dyn GroundwaterStore,
    query: &str,
    context: Option<&QueryContext>,
) -> Result<Region, AnalyticsError> {
    let name = extract_region_name(query, context).ok_or(AnalyticsError::RegionNotIdentified)?;
    log::debug!("Resolved region name '{name}' from query");

    for candidate in name_candidates(&name) {
        match find_by_name(store, candidate).await {
            Ok(region) => return Ok(region),
            Err(AnalyticsError::RegionNotFound { .. }) => {
                log::trace!("No region matches '{candidate}'");
            }
            Err(e) => return Err(e),
        }
    }

    Err(AnalyticsError::RegionNotFound { reference: name })
}

/// `name` followed by its leading word prefixes, longest first, down to
/// [`MIN_PHRASE_LEN`] characters. A phrase capture runs to the end of the
/// clause ("ludhiana over the years"), so trailing words are dropped one at
/// a time until a stored name matches.
fn name_candidates(name: &str) -> Vec<&str> {
    let mut candidates = vec![name];
    let mut rest = name;
    while let Some((head, _)) = rest.rsplit_once(char::is_whitespace) {
        rest = head.trim_end();
        if rest.chars().count() >= MIN_PHRASE_LEN {
            candidates.push(rest);
        }
    }
    candidates
}
