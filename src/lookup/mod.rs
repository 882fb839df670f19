//! Postcode to local-authority resolution and address grouping.
//!
//! Verification requests to a local authority may only disclose the addresses
//! within that authority's remit, so the grouping keys every address by its
//! resolved authority. Lookup failures degrade a single address rather than
//! aborting the grouping: the current address falls back to a configured
//! default authority, previous addresses fall into the "Unknown" bucket.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::{Address, PreviousAddress};

/// Bucket name for addresses whose postcode cannot be extracted or resolved.
pub const UNKNOWN_AUTHORITY: &str = "Unknown";

/// UK postcode substring, anywhere in the text.
static POSTCODE_IN_TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[A-Z]{1,2}[0-9][A-Z0-9]?\s*[0-9][A-Z]{2}\b").unwrap()
});

/// Extract a UK postcode substring from free text, normalized to upper case.
pub fn extract_postcode(text: &str) -> Option<String> {
    POSTCODE_IN_TEXT
        .find(text)
        .map(|m| m.as_str().to_uppercase())
}

/// Resolves a postcode to the name of its governing local authority.
#[async_trait]
pub trait AuthorityLookup: Send + Sync {
    /// Ok(None) means the postcode is unknown to the service; Err means the
    /// service itself failed. Both degrade the same way in the grouping.
    async fn authority_for(&self, postcode: &str) -> Result<Option<String>, reqwest::Error>;
}

/// Client for the postcodes.io lookup service.
pub struct PostcodesIoClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct PostcodeResponse {
    result: Option<PostcodeResult>,
}

#[derive(Deserialize)]
struct PostcodeResult {
    admin_district: Option<String>,
}

impl PostcodesIoClient {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }
}

#[async_trait]
impl AuthorityLookup for PostcodesIoClient {
    async fn authority_for(&self, postcode: &str) -> Result<Option<String>, reqwest::Error> {
        let url = format!(
            "{}/postcodes/{}",
            self.base_url.trim_end_matches('/'),
            postcode.replace(' ', "")
        );
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            // postcodes.io answers 404 for unknown postcodes.
            return Ok(None);
        }
        let body: PostcodeResponse = response.json().await?;
        Ok(body.result.and_then(|r| r.admin_district))
    }
}

/// One address in an authority group, with the current address marked.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedAddress {
    pub is_current: bool,
    pub address: Address,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postcode: Option<String>,
}

/// Group the current and previous addresses by governing local authority.
///
/// The current address falls back to `default_authority` when its postcode
/// cannot be extracted or resolved; previous addresses degrade one at a time
/// to the "Unknown" bucket.
pub async fn group_addresses_by_authority(
    current: &Address,
    previous: &[PreviousAddress],
    default_authority: &str,
    lookup: &dyn AuthorityLookup,
) -> BTreeMap<String, Vec<GroupedAddress>> {
    let mut groups: BTreeMap<String, Vec<GroupedAddress>> = BTreeMap::new();

    let current_postcode = extract_postcode(&address_text(current));
    let current_authority = match &current_postcode {
        Some(postcode) => resolve(lookup, postcode)
            .await
            .unwrap_or_else(|| default_authority.to_string()),
        None => default_authority.to_string(),
    };
    groups.entry(current_authority).or_default().push(GroupedAddress {
        is_current: true,
        address: current.clone(),
        postcode: current_postcode,
    });

    for entry in previous {
        let postcode = extract_postcode(&address_text(&entry.address));
        let authority = match &postcode {
            Some(postcode) => resolve(lookup, postcode)
                .await
                .unwrap_or_else(|| UNKNOWN_AUTHORITY.to_string()),
            None => UNKNOWN_AUTHORITY.to_string(),
        };
        groups.entry(authority).or_default().push(GroupedAddress {
            is_current: false,
            address: entry.address.clone(),
            postcode,
        });
    }

    groups
}

async fn resolve(lookup: &dyn AuthorityLookup, postcode: &str) -> Option<String> {
    match lookup.authority_for(postcode).await {
        Ok(authority) => authority,
        Err(err) => {
            tracing::warn!("Postcode lookup failed for {}: {}", postcode, err);
            None
        }
    }
}

fn address_text(address: &Address) -> String {
    format!(
        "{} {} {} {}",
        address.line1,
        address.line2.as_deref().unwrap_or(""),
        address.town,
        address.postcode
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fixed-table lookup for tests.
    pub struct FakeLookup {
        pub table: BTreeMap<String, String>,
    }

    #[async_trait]
    impl AuthorityLookup for FakeLookup {
        async fn authority_for(&self, postcode: &str) -> Result<Option<String>, reqwest::Error> {
            Ok(self.table.get(&postcode.replace(' ', "")).cloned())
        }
    }

    fn address(line1: &str, postcode: &str) -> Address {
        Address {
            line1: line1.to_string(),
            line2: None,
            town: "Testtown".to_string(),
            postcode: postcode.to_string(),
        }
    }

    fn lookup_with(entries: &[(&str, &str)]) -> FakeLookup {
        FakeLookup {
            table: entries
                .iter()
                .map(|(k, v)| (k.replace(' ', ""), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn extracts_postcode_from_free_text() {
        assert_eq!(
            extract_postcode("Flat 2, 10 Downing Street, sw1a 2aa, London"),
            Some("SW1A 2AA".to_string())
        );
        assert_eq!(extract_postcode("no postcode here"), None);
    }

    #[tokio::test]
    async fn groups_resolvable_and_malformed_addresses() {
        let lookup = lookup_with(&[("LS1 4AP", "Leeds"), ("LS2 9JT", "Leeds")]);
        let current = address("1 High Street", "LS1 4AP");
        let previous = vec![
            PreviousAddress {
                address: address("2 Old Road", "LS2 9JT"),
                from_date: None,
                to_date: None,
            },
            PreviousAddress {
                address: address("3 Nowhere Lane", "not-a-postcode"),
                from_date: None,
                to_date: None,
            },
        ];

        let groups =
            group_addresses_by_authority(&current, &previous, "Default Authority", &lookup).await;

        assert_eq!(groups.len(), 2);
        let leeds = &groups["Leeds"];
        assert_eq!(leeds.len(), 2);
        assert!(leeds.iter().any(|a| a.is_current));
        assert_eq!(groups[UNKNOWN_AUTHORITY].len(), 1);

        let total: usize = groups.values().map(|v| v.len()).sum();
        assert_eq!(total, 3);
    }

    #[tokio::test]
    async fn current_address_falls_back_to_default_authority() {
        let lookup = lookup_with(&[]);
        let current = address("1 High Street", "ZZ9 9ZZ");
        let groups = group_addresses_by_authority(&current, &[], "Kirklees", &lookup).await;

        assert_eq!(groups.len(), 1);
        assert!(groups["Kirklees"][0].is_current);
    }

    #[tokio::test]
    async fn unresolvable_previous_address_degrades_to_unknown() {
        let lookup = lookup_with(&[("LS1 4AP", "Leeds")]);
        let current = address("1 High Street", "LS1 4AP");
        let previous = vec![PreviousAddress {
            address: address("2 Mystery Street", "ZZ9 9ZZ"),
            from_date: None,
            to_date: None,
        }];

        let groups = group_addresses_by_authority(&current, &previous, "Default", &lookup).await;
        assert_eq!(groups[UNKNOWN_AUTHORITY].len(), 1);
        assert_eq!(
            groups[UNKNOWN_AUTHORITY][0].postcode,
            Some("ZZ9 9ZZ".to_string())
        );
    }
}
