//! Contact resolution and per-contact message grouping.
//!
//! The resolver turns raw `From:`-style header strings into a canonical
//! `Person`. The grouper partitions a user's messages into per-contact sets,
//! dropping self-correspondence and configured noise senders. Groups never
//! overlap: a message belongs to exactly one contact.

use std::collections::{BTreeMap, HashSet};

use regex::Regex;

use crate::config::EngineConfig;
use crate::types::{Message, Person};

// ─────────────────────────────────────────────────────────────────────
// Contact resolver
// ─────────────────────────────────────────────────────────────────────

/// Parse a raw address header into (display name, email).
///
/// Accepts `Sarah Chen <sarah.chen@acme.com>`, `"Chen, Sarah" <s@acme.com>`,
/// or a bare address. The email is lower-cased; an address without `@`
/// yields `None`.
pub fn parse_address(raw: &str) -> Option<(Option<String>, String)> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let (name_part, email_part) = match (raw.find('<'), raw.rfind('>')) {
        (Some(open), Some(close)) if close > open => {
            (raw[..open].trim(), raw[open + 1..close].trim())
        }
        _ => ("", raw),
    };

    if !email_part.contains('@') {
        return None;
    }

    let name = name_part.trim_matches(|c| c == '"' || c == '\'').trim();
    let name = if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    };

    Some((name, email_part.to_lowercase()))
}

/// Derive an organization name from an email domain (best-effort).
///
/// Strips a leading `www` label and the TLD, capitalizes the remainder:
/// `www.acme.com` → "Acme". A bare or empty domain yields `None`.
pub fn company_from_domain(domain: &str) -> Option<String> {
    let stripped = domain.strip_prefix("www.").unwrap_or(domain);
    let org_part = stripped.split('.').next().unwrap_or("");
    if org_part.is_empty() {
        return None;
    }
    let mut chars = org_part.chars();
    chars
        .next()
        .map(|c| c.to_uppercase().to_string() + chars.as_str())
}

impl Person {
    /// Resolve a raw sender/recipient string into a canonical Person.
    pub fn resolve(raw: &str) -> Option<Person> {
        let (name, email) = parse_address(raw)?;
        let domain = email.split('@').nth(1).unwrap_or("").to_string();
        let company = company_from_domain(&domain);
        Some(Person {
            email,
            name,
            domain,
            company,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────
// Exclusion rules
// ─────────────────────────────────────────────────────────────────────

/// Compiled noise filters from config. Invalid patterns are logged and
/// skipped rather than failing the run.
pub struct ExclusionRules {
    domains: Vec<String>,
    patterns: Vec<Regex>,
}

impl ExclusionRules {
    pub fn from_config(config: &EngineConfig) -> Self {
        let domains = config
            .excluded_domains
            .iter()
            .map(|d| d.to_lowercase())
            .collect();

        let mut patterns = Vec::new();
        for raw in &config.excluded_patterns {
            match Regex::new(raw) {
                Ok(re) => patterns.push(re),
                Err(e) => log::warn!("Skipping invalid excluded pattern {:?}: {}", raw, e),
            }
        }

        Self { domains, patterns }
    }

    /// Whether a canonical contact email should be dropped.
    pub fn excludes(&self, email: &str) -> bool {
        let domain = email.split('@').nth(1).unwrap_or("");
        if self.domains.iter().any(|d| d == domain) {
            return true;
        }
        self.patterns.iter().any(|re| re.is_match(email))
    }
}

// ─────────────────────────────────────────────────────────────────────
// Message grouper
// ─────────────────────────────────────────────────────────────────────

/// The contact on the other end of a message.
///
/// For sent mail this is the first non-user recipient (To before Cc). A
/// message with several non-user recipients is attributed only to that
/// primary one — documented behavior that downstream consumers rely on,
/// not an oversight.
pub fn other_party(message: &Message, user_email: &str) -> Option<String> {
    if message.is_from_user {
        message
            .to
            .iter()
            .chain(message.cc.iter())
            .filter_map(|raw| parse_address(raw).map(|(_, email)| email))
            .find(|email| email != user_email)
    } else {
        parse_address(&message.from)
            .map(|(_, email)| email)
            .filter(|email| email != user_email)
    }
}

/// Partition a user's messages into per-contact groups.
///
/// Dedupes by message id, sorts each group by timestamp ascending, and
/// drops messages with no resolvable other party or an excluded one.
/// Returns a BTreeMap so iteration order is stable across runs.
pub fn group_by_contact(
    messages: &[Message],
    user_email: &str,
    rules: &ExclusionRules,
) -> BTreeMap<String, Vec<Message>> {
    let user_email = user_email.to_lowercase();
    let mut seen_ids: HashSet<&str> = HashSet::with_capacity(messages.len());
    let mut groups: BTreeMap<String, Vec<Message>> = BTreeMap::new();

    for message in messages {
        if !seen_ids.insert(message.id.as_str()) {
            continue;
        }

        let contact = match other_party(message, &user_email) {
            Some(email) => email,
            None => continue,
        };

        if contact == user_email || rules.excludes(&contact) {
            continue;
        }

        groups.entry(contact).or_default().push(message.clone());
    }

    for group in groups.values_mut() {
        group.sort_by_key(|m| m.timestamp);
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn msg(id: &str, from: &str, to: &[&str], from_user: bool, minute: u32) -> Message {
        Message {
            id: id.to_string(),
            thread_id: "t1".to_string(),
            from: from.to_string(),
            to: to.iter().map(|s| s.to_string()).collect(),
            cc: Vec::new(),
            subject: String::new(),
            body: String::new(),
            timestamp: Utc.with_ymd_and_hms(2026, 3, 2, 10, minute, 0).unwrap(),
            is_from_user: from_user,
            labels: Vec::new(),
        }
    }

    fn no_rules() -> ExclusionRules {
        ExclusionRules::from_config(&EngineConfig::default())
    }

    #[test]
    fn test_parse_address_with_display_name() {
        let (name, email) = parse_address("Sarah Chen <Sarah.Chen@Acme.com>").unwrap();
        assert_eq!(name.as_deref(), Some("Sarah Chen"));
        assert_eq!(email, "sarah.chen@acme.com");
    }

    #[test]
    fn test_parse_address_bare() {
        let (name, email) = parse_address("joe@bigcorp.io").unwrap();
        assert!(name.is_none());
        assert_eq!(email, "joe@bigcorp.io");
    }

    #[test]
    fn test_parse_address_rejects_non_email() {
        assert!(parse_address("Mailer Daemon").is_none());
        assert!(parse_address("").is_none());
    }

    #[test]
    fn test_company_from_domain() {
        assert_eq!(company_from_domain("acme.com").as_deref(), Some("Acme"));
        assert_eq!(company_from_domain("www.acme.com").as_deref(), Some("Acme"));
        assert_eq!(company_from_domain("bigcorp.io").as_deref(), Some("Bigcorp"));
        assert!(company_from_domain("").is_none());
    }

    #[test]
    fn test_person_resolve() {
        let person = Person::resolve("Sarah Chen <sarah.chen@acme.com>").unwrap();
        assert_eq!(person.email, "sarah.chen@acme.com");
        assert_eq!(person.domain, "acme.com");
        assert_eq!(person.company.as_deref(), Some("Acme"));
    }

    #[test]
    fn test_other_party_received() {
        let m = msg("m1", "sarah@acme.com", &["me@corp.com"], false, 0);
        assert_eq!(
            other_party(&m, "me@corp.com").as_deref(),
            Some("sarah@acme.com")
        );
    }

    #[test]
    fn test_other_party_sent_picks_first_non_user() {
        let m = msg(
            "m1",
            "me@corp.com",
            &["me@corp.com", "sarah@acme.com", "joe@bigcorp.io"],
            true,
            0,
        );
        assert_eq!(
            other_party(&m, "me@corp.com").as_deref(),
            Some("sarah@acme.com")
        );
    }

    #[test]
    fn test_group_dedupes_and_sorts() {
        let messages = vec![
            msg("m2", "sarah@acme.com", &["me@corp.com"], false, 30),
            msg("m1", "sarah@acme.com", &["me@corp.com"], false, 0),
            msg("m2", "sarah@acme.com", &["me@corp.com"], false, 30),
        ];
        let groups = group_by_contact(&messages, "me@corp.com", &no_rules());
        let group = &groups["sarah@acme.com"];
        assert_eq!(group.len(), 2);
        assert_eq!(group[0].id, "m1");
        assert_eq!(group[1].id, "m2");
    }

    #[test]
    fn test_group_drops_self_correspondence() {
        let messages = vec![msg("m1", "me@corp.com", &["me@corp.com"], true, 0)];
        let groups = group_by_contact(&messages, "me@corp.com", &no_rules());
        assert!(groups.is_empty());
    }

    #[test]
    fn test_group_respects_exclusions() {
        let config: EngineConfig = serde_json::from_str(
            r#"{"excludedDomains": ["mailer.acme.com"], "excludedPatterns": ["^no-?reply@"]}"#,
        )
        .unwrap();
        let rules = ExclusionRules::from_config(&config);

        let messages = vec![
            msg("m1", "bot@mailer.acme.com", &["me@corp.com"], false, 0),
            msg("m2", "noreply@bigcorp.io", &["me@corp.com"], false, 1),
            msg("m3", "sarah@acme.com", &["me@corp.com"], false, 2),
        ];
        let groups = group_by_contact(&messages, "me@corp.com", &rules);
        assert_eq!(groups.len(), 1);
        assert!(groups.contains_key("sarah@acme.com"));
    }

    #[test]
    fn test_group_message_belongs_to_one_contact() {
        let m = msg(
            "m1",
            "me@corp.com",
            &["sarah@acme.com", "joe@bigcorp.io"],
            true,
            0,
        );
        let groups = group_by_contact(&[m], "me@corp.com", &no_rules());
        assert_eq!(groups.len(), 1);
        assert!(groups.contains_key("sarah@acme.com"));
    }
}
