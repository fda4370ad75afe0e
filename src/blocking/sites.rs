use crate::error::SiteError;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:https?://)?(?:www\.)?").expect("static regex"));

// label(.label)*.tld, labels alphanumeric with inner hyphens, tld >= 2 letters
static DOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,}$").expect("static regex")
});

pub const DEFAULT_BLOCKED_SITES: [&str; 7] = [
    "youtube.com",
    "tiktok.com",
    "twitter.com",
    "instagram.com",
    "facebook.com",
    "reddit.com",
    "netflix.com",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PresetSite {
    pub name: &'static str,
    pub domain: &'static str,
}

pub const PRESET_SITES: [PresetSite; 12] = [
    PresetSite {
        name: "YouTube",
        domain: "youtube.com",
    },
    PresetSite {
        name: "TikTok",
        domain: "tiktok.com",
    },
    PresetSite {
        name: "Instagram",
        domain: "instagram.com",
    },
    PresetSite {
        name: "Facebook",
        domain: "facebook.com",
    },
    PresetSite {
        name: "X / Twitter",
        domain: "twitter.com",
    },
    PresetSite {
        name: "Reddit",
        domain: "reddit.com",
    },
    PresetSite {
        name: "Netflix",
        domain: "netflix.com",
    },
    PresetSite {
        name: "Twitch",
        domain: "twitch.tv",
    },
    PresetSite {
        name: "Discord",
        domain: "discord.com",
    },
    PresetSite {
        name: "Pinterest",
        domain: "pinterest.com",
    },
    PresetSite {
        name: "Amazon",
        domain: "amazon.com",
    },
    PresetSite {
        name: "LinkedIn",
        domain: "linkedin.com",
    },
];

/// Presets whose name or domain contains `query`, case-insensitively.
pub fn presets_matching(query: &str) -> Vec<PresetSite> {
    let query = query.trim().to_lowercase();
    PRESET_SITES
        .iter()
        .filter(|preset| {
            query.is_empty()
                || preset.name.to_lowercase().contains(&query)
                || preset.domain.contains(&query)
        })
        .copied()
        .collect()
}

/// Reduces user input to a bare host: no scheme, no `www.`, no path.
pub fn normalize(input: &str) -> String {
    let trimmed = input.trim();
    let stripped = PREFIX.replace(trimmed, "");
    stripped
        .split('/')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

pub fn validate_domain(candidate: &str) -> Result<(), SiteError> {
    if DOMAIN.is_match(candidate) {
        Ok(())
    } else {
        Err(SiteError::InvalidDomain(candidate.to_string()))
    }
}

/// Ordered set of normalized blocked domains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteList {
    sites: Vec<String>,
}

impl Default for SiteList {
    fn default() -> Self {
        Self {
            sites: DEFAULT_BLOCKED_SITES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl SiteList {
    pub fn empty() -> Self {
        Self { sites: Vec::new() }
    }

    /// Rebuilds a list from stored entries, dropping blanks and duplicates.
    pub fn from_stored(stored: Vec<String>) -> Self {
        let mut list = Self::empty();
        for site in stored {
            list.add(&site);
        }
        list
    }

    pub fn as_slice(&self) -> &[String] {
        &self.sites
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn contains(&self, site: &str) -> bool {
        self.sites.iter().any(|s| s == site)
    }

    /// Appends the normalized input. Returns whether the list changed.
    pub fn add(&mut self, input: &str) -> bool {
        let clean = normalize(input);
        if clean.is_empty() || self.contains(&clean) {
            return false;
        }
        self.sites.push(clean);
        true
    }

    /// Validated add used by the popup's search box.
    pub fn try_add(&mut self, input: &str) -> Result<String, SiteError> {
        let clean = normalize(input);
        if self.contains(&clean) {
            return Err(SiteError::AlreadyBlocked(clean));
        }
        validate_domain(&clean)?;
        self.sites.push(clean.clone());
        Ok(clean)
    }

    pub fn remove(&mut self, site: &str) -> bool {
        let before = self.sites.len();
        self.sites.retain(|s| s != site);
        self.sites.len() != before
    }

    pub fn toggle(&mut self, input: &str) -> bool {
        let clean = normalize(input);
        if self.contains(&clean) {
            self.remove(&clean)
        } else {
            self.add(&clean)
        }
    }

    /// Alphabetical view filtered by a case-insensitive substring.
    pub fn search(&self, query: &str) -> Vec<String> {
        let query = query.trim().to_lowercase();
        let mut found: Vec<String> = self
            .sites
            .iter()
            .filter(|site| query.is_empty() || site.contains(&query))
            .cloned()
            .collect();
        found.sort();
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_scheme_www_and_path() {
        assert_eq!(normalize("https://www.Example.COM/path"), "example.com");
        assert_eq!(normalize("  http://reddit.com/r/rust?x=1 "), "reddit.com");
        assert_eq!(normalize("WWW.YouTube.com"), "youtube.com");
        assert_eq!(normalize("news.ycombinator.com"), "news.ycombinator.com");
        assert_eq!(normalize("https://"), "");
        assert_eq!(normalize("/only/path"), "");
    }

    #[test]
    fn add_normalizes_and_dedupes() {
        let mut sites = SiteList::empty();
        assert!(sites.add("https://www.Example.COM/path"));
        assert!(!sites.add("https://www.Example.COM/path"));
        assert!(!sites.add("example.com"));
        assert!(!sites.add("   "));
        assert_eq!(sites.as_slice(), &["example.com".to_string()]);
    }

    #[test]
    fn add_preserves_insertion_order() {
        let mut sites = SiteList::empty();
        sites.add("zeta.com");
        sites.add("alpha.com");
        assert_eq!(
            sites.as_slice(),
            &["zeta.com".to_string(), "alpha.com".to_string()]
        );
    }

    #[test]
    fn remove_requires_exact_match() {
        let mut sites = SiteList::default();
        assert!(!sites.remove("YouTube.com"));
        assert!(sites.remove("youtube.com"));
        assert!(!sites.remove("youtube.com"));
        assert_eq!(sites.len(), DEFAULT_BLOCKED_SITES.len() - 1);
    }

    #[test]
    fn toggle_adds_then_removes() {
        let mut sites = SiteList::empty();
        assert!(sites.toggle("https://twitch.tv/somebody"));
        assert!(sites.contains("twitch.tv"));
        assert!(sites.toggle("twitch.tv"));
        assert!(sites.is_empty());
    }

    #[test]
    fn validate_domain_shapes() {
        assert!(validate_domain("example.com").is_ok());
        assert!(validate_domain("sub.example.co.uk").is_ok());
        assert!(validate_domain("my-site.io").is_ok());
        assert!(validate_domain("a1.b2.dev").is_ok());
        let rejected = [
            "not a domain",
            "example",
            "-bad.com",
            "bad-.com",
            "example.c",
            "example.c0m",
            "",
        ];
        for bad in rejected {
            assert_eq!(
                validate_domain(bad),
                Err(SiteError::InvalidDomain(bad.to_string())),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn try_add_reports_duplicate_before_format() {
        let mut sites = SiteList::default();
        assert_eq!(
            sites.try_add("https://www.youtube.com/watch"),
            Err(SiteError::AlreadyBlocked("youtube.com".to_string()))
        );
        assert_eq!(
            sites.try_add("localhost"),
            Err(SiteError::InvalidDomain("localhost".to_string()))
        );
        assert_eq!(sites.try_add("Twitch.tv/"), Ok("twitch.tv".to_string()));
        assert!(sites.contains("twitch.tv"));
    }

    #[test]
    fn from_stored_drops_duplicates_and_blanks() {
        let sites = SiteList::from_stored(vec![
            "a.com".to_string(),
            "".to_string(),
            "A.com".to_string(),
            "b.com".to_string(),
        ]);
        assert_eq!(sites.as_slice(), &["a.com".to_string(), "b.com".to_string()]);
    }

    #[test]
    fn search_is_sorted_and_filtered() {
        let sites = SiteList::default();
        assert_eq!(sites.search("TOK"), vec!["tiktok.com".to_string()]);
        let all = sites.search("");
        assert_eq!(all.first().map(String::as_str), Some("facebook.com"));
        assert_eq!(all.len(), DEFAULT_BLOCKED_SITES.len());
    }

    #[test]
    fn presets_match_name_or_domain() {
        let found = presets_matching("twitter");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].domain, "twitter.com");
        assert_eq!(presets_matching(".tv")[0].name, "Twitch");
        assert_eq!(presets_matching("").len(), PRESET_SITES.len());
    }
}
