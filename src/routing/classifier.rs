//! Client classification.
//!
//! # Responsibilities
//! - Map a user-agent to a client family and optional version
//! - Decide which response shape the client receives
//!
//! # Design Decisions
//! - Ordered list of (matcher, family, gate); first match wins
//! - The list is built once at startup and immutable afterwards
//! - Pure: the same agent always yields the same negotiation

use crate::routing::matcher::{KeywordMatcher, Matcher, PrefixMatcher};
use crate::routing::version::at_least;

/// Minimum v2rayN version that understands JSON configs.
pub const V2RAYN_MIN_VERSION: &str = "6.40";

/// Minimum v2rayNG version that understands JSON configs.
pub const V2RAYNG_MIN_VERSION: &str = "1.8.29";

/// Substrings that mark a browser or link-preview bot.
pub const BROWSER_KEYWORDS: &[&str] = &[
    "Mozilla",
    "Chrome",
    "Safari",
    "Firefox",
    "Opera",
    "Edge",
    "TelegramBot",
];

/// Known client applications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientFamily {
    GenericV2rayDesktop,
    GenericV2rayMobile,
    Streisand,
    Happ,
    KtorClient,
    V2box,
    Browser,
    Unknown,
}

impl ClientFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClientFamily::GenericV2rayDesktop => "generic-v2ray-desktop",
            ClientFamily::GenericV2rayMobile => "generic-v2ray-mobile",
            ClientFamily::Streisand => "streisand",
            ClientFamily::Happ => "happ",
            ClientFamily::KtorClient => "ktor-client",
            ClientFamily::V2box => "v2box",
            ClientFamily::Browser => "browser",
            ClientFamily::Unknown => "unknown",
        }
    }
}

/// What the requester is, as far as the user-agent tells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    pub family: ClientFamily,
    pub version: Option<String>,
}

/// Response shape chosen for a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseVariant {
    /// Composed JSON configuration documents.
    Structured,
    /// Upstream feed passed through unchanged.
    Direct,
    /// Human-facing HTML page.
    StatusPage,
}

impl ResponseVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseVariant::Structured => "structured",
            ResponseVariant::Direct => "direct",
            ResponseVariant::StatusPage => "status_page",
        }
    }
}

/// Classification result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Negotiation {
    pub identity: ClientIdentity,
    pub variant: ResponseVariant,
}

/// How a matched family turns into a variant.
#[derive(Debug, Clone, Copy)]
enum Gate {
    Structured,
    MinVersion(&'static str),
    Toggle(bool),
}

impl Gate {
    fn decide(&self, version: Option<&str>) -> ResponseVariant {
        let structured = match self {
            Gate::Structured => true,
            Gate::MinVersion(minimum) => version.is_some_and(|v| at_least(v, minimum)),
            Gate::Toggle(enabled) => *enabled,
        };
        if structured {
            ResponseVariant::Structured
        } else {
            ResponseVariant::Direct
        }
    }
}

#[derive(Debug)]
struct ClientPattern {
    matcher: Box<dyn Matcher>,
    family: ClientFamily,
    gate: Gate,
}

/// First-match-wins user-agent classifier.
#[derive(Debug)]
pub struct Classifier {
    patterns: Vec<ClientPattern>,
    browser: KeywordMatcher,
}

impl Classifier {
    /// Build the fixed pattern table. `happ_json` decides whether Happ
    /// receives structured configs or the raw feed.
    pub fn new(happ_json: bool) -> Self {
        let pattern = |matcher: PrefixMatcher, family, gate| ClientPattern {
            matcher: Box::new(matcher),
            family,
            gate,
        };

        let patterns = vec![
            pattern(
                PrefixMatcher::new(&["v2rayN/"]).with_version(2),
                ClientFamily::GenericV2rayDesktop,
                Gate::MinVersion(V2RAYN_MIN_VERSION),
            ),
            pattern(
                PrefixMatcher::new(&["v2rayNG/"]).with_version(3),
                ClientFamily::GenericV2rayMobile,
                Gate::MinVersion(V2RAYNG_MIN_VERSION),
            ),
            pattern(
                PrefixMatcher::new(&["Streisand", "streisand"]),
                ClientFamily::Streisand,
                Gate::Structured,
            ),
            pattern(
                PrefixMatcher::new(&["Happ/"]),
                ClientFamily::Happ,
                Gate::Toggle(happ_json),
            ),
            pattern(
                PrefixMatcher::new(&["ktor-client"]),
                ClientFamily::KtorClient,
                Gate::Structured,
            ),
            pattern(
                PrefixMatcher::new(&["V2Box"]),
                ClientFamily::V2box,
                Gate::Structured,
            ),
        ];

        Self {
            patterns,
            browser: KeywordMatcher::new(BROWSER_KEYWORDS),
        }
    }

    /// Classify a user-agent.
    pub fn classify(&self, user_agent: &str) -> Negotiation {
        for pattern in &self.patterns {
            if let Some(version) = pattern.matcher.matches(user_agent) {
                let variant = pattern.gate.decide(version.as_deref());
                return Negotiation {
                    identity: ClientIdentity {
                        family: pattern.family,
                        version,
                    },
                    variant,
                };
            }
        }

        let (family, variant) = if self.browser.matches(user_agent).is_some() {
            (ClientFamily::Browser, ResponseVariant::StatusPage)
        } else {
            (ClientFamily::Unknown, ResponseVariant::Direct)
        };

        Negotiation {
            identity: ClientIdentity {
                family,
                version: None,
            },
            variant,
        }
    }
}
