use std::collections::HashSet;
use std::str::FromStr;
use std::sync::LazyLock;

use graphscope_core::AppError;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Keyword sets driving classification, scanned in priority order.
const EQUIPMENT_KEYWORDS: &[&str] = &["equipment", "projector", "device", "camera", "tv", "screen"];
const ROOM_KEYWORDS: &[&str] = &["room", "meeting", "conference", "boardroom", "meetingroom"];
const WORKSPACE_KEYWORDS: &[&str] = &["workspace", "desk", "office", "workstation"];

static CAPACITY_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)\bcap:?\s*(\d+)",
        r"(?i)\bcapacity:?\s*(\d+)",
        r"(?i)\b(\d+)\s*people?\b",
        r"(?i)\b(\d+)[-\s]*person\b",
        r"(?i)\bseats?[-\s]*(\d+)\b",
        r"(?i)\b(\d+)[-\s]*seat\b",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("capacity pattern must compile"))
    .collect()
});

static LOCATION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\(([^)]+)\)\s*$",
        r"-\s*([^-]+)\s*$",
        r"(?i)\broom\s+([A-Za-z0-9.-]+)",
        r"(?i)\bbuilding\s+([A-Za-z0-9.-]+)",
        r"(?i)\bfloor\s+([A-Za-z0-9.-]+)",
        r"(?i)\blevel\s+([A-Za-z0-9.-]+)",
        r"(?i)\b([A-Za-z0-9.-]+)\s+building\b",
        r"(?i)\b(\d+(?:st|nd|rd|th)\s+floor\b.*)$",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("location pattern must compile"))
    .collect()
});

/// Classification of a directory member admitted into a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Bookable meeting room.
    Room,
    /// Individual workspace or desk.
    Workspace,
    /// Bookable equipment (projectors, cameras, screens).
    Equipment,
    /// Mailbox with no recognizable resource marker.
    Generic,
}

impl ResourceKind {
    /// Returns a stable transport value for this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Room => "room",
            Self::Workspace => "workspace",
            Self::Equipment => "equipment",
            Self::Generic => "generic",
        }
    }
}

impl FromStr for ResourceKind {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "room" => Ok(Self::Room),
            "workspace" => Ok(Self::Workspace),
            "equipment" => Ok(Self::Equipment),
            "generic" => Ok(Self::Generic),
            other => Err(AppError::Validation(format!(
                "unknown place type '{other}'"
            ))),
        }
    }
}

/// Raw group member record as returned by the upstream directory.
#[derive(Debug, Clone, Default)]
pub struct DirectoryMember {
    pub id: String,
    pub mail: Option<String>,
    pub display_name: Option<String>,
}

/// A single admissible target inside a scope.
///
/// `display_name`, `capacity`, and `location` are advisory and never feed
/// access decisions; only `id` and `mail` identify the resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub mail: Option<String>,
    pub kind: ResourceKind,
    pub display_name: Option<String>,
    pub capacity: Option<u32>,
    pub location: Option<String>,
}

impl Resource {
    /// Returns whether `candidate` identifies this resource by id or mail,
    /// compared case-insensitively.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        if !self.id.is_empty() && self.id.eq_ignore_ascii_case(candidate) {
            return true;
        }

        self.mail
            .as_deref()
            .is_some_and(|mail| mail.eq_ignore_ascii_case(candidate))
    }
}

/// Which classified kinds a scope admits.
#[derive(Debug, Clone)]
pub struct AdmissionPolicy {
    pub allowed_place_types: HashSet<ResourceKind>,
    pub allow_generic_resources: bool,
}

impl AdmissionPolicy {
    /// Creates a policy from an allowed-kind set and the Generic switch.
    #[must_use]
    pub fn new(allowed_place_types: HashSet<ResourceKind>, allow_generic_resources: bool) -> Self {
        Self {
            allowed_place_types,
            allow_generic_resources,
        }
    }

    /// Returns whether a classified resource of `kind` is admitted.
    #[must_use]
    pub fn admits(&self, kind: ResourceKind) -> bool {
        self.allowed_place_types.contains(&kind)
            && (kind != ResourceKind::Generic || self.allow_generic_resources)
    }
}

/// Classifies a directory member into a typed resource.
///
/// Total and deterministic: malformed input yields `None`, never an error.
/// Members without a mail address are rejected. When the member carries no
/// recognizable marker and generic resources are disabled, the historical
/// "assume room" default applies.
#[must_use]
pub fn classify(member: &DirectoryMember, policy: &AdmissionPolicy) -> Option<Resource> {
    let mail = member.mail.as_deref().map(str::trim).unwrap_or_default();
    if mail.is_empty() {
        return None;
    }
    let mail = mail.to_lowercase();

    let display_name = member
        .display_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty());

    let haystack = format!("{} {mail}", display_name.unwrap_or_default()).to_lowercase();

    let mut kind = if contains_any(&haystack, EQUIPMENT_KEYWORDS) {
        ResourceKind::Equipment
    } else if contains_any(&haystack, ROOM_KEYWORDS) {
        ResourceKind::Room
    } else if contains_any(&haystack, WORKSPACE_KEYWORDS) {
        ResourceKind::Workspace
    } else {
        ResourceKind::Generic
    };

    if kind == ResourceKind::Generic && !policy.allow_generic_resources {
        kind = ResourceKind::Room;
    }

    Some(Resource {
        id: member.id.clone(),
        mail: Some(mail),
        kind,
        display_name: display_name.map(str::to_owned),
        capacity: display_name.and_then(extract_capacity),
        location: display_name.and_then(extract_location),
    })
}

fn contains_any(haystack: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|keyword| haystack.contains(keyword))
}

/// Extracts a seat count from a display name. First matching pattern wins.
fn extract_capacity(display_name: &str) -> Option<u32> {
    CAPACITY_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(display_name)
            .and_then(|captures| captures.get(1))
            .and_then(|group| group.as_str().parse::<u32>().ok())
    })
}

/// Extracts a location hint from a display name, preserving original case.
///
/// Trailing parenthetical or dash fragments that are really capacity
/// annotations ("(Cap: 10)") are skipped so they do not shadow a location.
fn extract_location(display_name: &str) -> Option<String> {
    LOCATION_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(display_name)
            .and_then(|captures| captures.get(1))
            .map(|group| group.as_str().trim().to_owned())
            .filter(|candidate| !candidate.is_empty() && !is_capacity_annotation(candidate))
    })
}

fn is_capacity_annotation(candidate: &str) -> bool {
    CAPACITY_PATTERNS
        .iter()
        .any(|pattern| pattern.is_match(candidate))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::{AdmissionPolicy, DirectoryMember, Resource, ResourceKind, classify};

    fn policy(kinds: &[ResourceKind], allow_generic: bool) -> AdmissionPolicy {
        AdmissionPolicy::new(kinds.iter().copied().collect::<HashSet<_>>(), allow_generic)
    }

    fn member(id: &str, mail: &str, display_name: &str) -> DirectoryMember {
        DirectoryMember {
            id: id.to_owned(),
            mail: Some(mail.to_owned()),
            display_name: Some(display_name.to_owned()),
        }
    }

    #[test]
    fn rejects_member_without_mail() {
        let policy = policy(&[ResourceKind::Room], false);
        let no_mail = DirectoryMember {
            id: "u1".to_owned(),
            mail: None,
            display_name: Some("Alice".to_owned()),
        };
        let blank_mail = DirectoryMember {
            id: "u2".to_owned(),
            mail: Some("   ".to_owned()),
            display_name: Some("Bob".to_owned()),
        };

        assert!(classify(&no_mail, &policy).is_none());
        assert!(classify(&blank_mail, &policy).is_none());
    }

    #[test]
    fn normalizes_mail_to_lowercase() {
        let policy = policy(&[ResourceKind::Room], false);
        let resource = classify(&member("r1", "  Room-A@Example.COM ", "Room A"), &policy)
            .expect("classified");
        assert_eq!(resource.mail.as_deref(), Some("room-a@example.com"));
    }

    #[test]
    fn equipment_keywords_win_over_room_keywords() {
        let policy = policy(&[ResourceKind::Equipment], false);
        let resource = classify(
            &member("e1", "proj@x", "Meeting Room Projector"),
            &policy,
        )
        .expect("classified");
        assert_eq!(resource.kind, ResourceKind::Equipment);
    }

    #[test]
    fn classification_scans_mail_as_well_as_display_name() {
        let policy = policy(&[ResourceKind::Workspace], false);
        let resource = classify(&member("w1", "desk-12@x", "Spot 12"), &policy).expect("classified");
        assert_eq!(resource.kind, ResourceKind::Workspace);
    }

    #[test]
    fn generic_falls_back_to_room_when_generic_disabled() {
        let policy = policy(&[ResourceKind::Room], false);
        let resource = classify(&member("u1", "alice@x", "Alice"), &policy).expect("classified");
        assert_eq!(resource.kind, ResourceKind::Room);
    }

    #[test]
    fn generic_survives_when_generic_enabled() {
        let policy = policy(&[ResourceKind::Room], true);
        let resource = classify(&member("u1", "alice@x", "Alice"), &policy).expect("classified");
        assert_eq!(resource.kind, ResourceKind::Generic);
        assert!(!policy.admits(resource.kind));
    }

    #[test]
    fn classification_is_deterministic() {
        let policy = policy(&[ResourceKind::Room, ResourceKind::Workspace], false);
        let input = member("r9", "boardroom@x", "Boardroom West (Cap: 8)");
        let first = classify(&input, &policy);
        let second = classify(&input, &policy);
        assert_eq!(first, second);
    }

    #[test]
    fn extracts_capacity_variants() {
        let policy = policy(&[ResourceKind::Room], false);
        let cases = [
            ("Conference Room A (Cap: 10)", 10),
            ("Room B capacity 12", 12),
            ("Huddle 4 people", 4),
            ("Focus 6-person room", 6),
            ("Board seats 14", 14),
            ("Annex 8 seat room", 8),
        ];

        for (display_name, expected) in cases {
            let resource =
                classify(&member("r1", "r@x", display_name), &policy).expect("classified");
            assert_eq!(resource.capacity, Some(expected), "for '{display_name}'");
        }
    }

    #[test]
    fn extracts_location_variants() {
        let policy = policy(&[ResourceKind::Room], false);
        let cases = [
            ("Conference Room (East Wing)", "East Wing"),
            ("Conference Room - North Tower", "North Tower"),
            ("Main building 7 room", "7"),
            ("Quiet space floor 3", "3"),
            ("Open desk 3rd floor", "3rd floor"),
        ];

        for (display_name, expected) in cases {
            let resource =
                classify(&member("r1", "r@x", display_name), &policy).expect("classified");
            assert_eq!(
                resource.location.as_deref(),
                Some(expected),
                "for '{display_name}'"
            );
        }
    }

    #[test]
    fn capacity_annotation_is_not_mistaken_for_location() {
        let policy = policy(&[ResourceKind::Room], false);
        let resource = classify(&member("r1", "room-a@x", "Conference Room A (Cap: 10)"), &policy)
            .expect("classified");
        assert_eq!(resource.capacity, Some(10));
        assert_ne!(resource.location.as_deref(), Some("Cap: 10"));
    }

    #[test]
    fn matches_by_id_or_mail_case_insensitively() {
        let resource = Resource {
            id: "R1".to_owned(),
            mail: Some("room-a@x".to_owned()),
            kind: ResourceKind::Room,
            display_name: None,
            capacity: None,
            location: None,
        };

        assert!(resource.matches("r1"));
        assert!(resource.matches("Room-A@X"));
        assert!(!resource.matches("r2"));
    }
}
