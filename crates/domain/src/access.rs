//! Request-time authorization from an upstream URL path.

use crate::scope::Scope;

/// Outcome of inspecting a proxied path against a scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// The path is admissible (in scope, or outside the resource model).
    Allow,
    /// The path targets a specific resource that is not in scope.
    Deny { resource: String },
    /// The path yields a collection that must be filtered before serving.
    FilterCollection,
}

/// Decides whether a proxied call is admissible for `scope`.
///
/// `path` is the upstream path after the version segment, e.g.
/// `users/bob@x/calendar/events`. Inspection is case-insensitive and pure;
/// segments are percent-decoded before matching, nothing more.
#[must_use]
pub fn decide_access(path: &str, scope: &Scope) -> AccessDecision {
    let segments: Vec<String> = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(percent_decode)
        .collect();

    let Some(head) = segments.first() else {
        return AccessDecision::Allow;
    };

    // users/{X}/** and calendars/{X}/** name a single resource under test.
    if head.eq_ignore_ascii_case("users") {
        if let Some(target) = segments.get(1) {
            return decide_resource(target, scope);
        }
        return AccessDecision::FilterCollection;
    }

    if head.eq_ignore_ascii_case("calendars") {
        if let Some(target) = segments.get(1) {
            return decide_resource(target, scope);
        }
        return AccessDecision::FilterCollection;
    }

    // The places catalogue is always served filtered; single-object reads
    // fall out of the same filter applied to a one-element body.
    if head.eq_ignore_ascii_case("places") {
        return AccessDecision::FilterCollection;
    }

    if is_collection_suffix(&segments) {
        return AccessDecision::FilterCollection;
    }

    // Transparent for endpoints outside the resource model.
    AccessDecision::Allow
}

fn decide_resource(target: &str, scope: &Scope) -> AccessDecision {
    if scope.contains(target) {
        AccessDecision::Allow
    } else {
        AccessDecision::Deny {
            resource: target.to_owned(),
        }
    }
}

fn is_collection_suffix(segments: &[String]) -> bool {
    segments.last().is_some_and(|last| {
        last.eq_ignore_ascii_case("rooms")
            || last.eq_ignore_ascii_case("places")
            || last.eq_ignore_ascii_case("calendars")
    })
}

/// Decodes percent escapes in a path segment. Invalid escapes are kept
/// verbatim rather than rejected; path inspection never errors.
fn percent_decode(segment: &str) -> String {
    let bytes = segment.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut index = 0;

    while index < bytes.len() {
        if bytes[index] == b'%' {
            let hex = bytes.get(index + 1..index + 3);
            if let Some(value) = hex.and_then(|pair| {
                std::str::from_utf8(pair)
                    .ok()
                    .and_then(|text| u8::from_str_radix(text, 16).ok())
            }) {
                decoded.push(value);
                index += 3;
                continue;
            }
        }
        decoded.push(bytes[index]);
        index += 1;
    }

    String::from_utf8_lossy(&decoded).into_owned()
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use graphscope_core::GroupId;

    use crate::resource::{Resource, ResourceKind};
    use crate::scope::Scope;

    use super::{AccessDecision, decide_access};

    fn scope() -> Scope {
        let resources = vec![
            Resource {
                id: "r1".to_owned(),
                mail: Some("room-a@x".to_owned()),
                kind: ResourceKind::Room,
                display_name: None,
                capacity: None,
                location: None,
            },
            Resource {
                id: "r2".to_owned(),
                mail: Some("desk-1@x".to_owned()),
                kind: ResourceKind::Workspace,
                display_name: None,
                capacity: None,
                location: None,
            },
        ];
        let now = Utc::now();
        Scope::new(
            GroupId::new("G1").expect("valid group"),
            resources,
            now,
            now + Duration::seconds(900),
        )
    }

    #[test]
    fn in_scope_user_path_is_allowed() {
        let decision = decide_access("users/room-a@x/calendar/events", &scope());
        assert_eq!(decision, AccessDecision::Allow);
    }

    #[test]
    fn out_of_scope_user_path_is_denied_with_target() {
        let decision = decide_access("users/bob@x/calendar/events", &scope());
        assert_eq!(
            decision,
            AccessDecision::Deny {
                resource: "bob@x".to_owned()
            }
        );
    }

    #[test]
    fn match_is_case_insensitive_on_id_and_segment() {
        assert_eq!(decide_access("Users/R1/events", &scope()), AccessDecision::Allow);
    }

    #[test]
    fn percent_encoded_segment_is_decoded_before_matching() {
        let decision = decide_access("users/room-a%40x/calendar", &scope());
        assert_eq!(decision, AccessDecision::Allow);
    }

    #[test]
    fn calendars_with_id_tests_that_resource() {
        assert_eq!(decide_access("calendars/r2/events", &scope()), AccessDecision::Allow);
        assert_eq!(
            decide_access("calendars/r9/events", &scope()),
            AccessDecision::Deny {
                resource: "r9".to_owned()
            }
        );
    }

    #[test]
    fn collection_paths_are_filtered() {
        for path in [
            "places/microsoft.graph.room",
            "places",
            "me/findRooms/rooms",
            "groups/g1/calendars",
        ] {
            assert_eq!(
                decide_access(path, &scope()),
                AccessDecision::FilterCollection,
                "for '{path}'"
            );
        }
    }

    #[test]
    fn unmodeled_paths_pass_through() {
        assert_eq!(decide_access("me/messages", &scope()), AccessDecision::Allow);
        assert_eq!(decide_access("", &scope()), AccessDecision::Allow);
    }
}
