//! Response-time filtering of upstream JSON collection payloads.

use serde_json::Value;

use crate::scope::Scope;

/// Rewrites an upstream body so it contains only in-scope items.
///
/// Pure function of `(body, scope)`:
/// - an object with an array `value` property has that array filtered in
///   place, every other top-level property (including `@odata.nextLink`)
///   untouched, element order preserved;
/// - a single object is served back unchanged when it matches the scope
///   and replaced with `{}` when it does not;
/// - anything that is not a JSON object passes through byte-identical.
///
/// Never errors; a body that fails to parse is returned unmodified.
#[must_use]
pub fn filter_body(body: &[u8], scope: &Scope) -> Vec<u8> {
    let Ok(parsed) = serde_json::from_slice::<Value>(body) else {
        return body.to_vec();
    };

    let Value::Object(mut object) = parsed else {
        return body.to_vec();
    };

    if matches!(object.get("value"), Some(Value::Array(_))) {
        if let Some(Value::Array(items)) = object.get_mut("value") {
            items.retain(|item| item_matches(item, scope));
        }
        return serde_json::to_vec(&Value::Object(object)).unwrap_or_else(|_| body.to_vec());
    }

    if item_matches(&Value::Object(object), scope) {
        body.to_vec()
    } else {
        b"{}".to_vec()
    }
}

/// Candidate identifiers are probed in a fixed order; an element is kept
/// when any present identifier matches the scope.
fn item_matches(item: &Value, scope: &Scope) -> bool {
    candidate_identifiers(item)
        .into_iter()
        .any(|candidate| scope.contains(candidate))
}

fn candidate_identifiers(item: &Value) -> Vec<&str> {
    let mut candidates = Vec::with_capacity(4);

    if let Some(id) = item.get("id").and_then(Value::as_str) {
        candidates.push(id);
    }
    if let Some(address) = item
        .get("emailAddress")
        .and_then(|email| email.get("address"))
        .and_then(Value::as_str)
    {
        candidates.push(address);
    }
    if let Some(mail) = item.get("mail").and_then(Value::as_str) {
        candidates.push(mail);
    }
    if let Some(upn) = item.get("userPrincipalName").and_then(Value::as_str) {
        candidates.push(upn);
    }

    candidates
}
