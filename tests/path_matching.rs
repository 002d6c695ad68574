use runtime_messaging::{FilterSet, FilterValue, Location, MessagePath};
use serde_json::json;

fn envelope(source: &str, destination: &str, filters: serde_json::Value) -> serde_json::Value {
    json!({ "data": "x", "source": source, "destination": destination, "filters": filters })
}

#[test]
fn empty_filter_set_matches_everything() {
    let filters = FilterSet::new();
    assert!(filters.matches(None));
    assert!(filters.matches(Some(&json!({}))));
    assert!(filters.matches(Some(&json!({ "op": "ping", "n": 3 }))));
}

#[test]
fn filters_are_a_required_subset() {
    let wanted = FilterSet::from([("op", "ping")]);
    assert!(wanted.matches(Some(&json!({ "op": "ping" }))));
    // Extra keys on the message are ignored.
    assert!(wanted.matches(Some(&json!({ "op": "ping", "ver": 2, "debug": true }))));
    assert!(!wanted.matches(Some(&json!({ "op": "pong" }))));
    assert!(!wanted.matches(Some(&json!({}))));
    assert!(!wanted.matches(None));
}

#[test]
fn every_required_key_must_be_present() {
    let wanted = FilterSet::new().with("op", "ping").with("ver", 2);
    assert!(!wanted.matches(Some(&json!({ "op": "ping" }))));
    assert!(wanted.matches(Some(&json!({ "op": "ping", "ver": 2 }))));
}

#[test]
fn numbers_compare_numerically_and_kinds_never_mix() {
    let wanted = FilterSet::from([("ver", 2)]);
    assert!(wanted.matches(Some(&json!({ "ver": 2.0 }))));
    assert!(!wanted.matches(Some(&json!({ "ver": "2" }))));
    assert!(!wanted.matches(Some(&json!({ "ver": true }))));

    let flag = FilterSet::from([("enabled", true)]);
    assert!(flag.matches(Some(&json!({ "enabled": true }))));
    assert!(!flag.matches(Some(&json!({ "enabled": 1 }))));
    assert!(!flag.matches(Some(&json!({ "enabled": "true" }))));
}

#[test]
fn non_scalar_candidate_values_fail_closed() {
    let wanted = FilterSet::from([("op", "ping")]);
    assert!(!wanted.matches(Some(&json!({ "op": ["ping"] }))));
    assert!(!wanted.matches(Some(&json!({ "op": { "name": "ping" } }))));
    assert!(!wanted.matches(Some(&json!({ "op": null }))));
    // A non-scalar under a key nobody asked for is just an extra key.
    assert!(wanted.matches(Some(&json!({ "op": "ping", "meta": { "a": 1 } }))));
    // `filters` itself must be an object.
    assert!(!wanted.matches(Some(&json!(["op", "ping"]))));
}

#[test]
fn both_locations_require_exact_match() {
    let path = MessagePath::between(Location::Content, Location::Background);
    assert!(path.matches(&envelope("content", "background", json!({}))));
    assert!(!path.matches(&envelope("content", "popup", json!({}))));
    assert!(!path.matches(&envelope("popup", "background", json!({}))));
}

#[test]
fn single_location_ignores_the_other_field() {
    let from_content = MessagePath::any().with_source(Location::Content);
    assert!(from_content.matches(&envelope("content", "background", json!({}))));
    assert!(from_content.matches(&envelope("content", "popup", json!({}))));
    assert!(from_content.matches(&json!({ "data": 1, "source": "content" })));
    assert!(!from_content.matches(&envelope("options", "popup", json!({}))));

    let to_popup = MessagePath::any().with_destination(Location::Popup);
    assert!(to_popup.matches(&envelope("background", "popup", json!({}))));
    assert!(!to_popup.matches(&envelope("background", "options", json!({}))));
    assert!(!to_popup.matches(&json!({ "data": 1 })));
}

#[test]
fn empty_path_is_a_wildcard() {
    let path = MessagePath::any();
    assert!(path.matches(&envelope("content", "background", json!({ "op": "x" }))));
    assert!(path.matches(&json!({ "data": 1 })));
    assert!(path.matches(&json!({})));
}

#[test]
fn malformed_envelopes_fail_closed() {
    let path = MessagePath::any();
    assert!(!path.matches(&json!("just a string")));
    assert!(!path.matches(&json!(null)));
    assert!(!path.matches(&json!([1, 2, 3])));

    let from_content = MessagePath::any().with_source(Location::Content);
    assert!(!from_content.matches(&json!({ "data": 1, "source": "Content" })));
    assert!(!from_content.matches(&json!({ "data": 1, "source": 3 })));
    assert!(!from_content.matches(&json!({ "data": 1, "source": "devtools" })));
}

#[test]
fn address_and_filters_both_apply() {
    let path = MessagePath::between(Location::Content, Location::Background)
        .with_filters(FilterSet::from([("op", "ping")]));
    assert!(path.matches(&envelope("content", "background", json!({ "op": "ping" }))));
    assert!(!path.matches(&envelope("content", "background", json!({ "op": "pong" }))));
    assert!(!path.matches(&envelope("content", "popup", json!({ "op": "ping" }))));
}

#[test]
fn filter_values_convert_from_scalars() {
    assert_eq!(FilterValue::from("a"), FilterValue::Text("a".into()));
    assert_eq!(FilterValue::from(true), FilterValue::Bool(true));
    assert!(FilterValue::from(7u64).matches(&json!(7)));
    assert!(FilterValue::from(-7i64).matches(&json!(-7.0)));
}
