//! Integration tests for the cleansing pipeline through the interceptor

use avert::prelude::*;

fn group(pairs: &[(&str, &str)]) -> FieldGroup {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn query_only(pairs: &[(&str, &str)]) -> RequestFields {
    RequestFields {
        query: group(pairs),
        ..Default::default()
    }
}

#[test]
fn test_identity_with_all_defaults() {
    let interceptor = Interceptor::new(AvertConfig::new());
    let fields = RequestFields {
        query: group(&[("a", "$aad"), ("b", ""), ("c", "   ")]),
        params: group(&[("id", "{x}")]),
        payload: Some(group(&[("d", "<script>x</script>")])),
    };

    let out = interceptor.intercept(&RoutePolicy::Inherit, fields.clone());
    assert_eq!(out, fields);
}

#[test]
fn test_scenario_remove_non_existent() {
    // global {removeNonExistent: true}; ?a=&b=&c=c -> {c: "c"}
    let interceptor = Interceptor::new(AvertConfig::new().remove_non_existent(true));

    let out = interceptor.intercept(
        &RoutePolicy::Inherit,
        query_only(&[("a", ""), ("b", ""), ("c", "c")]),
    );
    assert_eq!(out.query, group(&[("c", "c")]));
}

#[test]
fn test_scenario_remove_whitespace_payload() {
    // global {removeWhitespace: true}; {a:"   ", b:"    ", c:"c"} -> {c:"c"}
    let interceptor = Interceptor::new(AvertConfig::new().remove_whitespace(true));

    let fields = RequestFields {
        payload: Some(group(&[("a", "   "), ("b", "    "), ("c", "c")])),
        ..Default::default()
    };
    let out = interceptor.intercept(&RoutePolicy::Inherit, fields);
    assert_eq!(out.payload.unwrap(), group(&[("c", "c")]));
}

#[test]
fn test_scenario_escape_dollar_sign() {
    // global {escapeDollarSign: true}; ?a=$aad&b=$&c=BTC
    let interceptor = Interceptor::new(AvertConfig::new().escape_dollar_sign(true));

    let out = interceptor.intercept(
        &RoutePolicy::Inherit,
        query_only(&[("a", "$aad"), ("b", "$"), ("c", "BTC")]),
    );
    assert_eq!(
        out.query,
        group(&[("a", "\\$aad"), ("b", "\\$"), ("c", "BTC")])
    );
}

#[test]
fn test_scenario_sanitize_query_html() {
    // global {avertQuery: true}; script stripped, benign tags kept
    let interceptor = Interceptor::new(AvertConfig::new().avert_query(true));

    let out = interceptor.intercept(
        &RoutePolicy::Inherit,
        query_only(&[(
            "a",
            "<b>hello <i>world</i><script src=foo.js></script></b>",
        )]),
    );
    assert_eq!(out.query.get("a").unwrap(), "<b>hello <i>world</i></b>");
}

#[test]
fn test_scenario_query_custom_sanitizer() {
    // queryCustomSanitizer appends "cq"; ?a=a&b=b -> {a:"acq", b:"bcq"}
    let interceptor = Interceptor::new(AvertConfig::new().with_query_sanitizer(
        |mut g: FieldGroup| {
            for v in g.values_mut() {
                v.push_str("cq");
            }
            g
        },
    ));

    let out = interceptor.intercept(&RoutePolicy::Inherit, query_only(&[("a", "a"), ("b", "b")]));
    assert_eq!(out.query, group(&[("a", "acq"), ("b", "bcq")]));
}

#[test]
fn test_query_sanitizer_runs_after_generic_before_removal() {
    // generic appends "cg", query slot appends "cq"; whitespace-only
    // input gains suffixes first and therefore survives the whitespace
    // pass
    let interceptor = Interceptor::new(
        AvertConfig::new()
            .remove_whitespace(true)
            .with_generic_sanitizer(|mut g: FieldGroup| {
                for v in g.values_mut() {
                    v.push_str("cg");
                }
                g
            })
            .with_query_sanitizer(|mut g: FieldGroup| {
                for v in g.values_mut() {
                    v.push_str("cq");
                }
                g
            }),
    );

    let out = interceptor.intercept(&RoutePolicy::Inherit, query_only(&[("a", "   ")]));
    assert_eq!(out.query.get("a").unwrap(), "   cgcq");
}

#[test]
fn test_precedence_remove_over_escape() {
    let interceptor = Interceptor::new(
        AvertConfig::new()
            .remove_dollar_sign(true)
            .escape_dollar_sign(true)
            .remove_curly_bracket(true)
            .escape_curly_bracket(true),
    );

    let out = interceptor.intercept(
        &RoutePolicy::Inherit,
        query_only(&[("a", "$gt"), ("b", "{x}"), ("c", "safe")]),
    );
    assert_eq!(out.query, group(&[("c", "safe")]));
}

#[test]
fn test_disabled_sentinel_beats_global_config() {
    let interceptor = Interceptor::new(
        AvertConfig::new()
            .remove_whitespace(true)
            .remove_non_existent(true)
            .remove_dollar_sign(true)
            .remove_curly_bracket(true)
            .avert_query(true),
    );
    let fields = RequestFields {
        query: group(&[("a", "$x"), ("b", ""), ("c", "<script>x</script>")]),
        params: group(&[("id", "  ")]),
        payload: Some(group(&[("d", "{y}")])),
    };

    let out = interceptor.intercept(&RoutePolicy::Disabled, fields.clone());
    assert_eq!(out, fields);
}

#[test]
fn test_idempotence_of_removal_passes() {
    let interceptor = Interceptor::new(
        AvertConfig::new()
            .remove_whitespace(true)
            .remove_non_existent(true)
            .remove_dollar_sign(true)
            .remove_curly_bracket(true),
    );
    let fields = RequestFields {
        query: group(&[("a", " "), ("b", ""), ("c", "$x"), ("d", "{y"), ("e", "keep")]),
        ..Default::default()
    };

    let once = interceptor.intercept(&RoutePolicy::Inherit, fields);
    let twice = interceptor.intercept(&RoutePolicy::Inherit, once.clone());
    assert_eq!(once, twice);
    assert_eq!(once.query, group(&[("e", "keep")]));
}

#[test]
fn test_escape_is_idempotent_per_application() {
    // an already-escaped value no longer starts with '$', so a second
    // pass leaves it alone
    let interceptor = Interceptor::new(AvertConfig::new().escape_dollar_sign(true));
    let once = interceptor.intercept(&RoutePolicy::Inherit, query_only(&[("a", "$x")]));
    let twice = interceptor.intercept(&RoutePolicy::Inherit, once.clone());
    assert_eq!(once, twice);
}

#[test]
fn test_route_override_merges_over_global() {
    let interceptor = Interceptor::new(AvertConfig::new().remove_non_existent(true));
    let route = RoutePolicy::Override(
        AvertOverrides::new()
            .remove_non_existent(false)
            .escape_dollar_sign(true),
    );

    let out = interceptor.intercept(&route, query_only(&[("a", ""), ("b", "$x")]));
    // global removal switched off by the route, route-level escape active
    assert_eq!(out.query, group(&[("a", ""), ("b", "\\$x")]));
}

#[test]
fn test_yaml_registration_gate() {
    let err = AvertConfig::from_yaml_str("avertEverything: true").unwrap_err();
    assert_eq!(err.error_code(), "UNKNOWN_OPTION");

    let config = AvertConfig::from_yaml_str("removeDollarSign: true").unwrap();
    let interceptor = Interceptor::new(config);
    let out = interceptor.intercept(&RoutePolicy::Inherit, query_only(&[("a", "$x")]));
    assert!(out.query.is_empty());
}
