use std::borrow::Cow;

use http::HeaderValue;

use crate::{KeySource, LockKeyBuilder, RequestContext, RequestSnapshot};

const LOGIN_KEYS: [&str; 5] = [":ip", "h:X-Token", "q:type", "p:id", "account"];

fn login_request() -> RequestSnapshot {
    RequestSnapshot::new()
        .with_remote_addr("192.0.2.1:52110".parse().unwrap())
        .with_header("x-token", HeaderValue::from_static("xyz"))
        .with_query("type", "1")
        .with_param("id", "123")
        .with_body(
            r#"{
                "account": "tree.xie"
            }"#,
        )
}

#[test]
fn builds_key_from_every_source_kind() {
    let builder = LockKeyBuilder::new(LOGIN_KEYS);

    assert_eq!(builder.build(&login_request()), "192.0.2.1,xyz,1,123,tree.xie");
}

#[test]
fn identical_requests_build_identical_keys() {
    let builder = LockKeyBuilder::new(LOGIN_KEYS);

    let first = builder.build(&login_request());
    let second = builder.build(&login_request());

    assert_eq!(first, second);
}

#[test]
fn source_order_is_key_order() {
    let forward = LockKeyBuilder::new(["q:type", "p:id"]);
    let reversed = LockKeyBuilder::new(["p:id", "q:type"]);

    let ctx = login_request();

    assert_eq!(forward.build(&ctx), "1,123");
    assert_eq!(reversed.build(&ctx), "123,1");
}

#[test]
fn empty_source_list_builds_empty_key() {
    let builder = LockKeyBuilder::new(Vec::<String>::new());

    assert_eq!(builder.build(&login_request()), "");
    assert_eq!(builder.build(&RequestSnapshot::new()), "");
}

#[test]
fn missing_values_resolve_to_empty_segments() {
    let builder = LockKeyBuilder::new(LOGIN_KEYS);

    assert_eq!(builder.build(&RequestSnapshot::new()), ",,,,");
}

#[test]
fn single_missing_value_keeps_separators() {
    let builder = LockKeyBuilder::new(LOGIN_KEYS);
    let mut ctx = login_request();
    ctx.params_mut().clear();

    assert_eq!(builder.build(&ctx), "192.0.2.1,xyz,1,,tree.xie");
}

#[test]
fn malformed_body_resolves_to_empty_segment() {
    let builder = LockKeyBuilder::new(["q:type", "account"]);

    let ctx = login_request().with_body("account=tree.xie");
    assert_eq!(builder.build(&ctx), "1,");

    let ctx = login_request().with_body(r#"["tree.xie"]"#);
    assert_eq!(builder.build(&ctx), "1,");

    let ctx = login_request().with_body("");
    assert_eq!(builder.build(&ctx), "1,");
}

#[test]
fn non_string_body_values_render_as_json() {
    let builder = LockKeyBuilder::new(["count", "enabled", "missing", "nothing", "tags", "user"]);
    let ctx = RequestSnapshot::new().with_body(
        r#"{"count": 42, "enabled": true, "nothing": null, "tags": ["a", "b"], "user": {"id": 7}}"#,
    );

    assert_eq!(builder.build(&ctx), r#"42,true,,,["a", "b"],{"id": 7}"#);
}

#[test]
fn numbers_keep_their_source_text() {
    let builder = LockKeyBuilder::new(["order"]);

    let first = RequestSnapshot::new().with_body(r#"{"order":100000000000000000000001}"#);
    let second = RequestSnapshot::new().with_body(r#"{"order":100000000000000000000002}"#);

    assert_eq!(builder.build(&first), "100000000000000000000001");
    assert_ne!(builder.build(&first), builder.build(&second));

    let builder = LockKeyBuilder::new(["n", "price"]);
    let ctx = RequestSnapshot::new().with_body(r#"{"n":1e2,"price":10.50}"#);

    assert_eq!(builder.build(&ctx), "1e2,10.50");
}

#[test]
fn repeated_body_field_takes_first_occurrence() {
    let builder = LockKeyBuilder::new(["account"]);
    let ctx = RequestSnapshot::new().with_body(r#"{"account":"a","account":"b"}"#);

    assert_eq!(builder.build(&ctx), "a");
}

#[test]
fn escaped_string_fields_are_decoded() {
    let builder = LockKeyBuilder::new(["account"]);
    let ctx = RequestSnapshot::new().with_body(r#"{"account":"tree\u002exie\n"}"#);

    assert_eq!(builder.build(&ctx), "tree.xie\n");
}

#[test]
fn body_is_decoded_once_for_several_fields() {
    let builder = LockKeyBuilder::new(["account", "device"]);
    let ctx = RequestSnapshot::new().with_body(r#"{"account":"tree.xie","device":"ios"}"#);

    assert_eq!(builder.build(&ctx), "tree.xie,ios");
}

#[test]
fn header_lookup_ignores_case() {
    let builder = LockKeyBuilder::new(["h:x-token", "h:X-TOKEN"]);

    assert_eq!(builder.build(&login_request()), "xyz,xyz");
}

#[test]
fn separator_inside_values_is_kept_verbatim() {
    let builder = LockKeyBuilder::new(["q:a", "q:b"]);
    let ctx = RequestSnapshot::new().with_query("a", "1,2").with_query("b", "3");

    assert_eq!(builder.build(&ctx), "1,2,3");
}

#[test]
fn from_sources_exposes_sources() {
    let sources = vec![KeySource::ClientIp, KeySource::Body("account".to_string())];
    let builder = LockKeyBuilder::from_sources(sources.clone());

    assert_eq!(builder.sources(), sources.as_slice());
}

struct FixedContext;

impl RequestContext for FixedContext {
    fn client_ip(&self) -> Cow<'_, str> {
        Cow::Borrowed("10.0.0.1")
    }

    fn header(&self, _name: &str) -> Option<&str> {
        Some("h")
    }

    fn query(&self, _name: &str) -> Option<&str> {
        None
    }

    fn param(&self, _name: &str) -> Option<&str> {
        Some("p")
    }

    fn body(&self) -> &[u8] {
        br#"{"account":"a"}"#
    }
}

#[test]
fn builds_from_any_request_context() {
    let builder = LockKeyBuilder::new(LOGIN_KEYS);

    assert_eq!(builder.build(&FixedContext), "10.0.0.1,h,,p,a");
}
