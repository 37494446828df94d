//! Integration tests for `#[derive(Bind)]`.
//!
//! These check that the generated descriptors and setters line up with the
//! declared attributes and that derived types bind end to end.

use bytes::Bytes;
use http::Method;
use prost::Message;
use serde::Deserialize;
use tessera::{
    declared_fields, Bind, Binder, Binding, ConvertError, Location, ProtobufMessage, RawValue,
    Request,
};

#[derive(Debug, Default, Bind)]
struct Auth {
    #[bind(header = "token,required")]
    token: String,
}

#[derive(Debug, Default, Bind)]
struct Window {
    #[bind(query)]
    offset: u32,
}

#[derive(Debug, Default, Bind)]
struct CreateOrder {
    #[bind(path = "customer")]
    customer_id: u64,
    #[bind(query, form = "-")]
    dry_run: bool,
    #[bind(nested, header = "x")]
    auth: Auth,
    #[bind(flatten)]
    window: Window,
    #[bind(skip)]
    cache: Option<String>,
    #[bind(json, required, vd = "len > 0")]
    note: String,
}

#[test]
fn test_declared_fields_follow_attributes() {
    let fields = declared_fields::<CreateOrder>();
    let selectors: Vec<&str> = fields.iter().map(|f| f.selector.as_str()).collect();

    assert_eq!(
        selectors,
        vec![
            "customer_id",
            "dry_run",
            "auth",
            "auth.token",
            "window",
            "window.offset",
            "note",
        ]
    );

    let customer = &fields[0].descriptor;
    assert_eq!(customer.name(), "customer_id");
    assert_eq!(customer.directives()[0].location, Location::Path);
    assert_eq!(customer.directives()[0].name.as_deref(), Some("customer"));

    let token = &fields[3];
    assert_eq!(token.index_path, vec![2, 0]);
    assert!(token.descriptor.directives()[0].required);

    // Skipped fields keep their position, so later indices do not shift.
    assert_eq!(fields[6].index_path, vec![5]);
}

#[test]
fn test_generated_assign_routes_by_index() {
    let mut order = CreateOrder::default();

    order
        .assign(&[0], RawValue::Text(vec!["12"]), false)
        .unwrap();
    order
        .assign(&[2, 0], RawValue::Text(vec!["t"]), false)
        .unwrap();
    order
        .assign(&[3, 0], RawValue::Text(vec!["40"]), false)
        .unwrap();

    assert_eq!(order.customer_id, 12);
    assert_eq!(order.auth.token, "t");
    assert_eq!(order.window.offset, 40);
    assert_eq!(
        order.assign(&[4], RawValue::Text(vec!["x"]), false),
        Err(ConvertError::Unsupported)
    );
    assert!(matches!(
        order.assign(&[0], RawValue::Text(vec!["x"]), false),
        Err(ConvertError::Mismatch(_))
    ));
}

#[test]
fn test_compiled_names() {
    let binder = Binder::new();
    let receiver = binder.receiver::<CreateOrder>();

    let token = receiver.get_param("auth.token").unwrap();
    assert_eq!(token.directives()[0].name_path(), "x.token");

    let offset = receiver.get_param("window.offset").unwrap();
    assert_eq!(offset.directives()[0].name_path(), "offset");

    let dry_run = receiver.get_param("dry_run").unwrap();
    assert_eq!(dry_run.directives().len(), 1);
    assert!(!receiver.get_param("note").unwrap().is_omitted(Location::Json));
    assert!(receiver.get_param("cache").is_none());
    assert!(receiver.needs_validation());
}

#[test]
fn test_derived_type_binds() {
    let mut request = Request::builder()
        .method(Method::POST)
        .uri("/customers/3/orders?dry_run=true&offset=20")
        .path_param("customer", "3")
        .header("x.token", "abc")
        .content_type("application/json")
        .body(r#"{"note": "rush"}"#)
        .build();

    let mut order = CreateOrder::default();
    Binder::new().bind(&mut request, &mut order).unwrap();

    assert_eq!(order.customer_id, 3);
    assert!(order.dry_run);
    assert_eq!(order.auth.token, "abc");
    assert_eq!(order.window.offset, 20);
    assert_eq!(order.note, "rush");
    assert_eq!(order.cache, None);
}

#[derive(Debug, Default, Bind)]
struct Pair(#[bind(query = "a")] i32, #[bind(query = "b")] i32);

#[test]
fn test_tuple_struct() {
    let mut request = Request::builder().uri("/?a=1&b=-2").build();
    let mut pair = Pair::default();
    Binder::new().bind(&mut request, &mut pair).unwrap();
    assert_eq!((pair.0, pair.1), (1, -2));
}

#[derive(Debug, Default, Bind)]
struct Filter {
    #[bind(query)]
    r#type: String,
}

#[test]
fn test_raw_identifier_uses_plain_name() {
    let mut request = Request::builder().uri("/?type=open").build();
    let mut filter = Filter::default();
    Binder::new().bind(&mut request, &mut filter).unwrap();
    assert_eq!(filter.r#type, "open");
}

#[derive(Debug, Default, Bind)]
struct Blob {
    #[bind(raw_body)]
    data: Bytes,
}

#[test]
fn test_raw_body_requests_body() {
    let receiver = Binder::new().receiver::<Blob>();
    assert!(receiver.needs_body());
    assert!(!Blob::BULK_BODY);
}

#[derive(Clone, PartialEq, Message, Bind)]
#[bind(protobuf)]
struct Heartbeat {
    #[prost(uint64, tag = "1")]
    seq: u64,
}

#[derive(Debug, Default, Deserialize, Bind)]
#[bind(json_bulk)]
struct Settings {
    theme: String,
}

#[test]
fn test_bulk_decoders() {
    assert!(Heartbeat::BULK_BODY);
    assert!(Settings::BULK_BODY);

    let mut beat = Heartbeat::default();
    beat.as_protobuf()
        .unwrap()
        .decode_from(&Heartbeat { seq: 4 }.encode_to_vec())
        .unwrap();
    assert_eq!(beat.seq, 4);

    let mut settings = Settings::default();
    assert!(settings.as_protobuf().is_none());
    settings.prebind_json(br#"{"theme": "dark"}"#).unwrap();
    assert_eq!(settings.theme, "dark");
}
