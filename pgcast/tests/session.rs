use std::sync::Arc;

use pgcast::{Cast, Config, DateStyle, ErrorKind, Interval, Record, Session, Value, types::Category};

mod common;
use common::Scripted;

fn session() -> Session<Scripted> {
    Session::new(Scripted::new())
}

#[test]
fn builtin_types() {
    let mut session = session();
    assert_eq!(session.typecast(Some("t"), "bool").unwrap(), Value::Bool(true));
    assert_eq!(session.typecast(Some("42"), "int4").unwrap(), Value::Int(42));
    assert_eq!(session.typecast(None, "int4").unwrap(), Value::Null);
    assert_eq!(
        session.typecast(Some("1 day"), "interval").unwrap(),
        Value::Interval(Interval { days: 1, ..Default::default() })
    );
    assert_eq!(
        session.typecast(Some("{1,2,3}"), "_int4").unwrap(),
        Value::Array(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
    );
    // builtins need no catalog roundtrip
    assert_eq!(session.catalog().type_queries(), 0);
}

#[test]
fn unknown_type_is_text() {
    let mut session = session();
    assert_eq!(session.typecast(Some("whatever"), "mood").unwrap(), Value::from("whatever"));
    assert!(session.get_typecast("mood").unwrap().is_none());
}

#[test]
fn cast_failure_has_context() {
    let mut session = session();
    let err = session.typecast(Some("{a,b}"), "_int4").unwrap_err();
    assert!(err.to_string().starts_with("typecast _int4: "), "{err}");
    assert!(matches!(err.into_kind(), ErrorKind::CastFailure(_)));
}

#[test]
fn type_identity() {
    let mut session = session();
    let by_name = session.type_info("int4").unwrap();
    let by_oid = session.type_info(pgcast::types::TypeKey::Oid(23)).unwrap();
    let by_regtype = session.type_info("integer").unwrap();
    assert!(Arc::ptr_eq(&by_name, &by_oid));
    assert!(Arc::ptr_eq(&by_name, &by_regtype));
    assert_eq!(session.catalog().type_queries(), 1);

    let array = session.type_info("_int4").unwrap();
    assert_eq!(array.category(), Category::Array);
    assert!(Arc::ptr_eq(array.element().unwrap(), &by_name));
}

#[test]
fn composite_record() {
    let mut session = session();
    let fields = session.fields_of("inventory_item").unwrap().unwrap();
    assert_eq!(fields.len(), 3);
    assert!(session.fields_of("int4").unwrap().is_none());

    let value = session.typecast(Some(r#"("fuzzy dice",42,1.99)"#), "inventory_item").unwrap();
    let Value::Record(record) = value else { panic!("expected record") };
    let names: Vec<_> = record.names().unwrap().iter().map(|n| n.as_str()).collect();
    assert_eq!(names, ["name", "supplier_id", "price"]);
    assert_eq!(record.fields(), [Value::from("fuzzy dice"), Value::Int(42), Value::Numeric("1.99".into())]);

    let nested = session
        .typecast(Some(r#"("(""fuzzy dice"",42,1.99)",1000)"#), "on_hand")
        .unwrap();
    let Value::Record(nested) = nested else { panic!("expected record") };
    assert_eq!(nested.try_get::<_, i32>("count").unwrap(), 1000);
    let item: Record = nested.try_get("item").unwrap();
    assert_eq!(item.try_get::<_, String>("name").unwrap(), "fuzzy dice");

    let err = session.typecast(Some("(a,1)"), "inventory_item").unwrap_err();
    assert!(matches!(err.into_kind(), ErrorKind::FieldCountMismatch(e) if e.expected == 3 && e.found == 2));
}

#[test]
fn array_of_composite() {
    let mut session = session();
    let value = session
        .typecast(Some(r#"{"(a,1,)","(b,2,0.5)"}"#), "_inventory_item")
        .unwrap();
    let Value::Array(items) = value else { panic!("expected array") };
    assert_eq!(items.len(), 2);
    let Value::Record(first) = &items[0] else { panic!("expected record") };
    assert!(first.get("price").unwrap().is_null());
}

#[test]
fn element_delimiter() {
    let mut session = session();
    let value = session.typecast(Some("{(1,1),(0,0);(2,2),(1,1)}"), "_box").unwrap();
    assert_eq!(value, Value::Array(vec![Value::from("(1,1),(0,0)"), Value::from("(2,2),(1,1)")]));
}

#[test]
fn decode_row() {
    let mut session = session();
    let row = session
        .decode_row(&[Some("t"), Some("{1,NULL}"), None, Some("(x,1,2)")], &[16, 1007, 25, 16400])
        .unwrap();
    assert_eq!(row[0], Value::Bool(true));
    assert_eq!(row[1], Value::Array(vec![Value::Int(1), Value::Null]));
    assert_eq!(row[2], Value::Null);
    assert!(matches!(&row[3], Value::Record(r) if r.len() == 3));

    let err = session.decode_row(&[Some("t")], &[16, 23]).unwrap_err();
    assert!(matches!(err.into_kind(), ErrorKind::FieldCountMismatch(_)));

    let err = session.decode_row(&[Some("x")], &[99999]).unwrap_err();
    assert!(matches!(err.into_kind(), ErrorKind::UnknownType(_)));
}

#[test]
fn override_and_invalidation() {
    let mut session = session();
    let before = session.get_typecast("_inventory_item").unwrap().unwrap();

    let text = Cast::plain(|text| Ok(Value::Text(text.into())));
    session.set_typecast(&["int4", "numeric"], Some(text.clone()));
    assert!(session.get_typecast("int4").unwrap().unwrap().ptr_eq(&text));

    let after = session.get_typecast("_inventory_item").unwrap().unwrap();
    assert!(!after.ptr_eq(&before));
    assert_eq!(
        session.typecast(Some("(a,1,2)"), "inventory_item").unwrap(),
        Value::Record(Record::new(vec![Value::from("a"), Value::from("1"), Value::from("2")]))
    );

    session.set_typecast(&["numeric"], None);
    assert!(session.get_typecast("numeric").unwrap().unwrap().ptr_eq(&pgcast::typecast::get_default("numeric").unwrap()));
    assert!(session.get_typecast("int4").unwrap().unwrap().ptr_eq(&text));

    session.reset_typecast(None);
    assert_eq!(session.typecast(Some("1"), "int4").unwrap(), Value::Int(1));
}

#[test]
fn reset_keeps_overrides() {
    let mut session = session();
    let text = Cast::plain(|text| Ok(Value::Text(text.into())));
    session.set_typecast(&["int4"], Some(text.clone()));
    let before = session.type_info("inventory_item").unwrap();

    session.reset();
    let after = session.type_info("inventory_item").unwrap();
    assert!(!Arc::ptr_eq(&before, &after));
    assert!(session.get_typecast("int4").unwrap().unwrap().ptr_eq(&text));
}

#[test]
fn catalog_failure() {
    let mut session = session();
    session.catalog_mut().offline = true;

    let err = session.type_info("int4").unwrap_err();
    assert!(std::error::Error::source(&err).is_some());
    assert!(matches!(err.into_kind(), ErrorKind::UnknownType(_)));

    // builtin arrays need no element descriptor
    assert_eq!(
        session.typecast(Some("{1,2}"), "_int4").unwrap(),
        Value::Array(vec![Value::Int(1), Value::Int(2)])
    );
}

#[test]
fn catalog_failure_is_retried() {
    let mut session = session();
    session.catalog_mut().offline = true;

    let err = session.typecast(Some("(a,1,2)"), "inventory_item").unwrap_err();
    assert!(err.to_string().starts_with("typecast inventory_item: "), "{err}");
    assert!(std::error::Error::source(&err).is_some());
    assert!(matches!(err.into_kind(), ErrorKind::UnknownType(e) if !e.is_missing()));

    let err = session.typecast(Some("{(1,1),(0,0)}"), "_box").unwrap_err();
    assert!(matches!(err.into_kind(), ErrorKind::UnknownType(_)));
    let err = session.typecast(Some(r#"{"(a,1,2)"}"#), "_inventory_item").unwrap_err();
    assert!(matches!(err.into_kind(), ErrorKind::UnknownType(_)));

    session.catalog_mut().offline = false;
    let value = session.typecast(Some("(a,1,2)"), "inventory_item").unwrap();
    assert_eq!(
        value,
        Value::Record(Record::new(vec![Value::from("a"), Value::Int(1), Value::Numeric("2".into())]))
    );
    assert_eq!(
        session.typecast(Some("{(1,1),(0,0);(2,2),(1,1)}"), "_box").unwrap(),
        Value::Array(vec![Value::from("(1,1),(0,0)"), Value::from("(2,2),(1,1)")])
    );
    assert!(matches!(
        session.typecast(Some(r#"{"(a,1,2)"}"#), "_inventory_item").unwrap(),
        Value::Array(items) if items.len() == 1
    ));
}

#[test]
#[cfg(feature = "time")]
fn date_style_per_call() {
    let mut session = session();
    assert!(matches!(session.typecast(Some("1997-12-17"), "date").unwrap(), Value::Date(_)));

    session.catalog_mut().date_style = DateStyle::German;
    assert_eq!(session.context().date_style(), DateStyle::German);
    assert!(matches!(session.typecast(Some("17.12.1997"), "date").unwrap(), Value::Date(_)));
    assert!(session.typecast(Some("1997-12-17"), "date").is_err());

    session.set_config(Config::default().date_style(Some(DateStyle::Iso)));
    assert!(session.typecast(Some("1997-12-17"), "date").is_ok());
}

#[test]
fn config_flags() {
    let config = Config::default().bool_as_text(true).decimal_point(None);
    let mut session = Session::with_config(Scripted::new(), config);
    assert_eq!(session.typecast(Some("t"), "bool").unwrap(), Value::from("t"));
    assert_eq!(session.typecast(Some("$1.00"), "money").unwrap(), Value::from("$1.00"));
}
