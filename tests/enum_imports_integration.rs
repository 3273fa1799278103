mod common;

use common::recording_callback;
use nalt_bind::enumerate::ImportVisit;
use nalt_bind::{Binding, ImportEntry, MemoryDatabase, Value};

/// One module with ten by-name imports at 0x5000, 0x5008, ...
fn ten_imports() -> Binding<MemoryDatabase> {
    let mut db = MemoryDatabase::new();
    let m = db.add_import_module("USER32.dll");
    for i in 0..10u64 {
        db.add_import(m, ImportEntry::by_name(0x5000 + i * 8, format!("Func{}", i)));
    }
    Binding::new(db)
}

#[test]
fn test_non_callable_is_invalid_argument() {
    let b = ten_imports();
    for bogus in [Value::None, Value::Int(1), Value::from("print"), Value::Bool(true)] {
        assert_eq!(b.enum_import_names(0, &bogus), ImportVisit::INVALID_ARGUMENT);
    }
}

#[test]
fn test_non_callable_performs_no_iteration() {
    let b = ten_imports();
    let (cb, calls) = recording_callback(|_| Some(Value::Bool(true)));
    assert_eq!(b.enum_import_names(0, &Value::Int(0)), -1);
    assert!(calls.lock().unwrap().is_empty());
    // The real callback still works on the same binding.
    assert_eq!(b.enum_import_names(0, &cb), 1);
    assert_eq!(calls.lock().unwrap().len(), 10);
}

#[test]
fn test_falsy_on_third_item_stops() {
    let b = ten_imports();
    let (cb, calls) = recording_callback(|n| Some(Value::Bool(n != 3)));
    let code = b.enum_import_names(0, &cb);
    assert_eq!(code, ImportVisit::STOP);
    let calls = calls.lock().unwrap();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[2].0, Value::Int(0x5010));
    assert_eq!(calls[2].1, Value::from("Func2"));
}

#[test]
fn test_failed_call_stops() {
    let b = ten_imports();
    let (cb, calls) = recording_callback(|n| if n == 2 { None } else { Some(Value::Int(1)) });
    assert_eq!(b.enum_import_names(0, &cb), ImportVisit::STOP);
    assert_eq!(calls.lock().unwrap().len(), 2);
}

#[test]
fn test_truthiness_of_results() {
    let b = ten_imports();
    for (answer, expected_calls) in [
        (Value::Int(0), 1),
        (Value::from(""), 1),
        (Value::None, 1),
        (Value::Int(-1), 10),
        (Value::from("yes"), 10),
    ] {
        let (cb, calls) = recording_callback(move |_| Some(answer.clone()));
        b.enum_import_names(0, &cb);
        assert_eq!(calls.lock().unwrap().len(), expected_calls);
    }
}

#[test]
fn test_missing_name_is_resolved_by_address() {
    let mut db = MemoryDatabase::new();
    let m = db.add_import_module("WS2_32.dll");
    db.add_import(m, ImportEntry::by_ordinal(0x7000, 23));
    db.add_import(m, ImportEntry::by_ordinal(0x7008, 115));
    db.set_name(0x7000, "socket");
    let b = Binding::new(db);

    let (cb, calls) = recording_callback(|_| Some(Value::Bool(true)));
    assert_eq!(b.enum_import_names(0, &cb), 1);
    let calls = calls.lock().unwrap();
    assert_eq!(
        calls[0],
        (Value::Int(0x7000), Value::from("socket"), Value::Int(23))
    );
    assert_eq!(calls[1], (Value::Int(0x7008), Value::None, Value::Int(115)));
}

#[test]
fn test_bad_module_index() {
    let b = ten_imports();
    let (cb, calls) = recording_callback(|_| Some(Value::Bool(true)));
    assert_eq!(b.enum_import_names(1, &cb), -1);
    assert_eq!(b.enum_import_names(-1, &cb), -1);
    assert!(calls.lock().unwrap().is_empty());
}

#[test]
fn test_module_names() {
    let b = ten_imports();
    assert_eq!(b.get_import_module_qty(), 1);
    assert_eq!(b.get_import_module_name(0), Value::from("USER32.dll"));
    assert_eq!(b.get_import_module_name(1), Value::None);
}
