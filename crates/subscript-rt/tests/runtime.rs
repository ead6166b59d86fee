//! Ownership, tracing, resource limits and configuration around the subscript entry points.

use pretty_assertions::assert_eq;
use subscript_rt::{
    BuiltinKind, DispatchPath, ErrorKind, ExcType, MappingSlots, Operation, ProfilingTracer, RecordingTracer,
    ResourceLimits, Runtime, RuntimeConfig, SlotResult, TextModel, TraceEvent, TraceMode, TypeSpec, Value,
    del_subscript, lookup_subscript, lookup_subscript_const, set_subscript,
};

// =============================================================================
// 1. Ownership
// =============================================================================

#[test]
fn successful_reads_add_exactly_one_reference_on_every_path() {
    let mut rt = Runtime::default();
    let item = rt.new_bytes(b"item").unwrap();
    let held = rt.clone_value(&item);
    let list = rt.new_list(vec![held]).unwrap();
    assert_eq!(rt.refcount(&item), Some(2));

    let fast = lookup_subscript_const(&mut rt, &list, &Value::Int(0), 0).unwrap();
    assert_eq!(rt.refcount(&item), Some(3));

    let generic = lookup_subscript(&mut rt, &list, &Value::Int(0)).unwrap();
    assert_eq!(rt.refcount(&item), Some(4));

    let t = rt.new_tuple(vec![rt.clone_value(&item)]).unwrap();
    let from_tuple = lookup_subscript_const(&mut rt, &t, &Value::Int(-1), -1).unwrap();
    assert_eq!(rt.refcount(&item), Some(6));

    for value in [fast, generic, from_tuple] {
        rt.drop_value(value);
    }
    assert_eq!(rt.refcount(&item), Some(3));
}

#[test]
fn failed_reads_leave_reference_counts_untouched() {
    let mut rt = Runtime::default();
    let item = rt.new_bytes(b"item").unwrap();
    let list = rt.new_list(vec![rt.clone_value(&item)]).unwrap();

    assert!(lookup_subscript_const(&mut rt, &list, &Value::Int(1), 1).is_err());
    assert!(lookup_subscript(&mut rt, &list, &Value::Int(-2)).is_err());
    assert_eq!(rt.refcount(&item), Some(2));
    assert_eq!(rt.refcount(&list), Some(1));
}

#[test]
fn assignment_releases_the_replaced_value() {
    let mut rt = Runtime::default();
    let old = rt.new_bytes(b"old").unwrap();
    let new = rt.new_bytes(b"new").unwrap();
    let list = rt.new_list(vec![rt.clone_value(&old)]).unwrap();

    set_subscript(&mut rt, &new, &list, &Value::Int(0)).unwrap();
    assert_eq!(rt.refcount(&old), Some(1));
    assert_eq!(rt.refcount(&new), Some(2));

    del_subscript(&mut rt, &list, &Value::Int(0)).unwrap();
    assert_eq!(rt.refcount(&new), Some(1));
}

#[test]
fn dropping_a_container_frees_its_items() {
    let mut rt = Runtime::default();
    let inner = rt.new_list(vec![]).unwrap();
    let key = rt.new_bytes(b"k").unwrap();
    let d = rt.new_dict(vec![(key, inner)]).unwrap();
    assert_eq!(rt.heap_stats().live_objects, 3);

    rt.drop_value(d);
    let stats = rt.heap_stats();
    assert_eq!(stats.live_objects, 0);
    assert_eq!(stats.free_slots, 3);
}

// =============================================================================
// 2. Tracing
// =============================================================================

fn always_none(_: &mut Runtime, _: &Value, _: &Value) -> SlotResult<Value> {
    Ok(Value::None)
}

#[test]
fn tracer_distinguishes_fast_path_from_dispatch() {
    let mut rt = Runtime::new(RuntimeConfig::new().text_model(TextModel::ByteString));
    let recorder = RecordingTracer::new();
    rt.set_tracer(recorder.clone());

    let list = rt.new_list(vec![Value::Int(1), Value::Int(2)]).unwrap();
    let s = rt.new_bytes(b"ab").unwrap();
    let t = rt.new_tuple(vec![Value::Int(3)]).unwrap();
    let lookalike = rt.register_type(TypeSpec::new("ListLike").mapping(MappingSlots::new().get(always_none)));
    let obj = rt.new_instance(lookalike, vec![]).unwrap();

    lookup_subscript_const(&mut rt, &list, &Value::Int(-1), -1).unwrap();
    let c = lookup_subscript_const(&mut rt, &s, &Value::Int(0), 0).unwrap();
    lookup_subscript_const(&mut rt, &t, &Value::Int(0), 0).unwrap();
    lookup_subscript_const(&mut rt, &obj, &Value::Int(0), 0).unwrap();
    lookup_subscript(&mut rt, &list, &Value::Int(0)).unwrap();
    rt.drop_value(c);

    assert_eq!(
        recorder.events(),
        vec![
            TraceEvent::FastPath {
                kind: BuiltinKind::List,
                position: 1
            },
            TraceEvent::FastPath {
                kind: BuiltinKind::ByteStr,
                position: 0
            },
            TraceEvent::Dispatch {
                op: Operation::GetConst,
                path: DispatchPath::Mapping,
                type_name: "tuple".to_owned()
            },
            TraceEvent::Dispatch {
                op: Operation::GetConst,
                path: DispatchPath::Mapping,
                type_name: "ListLike".to_owned()
            },
            TraceEvent::Dispatch {
                op: Operation::Get,
                path: DispatchPath::Mapping,
                type_name: "list".to_owned()
            },
        ]
    );
}

#[test]
fn tracer_sees_errors_with_their_kind() {
    let mut rt = Runtime::default();
    let recorder = RecordingTracer::new();
    rt.set_tracer(recorder.clone());
    let list = rt.new_list(vec![]).unwrap();

    lookup_subscript_const(&mut rt, &list, &Value::Int(0), 0).unwrap_err();
    set_subscript(&mut rt, &Value::None, &Value::Int(1), &Value::Int(0)).unwrap_err();
    del_subscript(&mut rt, &list, &Value::Int(0)).unwrap_err();

    assert_eq!(
        recorder.events(),
        vec![
            TraceEvent::Error {
                op: Operation::GetConst,
                kind: ErrorKind::IndexOutOfRange,
                exc_type: ExcType::IndexError
            },
            TraceEvent::Error {
                op: Operation::Set,
                kind: ErrorKind::TypeMismatch,
                exc_type: ExcType::TypeError
            },
            TraceEvent::Dispatch {
                op: Operation::Del,
                path: DispatchPath::Generic,
                type_name: "list".to_owned()
            },
            TraceEvent::Error {
                op: Operation::Del,
                kind: ErrorKind::PropagatedFailure,
                exc_type: ExcType::IndexError
            },
        ]
    );
}

#[test]
fn profiling_counts_hits_per_path() {
    let mut rt = Runtime::default();
    let profiler = ProfilingTracer::new();
    rt.set_tracer(profiler.clone());
    let list = rt.new_list(vec![Value::Int(1)]).unwrap();

    for _ in 0..3 {
        lookup_subscript_const(&mut rt, &list, &Value::Int(0), 0).unwrap();
    }
    set_subscript(&mut rt, &Value::Int(2), &list, &Value::Int(0)).unwrap();

    let report = profiler.report();
    assert_eq!(report.total_fast_path_hits(), 3);
    assert_eq!(report.dispatches.get(&(Operation::Set, DispatchPath::Mapping)), Some(&1));
    assert!(report.errors.is_empty());
}

// =============================================================================
// 3. Resource limits
// =============================================================================

#[test]
fn allocation_limit_on_the_fast_path_is_uncatchable() {
    let config = RuntimeConfig::new()
        .text_model(TextModel::ByteString)
        .limits(ResourceLimits::new().max_allocations(2));
    let mut rt = Runtime::new(config);
    let s = rt.new_bytes(b"ab").unwrap();

    let a = lookup_subscript_const(&mut rt, &s, &Value::Int(0), 0).unwrap();
    let err = lookup_subscript_const(&mut rt, &s, &Value::Int(1), 1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResourceExhausted);
    assert_eq!(err.exc_type(), ExcType::MemoryError);
    assert!(!err.exc_type().is_subclass_of(ExcType::Exception));

    // cached characters need no new allocation
    let again = lookup_subscript_const(&mut rt, &s, &Value::Int(0), 0).unwrap();
    assert_eq!(a, again);
}

#[test]
fn allocation_limit_inside_a_slot_propagates_memory_error() {
    let mut rt = Runtime::new(RuntimeConfig::new().limits(ResourceLimits::new().max_allocations(1)));
    let s = rt.new_bytes(b"ab").unwrap();

    let err = lookup_subscript(&mut rt, &s, &Value::Int(0)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PropagatedFailure);
    assert_eq!(err.exc_type(), ExcType::MemoryError);
    assert!(!rt.pending().is_set());
}

#[test]
fn constructors_fail_when_the_limit_is_reached() {
    let mut rt = Runtime::new(RuntimeConfig::new().limits(ResourceLimits::new().max_allocations(1)));
    rt.new_list(vec![]).unwrap();
    let err = rt.new_tuple(vec![]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResourceExhausted);
    assert_eq!(err.message(), Some("allocation limit exceeded: 2 > 1"));
}

#[test]
fn shrunken_containers_release_all_their_memory_when_freed() {
    let mut rt = Runtime::new(RuntimeConfig::new().limits(ResourceLimits::new().max_memory(1 << 20)));
    let list = rt.new_list((0..100).map(Value::Int).collect()).unwrap();
    let d = rt
        .new_dict((0..10).map(|i| (Value::Int(i), Value::None)).collect())
        .unwrap();
    for _ in 0..100 {
        del_subscript(&mut rt, &list, &Value::Int(0)).unwrap();
    }
    for i in 0..10 {
        del_subscript(&mut rt, &d, &Value::Int(i)).unwrap();
    }
    rt.drop_value(list);
    rt.drop_value(d);

    let stats = rt.heap_stats();
    assert_eq!(stats.live_objects, 0);
    assert_eq!(stats.tracker_memory_bytes, 0);
}

#[test]
fn growing_a_dict_is_held_to_the_memory_limit() {
    let mut rt = Runtime::new(RuntimeConfig::new().limits(ResourceLimits::new().max_memory(512)));
    let d = rt.new_dict(vec![]).unwrap();

    let mut inserted = 0;
    let err = loop {
        match set_subscript(&mut rt, &Value::None, &d, &Value::Int(inserted)) {
            Ok(()) => inserted += 1,
            Err(err) => break err,
        }
        assert!(inserted < 10_000, "dict grew without bound");
    };
    assert!(inserted > 0);
    assert_eq!(err.kind(), ErrorKind::PropagatedFailure);
    assert_eq!(err.exc_type(), ExcType::MemoryError);
    assert!(rt.heap_stats().tracker_memory_bytes <= 512);

    // replacing a value does not grow the dict
    set_subscript(&mut rt, &Value::Int(1), &d, &Value::Int(0)).unwrap();
    // deleting an entry makes room for another
    del_subscript(&mut rt, &d, &Value::Int(0)).unwrap();
    set_subscript(&mut rt, &Value::None, &d, &Value::Int(inserted)).unwrap();
}

// =============================================================================
// 4. Configuration
// =============================================================================

#[test]
fn runtime_is_configured_from_json() {
    let config = RuntimeConfig::from_json(
        r#"{"text_model": "bytestring", "trace": "off", "limits": {"max_allocations": null, "max_memory": 65536}}"#,
    )
    .unwrap();
    assert_eq!(config.text_model, TextModel::ByteString);
    assert_eq!(config.trace, TraceMode::Off);
    assert_eq!(config.limits.max_memory, Some(65536));

    let rt = Runtime::new(config);
    assert_eq!(rt.config(), &config);
    let str_type = rt.find_type("str").unwrap();
    assert_eq!(rt.type_object(str_type).builtin(), Some(BuiltinKind::ByteStr));
    assert_eq!(rt.find_type("bytes"), None);
}

#[test]
fn unknown_text_model_is_rejected() {
    assert!(RuntimeConfig::from_json(r#"{"text_model": "utf16"}"#).is_err());
}
