//! End-to-end reification through the Reifier facade

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use reify_core::mop::DispatcherFactory;
use reify_core::runtime::{construct, ConstructorBuilder, MethodBuilder, Signature, TypeBuilder};
use reify_core::{
    CallDescriptor, ConstructorCall, Dispatcher, Reifier, ReifyError, ReifyResult,
    SynchronousDispatcher, Value,
};

/// Counts how often the `(String)` account constructor ran
fn bank(opened: Arc<AtomicUsize>) -> Reifier {
    let reifier = Reifier::new();
    reifier
        .types()
        .define(
            TypeBuilder::interface("acme.Audited")
                .method(MethodBuilder::new("audit").returns("String")),
        )
        .unwrap();
    reifier
        .types()
        .define(
            TypeBuilder::class("acme.Account")
                .implements("acme.Audited")
                .constructor(ConstructorBuilder::new(&[]))
                .constructor(ConstructorBuilder::new(&["String"]).body(move |this, args| {
                    opened.fetch_add(1, Ordering::SeqCst);
                    this.set_field("owner", args[0].clone());
                    this.set_field("balance", Value::Double(0.0));
                    Ok(())
                }))
                .method(
                    MethodBuilder::new("owner")
                        .returns("String")
                        .body(|this, _| Ok(this.get_field("owner").unwrap_or(Value::Null))),
                )
                .method(MethodBuilder::new("deposit").param("double").body(|this, args| {
                    let current = this.get_field("balance").and_then(|v| v.as_f64()).unwrap_or(0.0);
                    let amount = args[0].as_f64().unwrap_or(0.0);
                    this.set_field("balance", Value::Double(current + amount));
                    Ok(Value::Void)
                }))
                .method(
                    MethodBuilder::new("balance")
                        .returns("double")
                        .body(|this, _| Ok(this.get_field("balance").unwrap_or(Value::Double(0.0)))),
                )
                .method(MethodBuilder::new("statement").returns("String").cached().body(|this, _| {
                    let balance = this.get_field("balance").and_then(|v| v.as_f64()).unwrap_or(0.0);
                    Ok(Value::string(format!("balance={}", balance)))
                }))
                .method(
                    MethodBuilder::new("touch")
                        .returns("acme.Account")
                        .returns_self()
                        .body(|_, _| Ok(Value::Null)),
                )
                .method(
                    MethodBuilder::new("audit")
                        .returns("String")
                        .body(|_, _| Ok(Value::string("clean"))),
                ),
        )
        .unwrap();
    reifier
}

/// Dispatcher that records method names and forwards synchronously
struct Recording {
    inner: SynchronousDispatcher,
    log: Arc<Mutex<Vec<String>>>,
}

impl Dispatcher for Recording {
    fn reify(&self, call: CallDescriptor) -> ReifyResult<Value> {
        self.log.lock().push(call.method().signature.to_string());
        self.inner.reify(call)
    }
}

fn recording(log: Arc<Mutex<Vec<String>>>) -> DispatcherFactory {
    Arc::new(move |call: ConstructorCall, _args: &[Value]| {
        Ok(Arc::new(Recording {
            inner: SynchronousDispatcher::new(call),
            log: log.clone(),
        }) as Arc<dyn Dispatcher>)
    })
}

/// Dispatcher answering every call with the same value
struct Constant(Value);

impl Dispatcher for Constant {
    fn reify(&self, _call: CallDescriptor) -> ReifyResult<Value> {
        Ok(self.0.clone())
    }
}

#[test]
fn test_construction_deferred_until_first_dispatch() {
    let opened = Arc::new(AtomicUsize::new(0));
    let reifier = bank(opened.clone());
    let account = reifier
        .create_reified_instance(
            "acme.Account",
            &[],
            &[Value::string("alice")],
            SynchronousDispatcher::NAME,
            &[],
        )
        .unwrap();

    assert!(reifier.is_reified(&account));
    assert!(account.class().is_subtype_of("acme.Account"));
    assert_eq!(opened.load(Ordering::SeqCst), 0);

    let owner = reifier.invoke(&account, "owner", &[]).unwrap();
    assert_eq!(owner.as_str(), Some("alice"));
    assert_eq!(opened.load(Ordering::SeqCst), 1);

    reifier.invoke(&account, "deposit", &[Value::Int(40)]).unwrap();
    reifier.invoke(&account, "deposit", &[Value::Double(2.5)]).unwrap();
    assert_eq!(
        reifier.invoke(&account, "balance", &[]).unwrap(),
        Value::Double(42.5)
    );
    assert_eq!(opened.load(Ordering::SeqCst), 1);
}

#[test]
fn test_constructor_resolution_errors_surface_at_creation() {
    let reifier = bank(Arc::new(AtomicUsize::new(0)));
    let err = reifier
        .create_reified_instance(
            "acme.Account",
            &[],
            &[Value::Int(7)],
            SynchronousDispatcher::NAME,
            &[],
        )
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "no overload of acme.Account accepts (Integer)"
    );
}

#[test]
fn test_unknown_dispatcher_rejected() {
    let reifier = bank(Arc::new(AtomicUsize::new(0)));
    let err = reifier
        .create_reified_instance("acme.Account", &[], &[], "acme.Missing", &[])
        .unwrap_err();
    assert!(matches!(err, ReifyError::TypeNotFound(name) if name == "acme.Missing"));
}

#[test]
fn test_wrap_existing_instance_shares_identity() {
    let reifier = bank(Arc::new(AtomicUsize::new(0)));
    let class = reifier.types().get("acme.Account").unwrap();
    let real = construct(&class, Some(&class.constructors()[1]), &[Value::string("bob")]).unwrap();

    let stub = reifier
        .wrap_existing_instance(&real, "acme.Account", &[], SynchronousDispatcher::NAME, &[])
        .unwrap();
    reifier.invoke(&stub, "deposit", &[Value::Double(10.0)]).unwrap();

    // the call landed on the wrapped object itself
    assert_eq!(real.get_field("balance"), Some(Value::Double(10.0)));
    assert!(!stub.ptr_eq(&real));
}

#[test]
fn test_unattached_stub_runs_inherited_bodies() {
    let reifier = bank(Arc::new(AtomicUsize::new(0)));
    let handle = reifier
        .stubs()
        .get_or_create(&"acme.Account".parse().unwrap())
        .unwrap();
    let stub = reifier.stubs().instantiate(&handle).unwrap();
    assert!(stub.dispatcher().is_none());
    assert_eq!(reifier.invoke(&stub, "audit", &[]).unwrap().as_str(), Some("clean"));
    assert_eq!(
        reifier.invoke(&stub, "balance", &[]).unwrap(),
        Value::Double(0.0)
    );
}

#[test]
fn test_constructor_calls_run_inherited_body_on_the_stub() {
    let reifier = Reifier::new();
    reifier
        .types()
        .define(
            TypeBuilder::class("acme.Widget")
                .constructor(ConstructorBuilder::new(&[]).body(|this, _| {
                    let seen = this.invoke_signature(&Signature::new("init", &[]), &[])?;
                    this.set_field("seen", seen);
                    Ok(())
                }))
                .method(MethodBuilder::new("init").returns("int").body(|_, _| Ok(Value::Int(7)))),
        )
        .unwrap();

    let widget = reifier
        .create_reified_instance("acme.Widget", &[], &[], SynchronousDispatcher::NAME, &[])
        .unwrap();
    assert_eq!(widget.get_field("seen"), Some(Value::Int(7)));
    assert!(widget.dispatcher().is_some());
    assert_eq!(reifier.invoke(&widget, "init", &[]).unwrap(), Value::Int(7));
}

#[test]
fn test_stub_object_accessors_are_native_only() {
    let reifier = bank(Arc::new(AtomicUsize::new(0)));
    let account = reifier
        .create_reified_instance("acme.Account", &[], &[], SynchronousDispatcher::NAME, &[])
        .unwrap();
    assert!(account.class().is_subtype_of("reify.StubObject"));
    assert!(account.dispatcher().is_some());
    assert!(matches!(
        reifier.invoke(&account, "getDispatcher", &[]),
        Err(ReifyError::AbstractInvocation { .. })
    ));
}

#[test]
fn test_boxed_int_argument_selects_primitive_constructor() {
    let reifier = Reifier::new();
    reifier
        .types()
        .define(
            TypeBuilder::class("acme.Cell")
                .constructor(ConstructorBuilder::new(&["int"]).body(|this, _| {
                    this.set_field("kind", Value::string("int"));
                    Ok(())
                }))
                .constructor(ConstructorBuilder::new(&["Object"]).body(|this, _| {
                    this.set_field("kind", Value::string("Object"));
                    Ok(())
                }))
                .method(
                    MethodBuilder::new("kind")
                        .returns("String")
                        .body(|this, _| Ok(this.get_field("kind").unwrap_or(Value::Null))),
                ),
        )
        .unwrap();

    let cell = reifier
        .create_reified_instance("acme.Cell", &[], &[Value::Int(5)], SynchronousDispatcher::NAME, &[])
        .unwrap();
    assert_eq!(reifier.invoke(&cell, "kind", &[]).unwrap().as_str(), Some("int"));

    let other = reifier
        .create_reified_instance("acme.Cell", &[], &[Value::string("x")], SynchronousDispatcher::NAME, &[])
        .unwrap();
    assert_eq!(reifier.invoke(&other, "kind", &[]).unwrap().as_str(), Some("Object"));
}

#[test]
fn test_unattached_interface_stub_fails_cleanly() {
    let reifier = bank(Arc::new(AtomicUsize::new(0)));
    let handle = reifier
        .stubs()
        .get_or_create(&"acme.Audited".parse().unwrap())
        .unwrap();
    let stub = reifier.stubs().instantiate(&handle).unwrap();
    assert!(matches!(
        reifier.invoke(&stub, "audit", &[]),
        Err(ReifyError::DispatcherNotAttached { .. })
    ));
}

#[test]
fn test_views_share_one_target() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let reifier = bank(Arc::new(AtomicUsize::new(0)));
    reifier.dispatchers().register("acme.Recording", recording(log.clone()));

    let account = reifier
        .create_reified_instance("acme.Account", &[], &[Value::string("carol")], "acme.Recording", &[])
        .unwrap();
    reifier.invoke(&account, "deposit", &[Value::Double(5.0)]).unwrap();

    let audited = reifier.cast_reified_view(&account, "acme.Audited").unwrap();
    assert!(audited.class().is_subtype_of("acme.Audited"));
    assert!(!audited.class().is_subtype_of("acme.Account"));
    assert_eq!(reifier.invoke(&audited, "audit", &[]).unwrap().as_str(), Some("clean"));

    let back = reifier.cast_reified_view(&audited, "acme.Account").unwrap();
    assert_eq!(reifier.invoke(&back, "balance", &[]).unwrap(), Value::Double(5.0));
    assert_eq!(
        *log.lock(),
        vec!["deposit(double)", "audit()", "balance()"]
    );
}

#[test]
fn test_cast_to_unrelated_type_rejected() {
    let reifier = bank(Arc::new(AtomicUsize::new(0)));
    reifier.types().define(TypeBuilder::class("acme.Ledger")).unwrap();
    let account = reifier
        .create_reified_instance("acme.Account", &[], &[], SynchronousDispatcher::NAME, &[])
        .unwrap();
    assert!(matches!(
        reifier.cast_reified_view(&account, "acme.Ledger"),
        Err(ReifyError::ReifiedCast { .. })
    ));
}

#[test]
fn test_cached_operation_dispatches_once() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let reifier = bank(Arc::new(AtomicUsize::new(0)));
    reifier.dispatchers().register("acme.Recording", recording(log.clone()));
    let account = reifier
        .create_reified_instance("acme.Account", &[], &[Value::string("dan")], "acme.Recording", &[])
        .unwrap();

    let first = reifier.invoke(&account, "statement", &[]).unwrap();
    reifier.invoke(&account, "deposit", &[Value::Double(3.0)]).unwrap();
    let second = reifier.invoke(&account, "statement", &[]).unwrap();

    assert_eq!(first.as_str(), Some("balance=0"));
    assert_eq!(first, second);
    assert_eq!(*log.lock(), vec!["statement()", "deposit(double)"]);
}

#[test]
fn test_return_self_never_reaches_dispatcher() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let reifier = bank(Arc::new(AtomicUsize::new(0)));
    reifier.dispatchers().register("acme.Recording", recording(log.clone()));
    let account = reifier
        .create_reified_instance("acme.Account", &[], &[], "acme.Recording", &[])
        .unwrap();

    let touched = reifier.invoke(&account, "touch", &[]).unwrap();
    assert!(touched.as_object().map_or(false, |o| o.ptr_eq(&account)));
    assert!(log.lock().is_empty());
}

#[test]
fn test_reattach_swaps_dispatcher_and_clears_memo() {
    let reifier = bank(Arc::new(AtomicUsize::new(0)));
    let account = reifier
        .create_reified_instance("acme.Account", &[], &[Value::string("eve")], SynchronousDispatcher::NAME, &[])
        .unwrap();
    assert_eq!(
        reifier.invoke(&account, "statement", &[]).unwrap().as_str(),
        Some("balance=0")
    );

    let previous = account
        .attach_dispatcher(Arc::new(Constant(Value::string("replaced"))))
        .unwrap();
    assert!(previous.is_some());
    assert_eq!(
        reifier.invoke(&account, "statement", &[]).unwrap().as_str(),
        Some("replaced")
    );
}

#[test]
fn test_dispatcher_result_must_fit_return_type() {
    let reifier = bank(Arc::new(AtomicUsize::new(0)));
    let account = reifier
        .create_reified_instance("acme.Account", &[], &[], SynchronousDispatcher::NAME, &[])
        .unwrap();
    account
        .attach_dispatcher(Arc::new(Constant(Value::string("lots"))))
        .unwrap();

    match reifier.invoke(&account, "balance", &[]) {
        Err(ReifyError::ReturnTypeMismatch { expected, found, .. }) => {
            assert_eq!(expected, "double");
            assert_eq!(found, "String");
        }
        other => panic!("expected return type mismatch, got {:?}", other),
    }
    // null fits any reference return
    account.attach_dispatcher(Arc::new(Constant(Value::Null))).unwrap();
    assert_eq!(reifier.invoke(&account, "owner", &[]).unwrap(), Value::Null);
}

#[test]
fn test_plain_objects_are_not_reified() {
    let reifier = bank(Arc::new(AtomicUsize::new(0)));
    let class = reifier.types().get("acme.Account").unwrap();
    let plain = construct(&class, None, &[]).unwrap();
    assert!(!reifier.is_reified(&plain));
    assert!(matches!(
        plain.attach_dispatcher(Arc::new(Constant(Value::Null))),
        Err(ReifyError::NotReified(_))
    ));
    let value = plain.invoke_signature(&Signature::new("audit", &[]), &[]).unwrap();
    assert_eq!(value.as_str(), Some("clean"));
}

#[test]
fn test_generic_target_binds_return_type() {
    let reifier = Reifier::new();
    reifier
        .types()
        .define(
            TypeBuilder::class("acme.Box")
                .type_param("T")
                .method(MethodBuilder::new("get").returns("T"))
                .method(MethodBuilder::new("put").param("T")),
        )
        .unwrap();
    let boxed = reifier
        .create_reified_instance("acme.Box", &["String"], &[], SynchronousDispatcher::NAME, &[])
        .unwrap();
    assert_eq!(boxed.class().name(), "reify.stub.generic.acme._StubBox_GenericsString");

    boxed.attach_dispatcher(Arc::new(Constant(Value::Int(1)))).unwrap();
    assert!(matches!(
        reifier.invoke(&boxed, "get", &[]),
        Err(ReifyError::ReturnTypeMismatch { expected, .. }) if expected == "String"
    ));
    // type-variable parameters pass through unchanged
    assert_eq!(
        reifier.invoke(&boxed, "put", &[Value::Int(3)]).unwrap(),
        Value::Void
    );
}
