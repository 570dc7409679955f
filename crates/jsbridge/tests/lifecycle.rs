mod common;

use std::{
    io,
    sync::{Arc, Mutex},
    thread,
};

use common::{Counters, RecordingEngine, fail_next_create, open_recorded};
use jsbridge::{
    Context, EngineLimits, Error, InterfaceDescriptor, MethodSignature, QuickJs, ResourceError, Value, ValueType,
    js_interface,
};
use pretty_assertions::assert_eq;
use tracing_subscriber::fmt::MakeWriter;

fn service() -> InterfaceDescriptor {
    InterfaceDescriptor::new("Service")
        .method(MethodSignature::new("ping").returns(ValueType::String))
        .method(MethodSignature::new("echo").param(ValueType::Any).returns(ValueType::Any))
        .method(MethodSignature::new("fail"))
}

/// Collects formatted log output so tests can assert on it.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn with_captured_logs(f: impl FnOnce()) -> String {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    logs.contents()
}

#[test]
fn create_then_close() {
    let (context, counters) = open_recorded();
    assert!(!context.is_closed());
    context.close();
    assert!(context.is_closed());
    assert_eq!(Counters::get(&counters.creates), 1);
    assert_eq!(Counters::get(&counters.destroys), 1);
}

#[test]
fn close_is_idempotent() {
    let (context, counters) = open_recorded();
    context.close();
    context.close();
    context.close();
    assert_eq!(Counters::get(&counters.destroys), 1);
}

#[test]
fn closing_the_quickjs_context_twice_is_harmless() {
    let context = Context::create().unwrap();
    context.close();
    context.close();
    assert!(context.is_closed());
}

#[test]
fn operations_after_close_fail_without_reaching_the_engine() {
    let (context, counters) = open_recorded();
    let proxy = context.bind("svc", &service()).unwrap();
    context.close();

    assert_eq!(context.evaluate("1;", "late.js").unwrap_err(), Error::Closed);
    assert_eq!(context.evaluate_script("1;").unwrap_err(), Error::Closed);
    assert_eq!(context.bind("svc", &service()).unwrap_err(), Error::Closed);
    assert_eq!(proxy.invoke("ping", &[]).unwrap_err(), Error::Closed);
    assert!(proxy.invoke("ping", &[]).unwrap_err().is_closed());
    assert_eq!(proxy.invoke("ping", &[]).unwrap_err().to_string(), "script context is closed");

    assert_eq!(Counters::get(&counters.evaluates), 0);
    assert_eq!(Counters::get(&counters.binds), 1);
    assert_eq!(Counters::get(&counters.calls), 0);
}

#[test]
fn quickjs_proxy_fails_after_close() {
    js_interface! {
        interface Pinger {
            fn ping() -> String;
        }
    }

    let context = Context::create().unwrap();
    context.evaluate_script("var pinger = { ping() { return 'pong'; } };").unwrap();
    let pinger: Pinger = context.get("pinger").unwrap();
    assert_eq!(pinger.ping().unwrap(), "pong");

    context.close();
    assert_eq!(pinger.ping().unwrap_err(), Error::Closed);
    assert_eq!(context.evaluate_script("1;").unwrap_err(), Error::Closed);
}

#[test]
fn creation_failure_is_a_resource_error() {
    fail_next_create(true);
    let result = Context::<RecordingEngine>::open(EngineLimits::default());
    fail_next_create(false);
    assert_eq!(result.unwrap_err(), Error::Resource(ResourceError::Context));
}

#[test]
fn proxy_calls_route_by_declared_method() {
    let (context, counters) = open_recorded();
    let proxy = context.bind("svc", &service()).unwrap();
    assert_eq!(proxy.invoke("ping", &[]).unwrap(), Value::from("svc.ping"));
    assert_eq!(proxy.invoke("echo", &[Value::Int(7)]).unwrap(), Value::Int(7));
    assert_eq!(Counters::get(&counters.calls), 2);
    context.close();
}

#[test]
fn engine_failures_in_proxy_calls_are_script_errors() {
    let (context, _counters) = open_recorded();
    let proxy = context.bind("svc", &service()).unwrap();
    let error = proxy.invoke("fail", &[]).unwrap_err();
    assert_eq!(error.as_script().map(|script| script.message()), Some("failed on purpose"));
    // the guard is released after a failure
    assert_eq!(proxy.invoke("ping", &[]).unwrap(), Value::from("svc.ping"));
    context.close();
}

#[test]
fn evaluate_failures_are_labelled_with_the_source_name() {
    let (context, _counters) = open_recorded();
    let error = context.evaluate("throw", "boot.js").unwrap_err();
    let script = error.as_script().unwrap();
    assert_eq!(script.frames()[0].source, "boot.js");
    assert_eq!(script.frames()[0].function, "<eval>");
    assert_eq!(script.frames()[0].line, Some(1));
    context.close();
}

#[test]
fn structural_binding_errors_never_reach_the_engine() {
    let (context, counters) = open_recorded();
    let overloaded = InterfaceDescriptor::new("Service")
        .method(MethodSignature::new("ping"))
        .method(MethodSignature::new("ping").param(ValueType::Int));
    assert!(matches!(context.bind("svc", &overloaded), Err(Error::Binding(_))));

    let extending = service().extends("Base");
    assert!(matches!(context.bind("svc", &extending), Err(Error::Binding(_))));

    assert_eq!(Counters::get(&counters.binds), 0);
    context.close();
}

#[test]
fn engine_bind_failures_map_to_error_kinds() {
    let (context, _counters) = open_recorded();
    assert_eq!(
        context.bind("oom", &service()).unwrap_err(),
        Error::Resource(ResourceError::BoundObject { name: "oom".to_owned() })
    );
    assert!(matches!(context.bind("missing", &service()), Err(Error::Binding(_))));
    context.close();
}

#[test]
fn dropping_an_open_context_logs_a_leak_and_releases_the_engine() {
    let mut counters = None;
    let logs = with_captured_logs(|| {
        let (context, recorded) = open_recorded();
        counters = Some(recorded);
        drop(context);
    });
    let counters = counters.unwrap();
    assert!(logs.contains("script context leaked"), "{logs}");
    assert_eq!(Counters::get(&counters.destroys), 1);
}

#[test]
fn dropping_a_closed_context_is_silent() {
    let logs = with_captured_logs(|| {
        let (context, _counters) = open_recorded();
        context.close();
        drop(context);
    });
    assert!(!logs.contains("leaked"), "{logs}");
}

#[test]
fn outstanding_proxies_keep_an_unclosed_engine_alive() {
    let (context, counters) = open_recorded();
    let proxy = context.bind("svc", &service()).unwrap();
    let logs = with_captured_logs(|| drop(context));
    assert!(!logs.contains("leaked"), "{logs}");
    assert_eq!(Counters::get(&counters.destroys), 0);
    assert_eq!(proxy.invoke("ping", &[]).unwrap(), Value::from("svc.ping"));

    let logs = with_captured_logs(|| drop(proxy));
    assert!(logs.contains("script context leaked"), "{logs}");
    assert_eq!(Counters::get(&counters.destroys), 1);
}

#[test]
fn calls_from_many_threads_are_serialized() {
    let (context, counters) = open_recorded();
    let first = context.bind("first", &service()).unwrap();
    let second = context.bind("second", &service()).unwrap();

    thread::scope(|scope| {
        for thread_index in 0..4 {
            let proxy = if thread_index % 2 == 0 { first.clone() } else { second.clone() };
            let context = &context;
            scope.spawn(move || {
                for call in 0..10 {
                    let value = Value::Int(thread_index * 100 + call);
                    assert_eq!(proxy.invoke("echo", &[value.clone()]).unwrap(), value);
                    assert_eq!(context.evaluate_script("x").unwrap(), Value::from("x"));
                }
            });
        }
    });

    assert_eq!(Counters::get(&counters.calls), 40);
    assert_eq!(Counters::get(&counters.evaluates), 40);
    assert_eq!(Counters::get(&counters.max_in_flight), 1);
    context.close();
}

#[test]
fn racing_closes_destroy_once() {
    let (context, counters) = open_recorded();
    let proxy = context.bind("svc", &service()).unwrap();

    thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| context.close());
            scope.spawn(|| match proxy.invoke("ping", &[]) {
                Ok(value) => assert_eq!(value, Value::from("svc.ping")),
                Err(error) => assert_eq!(error, Error::Closed),
            });
        }
    });

    assert!(context.is_closed());
    assert_eq!(Counters::get(&counters.destroys), 1);
}

#[test]
fn quickjs_context_is_shared_across_threads() {
    js_interface! {
        interface Gate {
            fn enter(tag: i32) -> i32;
        }
    }

    let context = Context::create().unwrap();
    context
        .evaluate_script(
            "var active = 0, overlaps = 0;\n\
             var gate = { enter(tag) { active++; if (active > 1) overlaps++; for (let i = 0; i < 2000; i++) {} active--; return tag; } };",
        )
        .unwrap();
    let gate: Gate = context.get("gate").unwrap();

    thread::scope(|scope| {
        for tag in 0..4 {
            let gate = gate.clone();
            scope.spawn(move || {
                for _ in 0..25 {
                    assert_eq!(gate.enter(tag).unwrap(), tag);
                }
            });
        }
    });

    assert_eq!(context.evaluate_script("overlaps;").unwrap(), Value::Int(0));
    context.close();
}

#[test]
fn independent_contexts_run_in_parallel_threads() {
    let handles: Vec<_> = (0..4)
        .map(|n| {
            thread::spawn(move || {
                let context = Context::create().unwrap();
                context.evaluate_script(&format!("var n = {n};")).unwrap();
                let result = context.evaluate_script("n * 10;").unwrap();
                context.close();
                result
            })
        })
        .collect();
    let results: Vec<Value> = handles.into_iter().map(|handle| handle.join().unwrap()).collect();
    assert_eq!(results, vec![Value::Int(0), Value::Int(10), Value::Int(20), Value::Int(30)]);
}

#[test]
fn context_and_proxy_are_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Context>();
    assert_send_sync::<jsbridge::Proxy>();
    assert_send_sync::<Context<RecordingEngine>>();

    fn assert_send<T: Send>() {}
    assert_send::<QuickJs>();
}
