//! Concurrent access tests for the container.
//!
//! One shared container serves several threads; the reentrant lock
//! serializes registration and resolution process-wide.

mod common;

use std::sync::{Arc, Barrier};
use std::thread;

use common::{Clock, Journal, Ledger, Mailer, TcpTransport, Transport};
use ravel_container::prelude::*;

#[test]
fn concurrent_resolves_share_one_singleton() {
    let container = Arc::new(Container::new());
    container.register(component::<Clock>()).unwrap();

    let barrier = Arc::new(Barrier::new(4));
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let container = Arc::clone(&container);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                container.resolve::<Clock>().unwrap()
            })
        })
        .collect();

    let resolved: Vec<Arc<Clock>> = handles
        .into_iter()
        .map(|handle| handle.join().expect("thread panicked"))
        .collect();

    for clock in &resolved[1..] {
        assert!(Arc::ptr_eq(&resolved[0], clock));
    }
}

#[test]
fn transient_targets_stay_distinct_across_threads() {
    let container = Arc::new(Container::new());
    container
        .add_rules(RuleSet::new().component::<Clock>(Rule::new().scope(Scope::Transient)))
        .unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let container = Arc::clone(&container);
            thread::spawn(move || container.resolve::<Clock>().unwrap())
        })
        .collect();

    let resolved: Vec<Arc<Clock>> = handles
        .into_iter()
        .map(|handle| handle.join().expect("thread panicked"))
        .collect();

    for (index, left) in resolved.iter().enumerate() {
        for right in &resolved[index + 1..] {
            assert!(!Arc::ptr_eq(left, right));
        }
    }
}

#[test]
fn registration_and_resolution_interleave_safely() {
    let container = Arc::new(Container::new());
    container
        .register((component::<Clock>(), component::<Journal>()))
        .unwrap();

    let registrar = {
        let container = Arc::clone(&container);
        thread::spawn(move || {
            container.register(component::<Ledger>()).unwrap();
        })
    };
    let resolver = {
        let container = Arc::clone(&container);
        thread::spawn(move || {
            container.resolve::<Journal>().unwrap();
        })
    };

    registrar.join().expect("registrar panicked");
    resolver.join().expect("resolver panicked");

    assert!(container.resolve::<Ledger>().is_ok());
}

#[test]
fn reentrant_factories_do_not_deadlock_under_contention() {
    let container = Arc::new(Container::new());
    container
        .register((component::<Mailer>(), component::<TcpTransport>()))
        .unwrap();

    let inner = Arc::clone(&container);
    container
        .add_rules(RuleSet::new().target::<dyn Transport>(Rule::new().factory(
            Provider::function::<dyn Transport, _>("make_transport", Vec::new(), move |_args| {
                let transport: Arc<dyn Transport> = inner.resolve::<TcpTransport>()?;
                Ok(Some(transport))
            }),
        )))
        .unwrap();

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let container = Arc::clone(&container);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                container.resolve::<Mailer>().unwrap()
            })
        })
        .collect();

    let resolved: Vec<Arc<Mailer>> = handles
        .into_iter()
        .map(|handle| handle.join().expect("thread panicked"))
        .collect();

    assert!(Arc::ptr_eq(&resolved[0], &resolved[1]));
}
