//! End-to-end resolution with real `bash` servers.

#![cfg(unix)]

use std::sync::Arc;

use cidchain_exec::{CancelToken, Dispatcher, Language};
use cidchain_pipeline::{InMemoryRegistry, Output, Request, Resolver, ServerDefinition};
use cidchain_store::{ContentStore, InMemoryContentStore};
use http::StatusCode;

fn resolver() -> (Arc<InMemoryContentStore>, Resolver) {
    let store = Arc::new(InMemoryContentStore::new());
    let mut registry = InMemoryRegistry::new();

    for (name, source) in [
        ("echo", "cat"),
        ("upper", "tr a-z A-Z"),
        ("grep", r#"grep -- "$1" || true"#),
        ("count", "wc -l | tr -d ' '"),
    ] {
        let cid = store.put(source.as_bytes()).unwrap();
        registry.register(ServerDefinition::new(name, Language::Bash, cid));
    }

    let resolver = Resolver::new(Arc::new(registry), Dispatcher::new(store.clone()));
    (store, resolver)
}

fn text(output: Output) -> String {
    match output {
        Output::Inline { body, .. } => String::from_utf8(body.to_vec()).unwrap(),
        Output::Stored { cid } => panic!("unexpected redirect to {}", cid),
    }
}

#[test]
fn test_chain_through_bash() {
    let (store, resolver) = resolver();
    let data = store.put(b"apple\nbanana\napricot\n").unwrap();

    let output = resolver
        .resolve(&format!("/upper/grep/ap/{}", data), &CancelToken::new())
        .unwrap();
    assert_eq!(text(output), "APPLE\nAPRICOT\n");

    let output = resolver
        .resolve(&format!("/count/{}", data), &CancelToken::new())
        .unwrap();
    assert_eq!(text(output).trim(), "3");
}

#[test]
fn test_ad_hoc_script_cid() {
    let (store, resolver) = resolver();
    let script = store.put(b"#!/bin/bash\nprintf 'got:%s' \"$(cat)\"").unwrap();

    let output = resolver
        .resolve(&format!("/{}/hello", script), &CancelToken::new())
        .unwrap();
    assert_eq!(text(output), "got:hello");
}

#[test]
fn test_large_bash_output_redirects() {
    let (store, resolver) = resolver();
    let script = store.put(b"head -c 200 /dev/zero | tr '\\0' x").unwrap();

    let response = resolver.handle(
        &Request::parse(&format!("/{}.sh", script)),
        &CancelToken::new(),
    );
    assert_eq!(response.status(), StatusCode::FOUND);
    let location = response.location().unwrap();
    let cid = cidchain_store::Cid::parse(location.trim_start_matches('/')).unwrap();
    assert_eq!(&store.get(&cid).unwrap()[..], "x".repeat(200).as_bytes());
}
