//! Opening, closing and restarting engine processes.

use std::time::{Duration, Instant};

use logic_bridge::{
    Backend, EngineErrorKind, PatternOverrides, Session, SessionError, SessionOptions,
    SessionState, SpawnError,
};

use crate::common;

#[test]
fn test_missing_executable() {
    let options = SessionOptions::default().executable("/nonexistent/bin/swipl");
    let err = Session::open(Backend::Swi, options).unwrap_err();
    assert!(
        matches!(err, SessionError::Spawn(SpawnError::NotFound(_))),
        "Expected NotFound, got {err:?}"
    );
}

#[test]
fn test_invalid_pattern_override() {
    let options = common::options("fake_swipl.sh").patterns(PatternOverrides {
        ready_prompt: Some("(unclosed".to_string()),
        ..Default::default()
    });
    let err = Session::open(Backend::Swi, options).unwrap_err();
    let SessionError::Pattern(pattern) = &err else {
        panic!("Expected pattern error, got {err:?}");
    };
    assert_eq!(pattern.name, "ready prompt");
}

#[test]
fn test_startup_timeout() {
    let options = common::options("fake_swipl.sh")
        .startup_timeout(Duration::from_millis(300))
        .patterns(PatternOverrides {
            ready_prompt: Some("never printed".to_string()),
            ..Default::default()
        });
    let started = Instant::now();
    let err = Session::open(Backend::Swi, options).unwrap_err();
    assert_eq!(err.engine_kind(), Some(EngineErrorKind::Timeout));
    assert!(err.to_string().contains("?- "), "pending output: {err}");
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[test]
fn test_close_from_ready() {
    let session = common::open_swi();
    let pid = session.pid().unwrap();
    session.close();
    assert!(!common::process_exists(pid));
}

#[test]
fn test_close_while_enumerating() {
    let mut session = common::open_swi();
    let pid = session.pid().unwrap();

    let mut solutions = session.query("nat(N)").unwrap();
    assert!(solutions.next().unwrap().is_ok());
    std::mem::forget(solutions);
    assert_eq!(session.state(), SessionState::EnumeratingSolutions);

    session.close();
    assert!(!common::process_exists(pid));
}

#[test]
fn test_close_after_unrecovered_error() {
    let options = common::swi_options().query_timeout(Duration::from_millis(300));
    let mut session = Session::open(Backend::Swi, options).unwrap();
    let pid = session.pid().unwrap();

    assert!(session.query_all("wedged").is_err());
    assert_eq!(session.state(), SessionState::Error);

    session.close();
    assert!(!common::process_exists(pid));
}

#[test]
fn test_close_kills_engine_that_ignores_quit() {
    let mut session = common::open_swi();
    let pid = session.pid().unwrap();
    assert!(session.ask("stubborn").unwrap());

    let started = Instant::now();
    session.close();
    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(!common::process_exists(pid));
}

#[test]
fn test_drop_releases_process() {
    let session = common::open_swi();
    let pid = session.pid().unwrap();
    drop(session);
    assert!(!common::process_exists(pid));
}

#[test]
fn test_restart_replaces_process() {
    let mut session = common::open_swi();
    let first = session.pid().unwrap();

    session.restart().unwrap();
    let second = session.pid().unwrap();
    assert_ne!(first, second);
    assert!(!common::process_exists(first));
    assert_eq!(session.state(), SessionState::Ready);
    assert_eq!(session.stats().queries, 0);
    assert!(session.ask("true").unwrap());
}

#[test]
fn test_sessions_are_independent() {
    let mut swi = common::open_swi();
    let mut xsb = common::open_xsb();
    assert_ne!(swi.pid(), xsb.pid());

    let mut solutions = swi.query("color(C)").unwrap();
    assert!(solutions.next().unwrap().is_ok());
    assert!(xsb.ask("true").unwrap());
    assert!(solutions.next().unwrap().is_ok());
}
