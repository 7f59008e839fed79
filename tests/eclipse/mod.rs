//! Sessions against the scripted ECLiPSe toplevel.

use logic_bridge::{Backend, EngineErrorKind, Session, SessionError, SessionState, Term};
use tempfile::TempDir;

use crate::common;

#[test]
fn test_open_reaches_ready() {
    let mut session = common::open_eclipse();
    assert_eq!(session.backend(), Backend::Eclipse);
    assert_eq!(session.state(), SessionState::Ready);
    assert!(session.is_alive());
    assert!(session.ask("true").unwrap());
    session.close();
}

#[test]
fn test_solutions_in_order_then_exhaustion() {
    let mut session = common::open_eclipse();
    let mut solutions = session.query("color(C)").unwrap();

    for expected in ["red", "green", "blue"] {
        let solution = solutions.next().unwrap().unwrap();
        assert_eq!(solution.get("C"), Some(&Term::atom(expected)));
        assert!(solutions.may_have_more());
    }
    assert!(solutions.next().is_none());
    assert!(solutions.next().is_none());
    drop(solutions);

    assert_eq!(session.state(), SessionState::Ready);
    assert_eq!(session.stats().solutions, 3);
}

#[test]
fn test_consult_and_final_solution() {
    let dir = TempDir::new().unwrap();
    let mut session = common::open_eclipse();
    session.consult_file(common::family_file(&dir)).unwrap();

    let mut solutions = session.query("parent(bob, X)").unwrap();
    let first = solutions.next().unwrap().unwrap();
    assert_eq!(first.get("X"), Some(&Term::atom("ann")));
    let second = solutions.next().unwrap().unwrap();
    assert_eq!(second.get("X"), Some(&Term::atom("pat")));
    assert!(!solutions.may_have_more());
    assert!(solutions.next().is_none());
    drop(solutions);

    assert_eq!(session.state(), SessionState::Ready);
}

#[test]
fn test_zero_solutions() {
    let dir = TempDir::new().unwrap();
    let mut session = common::open_eclipse();
    session.consult_file(common::family_file(&dir)).unwrap();

    assert!(session.query_all("fail").unwrap().is_empty());
    assert!(session.query_all("parent(ann, X)").unwrap().is_empty());
    assert!(!session.ask("parent(tom, ann)").unwrap());
    assert!(session.ask("parent(tom, liz)").unwrap());
    assert_eq!(session.state(), SessionState::Ready);
}

#[test]
fn test_drop_mid_enumeration_leaves_session_ready() {
    let mut session = common::open_eclipse();
    {
        let mut solutions = session.query("nat(N)").unwrap();
        let taken: Vec<Term> = solutions
            .by_ref()
            .take(3)
            .map(|s| s.unwrap().get("N").cloned().unwrap())
            .collect();
        assert_eq!(taken, [Term::int(0), Term::int(1), Term::int(2)]);
    }
    assert_eq!(session.state(), SessionState::Ready);
    assert!(session.ask("true").unwrap());
}

#[test]
fn test_abort_is_runtime_error() {
    let mut session = common::open_eclipse();
    let err = session.query_all("missing(a, X)").unwrap_err();
    assert_eq!(err.engine_kind(), Some(EngineErrorKind::Runtime));
    assert!(err.to_string().contains("calling an undefined procedure"));
    assert_eq!(session.state(), SessionState::Ready);
    assert!(session.ask("true").unwrap());
}

#[test]
fn test_syntax_error() {
    let mut session = common::open_eclipse();
    let err = session.query_all("foo(").unwrap_err();
    assert_eq!(err.engine_kind(), Some(EngineErrorKind::Syntax));
    let SessionError::Engine(engine) = &err else {
        panic!("Expected engine error, got {err:?}");
    };
    assert!(engine.diagnostic.contains("syntax error"));
    assert_eq!(session.state(), SessionState::Ready);
}

#[test]
fn test_consult_missing_file() {
    let mut session = common::open_eclipse();
    let err = session.consult_file("/nonexistent/family.pl").unwrap_err();
    assert_eq!(err.engine_kind(), Some(EngineErrorKind::Runtime));
    assert_eq!(session.state(), SessionState::Ready);
}

#[test]
fn test_module_qualified_query() {
    let dir = TempDir::new().unwrap();
    let options = common::eclipse_options().module("family");
    let mut session = Session::open(Backend::Eclipse, options).unwrap();
    session.consult_file(common::family_file(&dir)).unwrap();

    let solutions = session.query_all("parent(tom, X)").unwrap();
    let children: Vec<_> = solutions.iter().map(|s| s.get("X").cloned()).collect();
    assert_eq!(children, [Some(Term::atom("bob")), Some(Term::atom("liz"))]);
}
