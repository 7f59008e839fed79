use logic_bridge::{Backend, EngineErrorKind, SessionState, Term};
use tempfile::TempDir;

use crate::common;

#[test]
fn test_consult_and_enumerate() {
    let dir = TempDir::new().unwrap();
    let mut session = common::open_xsb();
    assert_eq!(session.backend(), Backend::Xsb);
    session.consult_file(common::family_file(&dir)).unwrap();

    let solutions = session.query_all("parent(bob, Child)").unwrap();
    let children: Vec<_> = solutions.iter().map(|s| s.get("Child").cloned()).collect();
    assert_eq!(
        children,
        [Some(Term::atom("ann")), Some(Term::atom("pat"))]
    );
    assert_eq!(session.state(), SessionState::Ready);
}

#[test]
fn test_drop_after_first_solution() {
    let dir = TempDir::new().unwrap();
    let mut session = common::open_xsb();
    session.consult_file(common::family_file(&dir)).unwrap();
    {
        let mut solutions = session.query("parent(tom, X)").unwrap();
        let first = solutions.next().unwrap().unwrap();
        assert_eq!(first.get("X"), Some(&Term::atom("bob")));
    }
    assert_eq!(session.state(), SessionState::Ready);
    assert!(session.ask("parent(tom, liz)").unwrap());
}

#[test]
fn test_ground_and_failing_queries() {
    let dir = TempDir::new().unwrap();
    let mut session = common::open_xsb();
    session.consult_file(common::family_file(&dir)).unwrap();

    assert!(session.ask("true").unwrap());
    assert!(session.ask("parent(tom, bob)").unwrap());
    assert!(!session.ask("parent(tom, ann)").unwrap());
    assert!(session.query_all("fail").unwrap().is_empty());
}

#[test]
fn test_syntax_error() {
    let mut session = common::open_xsb();
    let err = session.query_all("foo(").unwrap_err();
    assert_eq!(err.engine_kind(), Some(EngineErrorKind::Syntax));
    assert!(err.to_string().contains("clause discarded"));
    assert_eq!(session.state(), SessionState::Ready);
}

#[test]
fn test_existence_error_is_runtime() {
    let mut session = common::open_xsb();
    let err = session.query_all("missing(a, X)").unwrap_err();
    assert_eq!(err.engine_kind(), Some(EngineErrorKind::Runtime));
    assert!(err.to_string().contains("No procedure usermod : missing / 2"));
    assert_eq!(session.state(), SessionState::Ready);
}

#[test]
fn test_consult_missing_file() {
    let mut session = common::open_xsb();
    let err = session.consult_file("/nonexistent/family.P").unwrap_err();
    assert_eq!(err.engine_kind(), Some(EngineErrorKind::Runtime));
    assert_eq!(session.state(), SessionState::Ready);
}
