//! Sessions against the scripted SWI toplevel.

use std::time::Duration;

use logic_bridge::{
    Backend, EngineErrorKind, Session, SessionError, SessionState, Solution, Term,
};
use tempfile::TempDir;

use crate::common;

fn values(solutions: &[Solution], name: &str) -> Vec<Term> {
    solutions
        .iter()
        .map(|s| s.get(name).cloned().expect("binding should be present"))
        .collect()
}

#[test]
fn test_open_reaches_ready() {
    let mut session = common::open_swi();
    assert_eq!(session.backend(), Backend::Swi);
    assert_eq!(session.state(), SessionState::Ready);
    assert!(session.pid().is_some());
    assert!(session.is_alive());
    session.close();
}

#[test]
fn test_consult_and_enumerate_family() {
    let dir = TempDir::new().unwrap();
    let mut session = common::open_swi();
    session.consult_file(common::family_file(&dir)).unwrap();

    let mut solutions = session.query("parent(tom, X)").unwrap();
    assert_eq!(solutions.variables(), ["X"]);

    let first = solutions.next().unwrap().unwrap();
    assert_eq!(first.get("X"), Some(&Term::atom("bob")));
    assert!(solutions.may_have_more());
    let second = solutions.next().unwrap().unwrap();
    assert_eq!(second.get("X"), Some(&Term::atom("liz")));
    assert!(!solutions.may_have_more());
    assert!(solutions.next().is_none());
    assert!(solutions.next().is_none());
    drop(solutions);

    assert_eq!(session.state(), SessionState::Ready);
    let stats = session.stats();
    assert_eq!(stats.queries, 1);
    assert_eq!(stats.solutions, 2);
}

#[test]
fn test_solutions_in_order_then_exhaustion() {
    let mut session = common::open_swi();
    let mut solutions = session.query("color(C)").unwrap();

    let mut seen = Vec::new();
    for solution in solutions.by_ref() {
        seen.push(solution.unwrap());
    }
    assert_eq!(
        values(&seen, "C"),
        [Term::atom("red"), Term::atom("green"), Term::atom("blue")]
    );
    assert!(solutions.next().is_none());
    assert!(solutions.next().is_none());
    drop(solutions);
    assert_eq!(session.state(), SessionState::Ready);
}

#[test]
fn test_zero_solutions_is_exhaustion() {
    let dir = TempDir::new().unwrap();
    let mut session = common::open_swi();
    session.consult_file(common::family_file(&dir)).unwrap();

    let mut solutions = session.query("parent(ann, X).").unwrap();
    assert!(solutions.next().is_none());
    drop(solutions);

    assert!(session.query_all("fail").unwrap().is_empty());
    assert_eq!(session.state(), SessionState::Ready);
}

#[test]
fn test_ground_query_yields_empty_solution() {
    let mut session = common::open_swi();
    let solutions = session.query_all("true").unwrap();
    assert_eq!(solutions.len(), 1);
    assert!(solutions[0].is_empty());
}

#[test]
fn test_numbers_are_parsed() {
    let dir = TempDir::new().unwrap();
    let mut session = common::open_swi();
    session.consult_file(common::family_file(&dir)).unwrap();

    let solutions = session.query_all("age(tom, A)").unwrap();
    assert_eq!(values(&solutions, "A"), [Term::int(62)]);
}

#[test]
fn test_syntax_error_leaves_session_ready() {
    let mut session = common::open_swi();
    {
        let mut solutions = session.query("foo(").unwrap();
        let err = solutions.next().unwrap().unwrap_err();
        assert_eq!(err.engine_kind(), Some(EngineErrorKind::Syntax));
        let SessionError::Engine(engine) = &err else {
            panic!("Expected engine error, got {err:?}");
        };
        assert!(engine.diagnostic.contains("Syntax error"));
        assert!(!engine.diagnostic.contains("write("), "echo should be stripped");
        assert!(solutions.next().is_none());
    }
    assert_eq!(session.state(), SessionState::Ready);
    assert!(session.ask("true").unwrap());
    assert_eq!(session.stats().errors, 1);
}

#[test]
fn test_runtime_error_is_classified() {
    let mut session = common::open_swi();
    let err = session.query_all("no_such_goal").unwrap_err();
    assert_eq!(err.engine_kind(), Some(EngineErrorKind::Runtime));
    assert!(err.to_string().contains("Unknown procedure"));
    assert_eq!(session.state(), SessionState::Ready);
}

#[test]
fn test_consult_missing_file_reports_error() {
    let mut session = common::open_swi();
    let err = session
        .consult_file("/nonexistent/family.pl")
        .unwrap_err();
    assert_eq!(err.engine_kind(), Some(EngineErrorKind::Runtime));
    assert!(err.to_string().contains("does not exist"));
    assert_eq!(session.state(), SessionState::Ready);
}

#[test]
fn test_dropping_mid_enumeration_stops_engine() {
    let mut session = common::open_swi();
    {
        let mut solutions = session.query("nat(N)").unwrap();
        let taken: Vec<Solution> = solutions.by_ref().take(5).map(Result::unwrap).collect();
        assert_eq!(
            values(&taken, "N"),
            (0..5).map(Term::int).collect::<Vec<_>>()
        );
    }
    assert_eq!(session.state(), SessionState::Ready);
    assert!(session.ask("true").unwrap());
}

#[test]
fn test_stop_reports_success() {
    let mut session = common::open_swi();
    let mut solutions = session.query("color(C)").unwrap();
    assert!(solutions.next().unwrap().is_ok());
    solutions.stop().unwrap();
    assert_eq!(session.state(), SessionState::Ready);
}

#[test]
fn test_ask() {
    let dir = TempDir::new().unwrap();
    let mut session = common::open_swi();
    session.consult_file(common::family_file(&dir)).unwrap();

    assert!(session.ask("parent(tom, bob)").unwrap());
    assert!(!session.ask("parent(tom, ann)").unwrap());
    assert!(session.ask("parent(bob, X)").unwrap());
    assert_eq!(session.state(), SessionState::Ready);
}

#[test]
fn test_add_facts() {
    let mut session = common::open_swi();
    session
        .add_facts(["likes(mary, wine).", "likes(mary, food)"])
        .unwrap();
    let solutions = session.query_all("likes(mary, What)").unwrap();
    assert_eq!(
        values(&solutions, "What"),
        [Term::atom("wine"), Term::atom("food")]
    );
}

#[test]
fn test_empty_query_is_rejected() {
    let mut session = common::open_swi();
    assert!(matches!(
        session.query("  . "),
        Err(SessionError::EmptyQuery)
    ));
    assert_eq!(session.state(), SessionState::Ready);
}

#[test]
fn test_timeout_then_retry() {
    let options = common::swi_options().query_timeout(Duration::from_millis(200));
    let mut session = Session::open(Backend::Swi, options).unwrap();
    {
        let mut solutions = session.query("slow").unwrap();
        let err = solutions.next().unwrap().unwrap_err();
        assert_eq!(err.engine_kind(), Some(EngineErrorKind::Timeout));

        let mut answer = None;
        for _ in 0..20 {
            match solutions.next() {
                Some(Ok(solution)) => {
                    answer = Some(solution);
                    break;
                }
                Some(Err(e)) => assert_eq!(e.engine_kind(), Some(EngineErrorKind::Timeout)),
                None => break,
            }
        }
        assert!(answer.expect("slow goal should eventually answer").is_empty());
        assert!(solutions.next().is_none());
    }
    assert_eq!(session.state(), SessionState::Ready);
}

#[test]
fn test_abandoned_timeout_resynchronizes() {
    let options = common::swi_options().query_timeout(Duration::from_millis(200));
    let mut session = Session::open(Backend::Swi, options).unwrap();
    {
        let mut solutions = session.query("slow").unwrap();
        let err = solutions.next().unwrap().unwrap_err();
        assert_eq!(err.engine_kind(), Some(EngineErrorKind::Timeout));
    }
    assert_eq!(session.state(), SessionState::Ready);
    assert!(session.ask("true").unwrap());
}

#[test]
fn test_forgotten_enumeration_is_resumed_on_next_query() {
    let mut session = common::open_swi();
    let mut solutions = session.query("color(C)").unwrap();
    assert!(solutions.next().unwrap().is_ok());
    std::mem::forget(solutions);

    assert_eq!(session.state(), SessionState::EnumeratingSolutions);
    assert!(session.ask("true").unwrap());
    assert_eq!(session.state(), SessionState::Ready);
}

#[test]
fn test_engine_crash_terminates_session() {
    let mut session = common::open_swi();
    {
        let mut solutions = session.query("crash").unwrap();
        let err = solutions.next().unwrap().unwrap_err();
        assert_eq!(err.engine_kind(), Some(EngineErrorKind::ProcessTerminated));
        assert!(solutions.next().is_none());
    }
    assert_eq!(session.state(), SessionState::Terminated);

    let err = session.query("true").unwrap_err();
    assert_eq!(err.engine_kind(), Some(EngineErrorKind::ProcessTerminated));
    let err = session.consult_file("family.pl").unwrap_err();
    assert_eq!(err.engine_kind(), Some(EngineErrorKind::ProcessTerminated));

    session.restart().unwrap();
    assert_eq!(session.state(), SessionState::Ready);
    assert!(session.ask("true").unwrap());
}

#[test]
fn test_unrecovered_error_needs_restart() {
    let options = common::swi_options().query_timeout(Duration::from_millis(300));
    let mut session = Session::open(Backend::Swi, options).unwrap();

    let err = session.query_all("wedged").unwrap_err();
    assert_eq!(err.engine_kind(), Some(EngineErrorKind::Runtime));
    assert_eq!(session.state(), SessionState::Error);

    assert!(matches!(
        session.query("true"),
        Err(SessionError::NotReady {
            state: SessionState::Error
        })
    ));

    session.restart().unwrap();
    assert!(session.ask("true").unwrap());
}

#[test]
fn test_module_qualified_query_is_sent() {
    let options = common::swi_options().module("user");
    let mut session = Session::open(Backend::Swi, options).unwrap();
    // The scripted engine does not know modules, so the qualified goal is
    // reported as an unknown procedure.
    let err = session.query_all("true").unwrap_err();
    assert_eq!(err.engine_kind(), Some(EngineErrorKind::Runtime));
    assert!(err.to_string().contains("user:"));
}
