use logic_bridge::{Backend, EngineErrorKind, Session, SessionState, Solution, Term};
use tempfile::TempDir;

use crate::common;

fn atoms(solutions: &[Solution], name: &str) -> Vec<String> {
    solutions
        .iter()
        .filter_map(|s| s.get(name).and_then(Term::as_atom).map(str::to_string))
        .collect()
}

#[test]
fn test_batch_reply_is_split_into_solutions() {
    let dir = TempDir::new().unwrap();
    let mut session = common::open_flora();
    assert_eq!(session.backend(), Backend::Flora2);
    session.consult_file(common::family_frames(&dir)).unwrap();

    let mut solutions = session.query("tom[parent->?X]").unwrap();
    assert_eq!(solutions.variables(), ["X"]);
    let first = solutions.next().unwrap().unwrap();
    assert_eq!(first.get("X"), Some(&Term::atom("bob")));
    let second = solutions.next().unwrap().unwrap();
    assert_eq!(second.get("X"), Some(&Term::atom("liz")));
    assert!(solutions.next().is_none());
    assert!(solutions.next().is_none());
    drop(solutions);

    assert_eq!(session.state(), SessionState::Ready);
    assert_eq!(session.stats().solutions, 2);
}

#[test]
fn test_two_variables_per_solution() {
    let dir = TempDir::new().unwrap();
    let mut session = common::open_flora();
    session.consult_file(common::family_frames(&dir)).unwrap();

    let solutions = session.query_all("?O[parent->?C]").unwrap();
    assert_eq!(solutions.len(), 3);
    assert_eq!(atoms(&solutions, "O"), ["tom", "tom", "bob"]);
    assert_eq!(atoms(&solutions, "C"), ["bob", "liz", "ann"]);
}

#[test]
fn test_no_solutions() {
    let dir = TempDir::new().unwrap();
    let mut session = common::open_flora();
    session.consult_file(common::family_frames(&dir)).unwrap();

    assert!(session.query_all("ann[parent->?X]").unwrap().is_empty());
    assert!(!session.ask("tom[parent->ann]").unwrap());
    assert!(session.ask("tom[parent->bob]").unwrap());
}

#[test]
fn test_dropping_buffered_solutions_leaves_session_ready() {
    let dir = TempDir::new().unwrap();
    let mut session = common::open_flora();
    session.consult_file(common::family_frames(&dir)).unwrap();
    {
        let mut solutions = session.query("?O[parent->?C]").unwrap();
        assert!(solutions.next().unwrap().is_ok());
    }
    assert_eq!(session.state(), SessionState::Ready);
    assert!(session.ask("true").unwrap());
}

#[test]
fn test_expert_mode() {
    let mut session = common::open_flora();
    assert!(!session.ask("expert_enabled").unwrap());

    let options = common::options("fake_flora.sh").flora_expert(true);
    let mut expert = Session::open(Backend::Flora2, options).unwrap();
    assert!(expert.ask("expert_enabled").unwrap());
}

#[test]
fn test_add_facts_inserts_frames() {
    let mut session = common::open_flora();
    session
        .add_facts(["mary[likes->wine].", "mary[likes->food]"])
        .unwrap();
    let solutions = session.query_all("mary[likes->?What]").unwrap();
    assert_eq!(atoms(&solutions, "What"), ["wine", "food"]);
}

#[test]
fn test_syntax_error() {
    let mut session = common::open_flora();
    let err = session.query_all("foo(").unwrap_err();
    assert_eq!(err.engine_kind(), Some(EngineErrorKind::Syntax));
    assert!(err.to_string().contains("unexpected end of clause"));
    assert_eq!(session.state(), SessionState::Ready);
    assert!(session.ask("true").unwrap());
}

#[test]
fn test_runtime_error() {
    let mut session = common::open_flora();
    let err = session.query_all("nonsense").unwrap_err();
    assert_eq!(err.engine_kind(), Some(EngineErrorKind::Runtime));
    assert_eq!(session.state(), SessionState::Ready);
}
