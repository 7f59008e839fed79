//! Shared helpers for driving the scripted engines.

use std::path::PathBuf;
use std::time::Duration;

use logic_bridge::{Backend, PatternOverrides, Session, SessionOptions};
use tempfile::TempDir;

/// Path of a fixture script.
pub fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Options that run `script` through bash with test-sized timeouts.
pub fn options(script: &str) -> SessionOptions {
    SessionOptions::default()
        .executable("bash")
        .args([fixture(script).display().to_string()])
        .startup_timeout(Duration::from_secs(5))
        .query_timeout(Duration::from_secs(5))
        .continuation_timeout(Duration::from_secs(5))
        .close_grace(Duration::from_millis(500))
}

/// The scripted SWI toplevel reads whole lines, not keystrokes.
pub fn swi_options() -> SessionOptions {
    options("fake_swipl.sh").patterns(PatternOverrides {
        next_solution: Some(";\n".to_string()),
        stop_enumeration: Some(".\n".to_string()),
        ..Default::default()
    })
}

pub fn open_swi() -> Session {
    Session::open(Backend::Swi, swi_options()).expect("Failed to open SWI session")
}

pub fn open_xsb() -> Session {
    Session::open(Backend::Xsb, options("fake_xsb.sh")).expect("Failed to open XSB session")
}

/// The scripted ECLiPSe toplevel reads a whole line at its "more?" prompt.
pub fn eclipse_options() -> SessionOptions {
    options("fake_eclipse.sh").patterns(PatternOverrides {
        next_solution: Some(";\n".to_string()),
        ..Default::default()
    })
}

pub fn open_eclipse() -> Session {
    Session::open(Backend::Eclipse, eclipse_options()).expect("Failed to open ECLiPSe session")
}

pub fn open_flora() -> Session {
    Session::open(Backend::Flora2, options("fake_flora.sh"))
        .expect("Failed to open Flora-2 session")
}

/// Write the family database used across tests.
pub fn family_file(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("family.pl");
    std::fs::write(
        &path,
        "% family database\n\
         parent(tom, bob).\n\
         parent(tom, liz).\n\
         parent(bob, ann).\n\
         parent(bob, pat).\n\
         age(tom, 62).\n",
    )
    .expect("Failed to write family.pl");
    path
}

/// Same facts as frames.
pub fn family_frames(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("family.flr");
    std::fs::write(
        &path,
        "// family database\n\
         tom[parent->bob].\n\
         tom[parent->liz].\n\
         bob[parent->ann].\n",
    )
    .expect("Failed to write family.flr");
    path
}

/// Whether a process with this id still exists.
#[cfg(unix)]
pub fn process_exists(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    kill(Pid::from_raw(i32::try_from(pid).unwrap()), None).is_ok()
}
