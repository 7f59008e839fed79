//! Logic Bridge - one query interface to interactive XSB, SWI, ECLiPSe and
//! Flora-2 engines.
//!
//! ```no_run
//! use logic_bridge::{Backend, Session, SessionOptions};
//!
//! # fn main() -> Result<(), logic_bridge::SessionError> {
//! let mut session = Session::open(Backend::Swi, SessionOptions::default())?;
//! session.consult_file("family.pl")?;
//! for solution in session.query("parent(tom, X)")? {
//!     println!("{}", solution?);
//! }
//! session.close();
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod display;
pub mod process;
pub mod protocol;
pub mod session;
pub mod term;

pub use backend::{Backend, PatternOverrides, PatternTable};
pub use config::{BridgeConfig, ConfigLoader, SessionOptions};
pub use process::{EngineError, EngineErrorKind, SessionState, SpawnError};
pub use protocol::Solutions;
pub use session::{Session, SessionError};
pub use term::{Number, ParseError, Solution, Term};
