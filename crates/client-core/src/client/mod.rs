//! Session orchestration
//!
//! [`SessionManager`] drives one conversation session from credential lookup
//! to teardown; [`SessionManagerBuilder`] wires its collaborators.

mod builder;
mod manager;

pub use builder::SessionManagerBuilder;
pub use manager::SessionManager;
