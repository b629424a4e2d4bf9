//! checkin-form: a constraint-propagating form model
//!
//! Forms whose fields derive one another (`start + duration = end`), whose
//! alternative fields exclude one another, and whose required-ness follows
//! from both. The terminal host in `main.rs` edits one session at a time.

pub mod config;
pub mod presets;
pub mod state;
pub mod submission;
