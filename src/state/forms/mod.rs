//! Form domain layer
//!
//! Fields, derivation rules between them, exclusivity groups and the
//! session that ties them together for one open form.

mod derivation;
mod error;
mod exclusivity;
mod field;
mod schema;
mod session;
mod validity;

pub use derivation::{DerivationEngine, DerivationRule, DerivedWrite, TriadState};
pub use error::{
    ConstraintViolation, ErrorKind, FieldError, FormError, ProgrammingError, ViolationKind,
};
pub use exclusivity::{ExclusivityController, ExclusivityGroup};
pub use field::{
    minutes_between, shift_minutes, Field, FieldKind, FieldSet, FieldValue, Origin, ParseError,
    INSTANT_FORMAT,
};
pub use schema::{FieldSpec, FormSchema, FormSchemaBuilder};
pub use session::{FormSession, SessionContext, SharedSession, Snapshot};
pub use validity::{collect_errors, Invariant, Validator};
