//! `openb2b-core`: domain foundation shared by every openb2b crate.
//!
//! Pure domain primitives only: identifiers, the aggregate contract, the
//! domain error model and money rounding. No IO lives here.

pub mod aggregate;
pub mod error;
pub mod id;
pub mod money;
pub mod number;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot, ExpectedVersion};
pub use error::{DomainError, DomainResult};
pub use id::{AggregateId, CustomerId, OrgId};
pub use money::{non_negative, round2};
pub use number::document_number;
pub use value_object::ValueObject;
