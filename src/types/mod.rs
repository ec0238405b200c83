//! Public data model types: requests, decisions, attribute values, and
//! policy listings.

mod attr_value;
mod decision;
mod listing;
mod request;

pub use attr_value::AttrValue;
pub use decision::{Decision, PermitPolicy, PolicyVersion};
pub use listing::PrincipalPolicies;
pub use request::Request;
