//! Access control: levels, requests, ACLs and their enforcement.

mod acl;
mod backend;
mod guard;
mod request;

pub use acl::{AccessList, AclEntry};
pub use backend::{Backend, ResolvedAcl};
pub use guard::{Guard, Guarded};
pub use request::{AccessLevel, AccessRequest, AccessTicket};
