//! External Interface Layer: the request, response, and event shapes
//! consumed and emitted by API handlers and callers (spec §2.10, §6).
//!
//! Everything here is plain data — no suspending behavior, no store
//! access. `dlb-server` deserializes [`request`] types from HTTP
//! bodies, calls into `dlb-engine`/`dlb-assign`/`dlb-tally`, and
//! serializes [`response`] types back out; `dlb-scheduler` produces
//! [`event::NotificationEvent`] and [`event::AuditRecord`] values for
//! whatever external sink the caller wires in.
pub mod event;
pub mod request;
pub mod response;

pub use event::AuditKind;
pub use event::AuditRecord;
pub use event::NotificationEvent;
