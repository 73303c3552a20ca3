//! Session coordination: the public facade over one connection.
//!
//! A [`Session`] forwards UI events to the server and applies what the server
//! sends back to an injected [`Page`]:
//!
//! - The first message of every connection epoch is an identity message that
//!   binds the session to a page element
//! - Every later message of that epoch is markup that replaces the bound
//!   element's content wholesale
//! - Updates for an element the page no longer has are dropped silently

mod coordinator;
mod page;
mod state;

pub use coordinator::{MessageOutcome, Session};
pub use page::{MemoryPage, Page};
pub use state::SessionState;
