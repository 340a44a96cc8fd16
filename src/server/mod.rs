//! Token server collaborator
//!
//! Polls the server for the pending authorization request and posts
//! received radio packets back to it.

mod client;

pub use client::{FetchError, HttpServerClient, SubmitError, TokenServer};
