//! Stateful client for a PDF question-answering service.
//!
//! Holds the bearer session, the caller's documents and one chat transcript per
//! document, and talks to the REST API through a single gateway that applies a
//! uniform failure policy.

// Interdiction stricte de pratiques dangereuses ou non idiomatiques
#![deny(unsafe_code)] // Le code unsafe est interdit
#![warn(missing_docs)] // Toute fonction, struct, enum ou module public doit être documenté
#![deny(non_camel_case_types)]
// Les types doivent suivre la convention CamelCase

// Options supplémentaires
#![warn(unused_imports)]
#![warn(unused_variables)]
#![deny(unused_must_use)] // Oblige à gérer explicitement les Result et Option
#![deny(non_snake_case)]
#![deny(non_upper_case_globals)]
#![deny(nonstandard_style)]
#![forbid(unsafe_op_in_unsafe_fn)]

// Clippy pour stricte discipline
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::unwrap_used)] // Interdit unwrap()
#![deny(clippy::expect_used)] // Interdit expect()
#![deny(clippy::panic)] // Interdit panic!()
#![deny(clippy::print_stdout)] // Interdit println!() en production
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::unwrap_in_result)]
#![deny(clippy::module_inception)]
#![deny(clippy::redundant_clone)]
#![deny(clippy::too_many_arguments)]
#![cfg_attr(
    test,
    allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)
)]

// Lints pour sécurité et robustesse
#![deny(overflowing_literals)]

/// Client facade composing session, documents, conversations and the gateway.
pub mod client;
/// Conversation transcripts and document selection.
pub mod conversation;
/// Shared types: configuration, errors, identifiers, documents and messages.
pub mod core;
/// Document registry and upload validation.
pub mod documents;
/// Remote API access and failure policy.
pub mod gateway;
/// Bearer session, token persistence and the login redirect listener.
pub mod session;
/// Startup helpers and the terminal front end.
pub mod start_client;
/// Read-only view projections and notices.
pub mod view;

#[cfg(test)]
pub(crate) mod testing;

pub use client::QaClient;
pub use crate::core::config::ClientConfig;
pub use crate::core::errors::{ClientError, ClientResult};
pub use gateway::{GatewayError, GatewayResult};
