//! Response Engine — template-driven response rendering.
//!
//! Resolves an incoming request to a response template (by id or by trigger
//! phrase), evaluates the template's directives against a caller-supplied
//! context at a chosen verbosity, and emits formatted text — so calling
//! systems get consistent, structured output without bespoke formatting
//! code per response type.

pub mod core;
pub mod schema;
