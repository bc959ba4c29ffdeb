//! MCP server that lets LLMs manage GitHub issues.
//!
//! Provides tools for creating, listing, searching, updating, closing and
//! commenting on issues. Requests authenticate with a personal access token
//! and fall back to the GitHub CLI's token when GitHub rejects the PAT.

pub mod auth;
pub mod client;
pub mod error;
pub mod github;
pub mod server;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;
