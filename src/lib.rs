//! Waypoint: hierarchical work item tracking for AI-agent development
//! workflows.
//!
//! Projects contain features, features contain tasks. Status changes flow
//! through the transition engine in [`status`], which enforces per-type
//! lifecycles, gates completion behind verification criteria and dependency
//! checks, cascades task completion upward, and serializes concurrent
//! mutations per entity. The engine is exposed over MCP ([`mcp`]) and HTTP
//! ([`api`]).

pub mod api;
pub mod db;
pub mod mcp;
pub mod models;
pub mod status;
