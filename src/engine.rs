//! Matching and dispatch engine.
//!
//! This module is the algorithmic core behind [`Engine`](crate::Engine). It
//! is split into focused submodules under `src/engine/`, re-exported here so
//! callers only ever name `crate::engine::X`.
//!
//! ## How the parts work together
//!
//! One `request_bids` call is a pipeline:
//!
//! ```text
//! patterns (JSON) ── PatternStore::add_patterns     (patterns.rs)
//!                      - validate identity + sizes
//!                      - compile regexes, resolve mtoRevId
//!                               │
//! requests ── validate + group ─┼───────────────────── (dispatch.rs)
//!                               │  per (source, destination) group:
//!                               v
//!                    MatchContext::find_candidates     (matcher.rs)
//!                      - identity regexes
//!                      - limit ∩ pattern sizes         (sizes.rs)
//!                      - admission hook
//!                               │
//!                               v
//!                    assign + ClaimSet                 (assign.rs)
//!                      - first unclaimed, first registered
//!                               │
//!                               v
//!                    build_unit                        (builder.rs)
//!                      - final sizes, sorted
//!                      - generated code (FNV-1a)
//!                      - first-party data
//!                               │
//!                               v
//!                    source ──> destination            (crate::submodules)
//!                      └─ AuctionTracker               (tracker.rs)
//! ```
//!
//! ## Responsibilities by module
//!
//! - `patterns.rs`: admission, compiled patterns, media-type configs.
//! - `sizes.rs`: limit sizes, responsive narrowing, ordering, size-mapping
//!   lookups, the `looks_like_pattern` helper.
//! - `matcher.rs`: the per-request candidate filter.
//! - `assign.rs`: batch-order claiming.
//! - `builder.rs`: unit construction, div id / slot name derivation.
//! - `registry.rs`: the named submodule slots.
//! - `dispatch.rs`: validation, grouping, and the inventory → source →
//!   destination hand-off.
//! - `tracker.rs`: latest auction per unit code.
//!
//! ## State
//!
//! The pattern store, size mappings, registry and tracker live on the
//! [`Engine`](crate::Engine) for its whole life. The [`ClaimSet`] is the only
//! per-call state: it is created by `dispatch::request_bids` and dropped when
//! the call returns.

#[path = "engine/assign.rs"]
mod assign;
#[path = "engine/builder.rs"]
mod builder;
#[path = "engine/dispatch.rs"]
mod dispatch;
#[path = "engine/matcher.rs"]
mod matcher;
#[path = "engine/patterns.rs"]
mod patterns;
#[path = "engine/registry.rs"]
mod registry;
#[path = "engine/sizes.rs"]
mod sizes;
#[path = "engine/tracker.rs"]
mod tracker;

pub use assign::{ClaimSet, assign};
pub use builder::build_unit;
pub use matcher::{AdmissionHook, MatchContext};
pub use patterns::{AdUnitPattern, AdmissionReport, PatternId, PatternSpec, PatternStore};
pub use registry::{Submodule, SubmoduleKind, SubmoduleRegistry};
pub use sizes::{
    GLOBAL_SIZE_MAPPING_KEY, LimitOrigin, LimitSizes, SizeMappings, looks_like_pattern, resolve_limit_sizes,
    resolve_pattern_sizes,
};
pub use tracker::AuctionTracker;

pub(crate) use builder::build_match;
pub(crate) use dispatch::request_bids;
pub(crate) use sizes::parse_size_list;
