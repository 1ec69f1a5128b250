//! # Brain Store
//!
//! A markdown note store with two interchangeable backends.
//!
//! Notes live either in one branch of a GitHub repository (remote mode) or
//! in a directory on disk (local mode). The mode is chosen once at startup
//! from configuration: remote when a token, owner, and repo are all set,
//! local otherwise. Callers see the same four operations either way.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐
//! │   CLI    │   │   HTTP   │
//! │ (brain)  │   │ (axum)   │
//! └────┬─────┘   └────┬─────┘
//!      └──────┬───────┘
//!             ▼
//!      ┌──────────────┐
//!      │ ContentStore │  mode selector + error policy
//!      └──────┬───────┘
//!        ┌────┴─────┐
//!        ▼          ▼
//!   ┌────────┐ ┌────────┐
//!   │ Remote │ │ Local  │
//!   │ GitHub │ │  dir   │
//!   └────────┘ └────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! brain mode                       # which backend is active
//! brain tree                       # print the note tree
//! brain read inbox/today.md        # metadata + body
//! echo "# Hi" | brain write inbox/hi.md
//! brain serve                      # start the HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and environment overrides |
//! | [`models`] | Tree nodes, documents, operation results |
//! | [`error`] | Typed store errors |
//! | [`frontmatter`] | YAML front-matter parsing and rendering |
//! | [`tree`] | Filtering and ordering rules shared by backends |
//! | [`backend`] | The backend trait and its two implementations |
//! | [`store`] | Mode selection and the public content store |
//! | [`server`] | HTTP route handlers |

pub mod backend;
pub mod config;
pub mod error;
pub mod frontmatter;
pub mod models;
pub mod server;
pub mod store;
pub mod tree;
