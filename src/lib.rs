//! QuillTip highlight core
//!
//! Captures reader selections in rendered prose, anchors them so they survive
//! a reload, paints them back as decorations and derives the identity hash
//! that joins a highlight to tips on the payment ledger.

pub mod anchor;
pub mod capture;
pub mod config;
pub mod db;
pub mod error;
pub mod highlights;
pub mod identity;
pub mod ledger;
pub mod migration;
pub mod render;
pub mod tree;

pub use config::Config;
pub use error::{AppError, Result};
