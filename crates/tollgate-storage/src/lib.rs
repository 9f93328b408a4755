// SPDX-FileCopyrightText: 2026 Tollgate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for the tollgate control plane.
//!
//! One database file holds all three tables: `rate_limits`,
//! `classification_cache`, and `processing_jobs`. Schema is managed by
//! embedded refinery migrations and every access goes through a single
//! tokio-rusqlite background connection.

pub mod database;
pub mod migrations;
pub mod queries;
pub mod stores;

pub use database::Database;
pub use stores::{SqliteCacheStore, SqliteJobStore, SqliteQuotaStore};
