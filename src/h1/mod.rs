//! HTTP/1.1 connection engine (C4) and chunked-decode stream (C5).
//!
//! Grounded on `original_source/modules/access/http/h1conn.c` and
//! `chunked.c`.

pub mod chunked;
pub mod connection;

pub use connection::{Body, Connection};
