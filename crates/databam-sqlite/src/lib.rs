#![doc = include_str!("../README.md")]

//! # SQLite Driver
//!
//! A [`databam::Driver`] over a single `rusqlite` connection. Suitable for
//! tests and embedded use; statements are serialized through one connection.

#![forbid(unsafe_code)]

mod sqlite;
mod value;

pub use self::sqlite::{ConnectOptions, Sqlite};
