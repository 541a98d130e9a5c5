//! SMCE registry crawler
//!
//! Walks the paginated listings of the community enterprise registry at
//! smce2023.doae.go.th, maps each row into a [`domain::Record`], follows
//! detail links to enrich it and writes the records as one JSON array.

pub mod application;
pub mod domain;
pub mod infrastructure;
