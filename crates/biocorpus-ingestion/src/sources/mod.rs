//! Source document readers.

pub mod bioc;
pub mod web;
