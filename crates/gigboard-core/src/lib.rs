#![forbid(unsafe_code)]

//! Core: ledger records, store boundary, scan engine, and paginated views.

pub mod record;
pub mod scan;
pub mod source;
pub mod view;
