//! Core library for the khaapa-insights spreadsheet analyzer.
//!
//! The library discovers spreadsheets in a Drive folder, normalizes their rows
//! into tables, and renders heuristic insights and recommendations for a tool
//! server. Source adapters live under [`khaapa::insights::io`], the data
//! representations inside [`khaapa::insights::model`], row repair in
//! [`khaapa::insights::normalize`], the batch orchestration under
//! [`khaapa::insights::loader`], and the text engines in
//! [`khaapa::insights::insight`] and [`khaapa::insights::recommend`].

pub mod khaapa;

pub use khaapa::insights::{
    Result, ToolError, cache, classify, config, error, insight, io, loader, model, normalize,
    recommend, server, tools,
};
