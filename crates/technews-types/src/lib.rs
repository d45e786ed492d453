//! Wire types shared by the technews store and HTTP layer.

pub mod api;
pub mod models;
