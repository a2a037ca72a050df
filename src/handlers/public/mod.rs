// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Token acquisition and image serving. Browsers load images through plain
// <img> tags, which cannot attach a bearer token.

pub mod auth;
pub mod images;
