// handlers/public/auth/mod.rs - Public authentication handlers

pub mod login; // POST /api/auth/login - exchange the shared password for a JWT
pub mod logout; // POST /api/auth/logout - stateless acknowledgement

pub use login::login_post;
pub use logout::logout_post;
