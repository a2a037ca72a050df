// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Every route here sits behind `jwt_auth_middleware`, which rejects the
// request before any body is parsed and leaves an `AuthSession` in the
// request extensions.

pub mod entries; // Journal entry CRUD
pub mod images; // Image generation and prompt ideas
pub mod questions; // Reflective follow-up questions
