// handlers/mod.rs - Handlers split by security tier
//
// Public (no auth) → Protected (JWT auth). Routes are wired in `server.rs`.
pub mod protected; // JWT authentication required (/api/entries, /api/images, /api/questions)
pub mod public; // No authentication required (/api/auth/*, /api/images/serve)
