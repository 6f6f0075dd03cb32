//! HTTP middleware stack for admin.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP context)
//! 2. `TraceLayer` (request spans)
//! 3. Request ID (correlation header, Sentry tag)
//! 4. Security headers (inline styles for invoices, nothing else)
//! 5. Session layer (tower-sessions with `PostgreSQL` store)
//! 6. Rate limiting on login (governor)
//!
//! Authentication is enforced per handler by the extractors in [`auth`].

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{RequireAdminAuth, RequireStoreManager, clear_current_admin, set_current_admin};
pub use rate_limit::login_rate_limiter;
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
