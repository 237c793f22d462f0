/// Router Module Index
///
/// Splits the API into routers by access level. Authentication is applied as a
/// layer on the authenticated router, so a protected endpoint cannot be exposed
/// by forgetting an extractor.

/// Anonymous access: reading content, submitting a comrade, logging in.
pub mod public;

/// Routes behind the `auth_middleware` layer. Requires a valid, unrevoked token.
pub mod authenticated;

/// Routes restricted to the 'admin' role, nested under `/api/admin`.
pub mod admin;
