/// Router Module Index
///
/// Routes are grouped by the guard they sit behind, so access control is
/// applied once per group (as a route layer) instead of inside each handler.

/// Routes open to everyone, anonymous or logged in.
pub mod public;

/// Routes behind `require_authenticated`: any logged-in user.
pub mod authenticated;

/// The admin panel, nested under `/crud` behind `require_admin`.
pub mod admin;
