pub mod auth;
pub mod publications;
pub mod ranking;
pub mod users;

pub use publications::publications_routes;
pub use ranking::{admin_ranking_routes, ranking_routes};
pub use users::users_routes;
