mod admin;
mod auth_routes;
pub mod dto;
mod pages;
pub mod response;
mod router;
mod site;
pub mod validation;

pub use router::{
    AppState, admin_router, auth_router, create_router, pages_router, service_router, site_router,
};
