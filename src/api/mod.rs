use rocket::Route;

mod questions;
mod vote;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(questions::routes());
    routes.extend(vote::routes());
    routes.extend(crate::cors::routes());
    routes
}
