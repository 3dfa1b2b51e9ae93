use rocket::Route;

mod dashboard;
mod vote;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(vote::routes());
    routes.extend(dashboard::routes());
    routes
}
