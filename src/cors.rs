use rocket::{
    fairing::{Fairing, Info, Kind},
    http::{Header, Status},
    options, routes, Request, Response, Route,
};

use crate::config::Config;

pub const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";
pub const ALLOWED_HEADERS: &str = "Origin, Content-Type";

pub fn routes() -> Vec<Route> {
    routes![preflight]
}

/// Answer CORS preflight requests for any path; the headers are added by [`CorsFairing`].
#[options("/<_..>")]
fn preflight() -> Status {
    Status::NoContent
}

/// A fairing that allows the configured frontend origin to call the API
/// with credentials (the session cookie).
#[derive(Debug, Copy, Clone)]
pub struct CorsFairing;

#[rocket::async_trait]
impl Fairing for CorsFairing {
    fn info(&self) -> Info {
        Info {
            name: "CORS",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        let Some(config) = req.rocket().state::<Config>() else {
            return;
        };
        let allowed = config.frontend_origin();

        // Only the configured origin is echoed back; browsers block the rest.
        if req.headers().get_one("Origin") != Some(allowed) {
            return;
        }

        res.set_header(Header::new("Access-Control-Allow-Origin", allowed.to_string()));
        res.set_header(Header::new("Access-Control-Allow-Methods", ALLOWED_METHODS));
        res.set_header(Header::new("Access-Control-Allow-Headers", ALLOWED_HEADERS));
        res.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
        res.set_header(Header::new("Vary", "Origin"));
    }
}
