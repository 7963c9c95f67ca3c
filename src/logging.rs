use log::{error, info, warn};
use rocket::{
    fairing::{Fairing, Info, Kind},
    http::StatusClass,
    request::{FromRequest, Outcome},
    Data, Orbit, Request, Response, Rocket,
};
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::Config;

/// A unique identifier for a particular request.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct RequestId(pub usize);

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Requests seen since startup.
static REQUESTS_SEEN: AtomicUsize = AtomicUsize::new(0);

impl RequestId {
    /// The ID of the given request, assigned from a global counter on first use.
    pub fn of<'r>(req: &'r Request<'_>) -> &'r RequestId {
        req.local_cache(|| RequestId(REQUESTS_SEEN.fetch_add(1, Ordering::Relaxed)))
    }
}

/// Allow the ID to be accessed via request guard.
#[rocket::async_trait]
impl<'r> FromRequest<'r> for &'r RequestId {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        Outcome::Success(RequestId::of(req))
    }
}

/// A rocket fairing that logs every request and response, tagged with its [`RequestId`].
#[derive(Debug, Copy, Clone)]
pub struct LoggerFairing;

#[rocket::async_trait]
impl Fairing for LoggerFairing {
    fn info(&self) -> Info {
        Info {
            name: "Logger",
            kind: Kind::Liftoff | Kind::Request | Kind::Response | Kind::Shutdown,
        }
    }

    async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
        let scheme = match rocket.config().tls_enabled() {
            true => "https",
            false => "http",
        };
        let config = rocket.config();
        let frontend = rocket
            .state::<Config>()
            .map(|app| app.frontend_origin())
            .unwrap_or("nobody");
        info!(
            "Serving questions on {scheme}://{}:{}, cross-origin calls allowed from {frontend}",
            config.address, config.port
        );
    }

    async fn on_request(&self, req: &mut Request<'_>, _data: &mut Data<'_>) {
        let id = RequestId::of(req);
        let origin = req
            .client_ip()
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "unknown origin".to_string());
        info!("->req{id} {} {} from {origin}", req.method(), req.uri());
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        let id = RequestId::of(req);
        let code = res.status();
        let handler = req
            .route()
            .and_then(|route| route.name.as_deref())
            .unwrap_or("no handler");
        let line = format!("<-rsp{id} {code} via {handler}");
        match code.class() {
            StatusClass::ServerError => error!("{line}"),
            StatusClass::ClientError => warn!("{line}"),
            _ => info!("{line}"),
        }
    }

    async fn on_shutdown(&self, _rocket: &Rocket<Orbit>) {
        let seen = REQUESTS_SEEN.load(Ordering::Relaxed);
        warn!("Polling server stopping after {seen} request(s)");
    }
}

#[cfg(test)]
mod tests {
    use rocket::{get, local::asynchronous::Client, routes};

    use super::*;

    #[get("/id")]
    fn echo_id(id: &RequestId) -> String {
        id.to_string()
    }

    async fn fetch_id(client: &Client) -> usize {
        let response = client.get("/id").dispatch().await;
        response.into_string().await.unwrap().parse().unwrap()
    }

    #[rocket::async_test]
    async fn each_request_gets_a_later_id() {
        let rocket = rocket::build()
            .attach(LoggerFairing)
            .mount("/", routes![echo_id]);
        let client = Client::untracked(rocket).await.unwrap();

        let first = fetch_id(&client).await;
        let second = fetch_id(&client).await;
        assert!(second > first);
        assert!(REQUESTS_SEEN.load(Ordering::Relaxed) > second);
    }

    #[test]
    fn request_ids_display_as_numbers() {
        assert_eq!(RequestId(42).to_string(), "42");
    }
}
