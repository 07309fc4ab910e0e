use http::{Method, StatusCode};
use may_minihttp::{HttpService, Request as RawRequest, Response as RawResponse};
use std::io::{self, Cursor, Read};
use std::sync::Arc;
use tracing::debug;

use super::request::Incoming;
use super::response::{write_response, HttpResponse};
use crate::dispatcher::{App, Server};
use crate::responder::{error_response, Responder};
use crate::static_files::StaticFiles;

/// `may_minihttp` service running every request through a [`Server`].
///
/// `GET` requests whose path matches no route (and no fallback route) are
/// served from the static directory, if one is configured. A `404` raised by
/// a matched route is never replaced.
pub struct AppService<A: App> {
    pub server: Arc<Server<A>>,
    pub static_files: Option<StaticFiles>,
}

impl<A: App> Clone for AppService<A> {
    fn clone(&self) -> Self {
        Self {
            server: Arc::clone(&self.server),
            static_files: self.static_files.clone(),
        }
    }
}

impl<A: App> AppService<A> {
    pub fn new(server: Arc<Server<A>>) -> Self {
        Self {
            server,
            static_files: None,
        }
    }

    #[must_use]
    pub fn with_static_files(mut self, static_files: StaticFiles) -> Self {
        self.static_files = Some(static_files);
        self
    }

    /// Dispatch one transport-neutral request, including the static fallback
    #[must_use]
    pub fn respond(&self, incoming: Incoming) -> HttpResponse {
        let static_path = (incoming.method == Method::GET.as_str() && self.static_files.is_some())
            .then(|| pathname_of(&incoming.target))
            .filter(|path| !self.server.has_route(path))
            .map(str::to_string);

        let response = self.server.serve(incoming);
        if response.status != StatusCode::NOT_FOUND {
            return response;
        }

        match (static_path, &self.static_files) {
            (Some(path), Some(files)) => match files.lookup(&path) {
                Some(file) => {
                    debug!(path = %path, "Serving static file");
                    let mut rendered = HttpResponse::default();
                    match Box::new(file).respond(&mut rendered) {
                        Ok(()) => rendered,
                        Err(err) => error_response(&err),
                    }
                }
                None => response,
            },
            _ => response,
        }
    }
}

fn pathname_of(target: &str) -> &str {
    let end = target.find(['?', '#']).unwrap_or(target.len());
    &target[..end]
}

fn incoming_from(req: RawRequest) -> io::Result<Incoming> {
    let method = req.method().to_string();
    let target = req.path().to_string();
    let headers: Vec<(String, String)> = req
        .headers()
        .iter()
        .map(|h| (h.name.to_string(), String::from_utf8_lossy(h.value).into_owned()))
        .collect();

    let mut body = Vec::new();
    req.body().read_to_end(&mut body)?;

    Ok(Incoming {
        method,
        target,
        headers,
        body: Box::new(Cursor::new(body)),
    })
}

impl<A: App> HttpService for AppService<A> {
    fn call(&mut self, req: RawRequest, res: &mut RawResponse) -> io::Result<()> {
        let incoming = incoming_from(req)?;
        write_response(res, self.respond(incoming));
        Ok(())
    }
}
