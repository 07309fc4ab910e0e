//! Demo application served by the `sprig` binary: a small in-memory tracks
//! API.
//!
//! | Route | Notes |
//! |---|---|
//! | `GET /health` | |
//! | `GET /tracks?limit=N` | typed query |
//! | `GET /tracks/:id` | `404` when absent |
//! | `POST /tracks` | members only, JSON-Schema body, injects `user` and `audit` |
//! | `DELETE /tracks/:id` | members only, local error mapper |
//! | `GET /assets/*` | files from the static directory |
//!
//! A request is a member when its bearer token equals the configured token.

use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use tracing::info;

use crate::error::HttpError;
use crate::handler::{Reply, RouteBuilder};
use crate::responder::{JsonResponder, Responder};
use crate::server::ServerBuilder;
use crate::static_files::StaticFileResponder;
use crate::validator;
use crate::{App, Server};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Track {
    pub id: u64,
    pub title: String,
    pub artist: String,
    pub added_by: String,
}

#[derive(Debug, Deserialize)]
struct NewTrack {
    title: String,
    artist: String,
}

#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    limit: Option<String>,
}

/// In-memory track store shared by every request
#[derive(Debug)]
pub struct TrackStore {
    tracks: RwLock<Vec<Track>>,
    next_id: AtomicU64,
}

impl Default for TrackStore {
    fn default() -> Self {
        Self {
            tracks: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl TrackStore {
    /// # Errors
    ///
    /// When the store lock is poisoned.
    pub fn list(&self, limit: Option<usize>) -> anyhow::Result<Vec<Track>> {
        let tracks = self
            .tracks
            .read()
            .map_err(|_| anyhow::anyhow!("track store poisoned"))?;
        Ok(tracks.iter().take(limit.unwrap_or(usize::MAX)).cloned().collect())
    }

    /// # Errors
    ///
    /// When the store lock is poisoned.
    pub fn find(&self, id: u64) -> anyhow::Result<Option<Track>> {
        let tracks = self
            .tracks
            .read()
            .map_err(|_| anyhow::anyhow!("track store poisoned"))?;
        Ok(tracks.iter().find(|t| t.id == id).cloned())
    }

    /// # Errors
    ///
    /// When the store lock is poisoned.
    pub fn add(&self, title: String, artist: String, added_by: String) -> anyhow::Result<Track> {
        let track = Track {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            title,
            artist,
            added_by,
        };
        self.tracks
            .write()
            .map_err(|_| anyhow::anyhow!("track store poisoned"))?
            .push(track.clone());
        Ok(track)
    }

    /// # Errors
    ///
    /// When the store lock is poisoned.
    pub fn remove(&self, id: u64) -> anyhow::Result<bool> {
        let mut tracks = self
            .tracks
            .write()
            .map_err(|_| anyhow::anyhow!("track store poisoned"))?;
        let before = tracks.len();
        tracks.retain(|t| t.id != id);
        Ok(tracks.len() != before)
    }
}

#[derive(Debug, Clone, Default)]
pub struct DemoConfig {
    /// Bearer token that grants the member role
    pub api_token: String,
    /// Base directory for `/assets/*`
    pub static_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Role {
    #[default]
    Guest,
    Member,
}

/// Name of the caller, from the `x-user` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser(pub String);

pub struct TracksApp;

impl App for TracksApp {
    type Context = TrackStore;
    type Config = DemoConfig;
    type Ability = Role;
}

fn track_id(raw: Option<&str>) -> Result<u64, HttpError> {
    raw.and_then(|id| id.parse().ok())
        .ok_or_else(|| HttpError::bad_request("Invalid track id"))
}

/// Assemble the demo server
///
/// # Errors
///
/// Only on a wiring mistake in the routes below.
pub fn build_server(config: DemoConfig) -> anyhow::Result<Server<TracksApp>> {
    let track_schema = json!({
        "type": "object",
        "required": ["title", "artist"],
        "properties": {
            "title": { "type": "string", "minLength": 1 },
            "artist": { "type": "string", "minLength": 1 }
        }
    });

    let new_track = validator::json_schema(&track_schema)?;
    let parse_track = validator::typed::<NewTrack>();

    ServerBuilder::<TracksApp>::new(config, TrackStore::default())
        .define_ability(|args| {
            let member = !args.config.api_token.is_empty()
                && args.request.auth_token() == Some(args.config.api_token.as_str());
            Ok(if member { Role::Member } else { Role::Guest })
        })
        .provide("user", |args| {
            Ok(CurrentUser(
                args.request.header("x-user").unwrap_or("anonymous").to_string(),
            ))
        })
        .provide("audit", |args| {
            let user = args.injector.get::<CurrentUser>("user")?;
            Ok(format!("{} {} by {}", args.request.method(), args.request.pathname(), user.0))
        })
        .route(RouteBuilder::<TracksApp>::get("health").handle(|_| Ok(json!({ "status": "ok" }).into())))
        .route(
            RouteBuilder::<TracksApp>::get("tracks")
                .query(validator::typed::<ListQuery>())
                .handle(|args| {
                    let limit = match args.query.limit.as_deref() {
                        Some(raw) => Some(
                            raw.parse::<usize>()
                                .map_err(|_| HttpError::bad_request("Invalid limit"))?,
                        ),
                        None => None,
                    };
                    Reply::json(&args.ctx.list(limit)?)
                }),
        )
        .route(RouteBuilder::<TracksApp>::get("tracks/:id").handle(|args| {
            let id = track_id(args.params.get("id"))?;
            match args.ctx.find(id)? {
                Some(track) => Reply::json(&track),
                None => Err(HttpError::not_found().into()),
            }
        }))
        .route(
            RouteBuilder::<TracksApp>::post("tracks")
                .guard(|role| *role == Role::Member)
                .inject("user")
                .inject("audit")
                .body(move |raw| parse_track(&new_track(raw)?))
                .handle(|args| {
                    let user = args.inject.require::<CurrentUser>("user")?;
                    if let Some(audit) = args.inject.get::<String>("audit") {
                        args.span.in_scope(|| info!(audit = %audit, "Track added"));
                    }
                    let track = args.ctx.add(args.body.title, args.body.artist, user.0.clone())?;
                    Reply::json(&track)
                }),
        )
        .route(
            RouteBuilder::<TracksApp>::delete("tracks/:id")
                .guard(|role| *role == Role::Member)
                .error(|err| -> Box<dyn Responder> {
                    Box::new(JsonResponder::with_status(
                        json!({ "error": err.message(), "status": err.status().as_u16() }),
                        err.status(),
                    ))
                })
                .handle(|args| {
                    let id = track_id(args.params.get("id"))?;
                    if args.ctx.remove(id)? {
                        Ok(Reply::responder(JsonResponder::with_status(
                            json!({ "deleted": id }),
                            StatusCode::OK,
                        )))
                    } else {
                        Err(HttpError::not_found().into())
                    }
                }),
        )
        .route(RouteBuilder::<TracksApp>::get("assets/*").handle(|args| {
            let base = args
                .config
                .static_dir
                .as_deref()
                .ok_or_else(HttpError::not_found)?;
            let path = args.params.get("path").unwrap_or_default();
            Ok(Reply::responder(StaticFileResponder::from_file_path(base, path)?))
        }))
        .build()
        .map_err(Into::into)
}
