use http::StatusCode;
use sprig::server::{HttpResponse, Incoming, Request, ServerBuilder};
use sprig::static_files::mime_lookup;
use sprig::{App, ErrorKind, Reply, Responder, RouteBuilder, StaticFileResponder, StaticFiles};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn fixture() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("public/css")).unwrap();
    fs::write(dir.path().join("public/index.html"), "<h1>home</h1>").unwrap();
    fs::write(dir.path().join("public/css/site.css"), "body{}").unwrap();
    fs::write(dir.path().join("public/song.mp3"), [0xff_u8, 0xfb, 0x90]).unwrap();
    fs::write(dir.path().join("public/notes"), "plain").unwrap();
    fs::write(dir.path().join("secret.txt"), "top secret").unwrap();
    dir
}

fn render(responder: StaticFileResponder) -> HttpResponse {
    let mut res = HttpResponse::default();
    Box::new(responder).respond(&mut res).unwrap();
    res
}

#[test]
fn test_serves_file_with_mime_type() {
    let dir = fixture();
    let base = dir.path().join("public");

    let css = render(StaticFileResponder::from_file_path(&base, "/css/site.css").unwrap());
    assert_eq!(css.status, StatusCode::OK);
    assert_eq!(css.header("content-type"), Some("text/css"));
    assert_eq!(css.body, b"body{}");

    let mp3 = render(StaticFileResponder::from_file_path(&base, "song.mp3").unwrap());
    assert_eq!(mp3.header("content-type"), Some("audio/mpeg"));
    assert_eq!(mp3.body, vec![0xff, 0xfb, 0x90]);

    let plain = render(StaticFileResponder::from_file_path(&base, "notes").unwrap());
    assert_eq!(plain.header("content-type"), Some("text/plain"));
}

#[test]
fn test_traversal_rejected_whether_or_not_target_exists() {
    let dir = fixture();
    let base = dir.path().join("public");

    for path in ["../secret.txt", "/css/../../secret.txt", "../missing.txt", "../../../../etc/passwd"] {
        let err = StaticFileResponder::from_file_path(&base, path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest, "{path}");
    }
}

#[test]
fn test_dot_segments_inside_base_are_allowed() {
    let dir = fixture();
    let base = dir.path().join("public");
    let responder = StaticFileResponder::from_file_path(&base, "css/../index.html").unwrap();
    assert_eq!(responder.path(), base.join("index.html"));
    assert_eq!(responder.content_type(), "text/html");
}

#[test]
fn test_missing_file_and_directory_are_not_found() {
    let dir = fixture();
    let base = dir.path().join("public");
    assert_eq!(
        StaticFileResponder::from_file_path(&base, "nope.js").unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(
        StaticFileResponder::from_file_path(&base, "css").unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(
        StaticFileResponder::from_default_path(base.join("missing.html")).unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn test_from_request_uses_pathname() {
    let dir = fixture();
    let base = dir.path().join("public");
    let request = Request::from_incoming(Incoming::new("GET", "/css/site.css?v=3")).unwrap();
    assert!(StaticFileResponder::from_request(&base, &request).is_some());

    let request = Request::from_incoming(Incoming::new("GET", "/../secret.txt")).unwrap();
    assert!(StaticFileResponder::from_request(&base, &request).is_none());
}

#[test]
fn test_spa_lookup_falls_back_to_index() {
    let dir = fixture();
    let base = dir.path().join("public");

    let plain = StaticFiles::new(&base);
    assert!(plain.lookup("/app/settings").is_none());

    let spa = StaticFiles::new(&base).spa(true);
    let index = spa.lookup("/app/settings").unwrap();
    assert_eq!(index.path(), base.join("index.html"));
    // Escapes are never answered with the index
    assert!(spa.lookup("/../secret.txt").is_none());
}

#[test]
fn test_removed_file_fails_at_render_time() {
    let dir = fixture();
    let base = dir.path().join("public");
    let responder = StaticFileResponder::from_file_path(&base, "notes").unwrap();
    fs::remove_file(base.join("notes")).unwrap();

    let mut res = HttpResponse::default();
    let err = Box::new(responder).respond(&mut res).unwrap_err();
    assert!(err.downcast_ref::<sprig::HttpError>().is_some());
}

struct FilesApp;

impl App for FilesApp {
    type Context = ();
    type Config = PathBuf;
    type Ability = ();
}

#[test]
fn test_wildcard_route_streams_files() {
    let dir = fixture();
    let server = ServerBuilder::<FilesApp>::new(dir.path().join("public"), ())
        .route(RouteBuilder::<FilesApp>::get("css/*").handle(|args| {
            let path = args.params.get("path").unwrap_or_default();
            Ok(Reply::responder(StaticFileResponder::from_file_path(args.config, path)?))
        }))
        .build()
        .unwrap();

    let ok = server.serve(Incoming::new("GET", "/css/site.css"));
    assert_eq!(ok.status, StatusCode::OK);
    assert_eq!(ok.body, b"body{}");

    let missing = server.serve(Incoming::new("GET", "/css/other.css"));
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let escape = server.serve(Incoming::new("GET", "/css/../../secret.txt"));
    assert_eq!(escape.status, StatusCode::BAD_REQUEST);
}

#[test]
fn test_mime_table() {
    for (file, mime) in [
        ("a.html", "text/html"),
        ("a.js", "application/javascript"),
        ("a.json", "application/json"),
        ("a.png", "image/png"),
        ("a.svg", "image/svg+xml"),
        ("a.tar.gz", "text/plain"),
    ] {
        assert_eq!(mime_lookup(Path::new(file)), mime, "{file}");
    }
}
