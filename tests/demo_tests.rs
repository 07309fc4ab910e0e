use http::StatusCode;
use serde_json::{json, Value};
use sprig::demo::{build_server, DemoConfig, TracksApp};
use sprig::server::{AppService, Incoming};
use sprig::{Server, StaticFiles};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

fn server() -> Server<TracksApp> {
    build_server(DemoConfig {
        api_token: "s3cret".into(),
        static_dir: None,
    })
    .unwrap()
}

fn member(method: &str, target: &str) -> Incoming {
    Incoming::new(method, target).header("Authorization", "Bearer s3cret")
}

fn add_track(server: &Server<TracksApp>, title: &str) -> Value {
    let res = server.serve(
        member("POST", "/tracks")
            .header("Content-Type", "application/json")
            .header("X-User", "ann")
            .text(json!({ "title": title, "artist": "Band" }).to_string()),
    );
    assert_eq!(res.status, StatusCode::CREATED);
    res.json().unwrap()
}

#[test]
fn test_member_can_add_and_fetch_tracks() {
    let server = server();
    let created = add_track(&server, "Intro");
    assert_eq!(created["added_by"], "ann");

    let id = created["id"].as_u64().unwrap();
    let res = server.serve(Incoming::new("GET", &format!("/tracks/{id}")));
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.json().unwrap()["title"], "Intro");
}

#[test]
fn test_guest_cannot_add() {
    let server = server();
    let res = server.serve(
        Incoming::new("POST", "/tracks")
            .header("Authorization", "Bearer wrong")
            .text(r#"{"title":"x","artist":"y"}"#),
    );
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[test]
fn test_schema_violation_is_invalid_body() {
    let server = server();
    let res = server.serve(
        member("POST", "/tracks")
            .header("Content-Type", "application/json")
            .text(r#"{"title":""}"#),
    );
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    assert_eq!(res.json().unwrap()["message"], "Invalid Body");
}

#[test]
fn test_list_limit() {
    let server = server();
    for title in ["a", "b", "c"] {
        add_track(&server, title);
    }
    let res = server.serve(Incoming::new("GET", "/tracks?limit=2"));
    assert_eq!(res.json().unwrap().as_array().map(Vec::len), Some(2));

    let bad = server.serve(Incoming::new("GET", "/tracks?limit=lots"));
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);
}

#[test]
fn test_delete_uses_local_error_mapper() {
    let server = server();
    let missing = server.serve(member("DELETE", "/tracks/99"));
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(missing.json().unwrap(), json!({"error": "Not Found", "status": 404}));

    let id = add_track(&server, "gone")["id"].as_u64().unwrap();
    let deleted = server.serve(member("DELETE", &format!("/tracks/{id}")));
    assert_eq!(deleted.json().unwrap(), json!({"deleted": id}));
}

#[test]
fn test_assets_without_static_dir_is_not_found() {
    let res = server().serve(Incoming::new("GET", "/assets/app.js"));
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

fn static_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("index.html"), "<html>spa</html>").unwrap();
    fs::create_dir_all(dir.path().join("tracks")).unwrap();
    fs::write(dir.path().join("tracks/999"), "shadow").unwrap();
    dir
}

fn service(dir: &TempDir, spa: bool) -> AppService<TracksApp> {
    let server = build_server(DemoConfig {
        api_token: "s3cret".into(),
        static_dir: Some(dir.path().to_path_buf()),
    })
    .unwrap();
    AppService::new(Arc::new(server)).with_static_files(StaticFiles::new(dir.path()).spa(spa))
}

#[test]
fn test_route_not_found_is_not_replaced_by_spa_index() {
    let dir = static_dir();
    let service = service(&dir, true);

    for target in ["/tracks/999", "/assets/missing.js"] {
        let res = service.respond(Incoming::new("GET", target));
        assert_eq!(res.status, StatusCode::NOT_FOUND, "{target}");
        assert_eq!(res.header("content-type"), Some("application/json"), "{target}");
        assert_eq!(res.json().unwrap()["message"], "Not Found");
    }

    let spa = service.respond(Incoming::new("GET", "/app/settings"));
    assert_eq!(spa.status, StatusCode::OK);
    assert_eq!(spa.body, b"<html>spa</html>");
}

#[test]
fn test_route_not_found_is_not_replaced_by_static_file() {
    let dir = static_dir();
    let res = service(&dir, false).respond(Incoming::new("GET", "/tracks/999"));
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.json().unwrap()["message"], "Not Found");
}

#[test]
fn test_has_route() {
    let server = server();
    assert!(server.has_route("/tracks/999"));
    assert!(server.has_route("/assets/a/b.css"));
    assert!(!server.has_route("/app/settings"));
}
