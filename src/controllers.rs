//! Demo controllers.
//!
//! Small handlers that exercise the context surface end to end: query and
//! path parameters, the request-scoped store, multipart uploads, JSON
//! binding, templates and JSONP. `register` wires them onto a router.

use std::path::{Path, PathBuf};
use std::time::Duration;

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::error::RouteError;
use crate::middleware::AUTH_USER;
use crate::pipeline::Context;
use crate::routing::Router;

/// Template rendered by the top page, relative to the working directory.
pub const TOP_PAGE_TEMPLATE: &str = "index.html";

/// How long `/users` stalls before answering.
pub const USERS_DELAY: Duration = Duration::from_secs(5);

/// Register every demo route.
pub fn register(router: &mut Router, upload_dir: impl Into<PathBuf>) -> Result<(), RouteError> {
    let upload_dir = upload_dir.into();
    router
        .get("/users", users)?
        .get("/list", list)?
        .get("/list/:item_id/:item_name", list_item)?
        .get("/students", students)?
        .get("/", top_page)?
        .post("/post", move |ctx| post(ctx, &upload_dir))?
        .post("/users/:user_id/posts", user_post)?
        .get("/json_p", json_p)?;
    Ok(())
}

#[derive(Serialize)]
struct Student<'a> {
    name: &'a str,
}

pub fn students(ctx: &mut Context) {
    if ctx.is_timed_out() {
        return;
    }
    let name = ctx.query_value("name").unwrap_or_default().to_string();
    ctx.write_json(&Student { name: &name });
}

/// Always fails: indexes past the end of an empty list.
pub fn list(ctx: &mut Context) {
    if ctx.is_timed_out() {
        return;
    }
    let list: Vec<&str> = Vec::new();
    let index = list.len() + 3;
    ctx.write_string(list[index]);
}

pub fn users(ctx: &mut Context) {
    if ctx.is_timed_out() {
        return;
    }
    std::thread::sleep(USERS_DELAY);
    if ctx.is_timed_out() {
        return;
    }
    ctx.write_string("users");
}

#[derive(Serialize)]
struct Item<'a> {
    item_id: i64,
    item_name: &'a str,
}

pub fn list_item(ctx: &mut Context) {
    if ctx.is_timed_out() {
        return;
    }
    let id = ctx.path_param("item_id").unwrap_or_default().to_string();
    let name = ctx.path_param("item_name").unwrap_or_default().to_string();

    match id.parse::<i64>() {
        Ok(item_id) => ctx.write_json(&Item {
            item_id,
            item_name: &name,
        }),
        Err(e) => {
            tracing::warn!(request_id = %ctx.request_id(), item_id = %id, error = %e, "Invalid item id");
            ctx.write_header(StatusCode::INTERNAL_SERVER_ERROR);
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct TopPage {
    name: String,
}

pub fn top_page(ctx: &mut Context) {
    if ctx.is_timed_out() {
        return;
    }
    let name = ctx.get_value(AUTH_USER, String::new());
    ctx.execute_template(TOP_PAGE_TEMPLATE, &TopPage { name });
}

/// Save the uploaded `file` field as `<name>_<age>_<filename>` in `dir`.
pub fn post(ctx: &mut Context, dir: &Path) {
    if ctx.is_timed_out() {
        return;
    }
    let name = ctx.form_value("name").unwrap_or_default();
    let age = ctx.form_value("age").unwrap_or_default();

    let saved = ctx.form_file("file").and_then(|file| {
        let filename = Path::new(&file.filename)
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default();
        let target = dir.join(format!("{name}_{age}_{filename}"));
        std::fs::write(&target, &file.data)?;
        Ok(target)
    });

    match saved {
        Ok(target) => {
            tracing::info!(request_id = %ctx.request_id(), file = %target.display(), "Saved upload");
            ctx.write_string("save file");
        }
        Err(e) => {
            tracing::warn!(request_id = %ctx.request_id(), error = %e, "Upload failed");
            ctx.write_header(StatusCode::INTERNAL_SERVER_ERROR);
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UserPost {
    pub title: String,
    pub content: String,
}

pub fn user_post(ctx: &mut Context) {
    if ctx.is_timed_out() {
        return;
    }
    match ctx.bind_json::<UserPost>() {
        Ok(post) => ctx.write_json(&post),
        Err(e) => {
            tracing::warn!(request_id = %ctx.request_id(), error = %e, "Invalid user post");
            ctx.write_header(StatusCode::INTERNAL_SERVER_ERROR);
        }
    }
}

pub fn json_p(ctx: &mut Context) {
    if ctx.is_timed_out() {
        return;
    }
    let callback = ctx.query_value("callback").unwrap_or_default().to_string();
    if let Err(e) = ctx.jsonp(&callback, "Hello, World!") {
        tracing::error!(request_id = %ctx.request_id(), error = %e, "Failed to encode jsonp");
        ctx.write_header(StatusCode::INTERNAL_SERVER_ERROR);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::routing::Method;

    #[test]
    fn test_register_all_routes() {
        let mut router = Router::new();
        register(&mut router, "static").unwrap();

        let table = router.table();
        for (method, path) in [
            (Method::Get, "/users"),
            (Method::Get, "/list"),
            (Method::Get, "/list/7/widget"),
            (Method::Get, "/students"),
            (Method::Get, "/"),
            (Method::Post, "/post"),
            (Method::Post, "/users/3/posts"),
            (Method::Get, "/json_p"),
        ] {
            assert!(table.lookup(method, path).is_some(), "{method} {path}");
        }
        assert!(register(&mut router, "static").is_err());
    }
}
