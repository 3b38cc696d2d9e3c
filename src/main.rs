use log::info;
use serde::Serialize;

use tonbi::error::Error;
use tonbi::route::PathParams;
use tonbi::{redirect, Request, Response, Tonbi};

#[derive(Serialize)]
struct Health {
    status: &'static str,
    version: &'static str,
}

// サンプルのトップページハンドラー
fn index(_req: &Request, _params: &PathParams) -> Result<&'static str, Error> {
    Ok("<h1>tonbi</h1>")
}

// サンプルのヘルスチェックハンドラー
fn health(_req: &Request, _params: &PathParams) -> Result<Response, Error> {
    Response::json(&Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// プレースホルダー抽出のサンプル
fn show_user(_req: &Request, params: &PathParams) -> Result<String, Error> {
    Ok(format!("<h1>user {}</h1>", params["id"]))
}

// 旧URLからのリダイレクトのサンプル
fn legacy(_req: &Request, _params: &PathParams) -> Result<Response, Error> {
    Ok(redirect("/"))
}

fn main() -> Result<(), Error> {
    // ロガーの初期化
    env_logger::init();

    // アプリケーションの構築（パターン不正はここで起動失敗になる）
    let app = Tonbi::builder()
        .debug(std::env::var("TONBI_DEBUG").is_ok())
        .get("/", index)?
        .get("/health/", health)?
        .get("/users/<id:[0-9]+>/", show_user)?
        .get("/old-top/", legacy)?
        .build();

    let host = std::env::var("TONBI_HOST").unwrap_or_else(|_| "localhost".to_string());
    let port = std::env::var("TONBI_PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8000);

    info!("Starting tonbi server on {}:{}", host, port);
    tonbi::gateway::server::run(app, &host, port)
}
