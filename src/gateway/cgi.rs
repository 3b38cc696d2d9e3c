//! CGIゲートウェイ
//!
//! プロセスの環境変数と標準入力からゲートウェイ環境を構築し、
//! 標準出力へ `Status:` 行形式のHTTPレスポンスを書き出す。
//! 1プロセス1リクエストの同期モデル。

use std::collections::HashMap;
use std::env;
use std::io::{self, Write};

use log::info;

use crate::error::Error;
use crate::http::Environment;
use crate::Tonbi;

/// プロセスのCGI環境変数からゲートウェイ環境を構築する
///
/// リクエストメタデータ（REQUEST_METHOD / PATH_INFO / QUERY_STRING /
/// CONTENT_LENGTH / CONTENT_TYPE / HTTP_*）だけを取り込み、ボディの
/// 供給源として標準入力を接続する。
pub fn environment_from_process() -> Environment {
    let mut vars = HashMap::new();
    for (key, value) in env::vars() {
        let relevant = matches!(
            key.as_str(),
            "REQUEST_METHOD" | "PATH_INFO" | "QUERY_STRING" | "CONTENT_LENGTH" | "CONTENT_TYPE"
        ) || key.starts_with("HTTP_");
        if relevant {
            vars.insert(key, value);
        }
    }
    vars.entry("PATH_INFO".to_string())
        .or_insert_with(|| "/".to_string());

    Environment::new(vars, Box::new(io::stdin()))
}

/// CGIリクエストを1件処理して標準出力へレスポンスを書く
pub fn run_cgi(app: &Tonbi) -> Result<(), Error> {
    let environ = environment_from_process();
    let mut out = io::stdout().lock();
    let result = run_cgi_to(app, environ, &mut out);
    out.flush()
        .map_err(|e| Error::Internal(format!("Failed to flush stdout: {}", e)))?;
    info!("CGI request processed");
    result
}

/// レスポンスを任意のライターへ書き出す（テスト容易化のため分離）
///
/// レスポンス開始コールバックでステータスラインとヘッダーを受け取り、
/// Content-Lengthはボディ確定後にフレームワーク側で付与する。
pub fn run_cgi_to<W: Write>(app: &Tonbi, environ: Environment, out: &mut W) -> Result<(), Error> {
    let mut head: Vec<u8> = Vec::new();
    let body = app.call(environ, &mut |status_line: &str, headers: &[(String, String)]| {
        let _ = write!(head, "Status: {}\r\n", status_line);
        for (name, value) in headers {
            let _ = write!(head, "{}: {}\r\n", name, value);
        }
    });

    out.write_all(&head)
        .map_err(|e| Error::Internal(format!("Failed to write response head: {}", e)))?;
    write!(out, "Content-Length: {}\r\n\r\n", body.len())
        .map_err(|e| Error::Internal(format!("Failed to write Content-Length: {}", e)))?;
    out.write_all(&body)
        .map_err(|e| Error::Internal(format!("Failed to write response body: {}", e)))?;
    Ok(())
}
