//! 同期HTTPサーバーゲートウェイ
//!
//! TcpListenerの素朴なシングルスレッド受付ループ。リクエストラインと
//! ヘッダーをゲートウェイ環境のメタデータへ写像し、残りのストリームを
//! ボディ供給源としてアプリケーションへ渡す。1コネクション1リクエスト、
//! Connection: close 前提。タイムアウトやキャンセルはホスト側の責務。

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};

use log::{error, info, warn};

use crate::error::Error;
use crate::http::Environment;
use crate::Tonbi;

/// サーバーループを起動する
///
/// リクエスト処理の失敗はログに残してループを継続する。bind失敗のみ
/// エラーとして返す。
pub fn run(app: Tonbi, host: &str, port: u16) -> Result<(), Error> {
    let listener = TcpListener::bind((host, port))
        .map_err(|e| Error::Internal(format!("Failed to bind {}:{}: {}", host, port, e)))?;
    info!("Listening on {}:{}", host, port);

    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                if let Err(e) = handle_connection(&app, stream) {
                    error!("Connection handling failed: {}", e);
                }
            }
            Err(e) => warn!("Failed to accept connection: {}", e),
        }
    }
    Ok(())
}

/// 1コネクションを処理する
fn handle_connection(app: &Tonbi, stream: TcpStream) -> Result<(), Error> {
    let writer = stream
        .try_clone()
        .map_err(|e| Error::Internal(format!("Failed to clone connection: {}", e)))?;
    let mut reader = BufReader::new(stream);

    let vars = read_request_head(&mut reader)?;
    // ヘッダーまで読み終えたリーダーをそのままボディ供給源にする
    let environ = Environment::new(vars, Box::new(reader));

    let mut head: Vec<u8> = Vec::new();
    let body = app.call(environ, &mut |status_line: &str, headers: &[(String, String)]| {
        let _ = write!(head, "HTTP/1.1 {}\r\n", status_line);
        for (name, value) in headers {
            let _ = write!(head, "{}: {}\r\n", name, value);
        }
    });

    write_http_response(writer, &head, &body)
}

/// リクエストラインとヘッダーを環境メタデータへ写像する
///
/// ヘッダー名は `Header-Name` → `HTTP_HEADER_NAME` 形式へ変換する。
/// CONTENT_LENGTH / CONTENT_TYPE は接頭辞なしの専用キーに入る。
pub(crate) fn read_request_head<R: BufRead>(reader: &mut R) -> Result<HashMap<String, String>, Error> {
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .map_err(|e| Error::InvalidRequest(format!("Failed to read request line: {}", e)))?;

    let mut parts = line.split_whitespace();
    let method = parts
        .next()
        .ok_or_else(|| Error::InvalidRequest("Empty request line".to_string()))?;
    let target = parts
        .next()
        .ok_or_else(|| Error::InvalidRequest("Request line without target".to_string()))?;
    let (path, query) = target.split_once('?').unwrap_or((target, ""));

    let mut vars = HashMap::new();
    vars.insert("REQUEST_METHOD".to_string(), method.to_string());
    vars.insert("PATH_INFO".to_string(), path.to_string());
    vars.insert("QUERY_STRING".to_string(), query.to_string());

    loop {
        let mut header_line = String::new();
        let read = reader
            .read_line(&mut header_line)
            .map_err(|e| Error::InvalidRequest(format!("Failed to read header line: {}", e)))?;
        let header_line = header_line.trim_end();
        if read == 0 || header_line.is_empty() {
            break;
        }

        let (name, value) = match header_line.split_once(':') {
            Some((name, value)) => (name.trim(), value.trim()),
            None => {
                warn!("Skipping malformed header line: {}", header_line);
                continue;
            }
        };

        let key = if name.eq_ignore_ascii_case("content-length") {
            "CONTENT_LENGTH".to_string()
        } else if name.eq_ignore_ascii_case("content-type") {
            "CONTENT_TYPE".to_string()
        } else {
            format!("HTTP_{}", name.to_ascii_uppercase().replace('-', "_"))
        };
        vars.insert(key, value.to_string());
    }

    Ok(vars)
}

/// HTTP/1.1形式でレスポンスを書き出す
fn write_http_response(mut out: TcpStream, head: &[u8], body: &[u8]) -> Result<(), Error> {
    out.write_all(head)
        .map_err(|e| Error::Internal(format!("Failed to write response head: {}", e)))?;
    write!(out, "Content-Length: {}\r\nConnection: close\r\n\r\n", body.len())
        .map_err(|e| Error::Internal(format!("Failed to write Content-Length: {}", e)))?;
    out.write_all(body)
        .map_err(|e| Error::Internal(format!("Failed to write response body: {}", e)))?;
    out.flush()
        .map_err(|e| Error::Internal(format!("Failed to flush connection: {}", e)))
}
