//! HTTPステータスコードと理由句の対応表

/// 既知のステータスコードから理由句を取得
///
/// 未知のコードはNoneを返す。呼び出し側（Responseのステータス設定）は
/// Noneを500へ読み替える。
pub fn reason_phrase(status: u16) -> Option<&'static str> {
    let phrase = match status {
        100 => "Continue",
        101 => "Switching Protocols",
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        203 => "Non-Authoritative Information",
        204 => "No Content",
        205 => "Reset Content",
        206 => "Partial Content",
        300 => "Multiple Choices",
        301 => "Moved Permanently",
        302 => "Found",
        303 => "See Other",
        304 => "Not Modified",
        305 => "Use Proxy",
        307 => "Temporary Redirect",
        400 => "Bad Request",
        401 => "Unauthorized",
        402 => "Payment Required",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        407 => "Proxy Authentication Required",
        408 => "Request Time-out",
        409 => "Conflict",
        410 => "Gone",
        411 => "Length Required",
        412 => "Precondition Failed",
        413 => "Request Entity Too Large",
        414 => "Request-URI Too Large",
        415 => "Unsupported Media Type",
        416 => "Requested range not satisfiable",
        417 => "Expectation Failed",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Time-out",
        505 => "HTTP Version not supported",
        _ => return None,
    };
    Some(phrase)
}

/// 既知のステータスコードかどうか判定
pub fn is_known(status: u16) -> bool {
    reason_phrase(status).is_some()
}

/// `"<code> <reason phrase>"` 形式のステータスラインを組み立てる
///
/// 未知のコードを渡すのは呼び出し側のバグなので、設定側で必ず既知の値へ
/// 正規化しておくこと。万一未知の値が来た場合は500として扱う。
pub fn status_line(status: u16) -> String {
    match reason_phrase(status) {
        Some(phrase) => format!("{} {}", status, phrase),
        None => "500 Internal Server Error".to_string(),
    }
}
