//! 共通ユーティリティ関数群（URLデコード、クエリ解析、環境設定 等）

use std::env;

/// URLエンコーディングのデコード関数
///
/// `%XX` 形式のほか、フォームエンコーディング由来の `+` を空白へ変換する。
pub fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut result = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(h), Some(l)) = (from_hex(bytes[i + 1]), from_hex(bytes[i + 2])) {
                result.push(h * 16 + l);
                i += 3;
                continue;
            }
        } else if bytes[i] == b'+' {
            result.push(b' ');
            i += 1;
            continue;
        }
        result.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&result).into_owned()
}

/// 16進数文字をバイト値に変換するヘルパー関数
fn from_hex(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// クエリ文字列をデコード済みの (key, value) ペア列に分解する
///
/// 同名フィールドの繰り返しを保持するため、マップではなくペア列を返す。
/// スカラー/リストへの畳み込みは http::params 側が行う。
pub fn parse_query_pairs(query_string: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();

    if query_string.is_empty() {
        return pairs;
    }

    for pair in query_string.split('&') {
        if pair.is_empty() {
            continue;
        }
        let mut parts = pair.splitn(2, '=');
        if let Some(key) = parts.next() {
            let value = parts.next().unwrap_or("");
            pairs.push((percent_decode(key), percent_decode(value)));
        }
    }

    pairs
}

/// リクエストボディの最大サイズ（バイト）を取得する
/// 優先順位: 環境変数 `TONBI_MAX_BODY_SIZE` -> デフォルト 5MB
pub fn get_max_body_size() -> usize {
    const DEFAULT_MAX_SIZE: usize = 5 * 1024 * 1024; // 5MB
    env::var("TONBI_MAX_BODY_SIZE")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(DEFAULT_MAX_SIZE)
}
