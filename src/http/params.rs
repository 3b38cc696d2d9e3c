//! リクエストパラメータのデコード
//!
//! クエリ文字列・フォームエンコードボディ・マルチパートボディを、
//! フィールド名 → 値のマップへ変換する。値の形はフィールドごとに
//! デコード時へ決まる: 1回だけ現れればスカラー、繰り返せばリスト、
//! filename付きのマルチパートならファイルアップロード。

use std::collections::HashMap;

use log::warn;

use crate::common::parse_query_pairs;

/// デコード済みパラメータのマップ
pub type Params = HashMap<String, ParamValue>;

/// 1フィールドの値
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// 1回だけ現れたフィールド
    Scalar(String),
    /// 繰り返し現れたフィールド
    List(Vec<String>),
    /// filename付きのマルチパートフィールド
    File(FileUpload),
}

impl ParamValue {
    /// スカラー値を取得（リスト/ファイルの場合はNone）
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::Scalar(value) => Some(value),
            _ => None,
        }
    }

    /// リスト値を取得
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            ParamValue::List(values) => Some(values),
            _ => None,
        }
    }

    /// ファイルアップロードを取得
    pub fn as_file(&self) -> Option<&FileUpload> {
        match self {
            ParamValue::File(file) => Some(file),
            _ => None,
        }
    }
}

/// マルチパートのファイルアップロード
#[derive(Debug, Clone, PartialEq)]
pub struct FileUpload {
    /// フォームのフィールド名
    pub name: String,
    /// クライアントが申告したファイル名
    pub filename: String,
    /// パートに宣言されたContent-Type
    pub content_type: Option<String>,
    /// ファイル内容
    pub data: Vec<u8>,
}

/// (key, value) ペア列をスカラー/リストへ畳み込む
pub fn collect_pairs(pairs: Vec<(String, String)>) -> Params {
    let mut params = Params::new();
    for (key, value) in pairs {
        insert_scalar(&mut params, key, value);
    }
    params
}

/// クエリ文字列をパラメータマップとしてデコードする
pub fn parse_query(query_string: &str) -> Params {
    collect_pairs(parse_query_pairs(query_string))
}

/// フォームエンコードされたボディをデコードする
pub fn parse_urlencoded(body: &[u8]) -> Params {
    collect_pairs(parse_query_pairs(&String::from_utf8_lossy(body)))
}

/// Content-Typeヘッダーからマルチパート境界文字列を取り出す
pub fn boundary_from_content_type(content_type: &str) -> Option<String> {
    for part in content_type.split(';').skip(1) {
        let part = part.trim();
        if let Some(value) = part.strip_prefix("boundary=") {
            let value = value.trim_matches('"');
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

/// マルチパートボディをデコードする
///
/// パート境界は `--<boundary>`。ヘッダーを解釈できないパートは警告を
/// 出してスキップし、リクエスト全体は失敗させない。
pub fn parse_multipart(body: &[u8], boundary: &str) -> Params {
    let mut params = Params::new();
    let delimiter = format!("--{}", boundary).into_bytes();

    for section in split_bytes(body, &delimiter) {
        // 終端マーカー `--boundary--` の後ろはエピローグ
        if section.starts_with(b"--") {
            break;
        }
        let section = strip_prefix_crlf(section);
        if section.is_empty() {
            continue;
        }

        let (headers, data) = match split_once_bytes(section, b"\r\n\r\n") {
            Some(parts) => parts,
            None => {
                warn!("Skipping multipart section without header/body separator");
                continue;
            }
        };
        let data = strip_suffix_crlf(data);

        let part = match parse_part_headers(headers) {
            Some(part) => part,
            None => {
                warn!("Skipping multipart section without a form-data name");
                continue;
            }
        };

        match part.filename {
            Some(filename) => {
                let upload = FileUpload {
                    name: part.name.clone(),
                    filename,
                    content_type: part.content_type,
                    data: data.to_vec(),
                };
                params.insert(part.name, ParamValue::File(upload));
            }
            None => {
                let value = String::from_utf8_lossy(data).into_owned();
                insert_scalar(&mut params, part.name, value);
            }
        }
    }

    params
}

/// パートヘッダーから抽出した属性
struct PartHeaders {
    name: String,
    filename: Option<String>,
    content_type: Option<String>,
}

/// マルチパート1区画のヘッダーブロックを解釈する
fn parse_part_headers(headers: &[u8]) -> Option<PartHeaders> {
    let text = String::from_utf8_lossy(headers);
    let mut name = None;
    let mut filename = None;
    let mut content_type = None;

    for line in text.split("\r\n") {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (header, value) = line.split_once(':')?;
        let value = value.trim();
        if header.eq_ignore_ascii_case("content-disposition") {
            for attr in value.split(';').skip(1) {
                let attr = attr.trim();
                if let Some(v) = attr.strip_prefix("name=") {
                    name = Some(v.trim_matches('"').to_string());
                } else if let Some(v) = attr.strip_prefix("filename=") {
                    filename = Some(v.trim_matches('"').to_string());
                }
            }
        } else if header.eq_ignore_ascii_case("content-type") {
            content_type = Some(value.to_string());
        }
    }

    name.map(|name| PartHeaders {
        name,
        filename,
        content_type,
    })
}

/// 値をマップへ組み入れる（繰り返しはスカラー→リストへ昇格）
fn insert_scalar(params: &mut Params, key: String, value: String) {
    match params.remove(&key) {
        None => {
            params.insert(key, ParamValue::Scalar(value));
        }
        Some(ParamValue::Scalar(previous)) => {
            params.insert(key, ParamValue::List(vec![previous, value]));
        }
        Some(ParamValue::List(mut values)) => {
            values.push(value);
            params.insert(key, ParamValue::List(values));
        }
        Some(existing @ ParamValue::File(_)) => {
            // ファイルとスカラーが同名で混在した場合はファイルを保持する
            warn!("Field '{}' mixes file and scalar values; keeping the file", key);
            params.insert(key, existing);
        }
    }
}

/// バイト列をneedleで分割する
fn split_bytes<'a>(haystack: &'a [u8], needle: &[u8]) -> Vec<&'a [u8]> {
    let mut sections = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i + needle.len() <= haystack.len() {
        if &haystack[i..i + needle.len()] == needle {
            sections.push(&haystack[start..i]);
            i += needle.len();
            start = i;
        } else {
            i += 1;
        }
    }
    sections.push(&haystack[start..]);
    sections
}

/// 最初のneedle出現位置で2分割する
fn split_once_bytes<'a>(haystack: &'a [u8], needle: &[u8]) -> Option<(&'a [u8], &'a [u8])> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    for i in 0..=haystack.len() - needle.len() {
        if &haystack[i..i + needle.len()] == needle {
            return Some((&haystack[..i], &haystack[i + needle.len()..]));
        }
    }
    None
}

fn strip_prefix_crlf(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(b"\r\n").unwrap_or(bytes)
}

fn strip_suffix_crlf(bytes: &[u8]) -> &[u8] {
    bytes.strip_suffix(b"\r\n").unwrap_or(bytes)
}
