//! ゲートウェイ環境とリクエスト

use std::cell::{OnceCell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::io::{self, Read};

use log::warn;

use crate::common::{get_max_body_size, Method};
use crate::error::Error;

use super::params::{self, Params};

/// ゲートウェイがリクエストごとに供給する環境
///
/// リクエストメタデータのキーバリューと、1回しか読めない入力ストリームを
/// 保持する。メタデータは1リクエストの間は不変。
pub struct Environment {
    vars: HashMap<String, String>,
    input: RefCell<Box<dyn Read>>,
}

impl Environment {
    /// メタデータと入力ストリームから環境を構築
    pub fn new(vars: HashMap<String, String>, input: Box<dyn Read>) -> Self {
        Self {
            vars,
            input: RefCell::new(input),
        }
    }

    /// メタデータのみの空の環境（主にテストとビルダー用）
    pub fn empty() -> Self {
        Self::new(HashMap::new(), Box::new(io::empty()))
    }

    /// メタデータを1件追加
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    /// 入力ストリームを差し替える（CONTENT_LENGTHは呼び出し側が設定する）
    pub fn with_input(mut self, input: Box<dyn Read>) -> Self {
        self.input = RefCell::new(input);
        self
    }

    /// メタデータを取得
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// クエリ文字列（未設定なら空文字列）
    pub fn query_string(&self) -> &str {
        self.get("QUERY_STRING").unwrap_or("")
    }

    /// 入力ストリームから申告済みボディ長だけを読み取る
    ///
    /// ストリームは1回しか読めないため、呼び出しはRequestのメモ化経由に
    /// 限られる。
    fn read_input(&self, length: usize) -> Result<Vec<u8>, Error> {
        let mut buffer = Vec::with_capacity(length);
        let mut input = self.input.borrow_mut();
        input
            .by_ref()
            .take(length as u64)
            .read_to_end(&mut buffer)
            .map_err(|e| Error::InvalidRequestBody(format!("Failed to read request body: {}", e)))?;
        Ok(buffer)
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment").field("vars", &self.vars).finish()
    }
}

/// HTTPリクエスト
///
/// 構築時にメソッド（大文字化）とパス（末尾 `/` へ正準化）を導出し、
/// ボディとパラメータは初回アクセス時に一度だけ計算してキャッシュする。
/// ストリームは1回しか読めないため、再計算は決して行わない。
pub struct Request {
    environ: Environment,
    method: Method,
    path: String,
    body: OnceCell<Result<Vec<u8>, Error>>,
    params: OnceCell<Result<Params, Error>>,
}

impl Request {
    /// ゲートウェイ環境からリクエストを構築する
    pub fn from_environ(environ: Environment) -> Result<Self, Error> {
        let method: Method = environ
            .get("REQUEST_METHOD")
            .ok_or_else(|| Error::InvalidRequest("REQUEST_METHOD not set".to_string()))?
            .parse()?;

        // ルート登録側と同じトレーリングスラッシュ正準化をここで行う。
        // 両側が一致しないと `/foo` 登録に `/foo` リクエストが届かなくなる。
        let mut path = environ.get("PATH_INFO").unwrap_or("").to_string();
        if !path.ends_with('/') {
            path.push('/');
        }

        Ok(Self {
            environ,
            method,
            path,
            body: OnceCell::new(),
            params: OnceCell::new(),
        })
    }

    /// HTTPメソッド
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// 正準化済みのリクエストパス
    pub fn path(&self) -> &str {
        &self.path
    }

    /// クエリ文字列
    pub fn query_string(&self) -> &str {
        self.environ.query_string()
    }

    /// 元の環境への参照
    pub fn environ(&self) -> &Environment {
        &self.environ
    }

    /// 生のリクエストボディ（初回アクセス時に一度だけ読み取る）
    ///
    /// CONTENT_LENGTHが未設定または数値でない場合は長さ0として何も
    /// 読まない。申告長が上限を超える場合はPayloadTooLarge。
    pub fn body(&self) -> Result<&[u8], Error> {
        self.body
            .get_or_init(|| self.read_body())
            .as_deref()
            .map_err(Error::clone)
    }

    /// デコード済みパラメータ（初回アクセス時に一度だけ計算する）
    ///
    /// POST/PUTはボディ（フォームエンコードまたはマルチパート）、
    /// クエリ付きGETはクエリ文字列、それ以外は空マップ。
    pub fn params(&self) -> Result<&Params, Error> {
        self.params
            .get_or_init(|| self.decode_params())
            .as_ref()
            .map_err(Error::clone)
    }

    fn read_body(&self) -> Result<Vec<u8>, Error> {
        let content_length = self
            .environ
            .get("CONTENT_LENGTH")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(0);

        if content_length == 0 {
            return Ok(Vec::new());
        }

        let max_body_size = get_max_body_size();
        if content_length > max_body_size {
            return Err(Error::PayloadTooLarge(format!(
                "Request body size {} bytes exceeds maximum allowed size {} bytes",
                content_length, max_body_size
            )));
        }

        self.environ.read_input(content_length)
    }

    fn decode_params(&self) -> Result<Params, Error> {
        match self.method {
            Method::POST | Method::PUT => {
                let content_type = self.environ.get("CONTENT_TYPE").unwrap_or("").to_string();
                let body = self.body()?;
                if content_type.starts_with("multipart/form-data") {
                    match params::boundary_from_content_type(&content_type) {
                        Some(boundary) => Ok(params::parse_multipart(body, &boundary)),
                        None => {
                            warn!("multipart/form-data request without boundary parameter");
                            Ok(Params::new())
                        }
                    }
                } else {
                    Ok(params::parse_urlencoded(body))
                }
            }
            Method::GET if !self.query_string().is_empty() => {
                Ok(params::parse_query(self.query_string()))
            }
            _ => Ok(Params::new()),
        }
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("path", &self.path)
            .finish()
    }
}
