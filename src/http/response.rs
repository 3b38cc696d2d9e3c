//! HTTPレスポンスとレンダリング

use log::warn;
use serde::Serialize;

use crate::common::status;
use crate::error::Error;

/// ゲートウェイのレスポンス開始コールバック
///
/// ステータスライン（`"200 OK"` 形式）とヘッダーのペア列を受け取る。
/// クロージャをそのまま渡せるよう、FnMutに対するブランケット実装を持つ。
pub trait StartResponse {
    fn start_response(&mut self, status_line: &str, headers: &[(String, String)]);
}

impl<F> StartResponse for F
where
    F: FnMut(&str, &[(String, String)]),
{
    fn start_response(&mut self, status_line: &str, headers: &[(String, String)]) {
        self(status_line, headers)
    }
}

/// HTTPレスポンス
///
/// コンテンツのバイト列、挿入順を保持するヘッダー列、ステータスコードを
/// 持つ。文字列コンテンツはUTF-8バイト列として格納される。リクエスト
/// ごとに生成され、レンダリング後に破棄される。
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    content: Vec<u8>,
    headers: Vec<(String, String)>,
    status: u16,
}

impl Response {
    /// ステータス200のレスポンスを作成
    pub fn new(content: impl Into<Vec<u8>>) -> Self {
        Self {
            content: content.into(),
            headers: Vec::new(),
            status: 200,
        }
    }

    /// JSONボディを持つレスポンスを作成
    pub fn json<T: Serialize>(value: &T) -> Result<Self, Error> {
        let body = serde_json::to_vec(value)
            .map_err(|e| Error::Internal(format!("Failed to serialize response: {}", e)))?;
        Ok(Self::new(body).with_header("Content-Type", "application/json"))
    }

    /// ステータスコードを設定
    ///
    /// 既知のテーブルにないコードは拒否せず、500へ黙って読み替える。
    pub fn with_status(mut self, status: u16) -> Self {
        if status::is_known(status) {
            self.status = status;
        } else {
            warn!("Unknown status code {}, coercing to 500", status);
            self.status = 500;
        }
        self
    }

    /// ヘッダーを追加（元の大文字小文字のまま格納する）
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// コンテンツを差し替える
    pub fn with_content(mut self, content: impl Into<Vec<u8>>) -> Self {
        self.content = content.into();
        self
    }

    /// コンテンツ末尾へ追記する（デバッグ時のトレース付加に使用）
    pub fn append_content(&mut self, extra: &[u8]) {
        self.content.extend_from_slice(extra);
    }

    /// ステータスコード
    pub fn status(&self) -> u16 {
        self.status
    }

    /// `"<code> <reason phrase>"` 形式のステータスライン
    pub fn status_line(&self) -> String {
        status::status_line(self.status)
    }

    /// 格納済みヘッダー（Content-Typeのデフォルト適用前）
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// コンテンツのバイト列
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// レスポンスをレンダリングする
    ///
    /// レスポンス開始コールバックへステータスラインとヘッダー列を渡し、
    /// コンテンツを単一チャンクのボディとして返す。Content-Typeは
    /// （大文字小文字を無視して）未設定の場合のみ `text/html` を補う。
    pub fn render<S: StartResponse + ?Sized>(mut self, start: &mut S) -> Vec<u8> {
        self.ensure_content_type();
        let status_line = self.status_line();
        start.start_response(&status_line, &self.headers);
        self.content
    }

    fn ensure_content_type(&mut self) {
        let present = self
            .headers
            .iter()
            .any(|(key, _)| key.eq_ignore_ascii_case("content-type"));
        if !present {
            self.headers
                .push(("Content-Type".to_string(), "text/html".to_string()));
        }
    }
}

/// ハンドラー戻り値をレスポンスへ変換するトレイト
///
/// ハンドラーは組み立て済みのResponseか、生のテキストを返せる。テキストは
/// デフォルトの200レスポンスに包まれる。
pub trait ResponseWrapper {
    /// 自身をResponseに変換
    fn into_response(self) -> Result<Response, Error>;
}

impl ResponseWrapper for Response {
    fn into_response(self) -> Result<Response, Error> {
        Ok(self)
    }
}

impl ResponseWrapper for String {
    fn into_response(self) -> Result<Response, Error> {
        Ok(Response::new(self))
    }
}

impl ResponseWrapper for &str {
    fn into_response(self) -> Result<Response, Error> {
        Ok(Response::new(self))
    }
}

impl ResponseWrapper for Vec<u8> {
    fn into_response(self) -> Result<Response, Error> {
        Ok(Response::new(self))
    }
}

/// 301リダイレクトレスポンスを作成
pub fn redirect(location: impl Into<String>) -> Response {
    Response::new("")
        .with_status(301)
        .with_header("Location", location)
}

/// ステータスページ（`<h1>ステータスライン</h1>`）を作成
pub fn status_response(status: u16) -> Response {
    let response = Response::new("").with_status(status);
    let body = format!("<h1>{}</h1>", response.status_line());
    response.with_content(body)
}
