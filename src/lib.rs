//! tonbi: 汎用ゲートウェイインターフェース上に載る最小のHTTPルーティング
//! およびレスポンス構築レイヤー
//!
//! ゲートウェイから届いた環境マッピングをリクエストへ解釈し、メソッドと
//! パスパターンで登録済みハンドラーへ振り分け、ハンドラーの戻り値を
//! 整形済みHTTPレスポンスとしてレスポンス開始コールバックへ流す。
//! ミドルウェアチェーン・テンプレート・永続化・非同期I/Oは扱わない。
//!
//! ```no_run
//! use tonbi::{Request, Tonbi};
//! use tonbi::route::PathParams;
//! use tonbi::error::Error;
//!
//! fn show_user(_req: &Request, params: &PathParams) -> Result<String, Error> {
//!     Ok(format!("user {}", params["id"]))
//! }
//!
//! # fn main() -> Result<(), Error> {
//! let app = Tonbi::builder()
//!     .get("/users/<id:[0-9]+>/", show_user)?
//!     .build();
//! tonbi::gateway::server::run(app, "localhost", 8000)?;
//! # Ok(())
//! # }
//! ```

pub mod common;
pub mod error;
pub mod gateway;
pub mod http;
pub mod route;

pub use common::Method;
pub use error::Error;
pub use http::{
    redirect, status_response, Environment, FileUpload, ParamValue, Params, Request, Response,
    ResponseWrapper, StartResponse,
};
pub use route::{PathParams, Route};

use std::backtrace::Backtrace;
use std::panic::{self, AssertUnwindSafe};

use log::{debug, error, warn};

/// アプリケーションを構築するためのビルダー
///
/// ルートの登録は起動時に行い、serving開始後は変更しない。パターンの
/// コンパイルは登録時に走るため、壊れたパターンはここで致命的エラーに
/// なり `?` で起動を中断できる。
#[derive(Default)]
pub struct TonbiBuilder {
    debug: bool,
    routes: Vec<Route>,
}

impl TonbiBuilder {
    /// 新しいビルダーを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// デバッグフラグを設定
    ///
    /// 有効にすると、ハンドラー失敗時の500レスポンスにエラー内容と
    /// バックトレースが `<pre>` ブロックで追記される。
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// 任意のメソッドでルートを登録
    pub fn route<F, R>(mut self, pattern: &str, method: Method, handler: F) -> Result<Self, Error>
    where
        F: Fn(&Request, &PathParams) -> Result<R, Error> + Send + Sync + 'static,
        R: ResponseWrapper,
    {
        self.routes.push(Route::try_new(pattern, method, handler)?);
        Ok(self)
    }

    /// GETルートを登録
    pub fn get<F, R>(self, pattern: &str, handler: F) -> Result<Self, Error>
    where
        F: Fn(&Request, &PathParams) -> Result<R, Error> + Send + Sync + 'static,
        R: ResponseWrapper,
    {
        self.route(pattern, Method::GET, handler)
    }

    /// POSTルートを登録
    pub fn post<F, R>(self, pattern: &str, handler: F) -> Result<Self, Error>
    where
        F: Fn(&Request, &PathParams) -> Result<R, Error> + Send + Sync + 'static,
        R: ResponseWrapper,
    {
        self.route(pattern, Method::POST, handler)
    }

    /// PUTルートを登録
    pub fn put<F, R>(self, pattern: &str, handler: F) -> Result<Self, Error>
    where
        F: Fn(&Request, &PathParams) -> Result<R, Error> + Send + Sync + 'static,
        R: ResponseWrapper,
    {
        self.route(pattern, Method::PUT, handler)
    }

    /// DELETEルートを登録
    pub fn delete<F, R>(self, pattern: &str, handler: F) -> Result<Self, Error>
    where
        F: Fn(&Request, &PathParams) -> Result<R, Error> + Send + Sync + 'static,
        R: ResponseWrapper,
    {
        self.route(pattern, Method::DELETE, handler)
    }

    /// 構築済みルートをそのまま追加（一括構築用）
    pub fn mount(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    /// アプリケーションをビルドして返却
    pub fn build(self) -> Tonbi {
        Tonbi {
            debug: self.debug,
            routes: self.routes,
        }
    }
}

/// ルートマッチングの結果
enum RouteMatch<'a> {
    /// パターンとメソッドの両方が一致したルートと抽出済みパラメータ
    Found(&'a Route, PathParams),
    /// 一致なし（404）またはパスのみ一致（405）
    Fallback(u16),
}

/// リクエストを処理するアプリケーション
///
/// 登録順のルート列を所有する。ルート表はビルド後は追記されない前提で、
/// serving中は読み取り専用。ホスト側がスレッド並行でリクエストを
/// 処理する場合も、表を構築してから受け付けを開始すれば共有できる。
pub struct Tonbi {
    debug: bool,
    routes: Vec<Route>,
}

impl Tonbi {
    /// 新しいビルダーを作成
    pub fn builder() -> TonbiBuilder {
        TonbiBuilder::new()
    }

    /// 構築済みルートの列から一括でアプリケーションを作成
    pub fn from_routes(routes: Vec<Route>, debug: bool) -> Self {
        Self { debug, routes }
    }

    /// 登録済みルート（登録順）
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// ゲートウェイからの呼び出し口
    ///
    /// 環境からリクエストを構築してディスパッチし、レスポンスを
    /// レンダリングしてボディを返す。リクエストが組み立てられない場合も
    /// 例外は外へ出さず、対応するステータスページを返す。
    pub fn call<S: StartResponse + ?Sized>(&self, environ: Environment, start: &mut S) -> Vec<u8> {
        let request = match Request::from_environ(environ) {
            Ok(request) => request,
            Err(e) => {
                warn!("Failed to build request from environment: {}", e);
                return status_response(e.status_code()).render(start);
            }
        };
        self.dispatch(&request).render(start)
    }

    /// リクエストをルーティングしてレスポンスを生成する
    pub fn dispatch(&self, request: &Request) -> Response {
        match self.match_route(request.path(), request.method()) {
            RouteMatch::Found(route, params) => self.invoke(route, request, &params),
            RouteMatch::Fallback(code) => {
                debug!(
                    "No handler for {} {}: responding {}",
                    request.method(),
                    request.path(),
                    code
                );
                status_response(code)
            }
        }
    }

    /// ルート表から一致するルートを探す
    ///
    /// 登録順に走査し、最初にパターンが一致した時点で保留ステータスを
    /// 404から405へ引き上げる。パターンとメソッドの両方が一致した最初の
    /// ルートが即座に勝つ（登録順が唯一のタイブレーク）。
    fn match_route(&self, path: &str, method: &Method) -> RouteMatch<'_> {
        let mut status = 404;
        for route in &self.routes {
            if let Some(params) = route.captures(path) {
                status = 405;
                if route.method() == method {
                    return RouteMatch::Found(route, params);
                }
            }
        }
        RouteMatch::Fallback(status)
    }

    /// ハンドラーを実行し、失敗を500レスポンスへ変換する
    ///
    /// Errの返却もpanicもここで捕捉する。ディスパッチ境界の外へ
    /// エラーが漏れることはない。
    fn invoke(&self, route: &Route, request: &Request, params: &PathParams) -> Response {
        let result = panic::catch_unwind(AssertUnwindSafe(|| route.invoke(request, params)));
        match result {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                error!("Handler error at {} {}: {}", request.method(), request.path(), e);
                self.error_response(&e.to_string())
            }
            Err(payload) => {
                let message = panic_message(payload);
                error!(
                    "Handler panicked at {} {}: {}",
                    request.method(),
                    request.path(),
                    message
                );
                self.error_response(&message)
            }
        }
    }

    fn error_response(&self, detail: &str) -> Response {
        let mut response = status_response(500);
        if self.debug {
            let trace = format!("<pre>{}\n{}</pre>", detail, Backtrace::force_capture());
            response.append_content(trace.as_bytes());
        }
        response
    }
}

/// panicペイロードから表示可能なメッセージを取り出す
fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}
