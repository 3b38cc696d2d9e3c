//! ルート本体の定義

use std::collections::HashMap;

use log::{debug, info};
use regex::Regex;

use crate::common::Method;
use crate::error::Error;
use crate::http::{Request, Response, ResponseWrapper};

use super::pattern::{self, ParamSpec, Segment};

/// パスパターンから抽出された名前付きパラメータ
pub type PathParams = HashMap<String, String>;

/// 型消去済みのハンドラー関数
///
/// 登録時にユーザーのハンドラーを包み、戻り値（Responseまたはテキスト）を
/// Responseへ正規化した形で保持する。
pub type BoxedHandler = Box<dyn Fn(&Request, &PathParams) -> Result<Response, Error> + Send + Sync>;

/// 登録済みルート
///
/// 構築後は不変。コンパイル済みマッチャー、パラメータ記述子、逆引きURL
/// テンプレート、ハンドラー、対象メソッドを保持し、Applicationの生存期間
/// だけ生きる。
pub struct Route {
    method: Method,
    pattern: String,
    segments: Vec<Segment>,
    regex: Regex,
    params: Vec<ParamSpec>,
    url_template: String,
    handler: BoxedHandler,
}

impl Route {
    /// 新しいルートを構築する
    ///
    /// パターンは末尾 `/` へ正準化した上で一度だけ分解・コンパイルされる。
    /// プレースホルダーの正規表現が壊れている場合は登録時の構成エラー。
    pub fn try_new<F, R>(pattern: &str, method: Method, handler: F) -> Result<Self, Error>
    where
        F: Fn(&Request, &PathParams) -> Result<R, Error> + Send + Sync + 'static,
        R: ResponseWrapper,
    {
        let pattern = pattern::normalize_pattern(pattern);
        let segments = pattern::parse_segments(&pattern);
        let regex = pattern::compile(&segments)?;
        let params = pattern::param_specs(&segments)?;
        let url_template = pattern::url_template(&segments);

        info!("Registering route {} {}", method, pattern);

        Ok(Self {
            method,
            pattern,
            segments,
            regex,
            params,
            url_template,
            handler: Box::new(move |req, path_params| {
                handler(req, path_params).and_then(ResponseWrapper::into_response)
            }),
        })
    }

    /// このルートが処理するHTTPメソッド
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// 正準化済みのパターン文字列
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// プレースホルダーを `%s` に置き換えた逆引きURLテンプレート
    pub fn url_template(&self) -> &str {
        &self.url_template
    }

    /// プレースホルダーの {name, 個別正規表現} 記述子（登録順）
    pub fn param_specs(&self) -> &[ParamSpec] {
        &self.params
    }

    /// パスがパターンにマッチするか（メソッドは考慮しない）
    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// パスをマッチさせ、名前付きキャプチャを抽出する
    pub fn captures(&self, path: &str) -> Option<PathParams> {
        let caps = self.regex.captures(path)?;
        let mut params = PathParams::new();
        for spec in &self.params {
            if let Some(m) = caps.name(&spec.name) {
                params.insert(spec.name.clone(), m.as_str().to_string());
            }
        }
        debug!(
            "Path matching: {} against pattern {}: matched with {} params",
            path,
            self.pattern,
            params.len()
        );
        Some(params)
    }

    /// テンプレートのスロットへ値を埋めてURLを組み立てる
    pub fn build_url(&self, values: &[&str]) -> Result<String, Error> {
        let slots = self
            .segments
            .iter()
            .filter(|s| matches!(s, Segment::Placeholder { .. }))
            .count();
        if values.len() != slots {
            return Err(Error::Configuration(format!(
                "Route '{}' expects {} URL values, got {}",
                self.pattern,
                slots,
                values.len()
            )));
        }

        let mut url = String::new();
        let mut next = values.iter();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => url.push_str(text),
                Segment::Placeholder { .. } => {
                    // スロット数は上で検証済み
                    if let Some(value) = next.next() {
                        url.push_str(value);
                    }
                }
            }
        }
        Ok(url)
    }

    /// ハンドラーを呼び出す
    pub(crate) fn invoke(&self, req: &Request, params: &PathParams) -> Result<Response, Error> {
        (self.handler)(req, params)
    }
}
