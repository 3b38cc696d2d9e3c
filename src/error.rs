//! エラー型の定義

use thiserror::Error;

/// アプリケーションのエラー型
///
/// 遅延評価したボディ/パラメータの結果を複数回返す必要があるためCloneを実装する。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// ルートパターンの構成エラー（登録時に致命的）
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// 不正なリクエスト（メソッド不明、リクエストラインの破損 等）
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// 無効なリクエストボディ
    #[error("Invalid request body: {0}")]
    InvalidRequestBody(String),

    /// リクエストボディが上限サイズを超過
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// ハンドラーが返したエラー
    #[error("Handler error: {0}")]
    Handler(String),

    /// 内部エラー（ゲートウェイのI/O失敗 等）
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl Error {
    /// エラーからHTTPステータスコードを取得
    ///
    /// ゲートウェイがディスパッチ前の失敗をレスポンスへ変換する際に使用する。
    /// ハンドラー実行中のエラーはここを通らず、常に500になる。
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Configuration(_) => 500,
            Error::InvalidRequest(_) => 400,
            Error::InvalidRequestBody(_) => 400,
            Error::PayloadTooLarge(_) => 413,
            Error::Handler(_) => 500,
            Error::Internal(_) => 500,
        }
    }
}
