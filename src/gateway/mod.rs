//! ホスティングゲートウェイ
//!
//! コアに環境マッピングとレスポンス開始コールバックを供給する側。
//! CGI（環境変数 + 標準入出力）と、素朴な同期HTTPサーバーループの
//! 2種類を提供する。

pub mod cgi;
pub mod server;

pub use cgi::run_cgi;
pub use server::run;
