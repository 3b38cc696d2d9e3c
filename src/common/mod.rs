//! 共通の型定義とユーティリティ

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

pub mod status;
pub mod utils;

pub use utils::{get_max_body_size, parse_query_pairs, percent_decode};

/// HTTPメソッド
///
/// ルート登録時の比較はenumの等値比較で行う。既知の7メソッド以外の動詞は
/// Otherとして保持し、ディスパッチ時には（どのルートのメソッドとも一致
/// し得ないため）404/405の通常フローに落ちる。
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Method {
    GET,
    POST,
    PUT,
    DELETE,
    PATCH,
    HEAD,
    OPTIONS,
    /// 上記以外の動詞（大文字化して保持）
    Other(String),
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::GET => write!(f, "GET"),
            Method::POST => write!(f, "POST"),
            Method::PUT => write!(f, "PUT"),
            Method::DELETE => write!(f, "DELETE"),
            Method::PATCH => write!(f, "PATCH"),
            Method::HEAD => write!(f, "HEAD"),
            Method::OPTIONS => write!(f, "OPTIONS"),
            Method::Other(name) => write!(f, "{}", name),
        }
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(method: &str) -> Result<Self, Self::Err> {
        let upper = method.trim().to_uppercase();
        if upper.is_empty() {
            return Err(Error::InvalidRequest("Empty HTTP method".to_string()));
        }
        let method = match upper.as_str() {
            "GET" => Method::GET,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "DELETE" => Method::DELETE,
            "PATCH" => Method::PATCH,
            "HEAD" => Method::HEAD,
            "OPTIONS" => Method::OPTIONS,
            _ => Method::Other(upper),
        };
        Ok(method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_from_str() {
        assert_eq!("GET".parse::<Method>(), Ok(Method::GET));
        assert_eq!("get".parse::<Method>(), Ok(Method::GET));
        assert_eq!("POST".parse::<Method>(), Ok(Method::POST));
        assert_eq!("delete".parse::<Method>(), Ok(Method::DELETE));
        assert_eq!(
            "BREW".parse::<Method>(),
            Ok(Method::Other("BREW".to_string()))
        );
        assert!("".parse::<Method>().is_err());
    }

    #[test]
    fn test_method_display() {
        assert_eq!(Method::GET.to_string(), "GET");
        assert_eq!(Method::Other("BREW".to_string()).to_string(), "BREW");
    }
}
