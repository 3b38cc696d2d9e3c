//! パスパターンの解析とコンパイル
//!
//! `/users/<id:[0-9]+>/` のような `<name:regex>` プレースホルダー付き
//! パターンを、名前付きキャプチャグループを持つ完全アンカー済み正規表現へ
//! 変換する。パターンの分解は Route 構築時に一度だけ行い、結果のセグメント
//! 列を Route が保持する。

use std::sync::OnceLock;

use regex::Regex;

use crate::error::Error;

/// プレースホルダー構文: `<name:pattern>`
/// name は識別子、pattern は `>` を含まない任意の正規表現
fn placeholder_syntax() -> &'static Regex {
    static SYNTAX: OnceLock<Regex> = OnceLock::new();
    SYNTAX.get_or_init(|| {
        Regex::new(r"<(?P<name>[a-zA-Z_][a-zA-Z_0-9]*):(?P<pattern>[^>]+)>")
            .expect("placeholder syntax regex is a valid constant")
    })
}

/// パターンを構成する1セグメント
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// リテラルテキスト（正規表現エスケープはしない）
    Literal(String),
    /// 名前付きプレースホルダー
    Placeholder { name: String, pattern: String },
}

/// 名前と個別コンパイル済み正規表現のペア
#[derive(Debug)]
pub struct ParamSpec {
    pub name: String,
    pub regex: Regex,
}

/// パターン末尾に `/` を補う（トレーリングスラッシュの正準化）
///
/// 登録側・リクエスト側の両方がこの正準化を通ることで一致が保証される。
pub fn normalize_pattern(pattern: &str) -> String {
    if pattern.ends_with('/') {
        pattern.to_string()
    } else {
        format!("{}/", pattern)
    }
}

/// パターンをリテラル/プレースホルダーのセグメント列に分解する
///
/// プレースホルダーを含まないパターンは単一のリテラルセグメントになる。
pub fn parse_segments(pattern: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut end = 0;

    for caps in placeholder_syntax().captures_iter(pattern) {
        let whole = caps.get(0).expect("capture group 0 always exists");
        if whole.start() > end {
            segments.push(Segment::Literal(pattern[end..whole.start()].to_string()));
        }
        segments.push(Segment::Placeholder {
            name: caps["name"].to_string(),
            pattern: caps["pattern"].to_string(),
        });
        end = whole.end();
    }

    if end < pattern.len() {
        segments.push(Segment::Literal(pattern[end..].to_string()));
    }

    segments
}

/// セグメント列から完全アンカー済みのマッチング正規表現を構築する
///
/// 各プレースホルダーは `(?P<name>pattern)` の名前付きキャプチャになる。
/// 埋め込み正規表現の破損や重複した名前はここでコンパイルエラーとなり、
/// 登録時の構成エラーとして呼び出し側へ返る。
pub fn compile(segments: &[Segment]) -> Result<Regex, Error> {
    let mut source = String::from("^");
    for segment in segments {
        match segment {
            Segment::Literal(text) => source.push_str(text),
            Segment::Placeholder { name, pattern } => {
                source.push_str(&format!("(?P<{}>{})", name, pattern));
            }
        }
    }
    source.push('$');

    Regex::new(&source)
        .map_err(|e| Error::Configuration(format!("Invalid route pattern '{}': {}", source, e)))
}

/// プレースホルダーごとの {name, 個別コンパイル済み正規表現} 記述子を構築
pub fn param_specs(segments: &[Segment]) -> Result<Vec<ParamSpec>, Error> {
    let mut specs = Vec::new();
    for segment in segments {
        if let Segment::Placeholder { name, pattern } = segment {
            let regex = Regex::new(pattern).map_err(|e| {
                Error::Configuration(format!(
                    "Invalid placeholder pattern '{}' for '{}': {}",
                    pattern, name, e
                ))
            })?;
            specs.push(ParamSpec {
                name: name.clone(),
                regex,
            });
        }
    }
    Ok(specs)
}

/// プレースホルダーを `%s` スロットに置き換えた逆引きURLテンプレートを構築
pub fn url_template(segments: &[Segment]) -> String {
    let mut url = String::new();
    for segment in segments {
        match segment {
            Segment::Literal(text) => url.push_str(text),
            Segment::Placeholder { .. } => url.push_str("%s"),
        }
    }
    url
}
