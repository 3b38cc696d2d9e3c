//! ルーティング（パターンコンパイルとルート定義）

pub mod core;
pub mod pattern;

pub use self::core::{BoxedHandler, PathParams, Route};
pub use pattern::{ParamSpec, Segment};

#[cfg(test)]
mod tests;
