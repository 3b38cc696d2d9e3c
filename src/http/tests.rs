use std::cell::Cell;
use std::io::{self, Read};
use std::rc::Rc;

use super::*;
use crate::common::Method;
use crate::error::Error;

/// read呼び出し回数を数えるリーダー（ストリーム再読込の検出用）
struct CountingReader {
    data: io::Cursor<Vec<u8>>,
    reads: Rc<Cell<usize>>,
}

impl Read for CountingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reads.set(self.reads.get() + 1);
        self.data.read(buf)
    }
}

fn environ(vars: &[(&str, &str)], body: &[u8]) -> Environment {
    let mut env = Environment::empty().with_input(Box::new(io::Cursor::new(body.to_vec())));
    for (key, value) in vars {
        env = env.with_var(*key, *value);
    }
    env
}

#[test]
fn test_request_derives_method_and_path() {
    let request = Request::from_environ(environ(
        &[("REQUEST_METHOD", "get"), ("PATH_INFO", "/items")],
        b"",
    ))
    .unwrap();

    assert_eq!(request.method(), &Method::GET);
    // 末尾スラッシュが補われる
    assert_eq!(request.path(), "/items/");
}

#[test]
fn test_request_empty_path_becomes_root() {
    let request =
        Request::from_environ(environ(&[("REQUEST_METHOD", "GET")], b"")).unwrap();
    assert_eq!(request.path(), "/");
}

#[test]
fn test_request_without_method_is_invalid() {
    let result = Request::from_environ(environ(&[("PATH_INFO", "/")], b""));
    assert!(matches!(result, Err(Error::InvalidRequest(_))));
}

#[test]
fn test_body_respects_content_length() {
    let request = Request::from_environ(environ(
        &[
            ("REQUEST_METHOD", "POST"),
            ("PATH_INFO", "/"),
            ("CONTENT_LENGTH", "5"),
        ],
        b"hello world",
    ))
    .unwrap();

    // 申告長を超えては読まない
    assert_eq!(request.body().unwrap(), b"hello");
}

#[test]
fn test_body_missing_or_invalid_content_length_reads_nothing() {
    let request = Request::from_environ(environ(
        &[("REQUEST_METHOD", "POST"), ("PATH_INFO", "/")],
        b"hello",
    ))
    .unwrap();
    assert_eq!(request.body().unwrap(), b"");

    let request = Request::from_environ(environ(
        &[
            ("REQUEST_METHOD", "POST"),
            ("PATH_INFO", "/"),
            ("CONTENT_LENGTH", "abc"),
        ],
        b"hello",
    ))
    .unwrap();
    assert_eq!(request.body().unwrap(), b"");
}

#[test]
fn test_body_is_memoized_and_stream_read_once() {
    let reads = Rc::new(Cell::new(0));
    let reader = CountingReader {
        data: io::Cursor::new(b"hello".to_vec()),
        reads: Rc::clone(&reads),
    };
    let env = Environment::empty()
        .with_var("REQUEST_METHOD", "POST")
        .with_var("PATH_INFO", "/")
        .with_var("CONTENT_LENGTH", "5")
        .with_input(Box::new(reader));
    let request = Request::from_environ(env).unwrap();

    let first = request.body().unwrap().to_vec();
    let reads_after_first = reads.get();
    assert!(reads_after_first > 0);

    let second = request.body().unwrap().to_vec();
    assert_eq!(first, second);
    // 2回目のアクセスでストリームへは触れない
    assert_eq!(reads.get(), reads_after_first);
}

#[test]
fn test_params_are_memoized() {
    let request = Request::from_environ(environ(
        &[
            ("REQUEST_METHOD", "GET"),
            ("PATH_INFO", "/"),
            ("QUERY_STRING", "a=1"),
        ],
        b"",
    ))
    .unwrap();

    let first = request.params().unwrap().clone();
    let second = request.params().unwrap().clone();
    assert_eq!(first, second);
}

#[test]
fn test_body_too_large() {
    temp_env::with_var("TONBI_MAX_BODY_SIZE", Some("4"), || {
        let request = Request::from_environ(environ(
            &[
                ("REQUEST_METHOD", "POST"),
                ("PATH_INFO", "/"),
                ("CONTENT_LENGTH", "5"),
            ],
            b"hello",
        ))
        .unwrap();

        assert!(matches!(request.body(), Err(Error::PayloadTooLarge(_))));
        // エラーもメモ化され、2回目も同じ結果になる
        assert!(matches!(request.body(), Err(Error::PayloadTooLarge(_))));
    });
}

#[test]
fn test_get_query_params_scalar_and_list() {
    let request = Request::from_environ(environ(
        &[
            ("REQUEST_METHOD", "GET"),
            ("PATH_INFO", "/search"),
            ("QUERY_STRING", "q=rust%20lang&tag=a&tag=b"),
        ],
        b"",
    ))
    .unwrap();

    let params = request.params().unwrap();
    assert_eq!(
        params.get("q"),
        Some(&ParamValue::Scalar("rust lang".to_string()))
    );
    assert_eq!(
        params.get("tag"),
        Some(&ParamValue::List(vec!["a".to_string(), "b".to_string()]))
    );
}

#[test]
fn test_get_without_query_has_empty_params() {
    let request = Request::from_environ(environ(
        &[("REQUEST_METHOD", "GET"), ("PATH_INFO", "/")],
        b"",
    ))
    .unwrap();
    assert!(request.params().unwrap().is_empty());

    // GET/POST/PUT以外も空マップ
    let request = Request::from_environ(environ(
        &[
            ("REQUEST_METHOD", "DELETE"),
            ("PATH_INFO", "/"),
            ("QUERY_STRING", "a=1"),
        ],
        b"",
    ))
    .unwrap();
    assert!(request.params().unwrap().is_empty());
}

#[test]
fn test_post_urlencoded_params() {
    let body = b"name=Alice&tag=x&tag=y";
    let request = Request::from_environ(environ(
        &[
            ("REQUEST_METHOD", "POST"),
            ("PATH_INFO", "/"),
            ("CONTENT_TYPE", "application/x-www-form-urlencoded"),
            ("CONTENT_LENGTH", "22"),
        ],
        body,
    ))
    .unwrap();

    let params = request.params().unwrap();
    assert_eq!(
        params.get("name"),
        Some(&ParamValue::Scalar("Alice".to_string()))
    );
    assert_eq!(
        params.get("tag"),
        Some(&ParamValue::List(vec!["x".to_string(), "y".to_string()]))
    );
}

#[test]
fn test_put_body_params() {
    let body = b"status=done";
    let request = Request::from_environ(environ(
        &[
            ("REQUEST_METHOD", "PUT"),
            ("PATH_INFO", "/tasks/1"),
            ("CONTENT_LENGTH", "11"),
        ],
        body,
    ))
    .unwrap();

    let params = request.params().unwrap();
    assert_eq!(
        params.get("status"),
        Some(&ParamValue::Scalar("done".to_string()))
    );
}

#[test]
fn test_post_multipart_params() {
    let body = b"--XYZ\r\n\
Content-Disposition: form-data; name=\"title\"\r\n\
\r\n\
Hello\r\n\
--XYZ\r\n\
Content-Disposition: form-data; name=\"tag\"\r\n\
\r\n\
a\r\n\
--XYZ\r\n\
Content-Disposition: form-data; name=\"tag\"\r\n\
\r\n\
b\r\n\
--XYZ\r\n\
Content-Disposition: form-data; name=\"upload\"; filename=\"note.txt\"\r\n\
Content-Type: text/plain\r\n\
\r\n\
file content\r\n\
--XYZ--\r\n";

    let request = Request::from_environ(environ(
        &[
            ("REQUEST_METHOD", "POST"),
            ("PATH_INFO", "/"),
            ("CONTENT_TYPE", "multipart/form-data; boundary=XYZ"),
            ("CONTENT_LENGTH", &body.len().to_string()),
        ],
        body,
    ))
    .unwrap();

    let params = request.params().unwrap();
    assert_eq!(
        params.get("title"),
        Some(&ParamValue::Scalar("Hello".to_string()))
    );
    assert_eq!(
        params.get("tag"),
        Some(&ParamValue::List(vec!["a".to_string(), "b".to_string()]))
    );

    let upload = params.get("upload").and_then(ParamValue::as_file).unwrap();
    assert_eq!(upload.name, "upload");
    assert_eq!(upload.filename, "note.txt");
    assert_eq!(upload.content_type.as_deref(), Some("text/plain"));
    assert_eq!(upload.data, b"file content");
}

#[test]
fn test_multipart_without_boundary_yields_empty_params() {
    let request = Request::from_environ(environ(
        &[
            ("REQUEST_METHOD", "POST"),
            ("PATH_INFO", "/"),
            ("CONTENT_TYPE", "multipart/form-data"),
            ("CONTENT_LENGTH", "4"),
        ],
        b"data",
    ))
    .unwrap();

    assert!(request.params().unwrap().is_empty());
}

mod response_tests {
    use super::*;

    /// レスポンス開始コールバックの呼び出しを記録する
    fn render_recorded(response: Response) -> (String, Vec<(String, String)>, Vec<u8>) {
        let mut status_line = String::new();
        let mut headers = Vec::new();
        let body = response.render(&mut |line: &str, hs: &[(String, String)]| {
            status_line = line.to_string();
            headers = hs.to_vec();
        });
        (status_line, headers, body)
    }

    #[test]
    fn test_default_content_type() {
        let (status_line, headers, body) = render_recorded(Response::new("hi"));

        assert_eq!(status_line, "200 OK");
        assert_eq!(body, b"hi");
        assert!(headers.contains(&("Content-Type".to_string(), "text/html".to_string())));
    }

    #[test]
    fn test_content_type_check_is_case_insensitive() {
        let response = Response::new("{}").with_header("content-type", "application/json");
        let (_, headers, _) = render_recorded(response);

        let ct_headers: Vec<_> = headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("content-type"))
            .collect();
        // 既存のヘッダーを保持し、重複は追加しない
        assert_eq!(ct_headers.len(), 1);
        assert_eq!(ct_headers[0].1, "application/json");
    }

    #[test]
    fn test_unknown_status_coerces_to_500() {
        let response = Response::new("").with_status(999);
        assert_eq!(response.status(), 500);
        assert_eq!(response.status_line(), "500 Internal Server Error");
    }

    #[test]
    fn test_known_status_is_kept() {
        let response = Response::new("").with_status(204);
        assert_eq!(response.status(), 204);
        assert_eq!(response.status_line(), "204 No Content");
    }

    #[test]
    fn test_redirect() {
        let (status_line, headers, _) = render_recorded(redirect("/new/"));

        assert_eq!(status_line, "301 Moved Permanently");
        assert!(headers.contains(&("Location".to_string(), "/new/".to_string())));
    }

    #[test]
    fn test_status_response_body() {
        let response = status_response(404);
        assert_eq!(response.status(), 404);
        assert_eq!(response.content(), b"<h1>404 Not Found</h1>");
    }

    #[test]
    fn test_json_response() {
        let response = Response::json(&serde_json::json!({"ok": true})).unwrap();
        let (_, headers, body) = render_recorded(response);

        assert!(headers.contains(&("Content-Type".to_string(), "application/json".to_string())));
        assert_eq!(body, br#"{"ok":true}"#);
    }

    #[test]
    fn test_text_wraps_into_default_response() {
        let response = "plain text".into_response().unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.content(), b"plain text");
    }
}
