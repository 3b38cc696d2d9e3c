use super::*;
use crate::common::Method;
use crate::error::Error;
use crate::http::{Request, Response};
use crate::route::core::PathParams;

fn dummy_handler(_req: &Request, _params: &PathParams) -> Result<&'static str, Error> {
    Ok("ok")
}

#[test]
fn test_placeholder_route_matches_and_extracts() {
    let route = Route::try_new("/users/<id:[0-9]+>/", Method::GET, dummy_handler).unwrap();

    let params = route.captures("/users/42/").expect("should match");
    assert_eq!(params.get("id"), Some(&"42".to_string()));

    assert!(route.captures("/users/abc/").is_none());
    // 完全アンカーなので前後の余剰は不一致
    assert!(route.captures("/users/42/extra/").is_none());
    assert!(route.captures("/prefix/users/42/").is_none());
}

#[test]
fn test_literal_route_is_anchored() {
    let route = Route::try_new("/about/", Method::GET, dummy_handler).unwrap();

    assert!(route.matches("/about/"));
    assert!(!route.matches("/about/team/"));
    assert!(!route.matches("/abou/"));
}

#[test]
fn test_pattern_trailing_slash_is_appended() {
    let route = Route::try_new("/foo", Method::GET, dummy_handler).unwrap();

    assert_eq!(route.pattern(), "/foo/");
    assert!(route.matches("/foo/"));
}

#[test]
fn test_multiple_placeholders() {
    let route = Route::try_new(
        "/posts/<year:[0-9]{4}>/<slug:[a-z-]+>/",
        Method::GET,
        dummy_handler,
    )
    .unwrap();

    let params = route.captures("/posts/2024/hello-world/").expect("should match");
    assert_eq!(params.get("year"), Some(&"2024".to_string()));
    assert_eq!(params.get("slug"), Some(&"hello-world".to_string()));

    let names: Vec<&str> = route.param_specs().iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["year", "slug"]);
    assert!(route.param_specs()[0].regex.is_match("1999"));
}

#[test]
fn test_url_template_and_build_url() {
    let route = Route::try_new("/users/<id:[0-9]+>/posts/<n:[0-9]+>/", Method::GET, dummy_handler)
        .unwrap();

    assert_eq!(route.url_template(), "/users/%s/posts/%s/");
    assert_eq!(route.build_url(&["7", "3"]).unwrap(), "/users/7/posts/3/");

    // スロット数が合わない場合は構成エラー
    assert!(matches!(
        route.build_url(&["7"]),
        Err(Error::Configuration(_))
    ));
}

#[test]
fn test_literal_route_url_template() {
    let route = Route::try_new("/about/", Method::GET, dummy_handler).unwrap();

    assert_eq!(route.url_template(), "/about/");
    assert_eq!(route.build_url(&[]).unwrap(), "/about/");
}

#[test]
fn test_malformed_placeholder_regex_is_fatal() {
    let result = Route::try_new("/users/<id:[0-9+>/", Method::GET, dummy_handler);
    assert!(matches!(result, Err(Error::Configuration(_))));
}

#[test]
fn test_duplicate_placeholder_names_are_fatal() {
    let result = Route::try_new("/a/<x:[0-9]+>/b/<x:[0-9]+>/", Method::GET, dummy_handler);
    assert!(matches!(result, Err(Error::Configuration(_))));
}

#[test]
fn test_handler_text_is_wrapped_into_response() {
    let route = Route::try_new("/hello/", Method::GET, |_req: &Request, _p: &PathParams| {
        Ok("hello".to_string())
    })
    .unwrap();

    let environ = crate::http::Environment::empty()
        .with_var("REQUEST_METHOD", "GET")
        .with_var("PATH_INFO", "/hello/");
    let request = Request::from_environ(environ).unwrap();
    let params = route.captures("/hello/").unwrap();

    let response = route.invoke(&request, &params).unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.content(), b"hello");
}

#[test]
fn test_handler_response_passes_through() {
    let route = Route::try_new("/gone/", Method::GET, |_req: &Request, _p: &PathParams| {
        Ok(Response::new("gone").with_status(410))
    })
    .unwrap();

    let environ = crate::http::Environment::empty()
        .with_var("REQUEST_METHOD", "GET")
        .with_var("PATH_INFO", "/gone/");
    let request = Request::from_environ(environ).unwrap();
    let params = route.captures("/gone/").unwrap();

    let response = route.invoke(&request, &params).unwrap();
    assert_eq!(response.status(), 410);
}

mod pattern_tests {
    use super::super::pattern::*;

    #[test]
    fn test_parse_segments() {
        let segments = parse_segments("/users/<id:[0-9]+>/");

        assert_eq!(
            segments,
            vec![
                Segment::Literal("/users/".to_string()),
                Segment::Placeholder {
                    name: "id".to_string(),
                    pattern: "[0-9]+".to_string(),
                },
                Segment::Literal("/".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_segments_pure_literal() {
        let segments = parse_segments("/about/");
        assert_eq!(segments, vec![Segment::Literal("/about/".to_string())]);
    }

    #[test]
    fn test_invalid_name_is_treated_as_literal() {
        // 識別子にならない名前はプレースホルダー構文にマッチしない
        let segments = parse_segments("/a/<1x:[0-9]+>/");
        assert_eq!(segments.len(), 1);
        assert!(matches!(segments[0], Segment::Literal(_)));
    }

    #[test]
    fn test_normalize_pattern() {
        assert_eq!(normalize_pattern("/foo"), "/foo/");
        assert_eq!(normalize_pattern("/foo/"), "/foo/");
        assert_eq!(normalize_pattern(""), "/");
    }
}
