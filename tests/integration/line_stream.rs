//! Line streams over real HTTP responses

use shopify_bulk::error::StreamError;
use shopify_bulk::stream::{
    collect_lines, open_lines, Delimiter, HttpByteSource, LineOptions, RetrievalPolicy,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn serve(server: &MockServer, route: &str, response: ResponseTemplate) -> String {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
    format!("{}{}", server.uri(), route)
}

async fn lines_of(
    url: &str,
    options: &LineOptions,
    policy: RetrievalPolicy,
) -> Result<Vec<String>, StreamError> {
    let source = HttpByteSource::default();
    let lines = open_lines(&source, url, options, policy).await?;
    collect_lines(lines).await
}

#[tokio::test]
async fn test_lines_without_trailing_empty_line() {
    let server = MockServer::start().await;
    let url = serve(
        &server,
        "/result.jsonl",
        ResponseTemplate::new(200).set_body_string("a\nb\nc"),
    )
    .await;

    let options = LineOptions {
        include_last_empty_line: false,
        ..LineOptions::default()
    };
    let lines = lines_of(&url, &options, RetrievalPolicy::Propagate).await.unwrap();
    assert_eq!(lines, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_trailing_delimiter_yields_final_empty_line() {
    let server = MockServer::start().await;
    let url = serve(
        &server,
        "/result.jsonl",
        ResponseTemplate::new(200).set_body_string("{\"id\":1}\r\n{\"id\":2}\n"),
    )
    .await;

    let lines = lines_of(&url, &LineOptions::default(), RetrievalPolicy::Propagate)
        .await
        .unwrap();
    assert_eq!(lines, vec!["{\"id\":1}", "{\"id\":2}", ""]);
}

#[tokio::test]
async fn test_missing_file_depends_on_policy() {
    let server = MockServer::start().await;
    let url = serve(&server, "/gone.jsonl", ResponseTemplate::new(404)).await;

    let strict = lines_of(&url, &LineOptions::default(), RetrievalPolicy::Propagate).await;
    assert!(matches!(strict, Err(StreamError::Transport(ref m)) if m.contains("404")));

    let soft = lines_of(&url, &LineOptions::default(), RetrievalPolicy::SoftFail)
        .await
        .unwrap();
    assert!(soft.is_empty());
}

#[tokio::test]
async fn test_no_content_is_transport_error() {
    let server = MockServer::start().await;
    let url = serve(&server, "/empty.jsonl", ResponseTemplate::new(204)).await;

    let result = lines_of(&url, &LineOptions::default(), RetrievalPolicy::Propagate).await;
    assert!(matches!(result, Err(StreamError::Transport(_))));
}

#[tokio::test]
async fn test_literal_delimiter_with_latin1_body() {
    let server = MockServer::start().await;
    // "café||naïve" in ISO-8859-1
    let body = vec![b'c', b'a', b'f', 0xE9, b'|', b'|', b'n', b'a', 0xEF, b'v', b'e'];
    let url = serve(&server, "/latin1.txt", ResponseTemplate::new(200).set_body_bytes(body)).await;

    let options = LineOptions {
        include_last_empty_line: true,
        encoding: "iso-8859-1".to_string(),
        delimiter: Delimiter::literal("||"),
    };
    let lines = lines_of(&url, &options, RetrievalPolicy::Propagate).await.unwrap();
    assert_eq!(lines, vec!["café", "naïve"]);
}

#[tokio::test]
async fn test_unsupported_encoding_fails_before_request() {
    let server = MockServer::start().await;
    let url = serve(
        &server,
        "/result.jsonl",
        ResponseTemplate::new(200).set_body_string("a"),
    )
    .await;

    let options = LineOptions {
        encoding: "klingon".to_string(),
        ..LineOptions::default()
    };
    let result = lines_of(&url, &options, RetrievalPolicy::SoftFail).await;
    assert!(matches!(result, Err(StreamError::UnsupportedEncoding(_))));
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}
