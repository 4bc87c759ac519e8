// Trailer-aware HTTP client for streaming responses.
//
// reqwest does not expose HTTP/1.1 trailers, so streaming cases talk raw
// hyper and read the response frame by frame.

use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;

pub struct StreamedResponse {
    pub status: u16,
    pub body: String,
    pub exit_code: Option<String>,
}

/// Issues one GET and drains the response, capturing data frames and the
/// `Exit-Code` trailer if the server sent one.
pub async fn get_streaming(addr: &str, path: &str, token: Option<&str>) -> StreamedResponse {
    let stream = TcpStream::connect(addr)
        .await
        .expect("failed to connect to test server");
    let io = TokioIo::new(stream);
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io)
        .await
        .expect("http handshake failed");
    tokio::spawn(async move {
        let _ = conn.await;
    });

    let mut builder = hyper::Request::builder()
        .uri(path)
        .header(hyper::header::HOST, addr)
        // hyper's HTTP/1.1 server only forwards trailer frames when the
        // client advertises willingness to receive them.
        .header(hyper::header::TE, "trailers");
    if let Some(token) = token {
        builder = builder.header(hyper::header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = builder.body(Empty::<Bytes>::new()).expect("bad request");

    let mut response = sender.send_request(request).await.expect("request failed");
    let status = response.status().as_u16();

    let mut body = Vec::new();
    let mut exit_code = None;

    while let Some(frame) = response.frame().await {
        let frame = frame.expect("frame error");
        match frame.into_data() {
            Ok(data) => body.extend_from_slice(&data),
            Err(frame) => {
                if let Ok(trailers) = frame.into_trailers() {
                    exit_code = trailers
                        .get("exit-code")
                        .and_then(|v| v.to_str().ok())
                        .map(String::from);
                }
            }
        }
    }

    StreamedResponse {
        status,
        body: String::from_utf8_lossy(&body).to_string(),
        exit_code,
    }
}
