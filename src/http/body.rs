//! Streaming HTTP body over a run's event channel.

use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use bytes::Bytes;
use http_body::Frame;
use tokio::sync::mpsc;

use crate::model::Event;

/// Trailer carrying the deployment exit code once the run finished.
pub static EXIT_CODE_TRAILER: HeaderName = HeaderName::from_static("exit-code");

/// Body that forwards event payloads as data frames while the run is live,
/// then closes with an `Exit-Code` trailer frame.
///
/// A stream that ends without having seen a terminal event ends without the
/// trailer; callers treat that as an execution failure. When an observer
/// stays attached across a coalesced follow-up run it sees two terminal
/// events; the trailer reports the last one.
pub struct EventBody {
    events: mpsc::Receiver<Event>,
    trailers: Option<HeaderMap>,
    finished: bool,
}

impl EventBody {
    pub fn new(events: mpsc::Receiver<Event>) -> Self {
        Self {
            events,
            trailers: None,
            finished: false,
        }
    }
}

impl http_body::Body for EventBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();

        loop {
            if this.finished {
                return Poll::Ready(None);
            }

            match this.events.poll_recv(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(event)) => {
                    if let Some(code) = event.exit_code {
                        let mut trailers = HeaderMap::new();
                        if let Ok(value) = HeaderValue::from_str(&code.to_string()) {
                            trailers.insert(EXIT_CODE_TRAILER.clone(), value);
                        }
                        this.trailers = Some(trailers);
                    }
                    // An empty data frame would terminate a chunked body
                    // early; events never carry one, but skip just in case.
                    if event.data.is_empty() {
                        continue;
                    }
                    return Poll::Ready(Some(Ok(Frame::data(event.data))));
                }
                Poll::Ready(None) => {
                    this.finished = true;
                    return match this.trailers.take() {
                        Some(trailers) => Poll::Ready(Some(Ok(Frame::trailers(trailers)))),
                        None => Poll::Ready(None),
                    };
                }
            }
        }
    }
}
