use std::future::Future;
use std::sync::Mutex;
use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

use tokio::sync::mpsc;

use crate::http_client::{HttpClient, HttpError, HttpFuture, HttpRequest, HttpResponse};

/// Transport double that records every request and replays one canned outcome.
#[derive(Debug)]
pub(crate) struct RecordingHttpClient {
    response: Result<HttpResponse, HttpError>,
    fragments: Vec<String>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl RecordingHttpClient {
    pub(crate) fn responding(response: HttpResponse) -> Self {
        Self {
            response: Ok(response),
            fragments: Vec::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing(message: &str) -> Self {
        Self {
            response: Err(HttpError::new(message)),
            fragments: Vec::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Streams `fragments` with a 200 status.
    pub(crate) fn streaming(fragments: &[&str]) -> Self {
        Self {
            response: Ok(HttpResponse::ok_json("")),
            fragments: fragments.iter().map(|f| (*f).to_owned()).collect(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn recorded_requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .expect("request store should not be poisoned")
            .clone()
    }

    pub(crate) fn request_count(&self) -> usize {
        self.recorded_requests().len()
    }

    fn record(&self, request: HttpRequest) {
        self.requests
            .lock()
            .expect("request store should not be poisoned")
            .push(request);
    }
}

impl HttpClient for RecordingHttpClient {
    fn execute<'a>(&'a self, request: HttpRequest) -> HttpFuture<'a> {
        self.record(request);
        let response = self.response.clone();
        Box::pin(async move { response })
    }

    fn execute_stream<'a>(
        &'a self,
        request: HttpRequest,
        sink: mpsc::Sender<String>,
    ) -> HttpFuture<'a> {
        self.record(request);
        Box::pin(async move {
            let response = self.response.clone()?;
            if !response.is_success() {
                return Ok(response);
            }
            for fragment in &self.fragments {
                if sink.send(fragment.clone()).await.is_err() {
                    break;
                }
            }
            Ok(HttpResponse::with_status(response.status, String::new()))
        })
    }
}

pub(crate) fn block_on<F>(future: F) -> F::Output
where
    F: Future,
{
    let waker = noop_waker();
    let mut context = Context::from_waker(&waker);
    let mut future = std::pin::pin!(future);

    loop {
        match future.as_mut().poll(&mut context) {
            Poll::Ready(output) => return output,
            Poll::Pending => std::thread::yield_now(),
        }
    }
}

fn noop_waker() -> Waker {
    // SAFETY: The vtable functions never dereference the data pointer and are no-op operations.
    unsafe { Waker::from_raw(noop_raw_waker()) }
}

fn noop_raw_waker() -> RawWaker {
    RawWaker::new(std::ptr::null(), &NOOP_WAKER_VTABLE)
}

unsafe fn noop_clone(_: *const ()) -> RawWaker {
    noop_raw_waker()
}

unsafe fn noop(_: *const ()) {}

static NOOP_WAKER_VTABLE: RawWakerVTable = RawWakerVTable::new(noop_clone, noop, noop, noop);
