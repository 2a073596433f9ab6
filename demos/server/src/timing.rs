use std::time::{Duration, Instant};

use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};

pub const PROCESS_TIME_HEADER: &str = "x-process-time";

/// Adds `X-Process-Time` (seconds, millisecond precision) to every response.
pub async fn process_time(req: Request, next: Next) -> Response {
    let started = Instant::now();
    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&seconds(started.elapsed())) {
        response.headers_mut().insert(PROCESS_TIME_HEADER, value);
    }
    response
}

fn seconds(elapsed: Duration) -> String {
    format!("{:.3}", elapsed.as_secs_f64())
}
