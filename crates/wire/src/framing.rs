// SPDX-License-Identifier: MIT

//! Newline-delimited JSON framing for the control socket (spec §4.2, §6).

use std::time::Duration;

use oa_core::EventRecord;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::time::timeout;

use crate::control::{Request, Response};

/// Errors from reading or writing a framed line.
#[derive(Debug, thiserror::Error)]
pub enum FramingError {
    #[error("connection closed")]
    ConnectionClosed,
    #[error("timed out waiting for a line")]
    Timeout,
    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// One line of a control-socket reply: either a progress `event` or the
/// `final` response that ends the exchange (see `control` module docs).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "frame", rename_all = "snake_case")]
pub enum ResponseFrame {
    Event(EventRecord),
    Final(Response),
}

/// Read one newline-delimited JSON request from `reader`, bounded by
/// `timeout_dur`.
pub async fn read_request<R>(reader: &mut BufReader<R>, timeout_dur: Duration) -> Result<Request, FramingError>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut line = String::new();
    let n = timeout(timeout_dur, reader.read_line(&mut line)).await.map_err(|_| FramingError::Timeout)??;
    if n == 0 {
        return Err(FramingError::ConnectionClosed);
    }
    Ok(serde_json::from_str(line.trim_end())?)
}

/// Write one newline-delimited JSON [`ResponseFrame`], bounded by
/// `timeout_dur`.
pub async fn write_response<W>(
    writer: &mut W,
    frame: &ResponseFrame,
    timeout_dur: Duration,
) -> Result<(), FramingError>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_string(frame)?;
    line.push('\n');
    timeout(timeout_dur, async {
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await
    })
    .await
    .map_err(|_| FramingError::Timeout)??;
    Ok(())
}

/// Client-side helper: write a request line.
pub async fn write_request<W>(writer: &mut W, request: &Request, timeout_dur: Duration) -> Result<(), FramingError>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_string(request)?;
    line.push('\n');
    timeout(timeout_dur, async {
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await
    })
    .await
    .map_err(|_| FramingError::Timeout)??;
    Ok(())
}

/// Client-side helper: read one frame (event or final) from a reply stream.
pub async fn read_response<R>(
    reader: &mut BufReader<R>,
    timeout_dur: Duration,
) -> Result<ResponseFrame, FramingError>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut line = String::new();
    let n = timeout(timeout_dur, reader.read_line(&mut line)).await.map_err(|_| FramingError::Timeout)??;
    if n == 0 {
        return Err(FramingError::ConnectionClosed);
    }
    Ok(serde_json::from_str(line.trim_end())?)
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;
    use tokio::io::BufReader as TokioBufReader;

    fn chat_request(message: String, correlation_id: Option<String>) -> Request {
        Request::Chat { message, correlation_id }
    }

    proptest! {
        /// Any `chat` message, however it's quoted or escaped, must survive a
        /// write/read round trip over the newline-delimited framing intact.
        #[test]
        fn chat_request_round_trips_for_arbitrary_message_text(
            message in ".{0,200}",
            correlation_id in proptest::option::of(".{0,40}"),
        ) {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            runtime.block_on(async {
                let (client, mut server) = tokio::io::duplex(8192);
                let mut client = TokioBufReader::new(client);
                let dur = Duration::from_secs(1);

                let req = chat_request(message.clone(), correlation_id.clone());
                write_request(&mut server, &req, dur).await.unwrap();
                drop(server);

                let got = read_request(&mut client, dur).await.unwrap();
                prop_assert_eq!(got, req);
                Ok(())
            })?;
        }

        /// A `ChatComplete` response frame survives the same round trip,
        /// including response text containing raw newlines (JSON-escaped).
        #[test]
        fn chat_complete_response_frame_round_trips(response in ".{0,200}") {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            runtime.block_on(async {
                let (mut client, server) = tokio::io::duplex(8192);
                let mut server = TokioBufReader::new(server);
                let dur = Duration::from_secs(1);

                let frame = ResponseFrame::Final(Response::ChatComplete { response: response.clone() });
                write_response(&mut client, &frame, dur).await.unwrap();
                drop(client);

                let got = read_response(&mut server, dur).await.unwrap();
                prop_assert!(matches!(got, ResponseFrame::Final(Response::ChatComplete { response: r }) if r == response));
                Ok(())
            })?;
        }
    }
}
