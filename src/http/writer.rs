use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::http::response::Body;
use crate::http::wire::WireResponse;

fn serialize_head(resp: &WireResponse) -> Vec<u8> {
    let mut buf = Vec::new();

    // Status line
    let status_line = format!(
        "{} {} {}\r\n",
        resp.version,
        resp.status.as_u16(),
        resp.status.reason_phrase()
    );
    buf.extend_from_slice(status_line.as_bytes());

    // Headers
    let mut has_length = false;
    for (k, v) in &resp.headers {
        has_length |= k.eq_ignore_ascii_case("Content-Length");
        buf.extend_from_slice(k.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(v.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }
    if !has_length {
        buf.extend_from_slice(format!("content-length: {}\r\n", resp.body.len()).as_bytes());
    }

    // Header/body separator
    buf.extend_from_slice(b"\r\n");

    buf
}

/// Writes one response to a stream.
///
/// The writer owns the response for the whole write, including any open file
/// handle, and drops it once the last byte has been handed to the stream.
pub struct ResponseWriter {
    head: Vec<u8>,
    body: Body,
}

impl ResponseWriter {
    pub fn new(response: WireResponse) -> Self {
        Self {
            head: serialize_head(&response),
            body: response.body,
        }
    }

    pub async fn write_to_stream<S>(self, stream: &mut S) -> anyhow::Result<()>
    where
        S: AsyncWrite + Unpin,
    {
        stream.write_all(&self.head).await?;

        match self.body {
            Body::Empty => {}
            Body::Bytes(bytes) => stream.write_all(&bytes).await?,
            Body::File { file, len } => {
                let file = tokio::fs::File::from_std(file);
                let copied = tokio::io::copy(&mut file.take(len), stream).await?;
                if copied != len {
                    anyhow::bail!("file ended after {copied} of {len} bytes");
                }
            }
        }

        stream.flush().await?;
        Ok(())
    }
}
