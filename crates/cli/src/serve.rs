use anyhow::{bail, Result};
use chunk_engine::{Engine, EngineWorker};
use chunk_protocol::{serialize_json, ProtocolError, Request, Response};
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

/// JSON-lines transport: one request per stdin line, responses on stdout.
///
/// Requests are handled one at a time; the next line is read only after the
/// previous request's terminal response has been written.
pub async fn run_serve(engine: Engine, emit_progress: bool) -> Result<()> {
    let (worker, mut responses) = EngineWorker::start(engine);
    let mut stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let mut buf = Vec::new();
    let mut handled = 0usize;

    loop {
        buf.clear();
        if stdin.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }

        // A bad line gets its own error response; the session goes on
        let line = match std::str::from_utf8(&buf) {
            Ok(line) => line.trim(),
            Err(err) => {
                log::warn!("Rejected request: not UTF-8 ({err})");
                let err = ProtocolError::MalformedRequest(format!("request is not UTF-8: {err}"));
                write_line(&mut stdout, &Response::from(err)).await?;
                continue;
            }
        };
        if line.is_empty() {
            continue;
        }

        let request = match Request::parse(line) {
            Ok(request) => request,
            Err(err) => {
                log::warn!("Rejected request: {err}");
                write_line(&mut stdout, &Response::from(err)).await?;
                continue;
            }
        };

        worker.send(request).await?;
        loop {
            let Some(response) = responses.next().await else {
                bail!("engine worker stopped unexpectedly");
            };
            let terminal = response.is_terminal();
            if terminal || emit_progress {
                write_line(&mut stdout, &response).await?;
            }
            if terminal {
                break;
            }
        }
        handled += 1;
    }

    log::info!("stdin closed after {handled} request(s)");
    Ok(())
}

async fn write_line<W: AsyncWrite + Unpin>(out: &mut W, response: &Response) -> Result<()> {
    let mut raw = serialize_json(response)?;
    raw.push('\n');
    out.write_all(raw.as_bytes()).await?;
    out.flush().await?;
    Ok(())
}
