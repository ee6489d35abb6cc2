//! Line-delimited JSON-RPC over stdin/stdout
//!
//! Each inbound line is handled in its own task so a tool call waiting on a sampling
//! reply does not stop the reader from picking that reply up.

use std::sync::Arc;

use serde_json::Value;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader},
    sync::broadcast::error::RecvError,
    task::JoinSet,
};
use tracing::{error, info, trace, warn};

use crate::mcp::{
    rpc::{json_rpc_error, PARSE_ERROR},
    server::McpServer,
};
use crate::Services;

pub async fn run(services: Services) -> std::io::Result<()> {
    info!("MCP server starting, waiting for requests on stdin");
    let server = Arc::new(McpServer::new(services));
    serve(server, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;
    info!("MCP server shutting down (stdin closed)");
    Ok(())
}

pub async fn serve<R, W>(server: Arc<McpServer>, reader: R, mut writer: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut outbound = server.peer().subscribe();
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                trace!(message = %line, "received");

                match serde_json::from_str::<Value>(line) {
                    Ok(payload) => {
                        let server = server.clone();
                        in_flight.spawn(async move { server.handle_payload(payload).await });
                    }
                    Err(err) => {
                        warn!(error = %err, "unparseable message on stdin");
                        write_message(&mut writer, &json_rpc_error(None, PARSE_ERROR, "Parse error")).await?;
                    }
                }
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                write_outcome(&mut writer, joined).await?;
            }
            message = outbound.recv() => match message {
                Ok(message) => write_message(&mut writer, &message).await?,
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "outbound messages dropped"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    server.peer().cancel_pending();
    while let Some(joined) = in_flight.join_next().await {
        write_outcome(&mut writer, joined).await?;
    }
    writer.flush().await
}

async fn write_outcome<W: AsyncWrite + Unpin>(
    writer: &mut W,
    joined: Result<Option<Value>, tokio::task::JoinError>,
) -> std::io::Result<()> {
    match joined {
        Ok(Some(response)) => write_message(writer, &response).await,
        Ok(None) => Ok(()),
        Err(err) => {
            error!(error = %err, "request task failed");
            Ok(())
        }
    }
}

async fn write_message<W: AsyncWrite + Unpin>(writer: &mut W, message: &Value) -> std::io::Result<()> {
    let mut line = serde_json::to_vec(message).map_err(std::io::Error::other)?;
    line.push(b'\n');
    trace!(bytes = line.len(), "sending");
    writer.write_all(&line).await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Arc};

    use serde_json::Value;
    use tokio::io::BufReader;

    use super::serve;
    use crate::{
        mcp::server::McpServer,
        test_support::{services, MockPlatform},
    };

    async fn run_lines(input: &str) -> HashMap<String, Value> {
        let server = Arc::new(McpServer::new(services(Arc::new(MockPlatform::default()))));
        let mut output = Vec::new();
        serve(server, BufReader::new(input.as_bytes()), &mut output)
            .await
            .expect("stdio loop");

        String::from_utf8(output)
            .expect("utf8 output")
            .lines()
            .map(|line| serde_json::from_str::<Value>(line).expect("json line"))
            .map(|message| (message["id"].to_string(), message))
            .collect()
    }

    #[tokio::test]
    async fn answers_initialize_and_tools_list() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2025-06-18","capabilities":{},"clientInfo":{"name":"cli","version":"0"}}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
            "\n",
        );

        let responses = run_lines(input).await;

        assert_eq!(responses.len(), 2);
        assert_eq!(responses["1"]["result"]["protocolVersion"], "2025-06-18");
        let tools = responses["2"]["result"]["tools"].as_array().expect("tools");
        assert_eq!(tools.len(), 2);
    }

    #[tokio::test]
    async fn malformed_line_yields_parse_error() {
        let responses = run_lines("{not json\n").await;

        assert_eq!(responses["null"]["error"]["code"], -32700);
    }
}
