use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use automation_bridge_core::protocol::McpServer;
use automation_bridge_core::runtime::{AutomationRuntime, Catalog, MemoryRuntime};
use automation_bridge_core::{Bridge, BridgeConfig};

/// Automation bridge MCP server.
///
/// Speaks line-delimited JSON-RPC on stdin/stdout. Logs go to stderr.
///
/// ENVIRONMENT VARIABLES:
///     AUTOMATION_BRIDGE_ALLOWLIST  Comma-separated identifiers allowed for creation
///     AUTOMATION_BRIDGE_CATALOG    Path of the runtime catalog
///     RUST_LOG                     Log filter (overrides --log-level)
#[derive(Debug, Parser)]
#[command(name = "automation-bridge")]
#[command(version)]
struct Args {
    /// Identifier allowed for creation (repeatable; none allows everything)
    #[arg(long = "allow", value_name = "ID", env = "AUTOMATION_BRIDGE_ALLOWLIST", value_delimiter = ',')]
    allow: Vec<String>,

    /// Runtime catalog (JSON); the bundled demo catalog when omitted
    #[arg(long, value_name = "PATH", env = "AUTOMATION_BRIDGE_CATALOG")]
    catalog: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    log_level: String,
}

impl Args {
    fn config(&self) -> BridgeConfig {
        BridgeConfig::default().with_allow_list(self.allow.iter().map(|id| id.trim().to_string()))
    }

    fn load_catalog(&self) -> Result<Catalog> {
        match &self.catalog {
            Some(path) => Catalog::from_file(path)
                .with_context(|| format!("failed to load catalog {}", path.display())),
            None => Catalog::demo().context("bundled demo catalog is invalid"),
        }
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|e| anyhow!(e))
}

/// Answer every input line until EOF
///
/// Lines are read as raw bytes so a frame that is not UTF-8 gets a parse
/// error instead of ending the loop. Only I/O failures end it early.
fn serve<R, I, O>(server: &mut McpServer<R>, mut input: I, mut output: O) -> Result<()>
where
    R: AutomationRuntime,
    I: BufRead,
    O: Write,
{
    let mut frame = Vec::new();
    loop {
        frame.clear();
        let read = input
            .read_until(b'\n', &mut frame)
            .context("failed to read from stdin")?;
        if read == 0 {
            return Ok(());
        }

        if let Some(reply) = server.handle_bytes(&frame) {
            writeln!(output, "{}", reply).context("failed to write to stdout")?;
            output.flush().context("failed to flush stdout")?;
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level).context("failed to initialize logging")?;

    let config = args.config();
    let runtime = MemoryRuntime::new(args.load_catalog()?);
    info!(
        allow_list = config.allow_list.len(),
        classes = runtime.catalog().classes.len(),
        "starting automation bridge"
    );

    let mut server = McpServer::new(Bridge::new(runtime, config));
    let served = serve(&mut server, io::stdin().lock(), io::stdout().lock());

    let report = server.shutdown();
    for (handle, error) in &report.failures {
        warn!(handle = %handle, error = %error, "object did not release cleanly");
    }
    info!(released = report.released, "automation bridge stopped");

    served
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_allow_list_is_comma_delimited() {
        let args = Args::try_parse_from(["automation-bridge", "--allow", "Calc.App, SAPI.SpVoice"]).unwrap();
        assert_eq!(
            args.config().allow_list,
            vec!["Calc.App".to_string(), "SAPI.SpVoice".to_string()]
        );
    }

    #[test]
    fn test_allow_is_repeatable() {
        let args =
            Args::try_parse_from(["automation-bridge", "--allow", "Calc.App", "--allow", "Calc.Document"]).unwrap();
        assert_eq!(args.allow.len(), 2);
    }

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["automation-bridge", "--log-level", "debug"]).unwrap();
        assert!(args.catalog.is_none());
        assert_eq!(args.log_level, "debug");
        assert!(args.load_catalog().is_ok());
    }

    #[test]
    fn test_missing_catalog_file_fails() {
        let args = Args::try_parse_from(["automation-bridge", "--catalog", "/nonexistent/catalog.json"]).unwrap();
        let err = args.load_catalog().unwrap_err();
        assert!(err.to_string().contains("failed to load catalog"));
    }

    #[test]
    fn test_serve_answers_requests_only() {
        let runtime = MemoryRuntime::demo().unwrap();
        let mut server = McpServer::new(Bridge::new(runtime.clone(), BridgeConfig::default()));
        let input = concat!(
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"CreateObject","arguments":{"identifier":"Calc.App"}}}"#,
            "\n",
            "not json\n",
        );
        let mut output = Vec::new();
        serve(&mut server, Cursor::new(input), &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].contains("-32700"));

        assert_eq!(runtime.live_references(), 1);
        assert_eq!(server.shutdown().released, 1);
        assert_eq!(runtime.live_references(), 0);
    }

    #[test]
    fn test_serve_survives_invalid_utf8() {
        let runtime = MemoryRuntime::demo().unwrap();
        let mut server = McpServer::new(Bridge::new(runtime.clone(), BridgeConfig::default()));
        server.handle_line(
            r#"{"jsonrpc":"2.0","id":0,"method":"tools/call","params":{"name":"CreateObject","arguments":{"identifier":"Calc.App"}}}"#,
        );

        let mut input = b"\xff\xfe garbage\n".to_vec();
        input.extend_from_slice(br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#);
        input.push(b'\n');
        let mut output = Vec::new();
        serve(&mut server, Cursor::new(input), &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("-32700"));
        assert_eq!(lines[1], r#"{"jsonrpc":"2.0","id":1,"result":{}}"#);
        assert_eq!(runtime.live_references(), 1);
    }

    #[test]
    fn test_serve_handles_last_line_without_newline() {
        let runtime = MemoryRuntime::demo().unwrap();
        let mut server = McpServer::new(Bridge::new(runtime, BridgeConfig::default()));
        let mut output = Vec::new();
        serve(&mut server, Cursor::new(r#"{"jsonrpc":"2.0","id":9,"method":"ping"}"#), &mut output).unwrap();
        assert_eq!(String::from_utf8(output).unwrap().lines().count(), 1);
    }
}
