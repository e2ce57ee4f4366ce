use std::io::{self, BufRead, Read, Write};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;
use twn_plugin::{PluginOptions, TwnPlugin};

#[derive(Deserialize)]
struct TransformRequest {
    code: String,
    id: String,
}

#[derive(Serialize)]
struct TransformResponse {
    ok: bool,
    /// Replacement source; absent when the module is unchanged.
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn handle(plugin: &mut TwnPlugin, input: &str) -> TransformResponse {
    match serde_json::from_str::<TransformRequest>(input) {
        Ok(req) => TransformResponse {
            ok: true,
            code: plugin.transform(&req.code, &req.id),
            error: None,
        },
        Err(e) => {
            tracing::warn!("Malformed transform request: {e}");
            TransformResponse {
                ok: false,
                code: None,
                error: Some(e.to_string()),
            }
        }
    }
}

fn write_response(out: &mut impl Write, resp: &TransformResponse) -> Result<()> {
    serde_json::to_writer(&mut *out, resp)?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}

/// `--options '{"entryPolicy":"firstWins"}'` overrides the defaults.
fn load_options(args: &[String]) -> Result<PluginOptions> {
    match args.iter().position(|a| a == "--options") {
        Some(i) => {
            let raw = args.get(i + 1).context("--options requires a JSON argument")?;
            serde_json::from_str(raw).context("Invalid --options JSON")
        }
        None => Ok(PluginOptions::default()),
    }
}

fn main() -> Result<()> {
    // stdout carries responses, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let daemon = args.iter().any(|a| a == "--daemon");
    let mut plugin = TwnPlugin::new(load_options(&args)?).context("Invalid cssEntryPattern")?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if daemon {
        // Daemon mode: one JSON request per line against one plugin instance,
        // so classes accumulate across the whole build. Exits at EOF.
        for line in io::stdin().lock().lines() {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    tracing::warn!("Stopped reading stdin: {e}");
                    break;
                }
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let resp = handle(&mut plugin, line);
            write_response(&mut out, &resp)?;
        }
    } else {
        // Single-shot mode: read all of stdin, transform once, write response.
        let mut input = String::new();
        io::stdin().read_to_string(&mut input)?;
        let resp = handle(&mut plugin, &input);
        write_response(&mut out, &resp)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_accumulates_across_requests() {
        let mut plugin = TwnPlugin::new(PluginOptions {
            touch: false,
            ..Default::default()
        })
        .unwrap();

        let css = r#"{"code": "@import \"tailwindcss\";", "id": "/src/index.css"}"#;
        let resp = handle(&mut plugin, css);
        assert!(resp.ok);
        assert!(resp.code.is_none());

        let tsx = r#"{"code": "import { twn } from 'tailwind-nested'; twn('p-4', { md: 'p-6' });", "id": "/src/App.tsx"}"#;
        assert!(handle(&mut plugin, tsx).code.is_none());

        let resp = handle(&mut plugin, css);
        assert_eq!(
            resp.code.as_deref(),
            Some("@source inline(\"md:p-6 p-4\");\n@import \"tailwindcss\";")
        );
    }

    #[test]
    fn test_handle_bad_request() {
        let mut plugin = TwnPlugin::default();
        let resp = handle(&mut plugin, "{\"id\": 3}");
        assert!(!resp.ok);
        assert!(resp.error.is_some());
        let json = serde_json::to_string(&resp).unwrap();
        assert!(!json.contains("\"code\""));

        let resp = handle(&mut plugin, r#"{"code": "a {}", "id": "/src/a.css"}"#);
        assert!(resp.ok);
        assert!(resp.error.is_none());
    }

    #[test]
    fn test_load_options() {
        let args = vec![
            "twn-bridge".to_string(),
            "--options".to_string(),
            r#"{"touch": false}"#.to_string(),
        ];
        assert!(!load_options(&args).unwrap().touch);
        assert!(load_options(&args[..1]).unwrap().touch);
        assert!(load_options(&args[..2]).is_err());
    }
}
