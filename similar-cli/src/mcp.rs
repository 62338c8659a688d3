//! MCP server exposing `find_similar_images` over stdio, one JSON-RPC message per line

use camino::Utf8PathBuf;
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::utility::{SharedFinder, find_matches};

pub mod protocol;

use protocol::{INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR, Request, Response};

pub const TOOL_NAME: &str = "find_similar_images";
const PROTOCOL_VERSION: &str = "2024-11-05";

#[derive(Clone)]
pub struct McpServer {
    finder: SharedFinder,
    default_top_k: usize,
}

#[derive(Deserialize)]
struct FindSimilarImagesArgs {
    image_path: String,
    assets_directory: String,
    #[serde(default)]
    top_k: Option<usize>,
}

impl McpServer {
    pub fn new(finder: SharedFinder, default_top_k: usize) -> Self {
        Self { finder, default_top_k }
    }

    /// Reads requests from stdin until it closes. Each request runs on the blocking pool since a
    /// search may embed many images.
    pub async fn serve_stdio(self) -> anyhow::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut stdout = tokio::io::stdout();
        info!("McpServer: ready on stdio");

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let server = self.clone();
            let response = tokio::task::spawn_blocking(move || server.handle_line(&line)).await?;
            if let Some(response) = response {
                let mut out = serde_json::to_string(&response)?;
                out.push('\n');
                stdout.write_all(out.as_bytes()).await?;
                stdout.flush().await?;
            }
        }

        info!("McpServer: stdin closed, shutting down");
        Ok(())
    }

    /// Handles one raw message. Returns `None` when nothing should be written back.
    pub fn handle_line(&self, line: &str) -> Option<Response> {
        let message: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                warn!("McpServer: could not parse message: {e}");
                return Some(Response::error(None, PARSE_ERROR, format!("Parse error: {e}")));
            }
        };
        let id = message.get("id").cloned();
        let request: Request = match serde_json::from_value(message) {
            Ok(r) => r,
            Err(e) => {
                warn!("McpServer: message is not a valid request: {e}");
                return Some(Response::error(id, INVALID_REQUEST, format!("Invalid request: {e}")));
            }
        };

        if request.jsonrpc != "2.0" {
            return Some(Response::error(request.id.clone(), INVALID_REQUEST,
                format!("Invalid JSON-RPC version: expected 2.0, got {}", request.jsonrpc)));
        }

        self.dispatch(&request)
    }

    pub fn dispatch(&self, req: &Request) -> Option<Response> {
        debug!("McpServer: {} (id: {:?})", req.method, req.id);
        if req.is_notification() {
            // notifications/initialized and friends need no answer
            return None;
        }

        let response = match req.method.as_str() {
            "initialize" => handle_initialize(req),
            "ping" => Response::success(req.id.clone(), json!({})),
            "tools/list" => handle_list_tools(req),
            "tools/call" => self.handle_tool_call(req),
            _ => Response::error(req.id.clone(), METHOD_NOT_FOUND, format!("Method not found: {}", req.method)),
        };
        Some(response)
    }

    fn handle_tool_call(&self, req: &Request) -> Response {
        let name = req.params.get("name").and_then(Value::as_str).unwrap_or("");
        if name != TOOL_NAME {
            return Response::error(req.id.clone(), INVALID_PARAMS, format!("Unknown tool: {name}"));
        }

        let arguments = req.params.get("arguments").cloned().unwrap_or(Value::Object(Default::default()));
        let args: FindSimilarImagesArgs = match serde_json::from_value(arguments) {
            Ok(args) => args,
            Err(e) => return Response::error(req.id.clone(), INVALID_PARAMS,
                format!("Invalid arguments for {TOOL_NAME}: {e}")),
        };

        let image_path = Utf8PathBuf::from(args.image_path);
        let assets_directory = Utf8PathBuf::from(args.assets_directory);
        let top_k = args.top_k.unwrap_or(self.default_top_k);

        let matches = match find_matches(&self.finder, &image_path, &assets_directory, top_k) {
            Ok(matches) => matches,
            Err(e) => {
                warn!("McpServer: {TOOL_NAME} failed: {e}");
                return Response::error(req.id.clone(), INTERNAL_ERROR, e.to_string());
            }
        };

        match serde_json::to_value(&matches) {
            Ok(structured) => {
                let text = structured.to_string();
                Response::success(req.id.clone(), json!({
                    "content": [{ "type": "text", "text": text }],
                    "structuredContent": structured,
                }))
            },
            Err(e) => Response::error(req.id.clone(), INTERNAL_ERROR, e.to_string()),
        }
    }
}

fn handle_initialize(req: &Request) -> Response {
    Response::success(
        req.id.clone(),
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {}
            },
            "serverInfo": {
                "name": "similar",
                "version": env!("CARGO_PKG_VERSION")
            }
        }),
    )
}

fn handle_list_tools(req: &Request) -> Response {
    Response::success(
        req.id.clone(),
        json!({
            "tools": [
                {
                    "name": TOOL_NAME,
                    "description": "Find the images in a directory that look most like a query image. Returns matches ordered from most to least similar, each with its file name, path and cosine similarity.",
                    "inputSchema": {
                        "type": "object",
                        "properties": {
                            "image_path": {
                                "type": "string",
                                "description": "Path to the query image"
                            },
                            "assets_directory": {
                                "type": "string",
                                "description": "Directory searched recursively for png, jpg and jpeg files"
                            },
                            "top_k": {
                                "type": "integer",
                                "description": "Maximum number of matches to return (default: 3)",
                                "minimum": 0,
                                "default": 3
                            }
                        },
                        "required": ["image_path", "assets_directory"]
                    }
                }
            ]
        }),
    )
}
