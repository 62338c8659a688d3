//! Single route HTTP shim: `POST /findSimilarAssets`

use std::io::Read;

use camino::Utf8PathBuf;
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::{Value, json};
use tiny_http::{Header, Method, Response, Server};

use crate::utility::{SharedFinder, find_matches};

pub const FIND_SIMILAR_ROUTE: &str = "/findSimilarAssets";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FindSimilarBody {
    image_path: String,
    assets_directory: String,
    #[serde(default)]
    top_k: Option<usize>,
}

pub struct HttpServer {
    finder: SharedFinder,
    default_top_k: usize,
}

impl HttpServer {
    pub fn new(finder: SharedFinder, default_top_k: usize) -> Self {
        Self { finder, default_top_k }
    }

    /// Serves requests one at a time until the listener fails.
    pub fn serve(&self, addr: &str) -> anyhow::Result<()> {
        let server = Server::http(addr)
            .map_err(|e| anyhow::anyhow!("Could not bind {addr}: {e}"))?;
        let content_type = Header::from_bytes("Content-Type", "application/json")
            .map_err(|_| anyhow::anyhow!("invalid header"))?;
        info!("HttpServer: listening on http://{addr}");

        for mut request in server.incoming_requests() {
            let mut body = String::new();
            let (status, payload) = match request.as_reader().read_to_string(&mut body) {
                Ok(_) => self.handle(request.method(), request.url(), &body),
                Err(e) => (400, error_body(format!("Could not read request body: {e}"))),
            };
            debug!("HttpServer: {} {} -> {}", request.method(), request.url(), status);

            let response = Response::from_string(payload.to_string())
                .with_status_code(status)
                .with_header(content_type.clone());
            if let Err(e) = request.respond(response) {
                warn!("HttpServer: could not send response: {e}");
            }
        }
        Ok(())
    }

    /// Maps one request to a status code and JSON body.
    pub fn handle(&self, method: &Method, url: &str, body: &str) -> (u16, Value) {
        let path = url.split('?').next().unwrap_or(url);
        if path != FIND_SIMILAR_ROUTE {
            return (404, error_body(format!("Not found: {path}")));
        }
        if *method != Method::Post {
            return (405, error_body(format!("Method not allowed: {method}")));
        }

        let request: FindSimilarBody = match serde_json::from_str(body) {
            Ok(request) => request,
            Err(e) => return (400, error_body(format!("Invalid request body: {e}"))),
        };

        let image_path = Utf8PathBuf::from(request.image_path);
        let assets_directory = Utf8PathBuf::from(request.assets_directory);
        let top_k = request.top_k.unwrap_or(self.default_top_k);
        match find_matches(&self.finder, &image_path, &assets_directory, top_k) {
            Ok(matches) => match serde_json::to_value(&matches) {
                Ok(value) => (200, value),
                Err(e) => (500, error_body(e.to_string())),
            },
            Err(e) => {
                warn!("HttpServer: search failed: {e}");
                (422, error_body(e.to_string()))
            }
        }
    }
}

fn error_body(message: String) -> Value {
    json!({ "error": message })
}
