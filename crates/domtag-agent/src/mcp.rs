//! MCP server exposing the session as planner-facing tools.
//!
//! Every tool answers with a JSON result envelope as its text content,
//! success and failure alike. Protocol-level `ErrorData` is reserved for
//! serialization faults inside this module; a planner never has to handle
//! two error channels.

use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::*,
    tool, tool_handler, tool_router, ServerHandler,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

use crate::envelope::{ActionEnvelope, NavigateEnvelope, SnapshotEnvelope, UrlEnvelope};
use crate::{Session, DEFAULT_NAVIGATE_TIMEOUT_MS};

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct InitializeRequest {
    #[schemars(
        description = "Run the browser headless. Defaults to the DOMTAG_HEADLESS env var, or true."
    )]
    pub headless: Option<bool>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct NavigateRequest {
    #[schemars(description = "URL to navigate to")]
    pub url: String,
    #[schemars(description = "Navigation timeout in milliseconds (default 5000)")]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ClickRequest {
    #[schemars(description = "mmid of the element, from the latest snapshot")]
    pub mmid: String,
    #[schemars(description = "Milliseconds to wait before clicking (default 0)")]
    pub wait_before_ms: Option<u64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct TypeRequest {
    #[schemars(description = "mmid of the input element, from the latest snapshot")]
    pub mmid: String,
    #[schemars(
        description = "Text to type. The exact tokens !USERNAME! or !PASSWORD! are replaced with configured credentials."
    )]
    pub content: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct TypeAndClickRequest {
    #[schemars(description = "mmid of the input element to fill")]
    pub text_mmid: String,
    #[schemars(description = "Text to fill, taken literally")]
    pub text: String,
    #[schemars(description = "mmid of the element to click after filling")]
    pub click_mmid: String,
    #[schemars(description = "Milliseconds to wait between fill and click (default 0)")]
    pub wait_before_click_ms: Option<u64>,
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

fn envelope_ok(env: &impl serde::Serialize) -> Result<CallToolResult, ErrorData> {
    let json = serde_json::to_string(env)
        .map_err(|e| ErrorData::internal_error(e.to_string(), None::<Value>))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

fn headless_default() -> bool {
    match std::env::var("DOMTAG_HEADLESS") {
        Ok(v) => !matches!(v.to_lowercase().as_str(), "0" | "false" | "no"),
        Err(_) => true,
    }
}

#[derive(Clone)]
pub struct DomtagServer {
    session: Arc<Mutex<Session>>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl DomtagServer {
    pub fn new() -> Self {
        Self {
            session: Arc::new(Mutex::new(Session::from_env())),
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        description = "Launch the browser and open a blank page. Must be called once before any other tool."
    )]
    async fn initialize_browser(
        &self,
        req: Parameters<InitializeRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        let headless = req.0.headless.unwrap_or_else(headless_default);
        let mut session = self.session.lock().await;
        let env = match session.start(headless).await {
            Ok(()) => ActionEnvelope::success("Browser initialized successfully"),
            Err(e) => {
                warn!("initialize_browser failed: {}", e);
                ActionEnvelope::error(e)
            }
        };
        envelope_ok(&env)
    }

    #[tool(
        description = "Navigate to a URL and wait for the page to settle. Returns the final URL, which may differ after redirects."
    )]
    async fn navigate(&self, req: Parameters<NavigateRequest>) -> Result<CallToolResult, ErrorData> {
        let timeout_ms = req.0.timeout_ms.unwrap_or(DEFAULT_NAVIGATE_TIMEOUT_MS);
        let mut session = self.session.lock().await;
        let env = match session.navigate(&req.0.url, timeout_ms).await {
            Ok(final_url) => NavigateEnvelope::success(
                format!("Successfully navigated to {}", req.0.url),
                final_url,
            ),
            Err(e) => NavigateEnvelope::error(e),
        };
        envelope_ok(&env)
    }

    #[tool(description = "Get the URL of the current page.")]
    async fn get_current_url(&self) -> Result<CallToolResult, ErrorData> {
        let session = self.session.lock().await;
        let env = match session.current_url().await {
            Ok(url) => UrlEnvelope::success(url),
            Err(e) => UrlEnvelope::error(e),
        };
        envelope_ok(&env)
    }

    #[tool(
        description = "Take a fresh snapshot of the page: actionable elements are tagged with mmid attributes and returned as a compact tree. Identifiers are only valid until the page changes; re-snapshot after every mutation."
    )]
    async fn get_page_snapshot(&self) -> Result<CallToolResult, ErrorData> {
        let mut session = self.session.lock().await;
        let env = match session.snapshot().await {
            Ok(snapshot) => SnapshotEnvelope::success(
                "Current page DOM retrieved successfully",
                snapshot.root,
                snapshot.mmid_counter,
            ),
            Err(e) => SnapshotEnvelope::error(e),
        };
        envelope_ok(&env)
    }

    #[tool(
        description = "Click the element tagged with the given mmid. Fails if the identifier matches no element or more than one; take a fresh snapshot and retry."
    )]
    async fn click(&self, req: Parameters<ClickRequest>) -> Result<CallToolResult, ErrorData> {
        let wait = req.0.wait_before_ms.unwrap_or(0);
        let mut session = self.session.lock().await;
        let env = match session.click(&req.0.mmid, wait).await {
            Ok(()) => ActionEnvelope::success(format!(
                "Successfully clicked element with mmid: {}",
                req.0.mmid
            )),
            Err(e) => ActionEnvelope::error(e),
        };
        envelope_ok(&env)
    }

    #[tool(
        description = "Type text into the element tagged with the given mmid. Use !USERNAME! or !PASSWORD! for configured credentials; they are substituted at fill time and never echoed back."
    )]
    async fn type_text(&self, req: Parameters<TypeRequest>) -> Result<CallToolResult, ErrorData> {
        let mut session = self.session.lock().await;
        let env = match session.type_text(&req.0.mmid, &req.0.content).await {
            // echo what the planner sent, never the resolved value
            Ok(()) => ActionEnvelope::success(format!(
                "Successfully typed {} into element with mmid: {}",
                req.0.content, req.0.mmid
            )),
            Err(e) => ActionEnvelope::error(e),
        };
        envelope_ok(&env)
    }

    #[tool(
        description = "Fill one element and click another as a single step, for search-and-submit interactions. The text is taken literally with no credential substitution."
    )]
    async fn enter_text_and_click(
        &self,
        req: Parameters<TypeAndClickRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        let wait = req.0.wait_before_click_ms.unwrap_or(0);
        let mut session = self.session.lock().await;
        let env = match session
            .enter_text_and_click(&req.0.text_mmid, &req.0.text, &req.0.click_mmid, wait)
            .await
        {
            Ok(()) => ActionEnvelope::success(format!(
                "Successfully entered {} into element with mmid {} and clicked element with mmid: {}",
                req.0.text, req.0.text_mmid, req.0.click_mmid
            )),
            Err(e) => ActionEnvelope::error(e),
        };
        envelope_ok(&env)
    }

    #[tool(description = "Press the Enter key in the currently focused element.")]
    async fn press_enter(&self) -> Result<CallToolResult, ErrorData> {
        let mut session = self.session.lock().await;
        let env = match session.press_enter().await {
            Ok(()) => ActionEnvelope::success("Enter key pressed"),
            Err(e) => ActionEnvelope::error(e),
        };
        envelope_ok(&env)
    }

    #[tool(description = "Close the browser and release the session.")]
    async fn close_browser(&self) -> Result<CallToolResult, ErrorData> {
        let mut session = self.session.lock().await;
        let env = match session.shutdown().await {
            Ok(()) => ActionEnvelope::success("Browser closed"),
            Err(e) => ActionEnvelope::error(e),
        };
        envelope_ok(&env)
    }
}

impl Default for DomtagServer {
    fn default() -> Self {
        Self::new()
    }
}

#[tool_handler]
impl ServerHandler for DomtagServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "domtag-tools".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "DOM tagging browser automation. Call 'initialize_browser' first, 'navigate' to open a URL, \
                 then 'get_page_snapshot' to receive a tree of elements tagged with mmid identifiers. \
                 Interact by mmid with click/type_text/enter_text_and_click/press_enter. \
                 Identifiers change between snapshots: after any action that mutates the page, take a \
                 fresh snapshot before acting again. Every tool returns a JSON envelope with a 'status' \
                 of success or error."
                    .into(),
            ),
        }
    }
}

pub async fn run_server() -> anyhow::Result<()> {
    use rmcp::ServiceExt;

    let server = DomtagServer::new();
    let service = server.serve(rmcp::transport::stdio()).await?;
    service.waiting().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_default_reads_env() {
        // no env set in the test harness by default
        std::env::remove_var("DOMTAG_HEADLESS");
        assert!(headless_default());
        std::env::set_var("DOMTAG_HEADLESS", "false");
        assert!(!headless_default());
        std::env::set_var("DOMTAG_HEADLESS", "1");
        assert!(headless_default());
        std::env::remove_var("DOMTAG_HEADLESS");
    }
}
