//! Corpus MCP Server implementation

use anyhow::Result;
use rmcp::{
    handler::server::{tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::info;

use crate::config::Config;
use crate::error::SearchError;
use crate::search::engine::{SearchEngine, SearchOptions};
use crate::search::vectordb::DocumentRecord;

/// Parameters for corpus_search tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchParams {
    #[schemars(description = "Natural language search query")]
    pub query: String,
    #[schemars(description = "Maximum number of results (default: 5)")]
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[schemars(description = "Minimum cosine similarity (0.0-1.0)")]
    #[serde(default)]
    pub min_score: Option<f32>,
    #[schemars(description = "Restrict search to one document id")]
    #[serde(default)]
    pub document: Option<String>,
    #[schemars(description = "Neighbouring sentences to include on each side (default: 0)")]
    #[serde(default)]
    pub context: usize,
}

fn default_limit() -> usize {
    5
}

/// Parameters for corpus_similar tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SimilarParams {
    #[schemars(description = "Document id of the source sentence")]
    pub document: String,
    #[schemars(description = "Position of the source sentence within the document")]
    pub position: usize,
    #[schemars(description = "Maximum number of results (default: 5)")]
    #[serde(default = "default_limit")]
    pub limit: usize,
}

/// Parameters for corpus_get_document tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct GetDocumentParams {
    #[schemars(description = "Document id or file name to retrieve")]
    pub document: String,
}

/// Parameters for corpus_list_documents tool
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ListDocumentsParams {
    #[schemars(description = "Maximum results (default: 50)")]
    #[serde(default = "default_list_limit")]
    pub limit: usize,
}

fn default_list_limit() -> usize {
    50
}

/// Clamp a requested limit; 0 means "use the default"
fn clamp_limit(requested: usize, default: usize, max: usize) -> usize {
    if requested == 0 {
        default
    } else {
        requested.min(max)
    }
}

/// Find a document by exact id, then by file name, then by title
fn resolve_document<'a>(documents: &'a [DocumentRecord], wanted: &str) -> Option<&'a DocumentRecord> {
    documents
        .iter()
        .find(|d| d.id == wanted)
        .or_else(|| documents.iter().find(|d| d.id.rsplit('/').next() == Some(wanted)))
        .or_else(|| documents.iter().find(|d| d.title == wanted))
}

fn internal_error(context: &str, e: impl std::fmt::Display) -> McpError {
    McpError::internal_error(format!("{}: {}", context, e), None)
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let output = serde_json::to_string_pretty(value)
        .map_err(|e| internal_error("JSON serialization failed", e))?;
    Ok(CallToolResult::success(vec![Content::text(output)]))
}

/// Corpus MCP Service
#[derive(Clone)]
pub struct CorpusService {
    config: Config,
    tool_router: ToolRouter<Self>,
}

impl CorpusService {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            tool_router: Self::tool_router(),
        }
    }

    fn get_engine(&self) -> Result<SearchEngine, McpError> {
        if !self.config.paths().db.exists() {
            return Err(McpError::invalid_request(
                "Index not found. Run `pss index` in the corpus directory first.".to_string(),
                None,
            ));
        }
        SearchEngine::new(&self.config).map_err(|e| internal_error("Failed to open index", e))
    }
}

#[tool_router]
impl CorpusService {
    #[tool(description = "Search the PDF corpus for sentences semantically similar to a query. Returns ranked sentences with document id, position and cosine similarity score.")]
    async fn corpus_search(
        &self,
        params: Parameters<SearchParams>,
    ) -> Result<CallToolResult, McpError> {
        let mut engine = self.get_engine()?;
        let params = params.0;
        let options = SearchOptions {
            limit: clamp_limit(params.limit, 5, 100),
            min_score: params.min_score,
            document: params.document,
            context: params.context.min(5),
        };

        let hits = engine.search(&params.query, &options).map_err(|e| match e {
            SearchError::EmptyQuery => McpError::invalid_params(e.to_string(), None),
            other => internal_error("Search failed", other),
        })?;

        to_json(&hits)
    }

    #[tool(description = "Find sentences in the corpus similar to an already indexed sentence, identified by document id and position.")]
    async fn corpus_similar(
        &self,
        params: Parameters<SimilarParams>,
    ) -> Result<CallToolResult, McpError> {
        let mut engine = self.get_engine()?;
        let params = params.0;
        let limit = clamp_limit(params.limit, 5, 100);

        let hits = engine
            .similar(&params.document, params.position, limit)
            .map_err(|e| match e {
                SearchError::DocumentNotFound(_) | SearchError::SentenceNotFound { .. } => {
                    McpError::invalid_params(e.to_string(), None)
                }
                other => internal_error("Similarity search failed", other),
            })?;

        to_json(&hits)
    }

    #[tool(description = "List documents in the sentence index with their sentence counts.")]
    async fn corpus_list_documents(
        &self,
        params: Parameters<ListDocumentsParams>,
    ) -> Result<CallToolResult, McpError> {
        let engine = self.get_engine()?;
        let limit = clamp_limit(params.0.limit, 50, 500);

        let mut documents = engine
            .db()
            .list_documents()
            .map_err(|e| internal_error("Failed to list documents", e))?;
        documents.truncate(limit);

        to_json(&documents)
    }

    #[tool(description = "Get all indexed sentences of one document, in order.")]
    async fn corpus_get_document(
        &self,
        params: Parameters<GetDocumentParams>,
    ) -> Result<CallToolResult, McpError> {
        let engine = self.get_engine()?;
        let wanted = &params.0.document;
        let db = engine.db();

        let documents = db
            .list_documents()
            .map_err(|e| internal_error("Failed to list documents", e))?;
        match resolve_document(&documents, wanted) {
            Some(document) => {
                let sentences = db
                    .document_sentences(&document.id)
                    .map_err(|e| internal_error("Failed to read sentences", e))?;
                let output = serde_json::json!({
                    "document": document,
                    "sentences": sentences
                        .iter()
                        .map(|s| serde_json::json!({ "position": s.position, "text": s.text }))
                        .collect::<Vec<_>>(),
                });
                to_json(&output)
            }
            None => Ok(CallToolResult::success(vec![Content::text(format!(
                "Document not found: {}",
                wanted
            ))])),
        }
    }

    #[tool(description = "Get sentence index statistics: document, sentence and embedding counts, embedder and last index time.")]
    async fn corpus_status(&self) -> Result<CallToolResult, McpError> {
        let engine = self.get_engine()?;
        let stats = engine
            .stats()
            .map_err(|e| internal_error("Failed to read index stats", e))?;
        to_json(&stats)
    }
}

#[tool_handler]
impl ServerHandler for CorpusService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "PDF corpus sentence search. Use corpus_search to find sentences similar in meaning to a query."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

/// Run the MCP server over stdio
pub async fn run_mcp_server(config: Config) -> Result<()> {
    use tokio::io::{stdin, stdout};

    info!(corpus = %config.corpus_dir.display(), "Starting MCP server");
    let service = CorpusService::new(config);
    let transport = (stdin(), stdout());
    let server = service.serve(transport).await?;
    server.waiting().await?;

    Ok(())
}
