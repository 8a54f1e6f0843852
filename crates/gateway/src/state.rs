use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use ah_domain::config::{AgentConfig, BrowserToolConfig, Config, ExecSecurityConfig, SubAgentConfig, TestRunnerConfig};
use ah_memory::MemoryStore;
use ah_providers::Llm;
use ah_tools::ProcessManager;
use parking_lot::RwLock;
use tokio::sync::Mutex as AsyncMutex;

use ah_agent::BaseAgent;
use ah_mcp_client::McpManager;
use ah_sessions::{SessionLockMap, SessionStore};

/// The agent instance driving one session's turns, paired with the recorder
/// writing its run log. Keyed in [`AppState::agents`] by the same session id
/// `ah_sessions::SessionStore` uses for message/token bookkeeping.
pub struct SessionAgent {
    pub base: BaseAgent,
}

/// Everything [`crate::bootstrap::build_tool_registry`] needs to assemble a
/// fresh, fully-scoped tool registry for a session or sub-agent, without
/// threading a dozen parameters through every call site.
#[derive(Clone)]
pub struct ToolEnvironment {
    pub llm: Arc<dyn Llm>,
    pub process_manager: Arc<ProcessManager>,
    pub workspace_root: PathBuf,
    pub exec_security: ExecSecurityConfig,
    pub test_runner: TestRunnerConfig,
    pub browser: BrowserToolConfig,
    pub agent_config: AgentConfig,
    pub sub_agent_overrides: SubAgentConfig,
    pub memory_store: Option<MemoryStore>,
    pub mcp_manager: Arc<McpManager>,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub llm: Arc<dyn Llm>,
    pub sessions: Arc<SessionStore>,
    pub session_locks: Arc<SessionLockMap>,
    pub agents: Arc<RwLock<HashMap<String, Arc<AsyncMutex<SessionAgent>>>>>,
    pub tool_env: ToolEnvironment,
    pub run_log_dir: PathBuf,
}
