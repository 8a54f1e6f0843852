//! Startup sequence (§4.12's `[FULL]` order): validate config, construct the
//! LLM client, wire the tool environment, and assemble [`AppState`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use ah_agent::{SubAgentEnvironment, SubAgentRegistry, TaskTool};
use ah_domain::config::{Config, ConfigSeverity};
use ah_domain::error::Result;
use ah_mcp_client::proxy::proxies_for;
use ah_mcp_client::McpManager;
use ah_memory::{MemoryStore, MemoryTool};
use ah_providers::build_llm;
use ah_tools::{
    BrowserTool, CodeExecTool, EditorTool, ProcessManager, ShellTool, TerminateTool, TestRunnerTool, ToolRegistry, ToolSearchTool,
};
use anyhow::{bail, Context};
use parking_lot::RwLock;

use crate::state::{AppState, ToolEnvironment};

/// Validate `config`, aborting the process on the first `Error`-severity
/// issue. Warnings are logged but never block startup.
pub fn validate_config(config: &Config) -> anyhow::Result<()> {
    let issues = config.validate();
    let mut error_count = 0usize;
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Error => {
                tracing::error!(%issue, "configuration error");
                error_count += 1;
            }
            ConfigSeverity::Warning => tracing::warn!(%issue, "configuration warning"),
        }
    }
    if error_count > 0 {
        bail!("configuration has {error_count} error(s); see log for detail");
    }
    Ok(())
}

pub async fn build_app_state(config: Config, run_log_dir: PathBuf) -> anyhow::Result<AppState> {
    validate_config(&config)?;
    let config = Arc::new(config);

    let llm = build_llm(&config.llm).context("failed to construct LLM client")?;

    let process_manager = Arc::new(ProcessManager::new(config.tools.exec.clone()));

    let memory_store = if config.memory.enabled {
        Some(MemoryStore::open(&config.memory.db_path).context("failed to open memory store")?)
    } else {
        None
    };

    let mcp_manager = Arc::new(McpManager::from_config(&config.mcp).await);

    let workspace_root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let tool_env = ToolEnvironment {
        llm: llm.clone(),
        process_manager,
        workspace_root,
        exec_security: config.tools.exec_security.clone(),
        test_runner: config.tools.test_runner.clone(),
        browser: config.tools.browser.clone(),
        agent_config: config.agent.clone(),
        sub_agent_overrides: config.sub_agent.clone(),
        memory_store,
        mcp_manager,
    };

    std::fs::create_dir_all(&run_log_dir).context("failed to create run log directory")?;

    Ok(AppState {
        config,
        llm,
        sessions: Arc::new(ah_sessions::SessionStore::new()),
        session_locks: Arc::new(ah_sessions::SessionLockMap::new()),
        agents: Arc::new(RwLock::new(HashMap::new())),
        tool_env,
        run_log_dir,
    })
}

/// Build a fresh main-agent tool registry: the full built-in set plus any
/// configured remote (MCP) tools, scoped persistent memory, and the `task`
/// tool for sub-agent delegation (§4.7).
pub fn build_tool_registry(env: &ToolEnvironment) -> Result<Arc<ToolRegistry>> {
    let registry = ToolRegistry::new();

    registry.add(Arc::new(ShellTool::new(env.process_manager.clone(), env.exec_security.clone())), "local");
    registry.add(Arc::new(CodeExecTool::new(env.process_manager.clone(), env.exec_security.clone())), "local");
    registry.add(Arc::new(EditorTool::new(env.workspace_root.clone())), "local");
    registry.add(Arc::new(BrowserTool::new(env.browser.clone())), "local");
    registry.add(Arc::new(TestRunnerTool::new(env.process_manager.clone(), env.test_runner.clone())), "local");
    registry.add(Arc::new(TerminateTool), "local");

    if let Some(store) = &env.memory_store {
        registry.add(Arc::new(MemoryTool::new(store.clone())), "local");
    }

    for proxy in proxies_for(&env.mcp_manager) {
        let source = proxy.source();
        registry.add(Arc::new(proxy), source);
    }

    let registry = Arc::new(registry);
    registry.add(Arc::new(ToolSearchTool::new(registry.clone())), "local");

    let sub_agents = build_sub_agent_registry(env);
    registry.add(Arc::new(TaskTool::new(sub_agents)), "local");

    Ok(registry)
}

/// Fresh sub-agent registry sharing this environment's LLM, process manager,
/// and config — cheap to construct, so each session (and each `task` tool
/// call) gets its own rather than sharing mutable state across runs.
pub fn build_sub_agent_registry(env: &ToolEnvironment) -> SubAgentRegistry {
    SubAgentRegistry::new(SubAgentEnvironment {
        llm: env.llm.clone(),
        process_manager: env.process_manager.clone(),
        workspace_root: env.workspace_root.clone(),
        exec_security: env.exec_security.clone(),
        test_runner: env.test_runner.clone(),
        browser: env.browser.clone(),
        agent_config: env.agent_config.clone(),
        sub_agent_overrides: env.sub_agent_overrides.clone(),
    })
}
