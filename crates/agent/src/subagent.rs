//! Sub-agent registry (§4.7): constructs a fresh, tool-scoped agent for a
//! named type, and routes free-text task descriptions to a type by keyword.

use std::path::PathBuf;
use std::sync::Arc;

use ah_domain::config::{AgentConfig, BrowserToolConfig, ExecSecurityConfig, SubAgentConfig, TestRunnerConfig};
use ah_domain::error::Result;
use ah_providers::Llm;
use ah_tools::{BrowserTool, CodeExecTool, EditorTool, ProcessManager, ShellTool, TerminateTool, TestRunnerTool, ToolRegistry};

use crate::base::BaseAgent;
use crate::tool_calling::ToolCallingAgent;
use crate::working_memory::WorkingMemory;

/// Default `(max_steps, tool set)` per sub-agent type, per §4.7's table.
fn type_table(agent_type: &str) -> Option<(u32, &'static [&'static str])> {
    match agent_type {
        "explore" => Some((10, &["shell", "terminate"])),
        "plan" => Some((20, &["shell", "terminate"])),
        "code" => Some((50, &["shell", "code_exec", "editor", "browser", "test_runner", "terminate"])),
        "test" => Some((15, &["shell", "code_exec", "test_runner", "terminate"])),
        "build" => Some((10, &["shell", "code_exec", "terminate"])),
        "review" => Some((3, &["test_runner"])),
        _ => None,
    }
}

pub const KNOWN_TYPES: &[&str] = &["explore", "plan", "code", "test", "build", "review"];

/// Map a free-text task description to a sub-agent type by keyword.
/// Falls back to "explore" when nothing matches.
pub fn route_task(description: &str) -> &'static str {
    let d = description.to_ascii_lowercase();
    let hits: &[(&str, &[&str])] = &[
        ("test", &["test", "verify", "assert", "validate"]),
        ("review", &["review", "critique", "audit"]),
        ("build", &["build", "compile", "package", "release"]),
        ("code", &["implement", "write code", "fix bug", "refactor", "code"]),
        ("plan", &["plan", "design", "outline", "strategy"]),
        ("explore", &["explore", "investigate", "find", "search", "understand"]),
    ];
    for (agent_type, keywords) in hits {
        if keywords.iter().any(|k| d.contains(k)) {
            return agent_type;
        }
    }
    "explore"
}

/// Everything needed to build a tool registry for a spawned sub-agent.
pub struct SubAgentEnvironment {
    pub llm: Arc<dyn Llm>,
    pub process_manager: Arc<ProcessManager>,
    pub workspace_root: PathBuf,
    pub exec_security: ExecSecurityConfig,
    pub test_runner: TestRunnerConfig,
    pub browser: BrowserToolConfig,
    pub agent_config: AgentConfig,
    pub sub_agent_overrides: SubAgentConfig,
}

pub struct SubAgentRegistry {
    env: SubAgentEnvironment,
}

pub struct SubAgent {
    pub agent_type: String,
    pub base: BaseAgent,
    initial_task: String,
}

impl SubAgent {
    pub async fn run_to_completion(&mut self) -> Result<(String, u32)> {
        let mut executor = ToolCallingAgent::new();
        let task = std::mem::take(&mut self.initial_task);
        let summary = self.base.run(&mut executor, Some(task)).await?;
        Ok((summary, self.base.current_step()))
    }
}

impl SubAgentRegistry {
    pub fn new(env: SubAgentEnvironment) -> Self {
        Self { env }
    }

    /// Build a tool registry scoped to `tool_names`, sourced "local" like
    /// the main agent's registry.
    fn build_registry(&self, tool_names: &[&str]) -> ToolRegistry {
        let registry = ToolRegistry::new();
        for name in tool_names {
            match *name {
                "shell" => registry.add(
                    Arc::new(ShellTool::new(self.env.process_manager.clone(), self.env.exec_security.clone())),
                    "local",
                ),
                "code_exec" => registry.add(
                    Arc::new(CodeExecTool::new(self.env.process_manager.clone(), self.env.exec_security.clone())),
                    "local",
                ),
                "editor" => registry.add(Arc::new(EditorTool::new(self.env.workspace_root.clone())), "local"),
                "browser" => registry.add(Arc::new(BrowserTool::new(self.env.browser.clone())), "local"),
                "test_runner" => registry.add(
                    Arc::new(TestRunnerTool::new(self.env.process_manager.clone(), self.env.test_runner.clone())),
                    "local",
                ),
                "terminate" => registry.add(Arc::new(TerminateTool), "local"),
                other => tracing::warn!(tool = other, "sub-agent tool set names an unknown tool, skipping"),
            }
        }
        registry
    }

    /// Spawn a sub-agent of `agent_type`. `context`, if given, is folded
    /// into the initial task as an appended JSON block.
    pub fn spawn(&self, agent_type: &str, task: &str, context: Option<&serde_json::Value>) -> Result<SubAgent> {
        let (default_max_steps, tool_names) = type_table(agent_type).ok_or_else(|| {
            ah_domain::error::Error::Other(format!(
                "unknown sub-agent type '{agent_type}', expected one of {KNOWN_TYPES:?}"
            ))
        })?;

        let max_steps = self
            .env
            .sub_agent_overrides
            .overrides
            .get(agent_type)
            .and_then(|o| o.max_steps)
            .unwrap_or(default_max_steps);

        let registry = Arc::new(self.build_registry(tool_names));
        let base = BaseAgent::with_effective_max_steps(
            format!("sub-agent:{agent_type}"),
            self.env.llm.clone(),
            registry,
            WorkingMemory::plain(),
            &self.env.agent_config,
            max_steps,
        );

        let initial_task = match context {
            Some(ctx) => format!("{task}\n\ncontext:\n{}", serde_json::to_string_pretty(ctx).unwrap_or_default()),
            None => task.to_string(),
        };

        Ok(SubAgent { agent_type: agent_type.to_string(), base, initial_task })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_task_matches_keywords() {
        assert_eq!(route_task("write unit tests for the parser"), "test");
        assert_eq!(route_task("review this diff for bugs"), "review");
        assert_eq!(route_task("build the release binary"), "build");
        assert_eq!(route_task("implement the new endpoint"), "code");
        assert_eq!(route_task("plan the migration approach"), "plan");
        assert_eq!(route_task("investigate why this crashes"), "explore");
        assert_eq!(route_task("do the thing"), "explore");
    }

    #[test]
    fn type_table_matches_spec_defaults() {
        assert_eq!(type_table("explore"), Some((10, &["shell", "terminate"][..])));
        assert_eq!(type_table("review"), Some((3, &["test_runner"][..])));
        assert_eq!(type_table("nonexistent"), None);
    }
}
