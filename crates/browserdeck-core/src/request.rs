//! Request bodies for submitting work to the agent backend.

use serde::{Deserialize, Serialize};

/// Request to run a browser-automation agent task.
///
/// Defaults mirror what the backend assumes when a field is omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunTaskRequest {
    /// Task description for the agent.
    pub task: String,

    /// LLM provider (e.g. openai, anthropic).
    pub llm_provider: String,

    /// Model name to use.
    pub llm_model_name: String,

    /// Sampling temperature.
    pub llm_temperature: f64,

    /// Whether the agent may use vision (screenshots as model input).
    pub use_vision: bool,

    /// Run the browser headless.
    pub headless: bool,

    /// Record the browser session.
    pub enable_recording: bool,

    /// Maximum number of steps the agent may take.
    pub max_steps: u32,

    /// Attach to the user's own browser instead of launching one.
    pub use_own_browser: bool,

    /// Additional free-text context for the agent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub add_infos: Option<String>,
}

impl RunTaskRequest {
    /// Create a request with backend defaults for the given task text.
    pub fn new(task: impl Into<String>, provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            llm_provider: provider.into(),
            llm_model_name: model.into(),
            llm_temperature: 0.6,
            use_vision: true,
            headless: false,
            enable_recording: true,
            max_steps: 100,
            use_own_browser: false,
            add_infos: None,
        }
    }

    /// Builder method to set the temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.llm_temperature = temperature;
        self
    }

    /// Builder method to toggle headless mode.
    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Builder method to set additional context.
    pub fn with_add_infos(mut self, infos: impl Into<String>) -> Self {
        self.add_infos = Some(infos.into());
        self
    }
}

/// Request to run a deep-research job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchRequest {
    /// Research task description.
    pub research_task: String,

    /// Maximum number of search iterations.
    pub max_search_iteration: u32,

    /// Maximum number of queries per iteration.
    pub max_query_per_iter: u32,

    /// LLM provider (e.g. openai, anthropic).
    pub llm_provider: String,

    /// Model name to use.
    pub llm_model_name: String,

    /// Sampling temperature.
    pub llm_temperature: f64,

    /// Whether the agent may use vision.
    pub use_vision: bool,

    /// Run the browser headless.
    pub headless: bool,

    /// Attach to the user's own browser instead of launching one.
    pub use_own_browser: bool,
}

impl ResearchRequest {
    /// Create a request with backend defaults for the given research topic.
    pub fn new(task: impl Into<String>, provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            research_task: task.into(),
            max_search_iteration: 3,
            max_query_per_iter: 1,
            llm_provider: provider.into(),
            llm_model_name: model.into(),
            llm_temperature: 0.6,
            use_vision: true,
            headless: false,
            use_own_browser: false,
        }
    }

    /// Builder method to bound the search loop.
    pub fn with_iterations(mut self, iterations: u32, queries_per_iter: u32) -> Self {
        self.max_search_iteration = iterations;
        self.max_query_per_iter = queries_per_iter;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_request_defaults() {
        let req = RunTaskRequest::new("buy milk", "anthropic", "claude-sonnet-4-5");
        assert_eq!(req.llm_temperature, 0.6);
        assert_eq!(req.max_steps, 100);
        assert!(req.use_vision);
        assert!(req.enable_recording);
    }

    #[test]
    fn test_add_infos_omitted_when_unset() {
        let req = RunTaskRequest::new("t", "openai", "gpt-4o");
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("add_infos").is_none());
    }
}
