use crate::config::ToolFilter;
use crate::mcp::ToolDefinition;

impl ToolFilter {
    /// Check if a tool should be allowed based on include/exclude filters
    /// Include list takes precedence - if present, tool must be in it
    /// Exclude list is then checked - if present, tool must not be in it
    pub fn allows(&self, tool_name: &str) -> bool {
        if let Some(include) = &self.include {
            if !include.iter().any(|t| t == tool_name) {
                return false;
            }
        }

        if let Some(exclude) = &self.exclude {
            if exclude.iter().any(|t| t == tool_name) {
                return false;
            }
        }

        true
    }
}

/// Apply tool filters to a list of tools
pub(crate) fn apply_tool_filter(
    tools: Vec<ToolDefinition>,
    filter: Option<&ToolFilter>,
) -> Vec<ToolDefinition> {
    match filter {
        None => tools,
        Some(filter) => tools
            .into_iter()
            .filter(|tool| filter.allows(&tool.name))
            .collect(),
    }
}

/// Check if a specific tool name is allowed by the filter
pub(crate) fn is_tool_allowed(tool_name: &str, filter: Option<&ToolFilter>) -> bool {
    match filter {
        None => true,
        Some(filter) => filter.allows(tool_name),
    }
}
