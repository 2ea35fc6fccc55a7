// ABOUTME: Closed set of name-addressed file tools exposed to the model
// ABOUTME: Argument structs carry JsonSchema so tool definitions are generated, not hand-written

use depscout_core::ToolSchema;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Arguments for the read_file tool
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct ReadFileArgs {
    /// The relative path of the file to read
    pub relative_path: String,
    /// The line number to start reading from (1-indexed, default: 1)
    #[serde(default = "default_offset")]
    pub offset: i64,
    /// Maximum number of lines to read; omit to read the whole file
    #[serde(default)]
    pub limit: Option<i64>,
}

/// Arguments for the file_name_search tool
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct FileNameSearchArgs {
    /// File name or glob pattern, e.g. 'app.module.ts', '*.module.ts', '**/*routing.module.ts'
    pub pattern: String,
    /// Relative directory to limit the search scope (default: workspace root)
    #[serde(default = "default_search_path")]
    pub relative_path: String,
}

fn default_offset() -> i64 {
    1
}
fn default_search_path() -> String {
    ".".to_string()
}

/// Tools the dispatcher knows how to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileTool {
    ReadFile,
    FileNameSearch,
}

impl FileTool {
    pub const ALL: [FileTool; 2] = [FileTool::ReadFile, FileTool::FileNameSearch];

    pub fn name(&self) -> &'static str {
        match self {
            FileTool::ReadFile => "read_file",
            FileTool::FileNameSearch => "file_name_search",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.name() == name)
    }

    pub fn description(&self) -> &'static str {
        match self {
            FileTool::ReadFile => {
                "Read the contents of a file within the workspace. \
                 Specify the relative path, and optionally a 1-indexed line offset and a line limit for pagination. \
                 To read a file fully do not pass any limit. \
                 Returns the requested lines framed by a header naming the line range."
            }
            FileTool::FileNameSearch => {
                "Search the workspace for files matching a file name or glob pattern. \
                 Returns matching file paths relative to the workspace root. \
                 Supports wildcards such as '*', '**' and '?'. \
                 At most 100 results are returned by default; larger result sets are truncated with a warning."
            }
        }
    }

    fn parameters(&self) -> JsonValue {
        let schema = match self {
            FileTool::ReadFile => schemars::schema_for!(ReadFileArgs),
            FileTool::FileNameSearch => schemars::schema_for!(FileNameSearchArgs),
        };
        let mut value = serde_json::to_value(schema).unwrap_or_default();
        if let Some(object) = value.as_object_mut() {
            object.remove("$schema");
            object.remove("title");
        }
        value
    }

    /// Tool definition advertised to the model
    pub fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters(),
        }
    }
}

impl std::fmt::Display for FileTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
