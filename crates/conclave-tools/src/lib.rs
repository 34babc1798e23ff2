pub mod builtin;
pub mod events;
pub mod policy;
pub mod registry;
pub mod tool;
pub mod toolset;

pub use events::{TodoItem, ToolEvent};
pub use policy::{ApprovalPolicy, ToolPolicy};
pub use registry::{ToolRegistry, ToolSchema};
pub use tool::{OutputCategory, Tool, ToolCall, ToolOutput, ToolOutputPart};
pub use toolset::{ToolSet, ToolSetContext};

// Filesystem tools, individually and as the "filesystem" ToolSet.
pub use builtin::delete_file::DeleteFileTool;
pub use builtin::edit_file::EditFileTool;
pub use builtin::filesystem::FilesystemToolSet;
pub use builtin::glob::GlobTool;
pub use builtin::grep::GrepTool;
pub use builtin::list_dir::ListDirTool;
pub use builtin::read_file::ReadFileTool;
pub use builtin::write::WriteTool;

// Single-tool builtins.
pub use builtin::shell::ShellTool;
pub use builtin::think::ThinkTool;
pub use builtin::todo_write::TodoWriteTool;
pub use builtin::update_memory::UpdateMemoryTool;
pub use builtin::web_fetch::WebFetchTool;
