use std::sync::Arc;

use async_trait::async_trait;

use crate::builtin::{
    delete_file::DeleteFileTool, edit_file::EditFileTool, glob::GlobTool, grep::GrepTool,
    list_dir::ListDirTool, read_file::ReadFileTool, write::WriteTool,
};
use crate::tool::Tool;
use crate::toolset::{ToolSet, ToolSetContext};

/// Bundles the granular file tools (read, write, edit, delete, list, grep,
/// glob) under one named set: "filesystem". Each tool keeps its own name and
/// schema — the set only gives them one lifecycle to start/stop together.
#[derive(Default)]
pub struct FilesystemToolSet;

#[async_trait]
impl ToolSet for FilesystemToolSet {
    fn name(&self) -> &str { "filesystem" }

    fn instructions(&self) -> Option<&str> {
        Some(
            "Filesystem tools: read_file, write, edit_file, delete_file, list_dir, grep, glob. \
             Prefer grep/glob to locate the relevant region before read_file; prefer edit_file \
             over write for modifying an existing file.",
        )
    }

    async fn start(&mut self, _ctx: &ToolSetContext) -> anyhow::Result<()> {
        Ok(())
    }

    async fn stop(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn tools(&self, _ctx: &ToolSetContext) -> anyhow::Result<Vec<Arc<dyn Tool>>> {
        Ok(vec![
            Arc::new(ReadFileTool),
            Arc::new(WriteTool),
            Arc::new(EditFileTool),
            Arc::new(DeleteFileTool),
            Arc::new(ListDirTool),
            Arc::new(GrepTool),
            Arc::new(GlobTool),
        ])
    }
}
