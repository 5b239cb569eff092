//! Render passes

use serde::{Deserialize, Serialize};
use std::fmt;

/// A render pass; passes run once per frame in [`RenderPass::ORDER`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderPass {
    /// Scene geometry
    #[default]
    Main,
    /// Editor-only overlays, always solid
    Editor,
    /// Debug lines, drawn as a line list
    Line,
}

impl RenderPass {
    pub const ORDER: [RenderPass; 3] = [RenderPass::Main, RenderPass::Editor, RenderPass::Line];

    pub fn label(&self) -> &'static str {
        match self {
            RenderPass::Main => "main",
            RenderPass::Editor => "editor",
            RenderPass::Line => "line",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ORDER.into_iter().find(|pass| pass.label() == label)
    }
}

impl fmt::Display for RenderPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_round_trip() {
        for pass in RenderPass::ORDER {
            assert_eq!(RenderPass::from_label(pass.label()), Some(pass));
        }
        assert_eq!(RenderPass::from_label("shadow"), None);
    }
}
