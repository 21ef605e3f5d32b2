//! Block layout and the change messages that update it.

use crate::config::BarConfig;

/// Position of a block in the rendered line. Dense and fixed at startup.
pub type BlockId = usize;

/// Text shown in place of a block whose command failed.
pub const ERROR_MARKER: &str = "ERROR";

/// One cell of the status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    /// Separator, prefix or suffix text. Never changes.
    Static(String),
    /// Output of the worker at `worker` (its index in the action list).
    Dynamic { worker: usize, text: String },
}

impl Block {
    pub fn text(&self) -> &str {
        match self {
            Self::Static(text) | Self::Dynamic { text, .. } => text,
        }
    }
}

/// A worker's report of new content for its block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub block_id: BlockId,
    /// Command output on success, error description on failure.
    pub text: String,
    pub ok: bool,
}

impl Change {
    pub fn success(block_id: BlockId, text: impl Into<String>) -> Self {
        Self {
            block_id,
            text: text.into(),
            ok: true,
        }
    }

    pub fn failure(block_id: BlockId, text: impl Into<String>) -> Self {
        Self {
            block_id,
            text: text.into(),
            ok: false,
        }
    }
}

/// The ordered block sequence.
///
/// Per action the cells are laid out as `[separator] [prefix] dynamic
/// [suffix]`, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct BlockLine {
    blocks: Vec<Block>,
    /// Dynamic block id for each worker index.
    dynamic: Vec<BlockId>,
}

impl BlockLine {
    /// Lay out the cells for every configured action.
    pub fn from_config(config: &BarConfig) -> Self {
        let mut line = Self::default();
        for (worker, action) in config.actions.iter().enumerate() {
            if !config.separator.is_empty() {
                line.blocks.push(Block::Static(config.separator.clone()));
            }
            if let Some(prefix) = &action.prefix {
                line.blocks.push(Block::Static(prefix.clone()));
            }
            line.dynamic.push(line.blocks.len());
            line.blocks.push(Block::Dynamic {
                worker,
                text: String::new(),
            });
            if let Some(suffix) = &action.suffix {
                line.blocks.push(Block::Static(suffix.clone()));
            }
        }
        line
    }

    /// Dynamic block ids, indexed by worker.
    pub fn dynamic_blocks(&self) -> &[BlockId] {
        &self.dynamic
    }

    /// Replace the text of a dynamic block.
    ///
    /// Returns `false` (leaving the line untouched) when `id` is out of range
    /// or names a static cell.
    pub fn set(&mut self, id: BlockId, new_text: String) -> bool {
        match self.blocks.get_mut(id) {
            Some(Block::Dynamic { text, .. }) => {
                *text = new_text;
                true
            }
            _ => false,
        }
    }

    /// Append every cell, in order, to `out`.
    pub fn render_into(&self, out: &mut String) {
        for block in &self.blocks {
            out.push_str(block.text());
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Action;

    fn rendered(line: &BlockLine) -> String {
        let mut out = String::new();
        line.render_into(&mut out);
        out
    }

    #[test]
    fn layout_interleaves_static_cells() {
        let config = BarConfig::new(
            "|",
            vec![
                Action::new("echo a").with_prefix("<").with_suffix(">"),
                Action::new("echo b"),
            ],
        );
        let line = BlockLine::from_config(&config);

        assert_eq!(
            line.blocks(),
            &[
                Block::Static("|".to_string()),
                Block::Static("<".to_string()),
                Block::Dynamic {
                    worker: 0,
                    text: String::new()
                },
                Block::Static(">".to_string()),
                Block::Static("|".to_string()),
                Block::Dynamic {
                    worker: 1,
                    text: String::new()
                },
            ]
        );
        assert_eq!(line.dynamic_blocks(), &[2, 5]);
    }

    #[test]
    fn empty_separator_adds_no_cells() {
        let config = BarConfig::new("", vec![Action::new("a"), Action::new("b")]);
        let line = BlockLine::from_config(&config);
        assert_eq!(line.len(), 2);
        assert_eq!(line.dynamic_blocks(), &[0, 1]);
    }

    #[test]
    fn no_actions_lay_out_nothing() {
        let line = BlockLine::from_config(&BarConfig::new("|", Vec::new()));
        assert!(line.is_empty());
        assert!(line.dynamic_blocks().is_empty());
        assert_eq!(rendered(&line), "");
    }

    #[test]
    fn set_only_touches_dynamic_cells() {
        let config = BarConfig::new("|", vec![Action::new("a")]);
        let mut line = BlockLine::from_config(&config);

        assert!(!line.set(0, "x".to_string()));
        assert!(!line.set(9, "x".to_string()));
        assert!(line.set(1, "A".to_string()));
        assert_eq!(rendered(&line), "|A");
    }

    #[test]
    fn order_is_stable_across_updates() {
        let config = BarConfig::new(
            " ",
            vec![Action::new("a"), Action::new("b"), Action::new("c")],
        );
        let mut line = BlockLine::from_config(&config);

        line.set(5, "C".to_string());
        line.set(1, "A".to_string());
        line.set(3, "B".to_string());
        assert_eq!(rendered(&line), " A B C");

        line.set(1, "A2".to_string());
        assert_eq!(rendered(&line), " A2 B C");
    }
}
