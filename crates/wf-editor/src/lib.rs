pub mod clipboard;
pub mod commands;
pub mod config;
pub mod engine;
pub mod execute;
pub mod shortcuts;
pub mod state;

pub use clipboard::Clipboard;
pub use commands::CommandStack;
pub use config::{ConfigError, EditorConfig};
pub use engine::{GraphMutation, MutationOutcome, WorkflowEngine};
pub use execute::{CodeRunner, ExecError, ExecOutcome, execute_node};
pub use shortcuts::{ShortcutAction, ShortcutMap};
pub use state::{ConnectionPreview, ContextMenu, EditorState, Selection, Viewport};
