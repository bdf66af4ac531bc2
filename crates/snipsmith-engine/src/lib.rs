pub mod buffer;
pub mod error;
pub mod eval;
pub mod geometry;
pub mod objects;
pub mod parsing;
pub mod transform;

// Re-export key types for easier usage
pub use buffer::TextBuffer;
pub use error::{Construct, ParseError, SnippetError};
pub use eval::{
    EvalContext, EvalFailure, Evaluator, FragmentKind, Globals, IndentUtil, Locals,
    NullEvaluator, SnippetUtil,
};
pub use geometry::{Position, Span};
pub use objects::{ExpandOptions, MAX_SETTLE_PASSES, SnippetInstance, TabStopInfo};
pub use transform::{CleverReplace, Transform};
