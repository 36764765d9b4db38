pub mod builtins;
pub mod cache;
pub mod dates;
pub mod environment;
pub mod error;
pub mod evaluator;
pub mod render;
pub mod resolver;
pub mod runtime_value;
pub mod style;

pub use cache::ExpressionCache;
pub use dates::DateFormat;
pub use error::{EvalError, RenderError};
pub use evaluator::CompiledExpr;
pub use render::{CompileFailure, OutputNode, RenderOptions, Renderer, render, render_value};
pub use runtime_value::Value;
