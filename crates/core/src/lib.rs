//! QTI response-processing value model.
//!
//! Holds everything the evaluator consumes but does not compute:
//! base types and cardinalities, typed processing values, the per-base-type
//! caster, variable declarations with their mappings and lookup tables,
//! session state, shape geometry, and the expression/rule trees handed
//! over by an item-model loader.

pub mod cast;
pub mod error;
pub mod node;
pub mod shape;
pub mod types;
pub mod value;
pub mod variable;

pub use error::CoreError;
pub use node::{ConditionBranch, ExpressionNode, ResponseCondition, RuleNode};
pub use shape::Shape;
pub use types::{BaseType, Cardinality};
pub use value::{Data, ProcessingValue, Value};
pub use variable::{
    AreaMapEntry, AreaMapping, InterpolationTableEntry, LookupTable, MapEntry, Mapping,
    MatchTableEntry, SessionState, Variable,
};
