//! Expression and response-rule trees.
//!
//! Both trees are produced by an external item-model loader and are
//! read-only for the duration of one evaluation. `ExpressionNode` is a
//! generic tagged node so the engine can dispatch on the tag string;
//! `RuleNode` is a closed set of rule kinds.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::CoreError;
use crate::types::BaseType;

// ──────────────────────────────────────────────
// Expressions
// ──────────────────────────────────────────────

/// One node of an expression tree, e.g. `sum` with two `baseValue` children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpressionNode {
    pub tag: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub children: Vec<ExpressionNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub literal: Option<String>,
}

impl ExpressionNode {
    pub fn new(tag: impl Into<String>) -> Self {
        ExpressionNode {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
            literal: None,
        }
    }

    /// An operator node over the given operand expressions.
    pub fn operator(tag: impl Into<String>, children: Vec<ExpressionNode>) -> Self {
        ExpressionNode {
            children,
            ..Self::new(tag)
        }
    }

    /// `<baseValue baseType="..">literal</baseValue>`
    pub fn base_value(base_type: BaseType, literal: impl Into<String>) -> Self {
        Self::new("baseValue")
            .with_attr("baseType", base_type.as_str())
            .with_literal(literal)
    }

    /// `<variable identifier=".."/>`
    pub fn variable(identifier: impl Into<String>) -> Self {
        Self::new("variable").with_attr("identifier", identifier)
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_child(mut self, child: ExpressionNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_literal(mut self, literal: impl Into<String>) -> Self {
        self.literal = Some(literal.into());
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn from_json(v: &serde_json::Value) -> Result<ExpressionNode, CoreError> {
        serde_json::from_value(v.clone()).map_err(|e| CoreError::Deserialize {
            message: format!("invalid expression node: {}", e),
        })
    }
}

// ──────────────────────────────────────────────
// Response rules
// ──────────────────────────────────────────────

/// A guarded rule list: `responseIf` or one `responseElseIf`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionBranch {
    pub expression: ExpressionNode,
    pub rules: Vec<RuleNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResponseCondition {
    pub response_if: ConditionBranch,
    pub response_else_ifs: Vec<ConditionBranch>,
    pub response_else: Option<Vec<RuleNode>>,
}

/// One response rule.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleNode {
    SetOutcomeValue {
        identifier: String,
        expression: ExpressionNode,
    },
    LookupOutcomeValue {
        identifier: String,
        expression: ExpressionNode,
    },
    ResponseCondition(ResponseCondition),
    /// A nested group of rules executed in order.
    ResponseProcessingFragment(Vec<RuleNode>),
    ExitResponse,
}

impl RuleNode {
    pub fn set_outcome_value(identifier: impl Into<String>, expression: ExpressionNode) -> Self {
        RuleNode::SetOutcomeValue {
            identifier: identifier.into(),
            expression,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            RuleNode::SetOutcomeValue { .. } => "setOutcomeValue",
            RuleNode::LookupOutcomeValue { .. } => "lookupOutcomeValue",
            RuleNode::ResponseCondition(_) => "responseCondition",
            RuleNode::ResponseProcessingFragment(_) => "responseProcessingFragment",
            RuleNode::ExitResponse => "exitResponse",
        }
    }

    /// Parse a rule from tag-based JSON:
    ///
    /// ```json
    /// { "tag": "responseCondition",
    ///   "responseIf": { "expression": {...}, "rules": [...] },
    ///   "responseElseIf": [ { "expression": {...}, "rules": [...] } ],
    ///   "responseElse": { "rules": [...] } }
    /// ```
    pub fn from_json(v: &serde_json::Value) -> Result<RuleNode, CoreError> {
        let tag = get_str(v, "tag")?;
        match tag.as_str() {
            "setOutcomeValue" => Ok(RuleNode::SetOutcomeValue {
                identifier: get_str(v, "identifier")?,
                expression: parse_expression_field(v, "expression")?,
            }),
            "lookupOutcomeValue" => Ok(RuleNode::LookupOutcomeValue {
                identifier: get_str(v, "identifier")?,
                expression: parse_expression_field(v, "expression")?,
            }),
            "exitResponse" => Ok(RuleNode::ExitResponse),
            "responseProcessingFragment" => {
                Ok(RuleNode::ResponseProcessingFragment(parse_rules_field(v)?))
            }
            "responseCondition" => {
                let if_json = v.get("responseIf").ok_or_else(|| CoreError::Deserialize {
                    message: "responseCondition missing 'responseIf'".to_string(),
                })?;
                let response_if = parse_branch(if_json)?;

                let mut response_else_ifs = Vec::new();
                if let Some(branches) = v.get("responseElseIf") {
                    let branches = branches.as_array().ok_or_else(|| CoreError::Deserialize {
                        message: "'responseElseIf' must be an array".to_string(),
                    })?;
                    for b in branches {
                        response_else_ifs.push(parse_branch(b)?);
                    }
                }

                let response_else = match v.get("responseElse") {
                    None | Some(serde_json::Value::Null) => None,
                    Some(serde_json::Value::Array(_)) => {
                        Some(parse_rule_list(&v["responseElse"])?)
                    }
                    Some(obj) => Some(parse_rules_field(obj)?),
                };

                Ok(RuleNode::ResponseCondition(ResponseCondition {
                    response_if,
                    response_else_ifs,
                    response_else,
                }))
            }
            _ => Err(CoreError::UnknownRule { tag }),
        }
    }

    /// Parse an ordered rule list (a JSON array of rules).
    pub fn list_from_json(v: &serde_json::Value) -> Result<Vec<RuleNode>, CoreError> {
        parse_rule_list(v)
    }
}

fn get_str(obj: &serde_json::Value, field: &str) -> Result<String, CoreError> {
    obj.get(field)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| CoreError::Deserialize {
            message: format!("missing string field '{}'", field),
        })
}

fn parse_expression_field(v: &serde_json::Value, field: &str) -> Result<ExpressionNode, CoreError> {
    let expr = v.get(field).ok_or_else(|| CoreError::Deserialize {
        message: format!("missing expression field '{}'", field),
    })?;
    ExpressionNode::from_json(expr)
}

fn parse_rules_field(v: &serde_json::Value) -> Result<Vec<RuleNode>, CoreError> {
    match v.get("rules") {
        Some(rules) => parse_rule_list(rules),
        None => Ok(Vec::new()),
    }
}

fn parse_rule_list(v: &serde_json::Value) -> Result<Vec<RuleNode>, CoreError> {
    let items = v.as_array().ok_or_else(|| CoreError::Deserialize {
        message: "rule list must be an array".to_string(),
    })?;
    items.iter().map(RuleNode::from_json).collect()
}

fn parse_branch(v: &serde_json::Value) -> Result<ConditionBranch, CoreError> {
    Ok(ConditionBranch {
        expression: parse_expression_field(v, "expression")?,
        rules: parse_rules_field(v)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expression_node_defaults() {
        let node = ExpressionNode::from_json(&json!({ "tag": "null" })).unwrap();
        assert_eq!(node, ExpressionNode::new("null"));
    }

    #[test]
    fn expression_node_builders() {
        let node = ExpressionNode::base_value(BaseType::Integer, "3");
        assert_eq!(node.attribute("baseType"), Some("integer"));
        assert_eq!(node.literal.as_deref(), Some("3"));
        let sum = ExpressionNode::operator("sum", vec![node.clone(), node]);
        assert_eq!(sum.children.len(), 2);
    }

    #[test]
    fn parse_response_condition() {
        let rule = RuleNode::from_json(&json!({
            "tag": "responseCondition",
            "responseIf": {
                "expression": { "tag": "isNull", "children": [ { "tag": "variable", "attributes": { "identifier": "RESPONSE" } } ] },
                "rules": [ { "tag": "exitResponse" } ]
            },
            "responseElseIf": [
                { "expression": { "tag": "null" }, "rules": [] }
            ],
            "responseElse": [
                { "tag": "setOutcomeValue", "identifier": "SCORE", "expression": { "tag": "baseValue", "attributes": { "baseType": "integer" }, "literal": "1" } }
            ]
        }))
        .unwrap();
        match rule {
            RuleNode::ResponseCondition(cond) => {
                assert_eq!(cond.response_if.rules, vec![RuleNode::ExitResponse]);
                assert_eq!(cond.response_else_ifs.len(), 1);
                assert_eq!(cond.response_else.unwrap().len(), 1);
            }
            other => panic!("expected responseCondition, got {:?}", other),
        }
    }

    #[test]
    fn unknown_rule_tag() {
        let err = RuleNode::from_json(&json!({ "tag": "setTemplateValue" })).unwrap_err();
        assert_eq!(
            err,
            CoreError::UnknownRule {
                tag: "setTemplateValue".to_string()
            }
        );
    }

    #[test]
    fn rule_list_and_fragment() {
        let rules = RuleNode::list_from_json(&json!([
            { "tag": "responseProcessingFragment", "rules": [ { "tag": "exitResponse" } ] }
        ]))
        .unwrap();
        assert_eq!(
            rules,
            vec![RuleNode::ResponseProcessingFragment(vec![
                RuleNode::ExitResponse
            ])]
        );
        assert_eq!(rules[0].tag(), "responseProcessingFragment");
    }
}
