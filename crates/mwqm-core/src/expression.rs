//! Serialized Earth Engine expression graphs.
//!
//! An [`Expression`] is a table of named [`ValueNode`]s plus the name of the
//! result node. Nodes may point at each other through `valueReference`;
//! [`Expression::resolve`] inlines those references into a single tree.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::RemoteError;

/// One node of an expression graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueNode {
    ConstantValue(JsonValue),
    FunctionInvocationValue(FunctionInvocation),
    ArrayValue(ArrayValue),
    DictionaryValue(DictionaryValue),
    ValueReference(String),
}

/// A call of a named server-side algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionInvocation {
    pub function_name: String,
    #[serde(default)]
    pub arguments: BTreeMap<String, ValueNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    pub values: Vec<ValueNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictionaryValue {
    pub values: BTreeMap<String, ValueNode>,
}

impl ValueNode {
    #[must_use]
    pub fn constant(value: impl Into<JsonValue>) -> Self {
        Self::ConstantValue(value.into())
    }

    /// Invoke `function_name` with named arguments.
    #[must_use]
    pub fn invoke<I, K>(function_name: impl Into<String>, arguments: I) -> Self
    where
        I: IntoIterator<Item = (K, ValueNode)>,
        K: Into<String>,
    {
        Self::FunctionInvocationValue(FunctionInvocation {
            function_name: function_name.into(),
            arguments: arguments
                .into_iter()
                .map(|(name, node)| (name.into(), node))
                .collect(),
        })
    }

    #[must_use]
    pub fn array(values: Vec<ValueNode>) -> Self {
        Self::ArrayValue(ArrayValue { values })
    }

    #[must_use]
    pub fn dictionary(values: BTreeMap<String, ValueNode>) -> Self {
        Self::DictionaryValue(DictionaryValue { values })
    }

    /// Name of the invoked function, if this node is an invocation.
    #[must_use]
    pub fn function_name(&self) -> Option<&str> {
        match self {
            Self::FunctionInvocationValue(call) => Some(&call.function_name),
            _ => None,
        }
    }
}

/// A complete expression graph as accepted by the REST API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    pub result: String,
    pub values: BTreeMap<String, ValueNode>,
}

impl Expression {
    /// Wrap a self-contained node as a single-entry graph.
    #[must_use]
    pub fn from_node(node: ValueNode) -> Self {
        let mut values = BTreeMap::new();
        values.insert("0".to_string(), node);
        Self {
            result: "0".to_string(),
            values,
        }
    }

    /// Inline every `valueReference`, returning the result node as a tree.
    ///
    /// # Errors
    ///
    /// Returns [`RemoteError::Expression`] for a dangling or cyclic reference.
    pub fn resolve(&self) -> Result<ValueNode, RemoteError> {
        let mut visiting = HashSet::new();
        self.resolve_reference(&self.result, &mut visiting)
    }

    fn resolve_reference(
        &self,
        name: &str,
        visiting: &mut HashSet<String>,
    ) -> Result<ValueNode, RemoteError> {
        let node = self.values.get(name).ok_or_else(|| RemoteError::Expression {
            message: format!("reference '{name}' is not defined"),
        })?;
        if !visiting.insert(name.to_string()) {
            return Err(RemoteError::Expression {
                message: format!("reference '{name}' is cyclic"),
            });
        }
        let resolved = self.resolve_node(node, visiting)?;
        visiting.remove(name);
        Ok(resolved)
    }

    fn resolve_node(
        &self,
        node: &ValueNode,
        visiting: &mut HashSet<String>,
    ) -> Result<ValueNode, RemoteError> {
        Ok(match node {
            ValueNode::ValueReference(name) => self.resolve_reference(name, visiting)?,
            ValueNode::ConstantValue(_) => node.clone(),
            ValueNode::FunctionInvocationValue(call) => {
                let mut arguments = BTreeMap::new();
                for (key, arg) in &call.arguments {
                    arguments.insert(key.clone(), self.resolve_node(arg, visiting)?);
                }
                ValueNode::FunctionInvocationValue(FunctionInvocation {
                    function_name: call.function_name.clone(),
                    arguments,
                })
            },
            ValueNode::ArrayValue(array) => ValueNode::array(
                array
                    .values
                    .iter()
                    .map(|value| self.resolve_node(value, visiting))
                    .collect::<Result<_, _>>()?,
            ),
            ValueNode::DictionaryValue(dict) => {
                let mut values = BTreeMap::new();
                for (key, value) in &dict.values {
                    values.insert(key.clone(), self.resolve_node(value, visiting)?);
                }
                ValueNode::dictionary(values)
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_in_rest_shape() {
        let node = ValueNode::invoke(
            "Image.load",
            [("id", ValueNode::constant("JRC/GSW1_4/GlobalSurfaceWater"))],
        );
        let value = serde_json::to_value(Expression::from_node(node)).unwrap();
        assert_eq!(
            value,
            json!({
                "result": "0",
                "values": {
                    "0": {
                        "functionInvocationValue": {
                            "functionName": "Image.load",
                            "arguments": {"id": {"constantValue": "JRC/GSW1_4/GlobalSurfaceWater"}}
                        }
                    }
                }
            })
        );
    }

    #[test]
    fn resolves_references() {
        let expression: Expression = serde_json::from_value(json!({
            "result": "1",
            "values": {
                "0": {"constantValue": "USGS/SRTMGL1_003"},
                "1": {"functionInvocationValue": {
                    "functionName": "Image.load",
                    "arguments": {"id": {"valueReference": "0"}}
                }}
            }
        }))
        .unwrap();

        let resolved = expression.resolve().unwrap();
        assert_eq!(
            resolved,
            ValueNode::invoke("Image.load", [("id", ValueNode::constant("USGS/SRTMGL1_003"))])
        );
    }

    #[test]
    fn dangling_reference_fails() {
        let expression: Expression = serde_json::from_value(json!({
            "result": "0",
            "values": {"0": {"valueReference": "7"}}
        }))
        .unwrap();
        let err = expression.resolve().unwrap_err();
        assert!(err.to_string().contains("'7' is not defined"));
    }

    #[test]
    fn cycle_fails() {
        let expression: Expression = serde_json::from_value(json!({
            "result": "a",
            "values": {
                "a": {"arrayValue": {"values": [{"valueReference": "b"}]}},
                "b": {"valueReference": "a"}
            }
        }))
        .unwrap();
        assert!(expression.resolve().unwrap_err().to_string().contains("cyclic"));
    }

    #[test]
    fn shared_reference_is_not_a_cycle() {
        let expression: Expression = serde_json::from_value(json!({
            "result": "pair",
            "values": {
                "x": {"constantValue": 1},
                "pair": {"arrayValue": {"values": [{"valueReference": "x"}, {"valueReference": "x"}]}}
            }
        }))
        .unwrap();
        let resolved = expression.resolve().unwrap();
        assert_eq!(
            resolved,
            ValueNode::array(vec![ValueNode::constant(1), ValueNode::constant(1)])
        );
    }
}
