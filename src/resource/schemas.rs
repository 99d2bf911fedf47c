//! Custom schema functions, used where the derived `JsonSchema` impl
//! can't express a Kubernetes-specific constraint on its own.
use schemars::{gen::SchemaGenerator, schema::Schema};
use serde_json::{from_value, json};

/// A TCP port number, either a cluster backend port or a listener port.
pub fn port(_: &mut SchemaGenerator) -> Schema {
    from_value(json!({
        "type": "integer",
        "minimum": 1,
        "maximum": 65535,
    }))
    .unwrap()
}

/// A non-negative traffic-split weight.
pub fn weight(_: &mut SchemaGenerator) -> Schema {
    from_value(json!({
        "type": "integer",
        "format": "int64",
        "minimum": 0,
    }))
    .unwrap()
}
