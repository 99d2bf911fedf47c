//! Policy validators (§4.5): each takes a wire-format CRD fragment and
//! either rejects it or resolves it into the corresponding DAG type.

pub mod cors;
pub mod extension;
pub mod slow_start;
pub mod tls;
