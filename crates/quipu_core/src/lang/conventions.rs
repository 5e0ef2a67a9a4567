//! Shared generator conventions (well-known emitted identifiers).

/// Runtime crate referenced by generated imports.
pub const RUNTIME_CRATE: &str = "quipu_rt";

/// Field that carries a service call's return value in its result struct.
pub const SERVICE_RESULT_VARIABLE: &str = "result_value";

/// Suffix carried by every service-call result struct name.
pub const RESULT_STRUCT_SUFFIX: &str = "Result";

/// Generic type parameters attached to generated sync clients.
pub const SYNC_CLIENT_BOUND_VARS: &str = "<IP, OP>";

/// Trait bounds attached to generated sync clients.
pub const SYNC_CLIENT_BOUNDS: &str = "where IP: InputProtocol, OP: OutputProtocol";
