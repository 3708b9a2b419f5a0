//! Well-known attribute, operation, and header names of the management model.

pub const ADDRESS: &str = "address";
pub const COMPOSITE: &str = "composite";
pub const FAILED: &str = "failed";
pub const FAILURE_DESCRIPTION: &str = "failure-description";
pub const HOST: &str = "host";
pub const INHERITED: &str = "inherited";
pub const LOCALE: &str = "locale";
pub const OP: &str = "operation";
pub const OPERATIONS: &str = "operations";
pub const OPERATION_HEADERS: &str = "operation-headers";
pub const OUTCOME: &str = "outcome";
pub const PROCESS_STATE: &str = "process-state";
pub const PROXIES: &str = "proxies";
pub const READ_RESOURCE_DESCRIPTION_OPERATION: &str = "read-resource-description";
pub const RECURSIVE: &str = "recursive";
pub const RELOAD_REQUIRED: &str = "reload-required";
pub const RESPONSE: &str = "response";
pub const RESPONSE_HEADERS: &str = "response-headers";
pub const RESTART_REQUIRED: &str = "restart-required";
pub const RESULT: &str = "result";
pub const ROLES: &str = "roles";
pub const SERVER_GROUPS: &str = "server-groups";
pub const STEPS: &str = "steps";
pub const SUCCESS: &str = "success";
pub const WHOAMI: &str = "whoami";
