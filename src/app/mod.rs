mod module_catalog;
mod module_execution;
mod usage_log;
mod usage_report;

pub use module_catalog::{InMemoryModuleCatalog, ModuleCatalog};
pub use module_execution::{
    DEFAULT_PROVIDER, ExecuteModuleCommand, ExecutionOutcome, ModuleExecutionService, RetryConfig,
};
pub use usage_log::{InMemoryUsageLog, UsageLog};
pub use usage_report::{DailyTokens, ModuleUsage, UsageReport};
