mod base;

pub use base::{
    EventBus, EventBusReporter, EventEmitter, ExecutionEvent, ExecutionLog, LogEntry, LogLevel,
};
