pub mod result_slot;
pub mod scheduler;
pub mod sync;
pub mod task;
pub mod threaded;

pub use result_slot::ResultSlot;
pub use scheduler::{SchedulerConfig, SchedulerConfigBuilder, TaskScheduler};
pub use sync::Semaphore;
pub use task::{KeyValue, Task, TaskKey};
pub use threaded::{PipedTask, Signal, SignalSource, ThreadedTask};
