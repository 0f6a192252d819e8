use crate::domains::logger::DomainLogger;
use std::sync::Arc;
use tokio::sync::mpsc;

enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

struct LogMessage {
    level: Level,
    msg: String,
}

/// Non-blocking buffered logger: the control loop only enqueues, a background
/// task forwards to `bridge`. Messages are dropped when the buffer is full.
/// Must be created inside a tokio runtime.
pub fn init_buffered_logger(bridge: Arc<dyn DomainLogger>, capacity: usize) -> Arc<dyn DomainLogger> {
    let (tx, mut rx) = mpsc::channel::<LogMessage>(capacity.max(1));

    let bridge_task = bridge.clone();
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match msg.level {
                Level::Debug => bridge_task.debug(&msg.msg),
                Level::Info => bridge_task.info(&msg.msg),
                Level::Warn => bridge_task.warn(&msg.msg),
                Level::Error => bridge_task.error(&msg.msg),
            }
        }
    });

    struct BufferedLogger {
        sender: mpsc::Sender<LogMessage>,
    }

    impl BufferedLogger {
        fn enqueue(&self, level: Level, msg: &str) {
            let _ = self.sender.try_send(LogMessage { level, msg: msg.to_string() });
        }
    }

    impl DomainLogger for BufferedLogger {
        fn info(&self, msg: &str) {
            self.enqueue(Level::Info, msg);
        }

        fn warn(&self, msg: &str) {
            self.enqueue(Level::Warn, msg);
        }

        fn error(&self, msg: &str) {
            self.enqueue(Level::Error, msg);
        }

        fn debug(&self, msg: &str) {
            self.enqueue(Level::Debug, msg);
        }
    }

    Arc::new(BufferedLogger { sender: tx })
}
