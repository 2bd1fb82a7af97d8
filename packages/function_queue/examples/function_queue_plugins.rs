//! A plugin host that accepts plugin registrations before its setup has finished.
//!
//! Run with `RUST_LOG=function_queue=trace` to see the queue's own log events.

use std::cell::RefCell;

use function_queue::{DeferredExecution, FunctionQueue};
use futures::executor::block_on;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

struct PluginHost {
    plugins: RefCell<Vec<&'static str>>,
    setup: FunctionQueue<Self>,
}

impl PluginHost {
    fn new() -> Self {
        Self {
            plugins: RefCell::new(Vec::new()),
            setup: FunctionQueue::builder()
                .on_executed(|| println!("Setup finished, plugin hooks now run immediately"))
                .build(),
        }
    }

    fn register(&self, name: &'static str) -> usize {
        let mut plugins = self.plugins.borrow_mut();
        plugins.push(name);
        println!("Registered plugin '{name}'");
        plugins.len()
    }
}

impl DeferredExecution for PluginHost {
    fn function_queue(&self) -> &FunctionQueue<Self> {
        &self.setup
    }
}

fn main() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .expect("info filter is valid");

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(env_filter)
        .init();

    println!("=== Function queue plugin host example ===");

    let host = PluginHost::new();

    let spellcheck = host.enqueue(|host| host.register("spellcheck"));
    let formatter = host.enqueue(|host| host.register("formatter"));

    println!(
        "Before setup: {} plugins registered, {} waiting",
        host.plugins.borrow().len(),
        host.function_queue().len()
    );

    host.execute();

    let late = host.enqueue(|host| host.register("git"));

    for (name, promise) in [("spellcheck", spellcheck), ("formatter", formatter), ("git", late)] {
        let position = block_on(promise).expect("registration does not panic");
        println!("'{name}' ended up at position {position}");
    }

    match host.try_enqueue::<(), _>("not a callback") {
        Ok(_) => println!("Unexpectedly accepted a string"),
        Err(error) => println!("Rejected bad input: {error}"),
    }

    println!("Example completed successfully!");
}
