//! Callbacks that return futures, driven by a local executor.
//!
//! The queue starts the callbacks in the order they were enqueued but does not wait for their
//! futures, so the quick one finishes before the slow one.

use std::rc::Rc;

use function_queue::FunctionQueue;
use futures::channel::oneshot;
use futures::executor::LocalPool;
use futures::future::join;

fn main() {
    println!("=== Function queue async example ===");

    let mut pool = LocalPool::new();
    let owner = Rc::new("download manager".to_string());

    let queue = FunctionQueue::<Rc<String>>::builder()
        .spawner(pool.spawner())
        .build();

    let (release, gate) = oneshot::channel::<()>();

    let slow = queue.enqueue_async(&owner, move |owner| {
        let owner = Rc::clone(owner);
        println!("Slow callback started");
        async move {
            gate.await.expect("the gate is released below");
            format!("slow callback finished for {owner}")
        }
    });

    let quick = queue.enqueue_async(&owner, |owner| {
        let owner = Rc::clone(owner);
        println!("Quick callback started");
        async move { format!("quick callback finished for {owner}") }
    });

    queue.flush(&owner);

    println!("{}", pool.run_until(quick).expect("quick callback succeeds"));

    release.send(()).expect("slow callback is waiting on the gate");

    let (slow, late) = pool.run_until(join(
        slow,
        queue.enqueue(&owner, |owner| format!("late callback ran at once for {owner}")),
    ));

    println!("{}", slow.expect("slow callback succeeds"));
    println!("{}", late.expect("late callback succeeds"));

    println!("Example completed successfully!");
}
