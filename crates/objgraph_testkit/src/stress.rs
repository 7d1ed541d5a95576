//! Stress tests for objgraph.
//!
//! These tests verify behavior under heavy load and concurrent access. They
//! expect the fixture schemas to be registered.

use crate::fixtures::scenarios;
use objgraph_core::{Database, Graph};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
    /// Operations per second.
    pub ops_per_second: f64,
}

impl StressTestResult {
    /// Creates a new result.
    #[allow(clippy::cast_precision_loss)]
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        let total = successful + failed;
        let ops_per_second = if duration.as_secs_f64() > 0.0 {
            total as f64 / duration.as_secs_f64()
        } else {
            0.0
        };

        Self {
            total_ops: total,
            successful_ops: successful,
            failed_ops: failed,
            duration,
            ops_per_second,
        }
    }

    /// Prints a summary of the test.
    pub fn print_summary(&self, name: &str) {
        println!("\n=== {name} ===");
        println!("Total operations: {}", self.total_ops);
        println!("Successful: {}", self.successful_ops);
        println!("Failed: {}", self.failed_ops);
        println!("Duration: {:?}", self.duration);
        println!("Throughput: {:.2} ops/sec", self.ops_per_second);
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of operations to perform.
    pub operations: usize,
    /// Number of concurrent threads (for concurrent tests).
    pub threads: usize,
    /// Number of distinct entities.
    pub entity_count: usize,
    /// Employees per department in graph saves.
    pub staff_size: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 10_000,
            threads: 4,
            entity_count: 1_000,
            staff_size: 8,
        }
    }
}

fn save_pessoa(db: &Database, graph: &mut Graph, id: &str, email: &str) -> bool {
    let Ok(p) = db.create(graph, "Pessoa") else {
        return false;
    };
    graph.set(p, "id", id).is_ok()
        && graph.set(p, "nome", id).is_ok()
        && graph.set(p, "email", email).is_ok()
        && db.save(graph, p).is_ok()
}

/// Run a sequential save stress test, overwriting `entity_count` people.
pub fn stress_sequential_saves(db: &Database, config: &StressConfig) -> StressTestResult {
    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..config.operations {
        let slot = i % config.entity_count;
        let mut graph = Graph::new();
        if save_pessoa(db, &mut graph, &format!("p-{slot}"), &format!("{slot}@x")) {
            successful += 1;
        } else {
            failed += 1;
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}

/// Run a sequential load stress test.
pub fn stress_sequential_loads(db: &Database, config: &StressConfig) -> StressTestResult {
    for slot in 0..config.entity_count {
        let mut graph = Graph::new();
        save_pessoa(db, &mut graph, &format!("p-{slot}"), &format!("{slot}@x"));
    }

    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..config.operations {
        let id = format!("p-{}", i % config.entity_count);
        match db.load("Pessoa", &id) {
            Ok(Some(_)) => successful += 1,
            Ok(None) | Err(_) => failed += 1,
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}

/// Run a department save stress test. Each save writes the department and
/// `staff_size` owned employees.
pub fn stress_graph_saves(db: &Database, config: &StressConfig) -> StressTestResult {
    let staff: Vec<String> = (0..config.staff_size).map(|i| format!("F{i}")).collect();
    let staff: Vec<&str> = staff.iter().map(String::as_str).collect();

    let start = Instant::now();
    let mut successful = 0usize;
    let mut failed = 0usize;

    for i in 0..config.operations {
        let mut graph = Graph::new();
        let (d, _) = scenarios::department(db, &mut graph, &format!("D{i}"), &staff);
        match db.save(&mut graph, d) {
            Ok(_) => successful += 1,
            Err(_) => failed += 1,
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}

/// Run a concurrent save stress test, each thread writing its own people.
pub fn stress_concurrent_saves(db: Arc<Database>, config: &StressConfig) -> StressTestResult {
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));
    let ops_per_thread = config.operations / config.threads;

    let start = Instant::now();

    let handles: Vec<_> = (0..config.threads)
        .map(|t| {
            let db = Arc::clone(&db);
            let successful = Arc::clone(&successful);
            let failed = Arc::clone(&failed);

            thread::spawn(move || {
                let mut graph = Graph::new();
                for i in 0..ops_per_thread {
                    let id = format!("t{t}-{i}");
                    if save_pessoa(&db, &mut graph, &id, &format!("{id}@x")) {
                        successful.fetch_add(1, Ordering::Relaxed);
                    } else {
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

/// Run a unique contention test: every thread saves a different person with
/// the same email, `operations` times per round.
///
/// Exactly one save per round can succeed.
pub fn stress_unique_contention(db: Arc<Database>, config: &StressConfig) -> StressTestResult {
    let successful = Arc::new(AtomicUsize::new(0));
    let failed = Arc::new(AtomicUsize::new(0));

    let start = Instant::now();

    for round in 0..config.operations {
        let handles: Vec<_> = (0..config.threads)
            .map(|t| {
                let db = Arc::clone(&db);
                let successful = Arc::clone(&successful);
                let failed = Arc::clone(&failed);

                thread::spawn(move || {
                    let mut graph = Graph::new();
                    let id = format!("r{round}-t{t}");
                    if save_pessoa(&db, &mut graph, &id, &format!("round{round}@x")) {
                        successful.fetch_add(1, Ordering::Relaxed);
                    } else {
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("Thread panicked");
        }
    }

    StressTestResult::new(
        successful.load(Ordering::Relaxed),
        failed.load(Ordering::Relaxed),
        start.elapsed(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::schemas;

    fn create_test_db() -> Database {
        let db = Database::open_in_memory();
        schemas::register_all(&db);
        db
    }

    #[test]
    fn test_sequential_saves() {
        let db = create_test_db();
        let config = StressConfig {
            operations: 1_000,
            entity_count: 100,
            ..Default::default()
        };

        let result = stress_sequential_saves(&db, &config);
        assert_eq!(result.failed_ops, 0);
        assert_eq!(result.successful_ops, 1_000);
        assert_eq!(db.get_all_ids("Pessoa").unwrap().len(), 100);
    }

    #[test]
    fn test_sequential_loads() {
        let db = create_test_db();
        let config = StressConfig {
            operations: 1_000,
            entity_count: 100,
            ..Default::default()
        };

        let result = stress_sequential_loads(&db, &config);
        assert_eq!(result.failed_ops, 0);
    }

    #[test]
    fn test_graph_saves() {
        let db = create_test_db();
        let config = StressConfig {
            operations: 50,
            staff_size: 4,
            ..Default::default()
        };

        let result = stress_graph_saves(&db, &config);
        assert_eq!(result.failed_ops, 0);
        assert_eq!(db.get_all_ids("Funcionario").unwrap().len(), 200);
    }

    #[test]
    fn test_concurrent_saves() {
        let db = Arc::new(create_test_db());
        let config = StressConfig {
            operations: 400,
            threads: 4,
            ..Default::default()
        };

        let result = stress_concurrent_saves(Arc::clone(&db), &config);
        assert_eq!(result.failed_ops, 0);
        assert_eq!(db.get_all_ids("Pessoa").unwrap().len(), 400);
    }

    #[test]
    fn test_unique_contention() {
        let db = Arc::new(create_test_db());
        let config = StressConfig {
            operations: 20,
            threads: 4,
            ..Default::default()
        };

        let result = stress_unique_contention(Arc::clone(&db), &config);
        assert_eq!(result.successful_ops, 20);
        assert_eq!(result.failed_ops, 60);
        assert_eq!(db.get_all_ids("Pessoa").unwrap().len(), 20);
    }
}
