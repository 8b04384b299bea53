//! Test runner - executes tests sequentially and reports results

use colored::Colorize;
use std::future::Future;
use std::pin::Pin;
use std::time::Instant;

use crate::types::{SharedBackendState, TestResult};

type TestFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// A single registered test
pub struct TestCase {
    pub name: &'static str,
    pub description: &'static str,
    pub run: Box<dyn Fn(TestContext) -> TestFuture + Send + Sync>,
}

/// Context passed to each test - proxy address and mock Fish Audio state
#[derive(Clone)]
pub struct TestContext {
    pub proxy_addr: String,
    pub upstream_addr: String,
    pub backend_state: SharedBackendState,
    pub http_client: reqwest::Client,
}

impl TestContext {
    /// Forget queued responses and recorded requests from the previous test
    fn reset_backend(&self) {
        let mut state = self.backend_state.lock().unwrap();
        state.response_queue.clear();
        state.received_requests.clear();
    }
}

/// Outcome of a whole run
pub struct Summary {
    pub results: Vec<TestResult>,
}

impl Summary {
    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }

    fn failed(&self) -> impl Iterator<Item = &TestResult> {
        self.results.iter().filter(|r| !r.passed)
    }
}

const RULE: &str = "═══════════════════════════════════════════════════";

/// Run the selected test cases one at a time against a shared mock backend
pub async fn run_tests(cases: Vec<TestCase>, ctx: TestContext, filter: Option<&str>) -> Summary {
    let selected: Vec<&TestCase> = cases
        .iter()
        .filter(|c| filter.map_or(true, |f| c.name.contains(f)))
        .collect();

    println!("\n{}", RULE.bright_blue());
    println!("{}", "  fish-proxy End-to-End Tests".bright_white().bold());
    println!("{}", RULE.bright_blue());
    println!("  Proxy:    {}", ctx.proxy_addr.bright_cyan());
    println!("  Upstream: {} (mock Fish Audio)", ctx.upstream_addr.bright_cyan());
    println!("  Running:  {} test(s)\n", selected.len().to_string().bright_cyan());

    let mut results = Vec::with_capacity(selected.len());
    for case in selected {
        ctx.reset_backend();
        print!("  {} {} ... ", "▶".bright_blue(), case.name.bright_white());

        let start = Instant::now();
        let outcome = (case.run)(ctx.clone()).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        let error = match outcome {
            Ok(()) => {
                println!("{} ({duration_ms}ms)", "PASS".bright_green().bold());
                None
            }
            Err(e) => {
                println!("{} ({duration_ms}ms)", "FAIL".bright_red().bold());
                for (depth, cause) in e.chain().enumerate() {
                    let label = if depth == 0 { "Error:" } else { "Caused by:" };
                    println!("    {} {}", label.bright_red(), cause);
                }
                Some(e.to_string())
            }
        };

        results.push(TestResult {
            name: case.name.to_string(),
            passed: error.is_none(),
            error,
            duration_ms,
        });
    }

    let summary = Summary { results };
    print_summary(&summary);
    summary
}

fn print_summary(summary: &Summary) {
    let total = summary.results.len();
    let failed: Vec<&TestResult> = summary.failed().collect();

    println!("\n{}", "───────────────────────────────────────────────────".bright_blue());
    let line = format!("  Results: {} passed, {} failed", total - failed.len(), failed.len());
    if failed.is_empty() {
        println!("{}", line.bright_green().bold());
    } else {
        println!("{}", line.bright_red().bold());
        for result in failed {
            println!("    {} {}", "✗".bright_red(), result.name);
        }
    }
    println!("{}\n", RULE.bright_blue());
}

/// List all available tests, grouped by the prefix before the first '/'
pub fn list_tests(cases: &[TestCase]) {
    println!("\n{}", "Available tests:".bright_white().bold());
    let mut current_group = "";
    for case in cases {
        let group = case.name.split('/').next().unwrap_or("");
        if group != current_group {
            println!("\n  {}", group.bright_white());
            current_group = group;
        }
        println!("    {} - {}", case.name.bright_cyan(), case.description);
    }
    println!();
}
