//! # Console Reporting Module / 控制台报告模块
//!
//! This module prints result trees, per-case progress and collection problems
//! to the console, coloured and localized.
//!
//! 此模块将结果树、逐用例进度和收集问题以彩色、本地化的形式打印到控制台。

use colored::*;

use crate::core::error::CollectReport;
use crate::core::models::ResultRecord;
use crate::infra::t;

/// Localized status word for a record.
pub fn status_str(record: &ResultRecord, locale: &str) -> String {
    if record.is_success() {
        t!("status.passed", locale = locale).to_string()
    } else {
        t!("status.failed", locale = locale).to_string()
    }
}

fn colored_status(record: &ResultRecord, locale: &str) -> ColoredString {
    let status = status_str(record, locale);
    if record.is_success() {
        status.green()
    } else {
        status.red()
    }
}

/// Prints the result tree with assertion and error counts per node.
///
/// 打印结果树，并显示每个节点的断言数和错误数。
///
/// # Output Format / 输出格式
/// ```text
/// --- Test Summary ---
///   Passed   | default_tests                          (3 assertions, 0 errors)
///     Passed   | default_tests::model_e_coli          (1 assertions, 0 errors)
///   Failed   | test_fluxes.json                       (2 assertions, 1 errors)
/// ```
pub fn print_summary(root: &ResultRecord, locale: &str) {
    println!("\n{}", t!("test_summary_banner", locale = locale).bold());

    for child in root.children() {
        print_node(child, 1, locale);
    }

    let (assertions, errors) = root.log_count();
    println!(
        "\n{}",
        t!(
            "summary_totals",
            locale = locale,
            assertions = assertions,
            errors = errors
        )
    );
    if root.is_success() {
        println!("{}", t!("all_tests_passed", locale = locale).green().bold());
    } else {
        println!("{}", t!("some_tests_failed", locale = locale).red().bold());
    }
}

fn print_node(record: &ResultRecord, depth: usize, locale: &str) {
    let (assertions, errors) = record.log_count();
    let indent = "  ".repeat(depth);
    println!(
        "{}{:<8} | {:<48} {}",
        indent,
        colored_status(record, locale),
        record.id(),
        t!(
            "node_counts",
            locale = locale,
            assertions = assertions,
            errors = errors
        )
        .dimmed()
    );
    for child in record.children() {
        print_node(child, depth + 1, locale);
    }
}

/// Prints one line for a finished case. Uses the global locale.
pub fn print_case_progress(record: &ResultRecord) {
    let locale = rust_i18n::locale();
    let (assertions, errors) = record.log_count();
    println!(
        "  - {:<8} | {} {}",
        colored_status(record, &*locale),
        record.id().cyan(),
        t!(
            "node_counts",
            locale = &*locale,
            assertions = assertions,
            errors = errors
        )
        .dimmed()
    );
}

/// Prints every problem found while collecting. Uses the global locale.
pub fn print_collection_errors(report: &CollectReport) {
    if report.is_clean() {
        return;
    }
    let locale = rust_i18n::locale();

    println!(
        "\n{}",
        t!("collection_errors_banner", locale = &*locale, count = report.len())
            .yellow()
            .bold()
    );
    for e in &report.load_errors {
        println!("  - [{}] {}", t!("error_kind.load", locale = &*locale).red(), e);
    }
    for e in &report.syntax_errors {
        println!("  - [{}] {}", t!("error_kind.syntax", locale = &*locale).red(), e);
    }
    for e in &report.invalid_tests {
        println!("  - [{}] {}", t!("error_kind.schema", locale = &*locale).red(), e);
    }
    for e in &report.module_errors {
        println!("  - [{}] {}", t!("error_kind.module", locale = &*locale).red(), e);
    }
}

/// Every record below `root` that carries errors of its own, depth first.
pub fn failing_records(root: &ResultRecord) -> Vec<&ResultRecord> {
    let mut failing = Vec::new();
    collect_failing(root, &mut failing);
    failing
}

fn collect_failing<'a>(record: &'a ResultRecord, out: &mut Vec<&'a ResultRecord>) {
    if !record.error().is_empty() {
        out.push(record);
    }
    for child in record.children() {
        collect_failing(child, out);
    }
}

/// Prints error entries and captured output of every failing record.
///
/// 打印每个失败记录的错误条目和捕获的输出。
pub fn print_failure_details(root: &ResultRecord, locale: &str) {
    let failing = failing_records(root);
    if failing.is_empty() {
        return;
    }

    println!("\n{}", t!("failure_details_banner", locale = locale).red().bold());
    println!("{}", "-".repeat(80));

    for (i, record) in failing.iter().enumerate() {
        let id = if record.id().is_empty() {
            t!("root_record", locale = locale).to_string()
        } else {
            record.id().to_string()
        };
        println!("[{}/{}] '{}'", i + 1, failing.len(), id.cyan());
        for entry in record.error() {
            println!("    {} {} {}", "x".red(), entry.message, entry.tag.dimmed());
        }
        for entry in record.warnings() {
            println!("    {} {} {}", "!".yellow(), entry.message, entry.tag.dimmed());
        }
        if let Some(output) = record.std_out() {
            println!("\n--- {} ---\n", t!("captured_output", locale = locale).yellow());
            println!("{}", output.trim_end());
        }
        println!("{}", "-".repeat(80));
    }
}
