use anyhow::{Context, Result};
use chrono::Local;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use crate::binding::{format_inputs, Input, Output};

/// Appends timestamped lines to `<log_dir>/session_<timestamp>.log`.
#[derive(Debug, Clone)]
pub struct Logger {
    log_file: PathBuf,
}

/// Callback invocation counters, served at `/api/stats`.
#[derive(Debug, Default, Clone, Serialize)]
pub struct CallbackMetrics {
    pub total_calls: usize,
    pub successful_calls: usize,
    pub failed_calls: usize,
}

impl CallbackMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, success: bool) {
        self.total_calls += 1;
        if success {
            self.successful_calls += 1;
        } else {
            self.failed_calls += 1;
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_calls == 0 {
            return 0.0;
        }
        (self.successful_calls as f64 / self.total_calls as f64) * 100.0
    }

    pub fn display(&self) {
        use colored::Colorize;
        println!("\n{}", "━━━━━━━━━ Callback Statistics ━━━━━━━━━".bright_cyan().bold());
        println!("Total calls: {}", self.total_calls);
        println!("Successful calls: {}", self.successful_calls.to_string().green());
        println!("Failed calls: {}", self.failed_calls.to_string().red());
        println!("Success rate: {:.1}%", self.success_rate());
        println!("{}", "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━".bright_cyan());
    }
}

impl Logger {
    pub fn new(log_dir: &str) -> Result<Self> {
        let dir = PathBuf::from(log_dir);
        if !dir.exists() {
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create log directory {:?}", dir))?;
        }

        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let log_file = dir.join(format!("session_{}.log", timestamp));

        Ok(Self { log_file })
    }

    pub fn path(&self) -> &PathBuf {
        &self.log_file
    }

    pub fn log(&self, message: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file)?;

        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        writeln!(file, "[{}] {}", timestamp, message)?;
        Ok(())
    }

    pub fn log_registration(&self, handler: &str, output: &Output, inputs: &[Input]) -> Result<()> {
        self.log(&format!(
            "REGISTER {}: {} <- {}",
            handler,
            output,
            format_inputs(inputs)
        ))
    }

    pub fn log_invocation(&self, output: &str, success: bool, detail: &str) -> Result<()> {
        let status = if success { "OK" } else { "FAILED" };
        self.log(&format!("CALLBACK {} {}: {}", output, status, detail))
    }

    pub fn log_error(&self, error: &str) -> Result<()> {
        self.log(&format!("ERROR: {}", error))
    }
}
