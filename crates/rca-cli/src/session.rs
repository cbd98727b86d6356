use anyhow::{Context, Result};
use rca_core::{
    Contract, MonitorSnapshot, Monitoring, Sample, SampleFormat, Signature, StepReport, Verdict,
    build_monitor,
};
use rca_store::{RcaConfig, RunStore};
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Output {
    /// Classic snapshot after every step.
    Text,
    /// One JSON object per step.
    Json,
    /// Final verdict only.
    Quiet,
}

#[derive(Serialize)]
struct StepLine<'a> {
    line: usize,
    report: &'a StepReport,
    snapshot: MonitorSnapshot,
}

#[derive(Serialize)]
struct Summary {
    contract: String,
    steps: u64,
    verdict: Verdict,
}

struct Recorder {
    store: RunStore,
    run_id: Uuid,
}

/// A monitor fed from sample lines, optionally archived step by step.
pub struct Session {
    name: String,
    monitor: Box<dyn Monitoring>,
    signature: Signature,
    format: SampleFormat,
    output: Output,
    recorder: Option<Recorder>,
    lines: usize,
    steps: u64,
}

impl Session {
    pub fn new(contract: Contract, config: &RcaConfig, output: Output) -> Result<Self> {
        let name = contract.name.clone();
        let signature = contract.signature.clone();
        let monitor = build_monitor(contract, &config.monitor)
            .with_context(|| format!("invalid contract '{name}'"))?;
        tracing::info!(contract = %name, "monitor ready");
        Ok(Self {
            name,
            monitor,
            signature,
            format: config.driver.format.clone(),
            output,
            recorder: None,
            lines: 0,
            steps: 0,
        })
    }

    /// Archive every following step under a new run.
    pub fn record_to(&mut self, store: RunStore, source: &str) -> Result<Uuid> {
        let run_id = store
            .begin_run(&self.name, source)
            .context("failed to begin run")?;
        tracing::info!(%run_id, "recording run");
        self.recorder = Some(Recorder { store, run_id });
        Ok(run_id)
    }

    /// Feed one log line. Blank lines and `#` comments are skipped.
    pub fn feed(&mut self, line: &str) -> Result<()> {
        self.lines += 1;
        let text = line.trim();
        if text.is_empty() || text.starts_with('#') {
            return Ok(());
        }
        let sample = Sample::parse(text, &self.signature, &self.format)
            .with_context(|| format!("line {}", self.lines))?;
        let report = self
            .monitor
            .step(&sample)
            .with_context(|| format!("line {}", self.lines))?;
        self.steps = report.step;
        tracing::debug!(
            step = report.step,
            any_pre = report.any_pre,
            fired = report.fired,
            tokens = report.tokens,
            verdict = %report.verdict,
            "step"
        );

        let snapshot = match (&self.recorder, self.output) {
            (None, Output::Quiet) => None,
            _ => Some(self.monitor.snapshot()),
        };
        if let Some(recorder) = &self.recorder {
            recorder
                .store
                .record_step(
                    recorder.run_id,
                    sample.delta_env,
                    sample.delta_sys,
                    &report,
                    snapshot.as_ref(),
                )
                .context("failed to record step")?;
        }
        match (self.output, snapshot) {
            (Output::Text, Some(snapshot)) => print!("{snapshot}"),
            (Output::Json, Some(snapshot)) => {
                let line = StepLine {
                    line: self.lines,
                    report: &report,
                    snapshot,
                };
                println!("{}", serde_json::to_string(&line)?);
            }
            _ => {}
        }
        Ok(())
    }

    pub fn should_stop(&self) -> bool {
        self.monitor.should_stop()
    }

    /// Close the archived run, print the summary and return the verdict.
    pub fn finish(self) -> Result<Verdict> {
        let verdict = self.monitor.verdict();
        if let Some(recorder) = &self.recorder {
            recorder
                .store
                .finish_run(recorder.run_id, verdict, self.steps)
                .context("failed to finish run")?;
        }
        match self.output {
            Output::Json => {
                let summary = Summary {
                    contract: self.name,
                    steps: self.steps,
                    verdict,
                };
                println!("{}", serde_json::to_string(&summary)?);
            }
            Output::Text | Output::Quiet => {
                println!("verdict: {verdict} after {} steps", self.steps);
            }
        }
        Ok(verdict)
    }
}
