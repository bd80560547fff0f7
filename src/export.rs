// src/export.rs - Session recording: per-frame CSV, JSON summary and HTML report
use anyhow::{Context, Result};
use chrono::Local;
use csv::Writer;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::analysis::FrameSnapshot;
use crate::catalog::JointCatalog;

#[derive(Debug, Clone, Copy, Default)]
struct RunningStats {
    samples: usize,
    sum: f64,
    max: f64,
}

impl RunningStats {
    fn push(&mut self, value: f64) {
        self.max = if self.samples == 0 { value } else { self.max.max(value) };
        self.samples += 1;
        self.sum += value;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementStats {
    pub name: String,
    pub samples: usize,
    pub mean: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub session_name: String,
    pub frames: usize,
    pub present_frames: usize,
    pub compliant_frames: usize,
    pub presence_rate: f64,
    pub compliance_rate: f64,
    pub measurements: Vec<MeasurementStats>,
}

/// Streams snapshots for one capture session to `readings.csv` as they
/// arrive. Only running totals stay in memory.
pub struct SessionRecorder {
    output_dir: PathBuf,
    session_name: String,
    columns: Vec<String>,
    writer: Option<Writer<File>>,
    frames: usize,
    present_frames: usize,
    compliant_frames: usize,
    stats: Vec<RunningStats>,
}

impl SessionRecorder {
    /// One column per catalog measurement, in catalog order.
    pub fn new(output_dir: impl AsRef<Path>, session_name: Option<String>, catalog: &JointCatalog) -> Self {
        let session_name = session_name.unwrap_or_else(|| {
            let id = uuid::Uuid::new_v4().simple().to_string();
            format!("session_{}_{}", Local::now().format("%Y%m%d_%H%M%S"), &id[..8])
        });
        let columns: Vec<String> = catalog.measurement_names().map(str::to_string).collect();

        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            session_name,
            stats: vec![RunningStats::default(); columns.len()],
            columns,
            writer: None,
            frames: 0,
            present_frames: 0,
            compliant_frames: 0,
        }
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    pub fn session_dir(&self) -> PathBuf {
        self.output_dir.join(&self.session_name)
    }

    pub fn csv_path(&self) -> PathBuf {
        self.session_dir().join("readings.csv")
    }

    pub fn frame_count(&self) -> usize {
        self.frames
    }

    fn prepare_path(&self, file_name: &str) -> Result<PathBuf> {
        let dir = self.session_dir();
        std::fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;
        Ok(dir.join(file_name))
    }

    fn open_writer(&mut self) -> Result<&mut Writer<File>> {
        if self.writer.is_none() {
            let csv_path = self.prepare_path("readings.csv")?;
            let file =
                File::create(&csv_path).with_context(|| format!("Failed to create {}", csv_path.display()))?;
            let mut writer = Writer::from_writer(file);

            let mut header = vec![
                "frame".to_string(),
                "timestamp_ms".to_string(),
                "subject_present".to_string(),
                "inside_capture_region".to_string(),
            ];
            header.extend(self.columns.iter().cloned());
            writer.write_record(&header)?;
            self.writer = Some(writer);
        }
        self.writer.as_mut().context("CSV writer was not opened")
    }

    /// Appends one row; a measurement missing from the frame is an empty cell.
    pub fn record(&mut self, snapshot: &FrameSnapshot) -> Result<()> {
        let values: Vec<Option<f64>> = self.columns.iter().map(|name| snapshot.degrees(name)).collect();

        let mut row = vec![
            self.frames.to_string(),
            format!("{:.3}", snapshot.timestamp_ms),
            snapshot.subject_present.to_string(),
            snapshot.inside_capture_region.to_string(),
        ];
        row.extend(values.iter().map(|v| v.map(|d| d.to_string()).unwrap_or_default()));
        self.open_writer()?.write_record(&row)?;

        self.frames += 1;
        if snapshot.subject_present {
            self.present_frames += 1;
        }
        if snapshot.inside_capture_region {
            self.compliant_frames += 1;
        }
        for (stats, value) in self.stats.iter_mut().zip(values) {
            if let Some(value) = value {
                stats.push(value);
            }
        }
        Ok(())
    }

    /// Flushes `readings.csv` to disk and returns its path. The header is
    /// written even when no frame was recorded.
    pub fn export_csv(&mut self) -> Result<PathBuf> {
        self.open_writer()?.flush()?;
        let csv_path = self.csv_path();
        info!(path = %csv_path.display(), rows = self.frames, "readings exported");
        Ok(csv_path)
    }

    pub fn summary(&self) -> SessionSummary {
        let frames = self.frames;
        let rate = |count: usize| {
            if frames == 0 {
                0.0
            } else {
                count as f64 / frames as f64
            }
        };

        let measurements = self
            .columns
            .iter()
            .zip(&self.stats)
            .filter(|(_, stats)| stats.samples > 0)
            .map(|(name, stats)| MeasurementStats {
                name: name.clone(),
                samples: stats.samples,
                mean: stats.sum / stats.samples as f64,
                max: stats.max,
            })
            .collect();

        SessionSummary {
            session_name: self.session_name.clone(),
            frames,
            present_frames: self.present_frames,
            compliant_frames: self.compliant_frames,
            presence_rate: rate(self.present_frames),
            compliance_rate: rate(self.compliant_frames),
            measurements,
        }
    }

    pub fn export_summary_json(&self) -> Result<PathBuf> {
        let path = self.prepare_path("summary.json")?;
        let json = serde_json::to_string_pretty(&self.summary())?;
        std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }

    pub fn generate_report(&self) -> Result<PathBuf> {
        let report_path = self.prepare_path("report.html")?;
        std::fs::write(&report_path, self.create_html_report())
            .with_context(|| format!("Failed to write {}", report_path.display()))?;
        info!(path = %report_path.display(), "report written");
        Ok(report_path)
    }

    fn create_html_report(&self) -> String {
        let summary = self.summary();

        let rows: String = summary
            .measurements
            .iter()
            .map(|m| {
                format!(
                    "            <tr><td>{}</td><td>{}</td><td>{:.2}°</td><td>{:.2}°</td></tr>\n",
                    m.name, m.samples, m.mean, m.max
                )
            })
            .collect();

        format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <title>Ergonomics Report - {name}</title>
    <style>
        body {{ font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; margin: 40px; background: #f5f5f5; }}
        h1 {{ color: #333; }}
        .stats {{ background: white; padding: 20px; border-radius: 8px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }}
        .stat-item {{ margin: 10px 0; }}
        .stat-label {{ font-weight: bold; color: #666; }}
        .stat-value {{ color: #4682EA; font-size: 1.2em; }}
        table {{ border-collapse: collapse; margin-top: 20px; background: white; }}
        td, th {{ padding: 6px 12px; border-bottom: 1px solid #ddd; text-align: left; }}
    </style>
</head>
<body>
    <h1>Ergonomics Session Report</h1>
    <div class="stats">
        <h2>Session: {name}</h2>
        <div class="stat-item">
            <span class="stat-label">Total Frames:</span>
            <span class="stat-value">{frames}</span>
        </div>
        <div class="stat-item">
            <span class="stat-label">Subject Detected:</span>
            <span class="stat-value">{presence:.1}%</span>
        </div>
        <div class="stat-item">
            <span class="stat-label">Inside Capture Region:</span>
            <span class="stat-value">{compliance:.1}%</span>
        </div>
        <table>
            <tr><th>Measurement</th><th>Samples</th><th>Mean</th><th>Max</th></tr>
{rows}        </table>
    </div>
</body>
</html>
"#,
            name = summary.session_name,
            frames = summary.frames,
            presence = summary.presence_rate * 100.0,
            compliance = summary.compliance_rate * 100.0,
            rows = rows,
        )
    }
}
