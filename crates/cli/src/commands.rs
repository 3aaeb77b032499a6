// SPDX-License-Identifier: MIT

//! Command handlers for every verb in the operator surface (spec §6).

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use oa_wire::MetricsFormat;

use crate::binary::find_agent_binary;
use crate::exit_error::ExitError;
use crate::output::{format_or_json, print_status_table, OutputFormat};

fn supervisor() -> oa_supervisor::Supervisor {
    oa_supervisor::Supervisor::new(find_agent_binary(), oa_supervisor::SupervisorConfig::default())
}

/// `oa start <descriptor>...`: load every file, register its agents, start
/// them, and report which ones reached `running` vs. `failed`.
pub async fn start(descriptors: Vec<PathBuf>) -> Result<()> {
    let sup = supervisor();
    let mut names = Vec::new();

    for path in &descriptors {
        let (agents, _config) = oa_supervisor::config::load_descriptor_file(path)
            .map_err(ExitError::from)?;
        for agent in agents {
            let name = agent.name.to_string();
            sup.add(agent).map_err(ExitError::from)?;
            names.push(name);
        }
    }

    let mut failed = Vec::new();
    for name in &names {
        if let Err(err) = sup.start(name).await {
            eprintln!("{}: {err}", crate::color::muted(name));
            failed.push(name.clone());
        } else {
            println!("{} started", crate::color::header(name));
        }
    }

    if !failed.is_empty() {
        return Err(anyhow!(ExitError::new(2, format!("agent(s) failed to start: {}", failed.join(", ")))));
    }
    Ok(())
}

/// `oa stop [name...]`: with no names, stop everything currently tracked by
/// the registry.
pub async fn stop(names: Vec<String>) -> Result<()> {
    let sup = supervisor();
    let targets = resolve_targets(&sup, names)?;
    for name in targets {
        sup.stop(&name).await.map_err(ExitError::from)?;
        println!("{} stopped", name);
    }
    Ok(())
}

pub async fn restart(names: Vec<String>) -> Result<()> {
    let sup = supervisor();
    let targets = resolve_targets(&sup, names)?;
    let mut failed = Vec::new();
    for name in &targets {
        if let Err(err) = sup.restart(name).await {
            eprintln!("{name}: {err}");
            failed.push(name.clone());
        } else {
            println!("{name} restarted");
        }
    }
    if !failed.is_empty() {
        return Err(anyhow!(ExitError::new(2, format!("agent(s) failed to restart: {}", failed.join(", ")))));
    }
    Ok(())
}

fn resolve_targets(sup: &oa_supervisor::Supervisor, names: Vec<String>) -> Result<Vec<String>> {
    if !names.is_empty() {
        return Ok(names);
    }
    let status = sup.status().map_err(ExitError::from)?;
    Ok(status.into_keys().collect())
}

pub async fn status(format: OutputFormat) -> Result<()> {
    let sup = supervisor();
    let records = sup.status().map_err(ExitError::from)?;
    let mut rows: Vec<_> = records.into_iter().collect();
    rows.sort_by(|a, b| a.0.cmp(&b.0));

    let json_rows: Vec<serde_json::Value> = rows
        .iter()
        .map(|(name, record)| {
            let mut value = serde_json::to_value(record).unwrap_or(serde_json::Value::Null);
            if let Some(obj) = value.as_object_mut() {
                obj.insert("name".to_string(), serde_json::Value::String(name.clone()));
            }
            value
        })
        .collect();

    format_or_json(format, &json_rows, || print_status_table(&rows))
}

pub async fn connect(a: String, b: String, bidirectional: bool) -> Result<()> {
    let sup = supervisor();
    sup.connect(&a, &b, bidirectional).await.map_err(ExitError::from)?;
    println!("{} {} {}", a, if bidirectional { "<->" } else { "->" }, b);
    Ok(())
}

pub async fn disconnect(a: String, b: String) -> Result<()> {
    let sup = supervisor();
    sup.disconnect(&a, &b).await.map_err(ExitError::from)?;
    println!("{a} -X- {b}");
    Ok(())
}

pub async fn health(name: String, format: OutputFormat) -> Result<()> {
    let sup = supervisor();
    let response = sup.health(&name).await.map_err(ExitError::from)?;
    format_or_json(format, &response, || println!("{response:?}"))
}

pub async fn metrics(name: String, format_arg: Option<String>) -> Result<()> {
    let sup = supervisor();
    let wire_format = match format_arg.as_deref() {
        Some("prometheus") => MetricsFormat::Prometheus,
        _ => MetricsFormat::Json,
    };
    let response = sup.metrics(&name, wire_format).await.map_err(ExitError::from)?;
    match response {
        oa_wire::Response::MetricsJson { metrics } => {
            println!("{}", serde_json::to_string_pretty(&metrics)?);
        }
        oa_wire::Response::MetricsPrometheus { body } => print!("{body}"),
        other => println!("{other:?}"),
    }
    Ok(())
}

pub async fn chat(name: String, message: Option<String>, verbose: bool, interactive: bool) -> Result<()> {
    let socket_path = oa_core::paths::control_socket_path(&name);

    if let Some(message) = message {
        let reply = crate::chat_session::chat_once(&socket_path, message, verbose).await?;
        println!("{reply}");
    }

    if interactive {
        let stdin = std::io::stdin();
        print!("> ");
        use std::io::Write;
        std::io::stdout().flush().ok();
        for line in stdin.lock().lines() {
            let line = line.context("reading stdin")?;
            if line.trim().is_empty() {
                print!("> ");
                std::io::stdout().flush().ok();
                continue;
            }
            let reply = crate::chat_session::chat_once(&socket_path, line, verbose).await?;
            println!("{reply}");
            print!("> ");
            std::io::stdout().flush().ok();
        }
    }
    Ok(())
}

pub async fn logs(name: String, follow: bool) -> Result<()> {
    let Some(log_dir) = std::env::var("OA_LOG_DIR").ok().map(PathBuf::from) else {
        println!("file logging is not enabled; set OA_LOG_DIR and restart the agent to enable it");
        return Ok(());
    };

    let path = latest_log_file(&log_dir, &name)?;
    let Some(path) = path else {
        println!("no log file found for {name} under {}", log_dir.display());
        return Ok(());
    };

    print!("{}", std::fs::read_to_string(&path)?);

    if follow {
        tail_follow(&path).await?;
    }
    Ok(())
}

/// `tracing_appender::rolling::daily` names files `<name>.log.<date>`; pick
/// the lexicographically greatest (i.e. most recent date) that matches.
fn latest_log_file(log_dir: &Path, name: &str) -> Result<Option<PathBuf>> {
    let prefix = format!("{name}.log");
    let mut candidates: Vec<PathBuf> = std::fs::read_dir(log_dir)
        .with_context(|| format!("reading log directory {}", log_dir.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.file_name().and_then(|n| n.to_str()).is_some_and(|n| n.starts_with(&prefix)))
        .collect();
    candidates.sort();
    Ok(candidates.pop())
}

async fn tail_follow(path: &Path) -> Result<()> {
    let mut file = std::fs::File::open(path)?;
    use std::io::{Seek, SeekFrom};
    file.seek(SeekFrom::End(0))?;
    loop {
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
        let mut reader = BufReader::new(&file);
        let mut line = String::new();
        while reader.read_line(&mut line)? > 0 {
            print!("{line}");
            line.clear();
        }
    }
}
