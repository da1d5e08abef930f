//! ThirdLayer - 录制 / 预测演示入口
//!
//! record 模式：逐步执行维基百科搜索工作流，把成功的操作写入转移表；
//! predict 模式：手动执行第一步，其余交给 Agent 循环自主决策，工作流剩余步骤作为基准答案计算准确率。
//! 用法：thirdlayer [record|predict]（需 feature "browser" 与本机 Chrome/Chromium）。

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use thirdlayer::agent::{Actuator, AgentLoop, Observer, PageProbe};
use thirdlayer::browser::ChromeSession;
use thirdlayer::config::load_config;
use thirdlayer::model::{click, extract, navigate, press, type_text, Action};
use thirdlayer::storage::TransitionStore;

/// 维基百科搜索工作流：演示用的固定操作序列
fn wikipedia_workflow() -> Vec<Action> {
    vec![
        navigate("https://en.wikipedia.org"),
        type_text("#searchInput", "Artificial Intelligence"),
        press("Enter"),
        click("h1.firstHeading"),
        extract("p.mw-empty-elt + p"),
    ]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    thirdlayer::observability::init();

    let mode = std::env::args().nth(1).unwrap_or_default();
    match mode.as_str() {
        "record" => run_recording_mode().await,
        "predict" => run_prediction_mode().await,
        _ => {
            eprintln!("Usage: thirdlayer [record|predict]");
            std::process::exit(2);
        }
    }
}

/// 录制模式：按工作流顺序执行并记录，失败的步也落日志（success=false）但不建转移
async fn run_recording_mode() -> anyhow::Result<()> {
    let cfg = load_config(None).context("Failed to load config")?;
    let store = TransitionStore::open(cfg.app.db_path()).context("Failed to open database")?;
    let session =
        Arc::new(ChromeSession::launch(&cfg.browser).context("Failed to launch Chrome")?);
    let pause = Duration::from_millis(cfg.agent.step_pause_ms);

    let workflow = wikipedia_workflow();
    tracing::info!("Recording {} actions", workflow.len());

    for (i, action) in workflow.iter().enumerate() {
        tracing::info!("Step {}: {}", i + 1, action);
        let result = session.execute(action).await;
        let state = session.observe().await?;

        if result.success {
            if let Some(text) = &result.extracted_text {
                let preview: String = text.chars().take(100).collect();
                tracing::info!("Extracted: {}...", preview);
            }
            store.record_action(action, Some(&state.url), true)?;
            if i > 0 {
                store.record_transition_first_order(&workflow[i - 1], action)?;
            }
            if i > 1 {
                store.record_transition_second_order(&workflow[i - 2], &workflow[i - 1], action)?;
            }
        } else {
            tracing::warn!(
                "Step failed: {}",
                result.error.as_deref().unwrap_or("unknown")
            );
            store.record_action(action, Some(&state.url), false)?;
        }
        tokio::time::sleep(pause).await;
    }

    tracing::info!(
        "Total transitions recorded: {}",
        store.total_transition_count()?
    );
    Ok(())
}

/// 预测模式：需要数据库里已有转移数据，否则直接退出
async fn run_prediction_mode() -> anyhow::Result<()> {
    let cfg = load_config(None).context("Failed to load config")?;
    let store =
        Arc::new(TransitionStore::open(cfg.app.db_path()).context("Failed to open database")?);

    let total = store.total_transition_count()?;
    if total == 0 {
        eprintln!("No transitions in database. Run record mode first.");
        return Ok(());
    }
    tracing::info!("Loaded {} transitions from database", total);

    let session =
        Arc::new(ChromeSession::launch(&cfg.browser).context("Failed to launch Chrome")?);
    let pause = Duration::from_millis(cfg.agent.step_pause_ms);

    let mut agent = AgentLoop::new(
        Arc::clone(&store),
        Arc::clone(&session) as Arc<dyn Observer>,
        Arc::clone(&session) as Arc<dyn Actuator>,
        Arc::clone(&session) as Arc<dyn PageProbe>,
        &cfg.agent,
    );

    let workflow = wikipedia_workflow();
    let first = &workflow[0];
    tracing::info!("Executing initial action: {}", first);
    let result = session.execute(first).await;
    if !result.success {
        anyhow::bail!(
            "Initial action failed: {}",
            result.error.unwrap_or_default()
        );
    }
    agent.push_history(first.clone());
    tokio::time::sleep(pause).await;

    for (i, expected) in workflow.iter().enumerate().skip(1) {
        tracing::info!("--- Step {} ---", i + 1);
        tracing::info!("Ground truth: {}", expected);

        let report = agent.step(Some(expected)).await?;

        if let Some(top) = report.predictions.first() {
            tracing::info!(
                "Predicted: {} confidence={:.2} source={} match={:?}",
                top.action,
                top.confidence,
                top.source.as_str(),
                report.ground_truth_match
            );
        } else {
            tracing::info!("No predictions available");
        }

        if report.plan.should_execute {
            if let Some(validation) = &report.validation {
                tracing::info!("Validation: {} ({})", validation.valid, validation.reason);
            }
            if let Some(execution) = &report.execution {
                match &execution.result {
                    Some(r) if r.success => tracing::info!("Execution: SUCCESS"),
                    Some(r) => tracing::warn!(
                        "Execution: FAILED ({})",
                        r.error.as_deref().unwrap_or("unknown")
                    ),
                    None => tracing::info!(
                        "Execution skipped: {}",
                        execution.reason.as_deref().unwrap_or("")
                    ),
                }
            }
        } else {
            tracing::info!("Decision: SKIP ({})", report.plan.reason);
        }
        tracing::info!("Decision time: {:.1}ms", report.decision_time_ms);

        tokio::time::sleep(pause).await;
    }

    println!("{}", serde_json::to_string_pretty(&agent.metrics())?);
    Ok(())
}
