// ==========================================
// 聚会节目分派引擎 - 命令行入口
// ==========================================
// 用法:
//   meeting-assign allocate <scenario.json> [config.json]
//   meeting-assign validate <scenario.json> [config.json]
//   meeting-assign family   <scenario.json> [config.json]
//
// scenario.json: { members, parts, family_links, reference_date, assignments }
// 所有 I/O 都在这里,引擎层只接收内存集合
// 结果以 JSON 输出到 stdout,日志输出到 stderr
// MEETING_ASSIGN_LOG_FORMAT=json 切换为 JSON 日志
// ==========================================

use anyhow::{bail, Context, Result};
use chrono::Utc;
use meeting_assign::domain::Assignment;
use meeting_assign::engine::{
    AllocationRequest, Allocator, BatchValidator, FamilyGraph, FamilyInferenceEngine,
    RuleCatalog,
};
use meeting_assign::{logging, EngineConfig};
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct Scenario {
    #[serde(flatten)]
    request: AllocationRequest,

    /// validate 命令使用的待校验分派
    #[serde(default)]
    assignments: Option<Vec<Assignment>>,
}

fn main() -> Result<()> {
    match std::env::var("MEETING_ASSIGN_LOG_FORMAT").as_deref() {
        Ok("json") => logging::init_json(),
        _ => logging::init(),
    }

    let mut args = std::env::args().skip(1);
    let usage = "用法: meeting-assign <allocate|validate|family> <scenario.json> [config.json]";
    let command = args.next().context(usage)?;
    let scenario_path = args.next().context(usage)?;

    let config = match args.next() {
        Some(path) => EngineConfig::from_file(&path)
            .with_context(|| format!("加载配置失败: {}", path))?,
        None => EngineConfig::default(),
    };
    let scenario = load_scenario(Path::new(&scenario_path))?;

    tracing::info!(
        version = meeting_assign::VERSION,
        command = %command,
        scenario = %scenario_path,
        "{}",
        meeting_assign::APP_NAME
    );

    let catalog = Arc::new(RuleCatalog::standard());
    let output = match command.as_str() {
        "allocate" => allocate(scenario, catalog, config)?,
        "validate" => validate(scenario, catalog, config)?,
        "family" => family(scenario, config)?,
        other => bail!("未知命令: {}\n{}", other, usage),
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&output).context("结果序列化失败")?
    );
    Ok(())
}

fn load_scenario(path: &Path) -> Result<Scenario> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("读取场景文件失败: {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("解析场景文件失败: {}", path.display()))
}

/// 分派 + 对生成结果执行持久化闸门
fn allocate(
    scenario: Scenario,
    catalog: Arc<RuleCatalog>,
    config: EngineConfig,
) -> Result<serde_json::Value> {
    let request = scenario.request;
    let today = request
        .reference_date
        .unwrap_or_else(|| Utc::now().date_naive());
    let members = request.members.clone().unwrap_or_default();
    let parts = request.parts.clone().unwrap_or_default();
    let links = request.family_links.clone();

    let allocator = Allocator::new(catalog.clone(), config.clone());
    let outcome = allocator
        .run(request.with_reference_date(today))
        .context("分派请求无效")?;

    let report = BatchValidator::new(catalog, config).validate_batch(
        &outcome.assignments,
        &parts,
        &members,
        &links,
        today,
    );
    let gate = report.gate().err().map(|e| e.to_string());

    Ok(json!({
        "outcome": outcome,
        "validation": report,
        "gate_error": gate,
    }))
}

/// 校验场景中提供的（人工编辑过的）分派
fn validate(
    scenario: Scenario,
    catalog: Arc<RuleCatalog>,
    config: EngineConfig,
) -> Result<serde_json::Value> {
    let assignments = scenario
        .assignments
        .context("validate 命令需要场景文件提供 assignments")?;
    let request = scenario.request;
    let today = request
        .reference_date
        .unwrap_or_else(|| Utc::now().date_naive());

    let report = BatchValidator::new(catalog, config).validate_batch(
        &assignments,
        request.parts.as_deref().unwrap_or_default(),
        request.members.as_deref().unwrap_or_default(),
        &request.family_links,
        today,
    );
    let gate = report.gate().err().map(|e| e.to_string());

    Ok(json!({
        "validation": report,
        "gate_error": gate,
    }))
}

/// 家庭结构校验 + 关系推断 + 演练应用
fn family(scenario: Scenario, config: EngineConfig) -> Result<serde_json::Value> {
    let request = scenario.request;
    let members = request.members.unwrap_or_default();
    let today = request
        .reference_date
        .unwrap_or_else(|| Utc::now().date_naive());

    let graph = FamilyGraph::build(&members, &request.family_links);
    let structure = graph.validate_structure();
    let member_warnings: Vec<String> = members
        .iter()
        .flat_map(|m| m.integrity_warnings(today))
        .collect();

    let engine = FamilyInferenceEngine::new(config.inference);
    let inference = engine.infer(&members, today);
    let checked = engine.validate_inferences(&inference.proposals, &members, &graph, today);
    let applied = engine.apply_inferences(&checked.valid, &members, today);

    Ok(json!({
        "structure": structure,
        "member_warnings": member_warnings,
        "inference": inference,
        "validation": checked,
        "dry_run": {
            "changes": applied.changes,
            "skipped": applied.skipped,
        },
    }))
}
