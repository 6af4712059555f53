// ==========================================
// 家庭关系集成测试
// ==========================================
// 测试范围: FamilyGraph 构建/环检测 → FamilyValidator 配对分类 → 推断 → 校验 → 演练应用
// ==========================================

mod helpers;

use helpers::test_data_builder::*;
use meeting_assign::domain::family::{Confidence, InferredRelation};
use meeting_assign::domain::{FamilyLink, RelationKind, Relationship};
use meeting_assign::engine::{
    FamilyGraph, FamilyInferenceEngine, FamilyValidator, InferenceConflictKind,
    PairClassification,
};
use meeting_assign::Member;

fn link(source: &str, target: &str, relation: RelationKind) -> FamilyLink {
    FamilyLink {
        source_id: source.to_string(),
        target_id: target.to_string(),
        relation,
    }
}

// ==========================================
// 场景1: 配对分类
// ==========================================

#[test]
fn test_child_and_parent_across_genders_is_direct_family() {
    let members = vec![
        MemberBuilder::brother("Parent").age(52).build(),
        MemberBuilder::sister("Child").age(24).parent("Parent").build(),
    ];
    let graph = FamilyGraph::build(&members, &[]);
    let validator = FamilyValidator::new(&graph);

    let result = validator.validate_pair(&members[1], &members[0]);
    assert!(result.compliant);
    assert_eq!(result.classification, PairClassification::DirectFamily);
    assert_eq!(result.relationship, Some(Relationship::ParentChild));
    assert!(result.violations.is_empty());
}

#[test]
fn test_unrelated_adults_of_different_gender_are_rejected_with_suggestion() {
    let members = vec![
        MemberBuilder::brother("Rui").age(40).build(),
        MemberBuilder::sister("Ana").age(35).build(),
    ];
    let graph = FamilyGraph::build(&members, &[]);
    let validator = FamilyValidator::new(&graph);

    let result = validator.validate_pair(&members[0], &members[1]);
    assert!(!result.compliant);
    assert_eq!(result.classification, PairClassification::UnrelatedMixedGender);
    assert!(!result.suggestions.is_empty());
    assert!(result.suggestions.iter().all(|s| !s.is_empty()));
}

#[test]
fn test_minor_mixed_gender_has_no_family_exception() {
    let members = vec![
        MemberBuilder::brother("Dad").age(45).build(),
        MemberBuilder::sister("Lea").age(15).parent("Dad").build(),
    ];
    let graph = FamilyGraph::build(&members, &[]);
    let validator = FamilyValidator::new(&graph);

    let result = validator.validate_pair(&members[0], &members[1]);
    assert!(!result.compliant);
    assert_eq!(result.classification, PairClassification::MinorMixedGender);
}

#[test]
fn test_siblings_and_links_are_classified() {
    let members = vec![
        MemberBuilder::brother("Dad").age(50).build(),
        MemberBuilder::brother("Leo").age(22).parent("Dad").build(),
        MemberBuilder::sister("Bia").age(20).parent("Dad").build(),
        MemberBuilder::sister("Eva").age(30).build(),
    ];
    let links = vec![link("Leo", "Eva", RelationKind::GuardianOf)];
    let graph = FamilyGraph::build(&members, &links);
    let validator = FamilyValidator::new(&graph);

    let siblings = validator.validate_pair(&members[1], &members[2]);
    assert_eq!(siblings.classification, PairClassification::DirectFamily);
    assert_eq!(siblings.relationship, Some(Relationship::Siblings));

    // 链接双向可查
    let linked = validator.validate_pair(&members[3], &members[1]);
    assert!(linked.compliant);
    assert_eq!(linked.classification, PairClassification::IndirectFamily);
    assert_eq!(linked.warnings.len(), 1);
}

// ==========================================
// 场景2: 图结构与环检测
// ==========================================

#[test]
fn test_mutual_parent_pointers_are_flagged_as_cycle() {
    let members = vec![
        MemberBuilder::brother("A").parent("B").build(),
        MemberBuilder::brother("B").parent("A").build(),
    ];
    let graph = FamilyGraph::build(&members, &[]);

    let cycles = graph.detect_cycles();
    assert!(!cycles.is_empty());
    assert!(cycles.iter().any(|c| c.path.contains(&"A".to_string())
        && c.path.contains(&"B".to_string())));

    let report = graph.validate_structure();
    assert!(!report.valid);
    assert!(report.errors.iter().any(|e| e.starts_with("CYCLE:")));
}

#[test]
fn test_married_couple_with_children_is_acyclic() {
    let members = vec![
        MemberBuilder::brother("J").age(45).spouse("M").build(),
        MemberBuilder::sister("M").age(43).spouse("J").build(),
        MemberBuilder::brother("P").age(12).parent("J").parent("M").build(),
    ];
    let graph = FamilyGraph::build(&members, &[]);

    assert!(graph.detect_cycles().is_empty());
    let report = graph.validate_structure();
    assert!(report.valid, "{:?}", report.errors);
    assert!(report.warnings.is_empty());
    assert_eq!(graph.spouse_of("J"), Some("M"));
}

#[test]
fn test_structure_report_collects_warnings() {
    let members = vec![
        MemberBuilder::sister("Lea").age(10).build(),
        MemberBuilder::brother("Rui").spouse("Ghost").build(),
        MemberBuilder::sister("Eva").spouse("Eva").build(),
    ];
    let graph = FamilyGraph::build(&members, &[link("Rui", "Nobody", RelationKind::GuardianOf)]);
    let report = graph.validate_structure();

    assert!(!report.valid);
    assert!(report.errors.iter().any(|e| e.starts_with("SELF_REFERENCE")));
    assert!(report.warnings.iter().any(|w| w.starts_with("ORPHANED_MINOR")));
    assert!(report.warnings.iter().any(|w| w.starts_with("DANGLING_SPOUSE")));
    assert!(report.warnings.iter().any(|w| w.starts_with("DANGLING_LINK")));
}

#[test]
fn test_guardian_link_satisfies_orphaned_minor_check() {
    let members = vec![
        MemberBuilder::sister("Lea").age(10).build(),
        MemberBuilder::sister("Eva").age(40).build(),
    ];
    let graph = FamilyGraph::build(&members, &[link("Eva", "Lea", RelationKind::GuardianOf)]);
    let report = graph.validate_structure();

    assert!(report.valid);
    assert!(!report.warnings.iter().any(|w| w.starts_with("ORPHANED_MINOR")));
}

// ==========================================
// 场景3: 推断 → 校验 → 演练应用
// ==========================================

fn costa_family() -> Vec<Member> {
    vec![
        MemberBuilder::brother("C1").name("Carlos Costa").age(48).married().build(),
        MemberBuilder::sister("C2").name("Rita Costa").age(45).married().build(),
        MemberBuilder::sister("C3").name("Julia Costa").age(14).build(),
        MemberBuilder::brother("O1").name("Paulo Mendes").age(33).build(),
    ]
}

#[test]
fn test_inference_pipeline_end_to_end() {
    let members = costa_family();
    let today = reference_date();
    let engine = FamilyInferenceEngine::default();

    let result = engine.infer(&members, today);
    assert_eq!(result.statistics.families_detected, 1);
    assert!(result
        .proposals
        .iter()
        .any(|p| p.relation == InferredRelation::Spouse && p.confidence == Confidence::High));
    assert!(result
        .proposals
        .iter()
        .filter(|p| p.relation == InferredRelation::ChildOf)
        .all(|p| p.subject_id == "C3"));

    let graph = FamilyGraph::build(&members, &[]);
    let checked = engine.validate_inferences(&result.proposals, &members, &graph, today);
    assert!(checked.conflicts.is_empty());
    assert_eq!(checked.valid.len(), result.proposals.len());

    let applied = engine.apply_inferences(&checked.valid, &members, today);
    let julia = applied.members.iter().find(|m| m.id == "C3").unwrap();
    assert!(julia.is_parent("C1"));
    assert!(julia.is_parent("C2"));

    // 应用后的名册构成合法结构,且父女之间是直接关系（但未成年异性配对仍被禁止）
    let new_graph = FamilyGraph::build(&applied.members, &[]);
    assert!(new_graph.validate_structure().valid);
    assert_eq!(
        new_graph.relationship("C3", "C1"),
        Some(Relationship::ParentChild)
    );

    // 原名册保持不变
    assert!(members[2].parent1_id.is_none());
}

#[test]
fn test_existing_relationships_are_not_proposed_again() {
    let mut members = costa_family();
    members[0].spouse_id = Some("C2".to_string());
    members[1].spouse_id = Some("C1".to_string());

    let result = FamilyInferenceEngine::default().infer(&members, reference_date());
    assert!(!result
        .proposals
        .iter()
        .any(|p| p.relation == InferredRelation::Spouse));
}

#[test]
fn test_conflicting_spouse_proposal_is_rejected() {
    let mut members = costa_family();
    // C1 已登记与外部成员 O1 为配偶（数据示意）
    members[0].spouse_id = Some("O1".to_string());
    members[3].spouse_id = Some("C1".to_string());

    let engine = FamilyInferenceEngine::default();
    let result = engine.infer(&members, reference_date());
    let graph = FamilyGraph::build(&members, &[]);
    let checked = engine.validate_inferences(&result.proposals, &members, &graph, reference_date());

    assert!(checked
        .conflicts
        .iter()
        .any(|c| c.kind == InferenceConflictKind::ExistingRelationship));
    assert!(!checked
        .valid
        .iter()
        .any(|p| p.relation == InferredRelation::Spouse));
}
