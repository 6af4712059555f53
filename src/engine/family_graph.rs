// ==========================================
// 聚会节目分派引擎 - 家庭关系图
// ==========================================
// 职责: 父母/配偶指针 + 显式链接的内存图,关系查询,环检测,结构校验
// 结构: arena + 下标,节点之间只保存下标,不持有所有权
// 红线: 构建时发现的问题只报告,不静默修正（配偶互指除外,会记录警告）
// ==========================================

use crate::domain::family::{FamilyLink, RelationKind, Relationship};
use crate::domain::member::Member;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Default)]
struct Node {
    parents: [Option<usize>; 2],
    spouse: Option<usize>,
    minor: bool,
    has_guardian_link: bool,
}

/// 环检测中的边类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgeKind {
    Root,
    Parent,
    Spouse,
}

// ==========================================
// FamilyCycle - 检测到的环
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyCycle {
    /// 环上的成员（首尾相同）
    pub path: Vec<String>,
}

impl fmt::Display for FamilyCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.join(" -> "))
    }
}

// ==========================================
// StructureReport - 图结构校验报告
// ==========================================
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructureReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

// ==========================================
// FamilyGraph
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct FamilyGraph {
    index: HashMap<String, usize>,
    ids: Vec<String>,
    nodes: Vec<Node>,
    links: HashMap<(usize, usize), RelationKind>,
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl FamilyGraph {
    /// 由完整名册（含非活跃成员）与显式链接构建
    ///
    /// # 规则
    /// - 自引用（自己是自己的父母/配偶）记为错误,边丢弃
    /// - 指向不存在成员的指针/链接记为警告,边丢弃
    /// - 单向配偶指针补全为互指,并记录警告;互相冲突的配偶指针只报告
    /// - 显式链接存为双向查找
    pub fn build(members: &[Member], links: &[FamilyLink]) -> Self {
        let mut graph = FamilyGraph::default();

        for member in members {
            if graph.index.contains_key(&member.id) {
                graph
                    .warnings
                    .push(format!("DUPLICATE_MEMBER: member={} (first entry kept)", member.id));
                continue;
            }
            graph.index.insert(member.id.clone(), graph.ids.len());
            graph.ids.push(member.id.clone());
            graph.nodes.push(Node {
                minor: member.minor,
                ..Node::default()
            });
        }

        // === 父母指针与配偶声明 ===
        let mut declared_spouse: Vec<Option<usize>> = vec![None; graph.nodes.len()];
        for member in members {
            let Some(&idx) = graph.index.get(&member.id) else {
                continue;
            };

            let mut slot = 0;
            for parent_id in member.parent_ids() {
                if parent_id == member.id {
                    graph
                        .errors
                        .push(format!("SELF_REFERENCE: member={} is its own parent", member.id));
                    continue;
                }
                match graph.index.get(parent_id) {
                    Some(&parent_idx) if slot < 2 => {
                        graph.nodes[idx].parents[slot] = Some(parent_idx);
                        slot += 1;
                    }
                    Some(_) => {}
                    None => graph.warnings.push(format!(
                        "DANGLING_PARENT: member={} parent={} not in roster",
                        member.id, parent_id
                    )),
                }
            }

            if let Some(spouse_id) = member.spouse_id.as_deref() {
                if spouse_id == member.id {
                    graph
                        .errors
                        .push(format!("SELF_REFERENCE: member={} is its own spouse", member.id));
                } else if let Some(&spouse_idx) = graph.index.get(spouse_id) {
                    declared_spouse[idx] = Some(spouse_idx);
                } else {
                    graph.warnings.push(format!(
                        "DANGLING_SPOUSE: member={} spouse={} not in roster",
                        member.id, spouse_id
                    ));
                }
            }
        }

        graph.reconcile_spouses(&declared_spouse);

        // === 显式链接 ===
        for link in links {
            let source = graph.index.get(&link.source_id).copied();
            let target = graph.index.get(&link.target_id).copied();
            match (source, target) {
                (Some(s), Some(t)) if s == t => graph.errors.push(format!(
                    "SELF_REFERENCE: link {} {} {}",
                    link.source_id, link.relation, link.target_id
                )),
                (Some(s), Some(t)) => {
                    graph.links.entry((s, t)).or_insert(link.relation);
                    graph.links.entry((t, s)).or_insert(link.relation);
                    match link.relation {
                        RelationKind::ChildOf => graph.nodes[s].has_guardian_link = true,
                        RelationKind::GuardianOf => graph.nodes[t].has_guardian_link = true,
                        RelationKind::Spouse => {}
                    }
                }
                _ => graph.warnings.push(format!(
                    "DANGLING_LINK: {} {} {}",
                    link.source_id, link.relation, link.target_id
                )),
            }
        }

        debug!(
            members = graph.nodes.len(),
            links = links.len(),
            errors = graph.errors.len(),
            warnings = graph.warnings.len(),
            "家庭关系图构建完成"
        );

        graph
    }

    fn reconcile_spouses(&mut self, declared: &[Option<usize>]) {
        for (idx, spouse) in declared.iter().enumerate() {
            if let Some(s) = spouse {
                self.nodes[idx].spouse = Some(*s);
            }
        }

        for (idx, spouse) in declared.iter().enumerate() {
            let Some(other) = *spouse else { continue };
            match declared[other] {
                Some(back) if back == idx => {}
                Some(back) => self.warnings.push(format!(
                    "SPOUSE_CONFLICT: {} -> {} but {} -> {}",
                    self.ids[idx], self.ids[other], self.ids[other], self.ids[back]
                )),
                None => match self.nodes[other].spouse {
                    None => {
                        self.nodes[other].spouse = Some(idx);
                        self.warnings.push(format!(
                            "NON_RECIPROCAL_SPOUSE: {} -> {} (reconciled)",
                            self.ids[idx], self.ids[other]
                        ));
                    }
                    Some(claimed) if claimed == idx => {}
                    Some(claimed) => self.warnings.push(format!(
                        "SPOUSE_CONFLICT: {} and {} both claim {}",
                        self.ids[claimed], self.ids[idx], self.ids[other]
                    )),
                },
            }
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// 构建阶段产生的警告
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// 对齐后的配偶（互指补全之后）
    pub fn spouse_of(&self, id: &str) -> Option<&str> {
        let idx = *self.index.get(id)?;
        self.nodes[idx].spouse.map(|s| self.ids[s].as_str())
    }

    /// 查询两个成员之间的关系
    ///
    /// # 规则（按顺序）
    /// 1. 父母/子女指针
    /// 2. 配偶指针
    /// 3. 共同父母（兄弟姊妹）
    /// 4. 显式链接（间接关系）
    pub fn relationship(&self, a: &str, b: &str) -> Option<Relationship> {
        let a = *self.index.get(a)?;
        let b = *self.index.get(b)?;
        if a == b {
            return None;
        }

        let (na, nb) = (&self.nodes[a], &self.nodes[b]);

        if na.parents.contains(&Some(b)) || nb.parents.contains(&Some(a)) {
            return Some(Relationship::ParentChild);
        }
        if na.spouse == Some(b) || nb.spouse == Some(a) {
            return Some(Relationship::Spouse);
        }
        let shared_parent = na
            .parents
            .iter()
            .flatten()
            .any(|p| nb.parents.contains(&Some(*p)));
        if shared_parent {
            return Some(Relationship::Siblings);
        }

        self.links.get(&(a, b)).map(|kind| Relationship::Linked(*kind))
    }

    /// 环检测（DFS + 递归栈）
    ///
    /// 边: 子女 → 父母,成员 → 配偶。
    /// 回边只有在环路径上至少包含一条父母边时才报告,互指的配偶本身不是环。
    pub fn detect_cycles(&self) -> Vec<FamilyCycle> {
        let mut state = vec![0u8; self.nodes.len()]; // 0 未访问, 1 在栈上, 2 完成
        let mut stack: Vec<(usize, EdgeKind)> = Vec::new();
        let mut cycles = Vec::new();

        for start in 0..self.nodes.len() {
            if state[start] == 0 {
                self.visit(start, EdgeKind::Root, &mut state, &mut stack, &mut cycles);
            }
        }

        cycles
    }

    fn visit(
        &self,
        node: usize,
        via: EdgeKind,
        state: &mut [u8],
        stack: &mut Vec<(usize, EdgeKind)>,
        cycles: &mut Vec<FamilyCycle>,
    ) {
        state[node] = 1;
        stack.push((node, via));

        let n = &self.nodes[node];
        let edges = n
            .parents
            .iter()
            .flatten()
            .map(|&p| (p, EdgeKind::Parent))
            .chain(n.spouse.map(|s| (s, EdgeKind::Spouse)));

        for (next, kind) in edges {
            match state[next] {
                0 => self.visit(next, kind, state, stack, cycles),
                1 => {
                    let Some(pos) = stack.iter().position(|(idx, _)| *idx == next) else {
                        continue;
                    };
                    let through_parent = kind == EdgeKind::Parent
                        || stack[pos + 1..].iter().any(|(_, k)| *k == EdgeKind::Parent);
                    if through_parent {
                        let mut path: Vec<String> = stack[pos..]
                            .iter()
                            .map(|(idx, _)| self.ids[*idx].clone())
                            .collect();
                        path.push(self.ids[next].clone());
                        cycles.push(FamilyCycle { path });
                    }
                }
                _ => {}
            }
        }

        stack.pop();
        state[node] = 2;
    }

    /// 图结构校验
    ///
    /// # 返回
    /// - errors: 环、自引用
    /// - warnings: 构建警告 + 无父母也无监护链接的未成年人
    pub fn validate_structure(&self) -> StructureReport {
        let mut errors = self.errors.clone();
        errors.extend(
            self.detect_cycles()
                .into_iter()
                .map(|cycle| format!("CYCLE: {}", cycle)),
        );

        let mut warnings = self.warnings.clone();
        for (idx, node) in self.nodes.iter().enumerate() {
            let orphaned = node.minor
                && node.parents.iter().all(Option::is_none)
                && !node.has_guardian_link;
            if orphaned {
                warnings.push(format!(
                    "ORPHANED_MINOR: member={} has no parent or guardian",
                    self.ids[idx]
                ));
            }
        }

        StructureReport {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }
}
