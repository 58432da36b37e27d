//! Dependency Sorter - 배포 순서 계산
//!
//! 두 가지 의존 관계를 구분한다.
//!
//! - **배포 순서**: `depends-on` 으로 선언된 명시적 의존성. DFS 후위 순회.
//! - **구조적 부모/자식**: `compile` 클래스패스 포함 관계. 변경 영향 분석용이며
//!   배포 순서에는 쓰이지 않는다.

use super::descriptor::{PluginDescriptor, Scope};
use crate::artifact::ArtifactKey;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, warn};

/// DFS 방문 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// 정렬 결과
#[derive(Debug, Clone, Default)]
pub struct SortOutcome {
    /// 배포 순서
    pub order: Vec<PluginDescriptor>,

    /// 순환으로 인해 건너뛴 간선 (의존하는 쪽, 의존 대상)
    pub cycles: Vec<(ArtifactKey, ArtifactKey)>,
}

impl SortOutcome {
    pub fn has_cycles(&self) -> bool {
        !self.cycles.is_empty()
    }

    pub fn keys(&self) -> Vec<ArtifactKey> {
        self.order.iter().map(PluginDescriptor::key).collect()
    }
}

/// 배포 순서 정렬기
pub struct DependencySorter;

impl DependencySorter {
    /// 각 플러그인을 같은 집합 안의 모든 명시적 의존성 뒤에 배치
    pub fn sort(descriptors: &[PluginDescriptor]) -> Vec<PluginDescriptor> {
        Self::sort_with_report(descriptors).order
    }

    /// 정렬 + 순환 간선 보고
    ///
    /// 순환은 에러가 아니다. 진행 중인 노드를 다시 만나면 건너뛰므로
    /// 순환 그룹도 종료되고 각 노드는 발견 순서대로 정확히 한 번 출력된다.
    pub fn sort_with_report(descriptors: &[PluginDescriptor]) -> SortOutcome {
        let descriptors = dedupe_last_wins(descriptors);

        let index: HashMap<ArtifactKey, &PluginDescriptor> =
            descriptors.iter().map(|d| (d.key(), d)).collect();

        let mut marks: HashMap<ArtifactKey, Mark> = HashMap::new();
        let mut outcome = SortOutcome::default();

        for descriptor in &descriptors {
            if !marks.contains_key(&descriptor.key()) {
                visit(descriptor, &index, &mut marks, &mut outcome);
            }
        }

        debug!(
            "Sorted {} plugins ({} cycle edges skipped)",
            outcome.order.len(),
            outcome.cycles.len()
        );
        outcome
    }

    // ========================================================================
    // 구조적 질의 (compile 클래스패스 기준)
    // ========================================================================

    /// `descriptor` 의 compile 클래스패스에 포함된 플러그인들
    pub fn parents<'a>(
        descriptor: &PluginDescriptor,
        all: &'a [PluginDescriptor],
    ) -> Vec<&'a PluginDescriptor> {
        let mut parents = Vec::new();
        for compile in descriptor.classpath(Scope::Compile) {
            for info in all {
                if compile.key() == info.key() {
                    parents.push(info);
                }
            }
        }
        parents
    }

    /// compile 클래스패스에 `descriptor` 를 포함하는 플러그인들
    pub fn children<'a>(
        descriptor: &PluginDescriptor,
        all: &'a [PluginDescriptor],
    ) -> Vec<&'a PluginDescriptor> {
        let key = descriptor.key();
        all.iter()
            .filter(|info| {
                info.classpath(Scope::Compile)
                    .iter()
                    .any(|compile| compile.key() == key)
            })
            .collect()
    }

    /// `descriptor` 변경 시 영향받는 플러그인 (자식의 추이적 폐포), `all` 순서
    pub fn impacted_by<'a>(
        descriptor: &PluginDescriptor,
        all: &'a [PluginDescriptor],
    ) -> Vec<&'a PluginDescriptor> {
        let origin = descriptor.key();
        let mut seen: HashSet<ArtifactKey> = HashSet::new();
        let mut queue: VecDeque<&PluginDescriptor> = VecDeque::new();
        queue.push_back(descriptor);

        while let Some(current) = queue.pop_front() {
            for child in Self::children(current, all) {
                let key = child.key();
                if key != origin && seen.insert(key) {
                    queue.push_back(child);
                }
            }
        }

        all.iter().filter(|d| seen.contains(&d.key())).collect()
    }
}

fn visit(
    descriptor: &PluginDescriptor,
    index: &HashMap<ArtifactKey, &PluginDescriptor>,
    marks: &mut HashMap<ArtifactKey, Mark>,
    outcome: &mut SortOutcome,
) {
    let key = descriptor.key();
    marks.insert(key.clone(), Mark::InProgress);

    for dep in descriptor.depends_on() {
        let dep_key = dep.key();
        // 집합에 없는 의존성은 외부에서 충족된 것으로 본다
        let Some(target) = index.get(&dep_key) else {
            continue;
        };
        match marks.get(&dep_key) {
            None => visit(target, index, marks, outcome),
            Some(Mark::InProgress) => {
                warn!("Dependency cycle: {} -> {} (edge skipped)", key, dep_key);
                outcome.cycles.push((key.clone(), dep_key));
            }
            Some(Mark::Done) => {}
        }
    }

    marks.insert(key, Mark::Done);
    outcome.order.push(descriptor.clone());
}

/// 같은 identity 가 여러 번 나오면 마지막 것이 첫 위치를 대체한다
pub fn dedupe_last_wins(descriptors: &[PluginDescriptor]) -> Vec<PluginDescriptor> {
    let mut positions: HashMap<ArtifactKey, usize> = HashMap::new();
    let mut result: Vec<PluginDescriptor> = Vec::with_capacity(descriptors.len());

    for descriptor in descriptors {
        let key = descriptor.key();
        match positions.get(&key) {
            Some(&pos) => {
                warn!(
                    "Duplicate plugin identity {}: {} replaces {}",
                    key,
                    descriptor.coordinates(),
                    result[pos].coordinates()
                );
                result[pos] = descriptor.clone();
            }
            None => {
                positions.insert(key, result.len());
                result.push(descriptor.clone());
            }
        }
    }

    result
}
