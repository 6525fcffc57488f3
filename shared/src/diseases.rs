//! Disease catalog
//!
//! The one table of disease reference data. Prompt construction, the catalog
//! endpoint and the risk cascade all resolve identifiers against it.

use crate::models::Disease;
use serde::Serialize;

/// One catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DiseaseInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    /// Free-text dietary concern used to condition prompts
    pub concerns: &'static str,
}

/// Canonical catalog
pub const DISEASE_CATALOG: [DiseaseInfo; 8] = [
    DiseaseInfo {
        id: "htn",
        name: "고혈압",
        description: "혈압이 정상보다 높은 상태",
        concerns: "나트륨 함량이 높으면 위험",
    },
    DiseaseInfo {
        id: "dm",
        name: "당뇨병",
        description: "혈당이 정상보다 높은 상태",
        concerns: "당분과 탄수화물 함량이 높으면 위험",
    },
    DiseaseInfo {
        id: "dyslipidemia",
        name: "고지혈증",
        description: "혈중 지질 수치가 높은 상태",
        concerns: "포화지방과 콜레스테롤이 높으면 위험",
    },
    DiseaseInfo {
        id: "obesity",
        name: "비만",
        description: "체질량지수가 높은 상태",
        concerns: "칼로리와 지방이 높으면 위험",
    },
    DiseaseInfo {
        id: "kidney",
        name: "신장질환",
        description: "신장 기능이 저하된 상태",
        concerns: "나트륨, 칼륨, 인이 높으면 위험",
    },
    DiseaseInfo {
        id: "liver",
        name: "간질환",
        description: "간 기능이 저하된 상태",
        concerns: "지방과 알코올이 많으면 위험",
    },
    DiseaseInfo {
        id: "gout",
        name: "통풍",
        description: "요산이 과다하게 축적되는 상태",
        concerns: "퓨린 함량이 높으면 위험",
    },
    DiseaseInfo {
        id: "osas",
        name: "수면무호흡증",
        description: "수면 중 호흡이 반복적으로 멈추는 상태",
        concerns: "칼로리와 지방이 높아 체중이 늘면 위험",
    },
];

/// Look up a catalog entry by id (case-insensitive)
pub fn find_disease(id: &str) -> Option<&'static DiseaseInfo> {
    let id = id.trim();
    DISEASE_CATALOG
        .iter()
        .find(|d| d.id.eq_ignore_ascii_case(id))
}

/// Catalog entry for a disease scored by the cascade
pub fn disease_info(disease: Disease) -> &'static DiseaseInfo {
    let index = match disease {
        Disease::Hypertension => 0,
        Disease::Diabetes => 1,
        Disease::Dyslipidemia => 2,
        Disease::Osas => 7,
    };
    &DISEASE_CATALOG[index]
}

/// A selected disease, resolved against the catalog when possible
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedDisease {
    Known(&'static DiseaseInfo),
    /// Unknown ids pass through as their raw text
    Unknown(String),
}

impl ResolvedDisease {
    /// Clause used in prompts: "name(concern)" or the raw id
    pub fn prompt_clause(&self) -> String {
        match self {
            ResolvedDisease::Known(info) => format!("{}({})", info.name, info.concerns),
            ResolvedDisease::Unknown(raw) => raw.clone(),
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            ResolvedDisease::Known(info) => info.name,
            ResolvedDisease::Unknown(raw) => raw,
        }
    }
}

/// Resolve selected ids, skipping blanks and duplicates
///
/// Never fails: ids missing from the catalog degrade to raw pass-through.
pub fn resolve_selection<S: AsRef<str>>(ids: &[S]) -> Vec<ResolvedDisease> {
    let mut resolved: Vec<ResolvedDisease> = Vec::new();
    for raw in ids {
        let raw = raw.as_ref().trim();
        if raw.is_empty() {
            continue;
        }
        let entry = match find_disease(raw) {
            Some(info) => ResolvedDisease::Known(info),
            None => ResolvedDisease::Unknown(raw.to_string()),
        };
        if !resolved.contains(&entry) {
            resolved.push(entry);
        }
    }
    resolved
}
